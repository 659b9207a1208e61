// ============================================================================
// VIEWMODELS - State the settings pages render, and the actions they trigger
// ============================================================================

pub mod entity_list_viewmodel;

pub use entity_list_viewmodel::*;
