// ============================================================================
// STATE MODULE - Rc<RefCell> state with change notifications
// ============================================================================

pub mod reactivity;
pub mod session_store;

pub use reactivity::*;
pub use session_store::*;
