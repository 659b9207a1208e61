// Shared utilities

pub mod constants;
pub mod storage;
#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use constants::*;
pub use storage::*;
