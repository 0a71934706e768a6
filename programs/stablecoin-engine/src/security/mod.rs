pub mod access_control;
pub mod reentrancy_guard;

pub use access_control::*;
pub use reentrancy_guard::*;
