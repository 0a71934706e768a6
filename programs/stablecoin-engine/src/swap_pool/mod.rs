//! Rate-limited swap pool
//!
//! Bounded, fee-charging swaps between the stablecoin and a reference token.
//! In decentralized mode every swap is checked against a single-swap limit,
//! a rolling daily limit and a per-user swap count; otherwise only
//! whitelisted accounts may swap.

pub mod admin;
pub mod config;
pub mod limits;
pub mod pool;
pub mod state;

pub use config::*;
pub use pool::*;
pub use state::*;
