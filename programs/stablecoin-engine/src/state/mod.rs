pub mod collateral_pool;

pub use collateral_pool::*;
