// Stablecoin Engine
// Debt accounting, stability fee accrual and a rate-limited swap pool

pub mod constants;
pub mod custody;
pub mod debt_share;
pub mod error;
pub mod events;
pub mod ledger;
pub mod math;
pub mod orchestrator;
pub mod security;
pub mod stability_fee;
pub mod state;
pub mod swap_pool;

pub use error::StablecoinEngineError;

// Declare program ID
solana_program::declare_id!("StabLeEngine1111111111111111111111111111111");
