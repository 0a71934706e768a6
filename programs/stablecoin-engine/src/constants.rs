use solana_program::clock::UnixTimestamp;

/// Denominator of the swap limit numerators
pub const LIMIT_DENOMINATOR: u64 = 10_000;

pub const MIN_DAILY_SWAP_LIMIT_NUMERATOR: u64 = 200;
pub const MIN_SINGLE_SWAP_LIMIT_NUMERATOR: u64 = 100;
pub const MAX_SWAP_LIMIT_NUMERATOR: u64 = LIMIT_DENOMINATOR;

/// Length of the rolling daily swap window
pub const SECONDS_PER_DAY: UnixTimestamp = 86_400;

/// Swap fees are capped at 0.5 (Wad)
pub const MAX_SWAP_FEE_RAW: u64 = 500_000_000_000_000_000;

/// Widest token precision the swap pool accepts; token amounts are u64
pub const MAX_TOKEN_DECIMALS: u8 = 9;

// Swap pool defaults
pub const DEFAULT_DAILY_SWAP_LIMIT_NUMERATOR: u64 = 2_000;
pub const DEFAULT_SINGLE_SWAP_LIMIT_NUMERATOR: u64 = 500;
pub const DEFAULT_NUMBER_OF_SWAPS_LIMIT_PER_USER: u64 = 10;
pub const DEFAULT_BLOCKS_PER_LIMIT: u64 = 150;

// PDA seeds
pub const POSITION_SEED: &[u8] = b"position";
pub const PROXY_SEED: &[u8] = b"proxy";
