use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};
use std::collections::BTreeSet;

use crate::{
    constants::*,
    error::StablecoinEngineError,
    math::{Wad, U256},
};

/// Swap pool configuration
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct SwapPoolConfig {
    /// Precision of the reference token, at most 9
    pub token_decimals: u8,

    /// Fee on token -> stablecoin swaps (Wad, at most 0.5)
    pub fee_in: Wad,

    /// Fee on stablecoin -> token swaps (Wad, at most 0.5)
    pub fee_out: Wad,

    /// Share of total value deposited swappable per day, over 10_000
    pub daily_swap_limit_numerator: u64,

    /// Share of total value deposited allowed in one swap, over 10_000
    pub single_swap_limit_numerator: u64,

    pub number_of_swaps_limit_per_user: u64,

    /// Slots per per-user swap window
    pub blocks_per_limit: u64,

    /// Rate limits instead of the whitelist
    pub is_decentralized_state: bool,

    /// Only account allowed to deposit or withdraw liquidity
    pub stableswap_wrapper: Pubkey,

    pub whitelist: BTreeSet<Pubkey>,

    pub paused: bool,
}

impl SwapPoolConfig {
    /// Create default configuration
    pub fn new(token_decimals: u8, stableswap_wrapper: Pubkey) -> Self {
        Self {
            token_decimals,
            fee_in: Wad::zero(),
            fee_out: Wad::zero(),
            daily_swap_limit_numerator: DEFAULT_DAILY_SWAP_LIMIT_NUMERATOR,
            single_swap_limit_numerator: DEFAULT_SINGLE_SWAP_LIMIT_NUMERATOR,
            number_of_swaps_limit_per_user: DEFAULT_NUMBER_OF_SWAPS_LIMIT_PER_USER,
            blocks_per_limit: DEFAULT_BLOCKS_PER_LIMIT,
            is_decentralized_state: false,
            stableswap_wrapper,
            whitelist: BTreeSet::new(),
            paused: false,
        }
    }

    pub fn with_fees(mut self, fee_in: Wad, fee_out: Wad) -> Self {
        self.fee_in = fee_in;
        self.fee_out = fee_out;
        self
    }

    pub fn with_limits(
        mut self,
        daily_swap_limit_numerator: u64,
        single_swap_limit_numerator: u64,
        number_of_swaps_limit_per_user: u64,
        blocks_per_limit: u64,
    ) -> Self {
        self.daily_swap_limit_numerator = daily_swap_limit_numerator;
        self.single_swap_limit_numerator = single_swap_limit_numerator;
        self.number_of_swaps_limit_per_user = number_of_swaps_limit_per_user;
        self.blocks_per_limit = blocks_per_limit;
        self
    }

    pub fn decentralized(mut self) -> Self {
        self.is_decentralized_state = true;
        self
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.token_decimals > MAX_TOKEN_DECIMALS {
            msg!("Token decimals {} exceed {}", self.token_decimals, MAX_TOKEN_DECIMALS);
            return Err(StablecoinEngineError::InvalidDecimals.into());
        }
        validate_fee(self.fee_in)?;
        validate_fee(self.fee_out)?;
        validate_daily_swap_limit_numerator(self.daily_swap_limit_numerator)?;
        validate_single_swap_limit_numerator(self.single_swap_limit_numerator)?;
        validate_at_least_one(self.number_of_swaps_limit_per_user, "swaps per user")?;
        validate_at_least_one(self.blocks_per_limit, "blocks per limit")?;
        Ok(())
    }

    pub fn is_whitelisted(&self, account: &Pubkey) -> bool {
        self.whitelist.contains(account)
    }
}

pub fn validate_fee(fee: Wad) -> Result<(), ProgramError> {
    if fee.raw() > U256::from(MAX_SWAP_FEE_RAW) {
        msg!("Fee {} exceeds 0.5", fee);
        return Err(StablecoinEngineError::InvalidFee.into());
    }
    Ok(())
}

pub fn validate_daily_swap_limit_numerator(numerator: u64) -> Result<(), ProgramError> {
    validate_numerator(numerator, MIN_DAILY_SWAP_LIMIT_NUMERATOR, "daily")
}

pub fn validate_single_swap_limit_numerator(numerator: u64) -> Result<(), ProgramError> {
    validate_numerator(numerator, MIN_SINGLE_SWAP_LIMIT_NUMERATOR, "single")
}

fn validate_numerator(numerator: u64, min: u64, name: &str) -> Result<(), ProgramError> {
    if numerator < min || numerator > MAX_SWAP_LIMIT_NUMERATOR {
        msg!(
            "{} swap limit numerator {} outside {}..={}",
            name,
            numerator,
            min,
            MAX_SWAP_LIMIT_NUMERATOR
        );
        return Err(StablecoinEngineError::InvalidLimitConfig.into());
    }
    Ok(())
}

pub fn validate_at_least_one(value: u64, name: &str) -> Result<(), ProgramError> {
    if value == 0 {
        msg!("{} must be at least one", name);
        return Err(StablecoinEngineError::InvalidLimitConfig.into());
    }
    Ok(())
}
