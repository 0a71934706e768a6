use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey,
};

use crate::{
    error::StablecoinEngineError,
    math::{debt_value, Rad, Ray, Wad},
};

/// Per-pool debt accounting
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct CollateralPool {
    pub pool_id: Pubkey,

    /// Per-second compounding factor, never below 1.0
    pub stability_fee_rate: Ray,

    /// Converts debt share into stablecoin debt; starts at 1.0
    pub debt_accumulated_rate: Ray,

    pub last_accumulation_time: UnixTimestamp,

    /// Sum of every position's debt share
    pub total_debt_share: Wad,
}

impl CollateralPool {
    pub fn new(
        pool_id: Pubkey,
        stability_fee_rate: Ray,
        now: UnixTimestamp,
    ) -> Result<Self, ProgramError> {
        let pool = Self {
            pool_id,
            stability_fee_rate,
            debt_accumulated_rate: Ray::one(),
            last_accumulation_time: now,
            total_debt_share: Wad::zero(),
        };
        pool.validate()?;
        Ok(pool)
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.stability_fee_rate < Ray::one() {
            msg!("Stability fee rate {} is below one", self.stability_fee_rate);
            return Err(StablecoinEngineError::InvalidStabilityFeeRate.into());
        }
        if self.debt_accumulated_rate < Ray::one() {
            msg!("Accumulated rate {} is below one", self.debt_accumulated_rate);
            return Err(StablecoinEngineError::InvalidStabilityFeeRate.into());
        }
        Ok(())
    }

    /// Outstanding debt of the whole pool
    pub fn total_debt(&self) -> Result<Rad, ProgramError> {
        debt_value(self.total_debt_share, self.debt_accumulated_rate)
    }
}

/// Collateral and debt share of one position in one pool
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub locked_collateral: Wad,
    pub debt_share: Wad,
}

impl Position {
    pub fn debt(&self, debt_accumulated_rate: Ray) -> Result<Rad, ProgramError> {
        debt_value(self.debt_share, debt_accumulated_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.locked_collateral.is_zero() && self.debt_share.is_zero()
    }
}

/// Registry record of an opened position
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq)]
pub struct PositionHandle {
    pub position_id: u64,
    pub pool_id: Pubkey,
    /// Ledger account holding the position's balances
    pub address: Pubkey,
    pub owner: Pubkey,
}
