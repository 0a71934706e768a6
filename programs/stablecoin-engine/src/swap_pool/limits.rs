//! Swap limits
//!
//! Enforced in order: single swap, rolling daily amount, per-user swap
//! count per slot window.

use solana_program::{
    clock::{Clock, Slot, UnixTimestamp},
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    constants::{LIMIT_DENOMINATOR, SECONDS_PER_DAY},
    error::StablecoinEngineError,
    math::{mul_div_floor, Wad, U256},
    swap_pool::{SwapPoolConfig, SwapPoolState, UserSwapWindow},
};

fn share_of_total(total: Wad, numerator: u64) -> Result<Wad, ProgramError> {
    mul_div_floor(total.raw(), U256::from(numerator), U256::from(LIMIT_DENOMINATOR))
        .map(Wad::from_raw)
}

impl SwapPoolState {
    pub fn single_swap_limit(&self, config: &SwapPoolConfig) -> Result<Wad, ProgramError> {
        share_of_total(self.total_value_deposited, config.single_swap_limit_numerator)
    }

    pub fn daily_swap_limit(&self, config: &SwapPoolConfig) -> Result<Wad, ProgramError> {
        share_of_total(self.total_value_deposited, config.daily_swap_limit_numerator)
    }

    pub fn check_single_swap_limit(
        &self,
        config: &SwapPoolConfig,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        let limit = self.single_swap_limit(config)?;
        if amount > limit {
            msg!("Swap of {} exceeds single swap limit {}", amount, limit);
            return Err(StablecoinEngineError::SingleSwapLimitExceeded.into());
        }
        Ok(())
    }

    /// Restarts the daily window at `now` with a fresh allowance.
    pub fn refresh_daily_limit(
        &mut self,
        config: &SwapPoolConfig,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError> {
        self.remaining_daily_swap_amount = self.daily_swap_limit(config)?;
        self.last_update = now;
        Ok(())
    }

    /// Caps the remaining allowance at the limit for the current total
    /// value deposited.
    pub fn clamp_daily_limit(&mut self, config: &SwapPoolConfig) -> Result<(), ProgramError> {
        let limit = self.daily_swap_limit(config)?;
        if self.remaining_daily_swap_amount > limit {
            self.remaining_daily_swap_amount = limit;
        }
        Ok(())
    }

    pub fn update_and_check_daily_limit(
        &mut self,
        config: &SwapPoolConfig,
        amount: Wad,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError> {
        if now.saturating_sub(self.last_update) >= SECONDS_PER_DAY {
            self.refresh_daily_limit(config, now)?;
        }
        if self.remaining_daily_swap_amount < amount {
            msg!(
                "Swap of {} exceeds remaining daily amount {}",
                amount,
                self.remaining_daily_swap_amount
            );
            return Err(StablecoinEngineError::DailyLimitExceeded.into());
        }
        self.remaining_daily_swap_amount = self.remaining_daily_swap_amount.safe_sub(amount)?;
        Ok(())
    }

    pub fn update_and_check_user_limit(
        &mut self,
        config: &SwapPoolConfig,
        user: &Pubkey,
        slot: Slot,
    ) -> Result<(), ProgramError> {
        let window = self.per_user.entry(*user).or_insert(UserSwapWindow {
            swaps_remaining: config.number_of_swaps_limit_per_user,
            last_window_boundary: slot,
        });
        if slot.saturating_sub(window.last_window_boundary) >= config.blocks_per_limit {
            window.swaps_remaining = config.number_of_swaps_limit_per_user;
            window.last_window_boundary = slot;
        }
        if window.swaps_remaining == 0 {
            msg!(
                "{} has no swaps left until slot {}",
                user,
                window
                    .last_window_boundary
                    .saturating_add(config.blocks_per_limit)
            );
            return Err(StablecoinEngineError::SwapCountExceeded.into());
        }
        window.swaps_remaining -= 1;
        Ok(())
    }

    /// Applies every limit when the pool runs in decentralized mode.
    pub fn apply_swap_limits(
        &mut self,
        config: &SwapPoolConfig,
        user: &Pubkey,
        amount: Wad,
        clock: &Clock,
    ) -> Result<(), ProgramError> {
        if !config.is_decentralized_state {
            return Ok(());
        }
        self.check_single_swap_limit(config, amount)?;
        self.update_and_check_daily_limit(config, amount, clock.unix_timestamp)?;
        self.update_and_check_user_limit(config, user, clock.slot)
    }
}
