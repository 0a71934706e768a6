//! Administrative surface of the swap pool. Every setter requires the
//! Owner or Governor role.

use solana_program::{clock::Clock, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    events::{
        DecentralizedStateSet, Event, PauseStateChanged, StableswapWrapperSet, SwapFeeSet,
        SwapLimitKind, SwapLimitSet, WhitelistUpdated,
    },
    math::Wad,
    security::require_owner_or_governor,
    swap_pool::{
        validate_at_least_one, validate_daily_swap_limit_numerator, validate_fee,
        validate_single_swap_limit_numerator, RateLimitedSwapPool, SwapDirection,
    },
};

impl RateLimitedSwapPool {
    fn require_admin(&self, caller: &Pubkey) -> Result<(), ProgramError> {
        require_owner_or_governor(self.access_control.as_ref(), caller)
    }

    pub fn set_fee_in(&self, caller: &Pubkey, fee: Wad) -> Result<(), ProgramError> {
        self.set_fee(caller, SwapDirection::TokenToStablecoin, fee)
    }

    pub fn set_fee_out(&self, caller: &Pubkey, fee: Wad) -> Result<(), ProgramError> {
        self.set_fee(caller, SwapDirection::StablecoinToToken, fee)
    }

    fn set_fee(
        &self,
        caller: &Pubkey,
        direction: SwapDirection,
        fee: Wad,
    ) -> Result<(), ProgramError> {
        self.require_admin(caller)?;
        validate_fee(fee)?;
        {
            let mut config = self.config.borrow_mut();
            match direction {
                SwapDirection::TokenToStablecoin => config.fee_in = fee,
                SwapDirection::StablecoinToToken => config.fee_out = fee,
            }
        }

        msg!("Swap fee {:?} set to {}", direction, fee);
        SwapFeeSet {
            pool: self.address,
            direction,
            fee,
        }
        .emit();
        Ok(())
    }

    pub fn set_daily_swap_limit_numerator(
        &self,
        caller: &Pubkey,
        numerator: u64,
    ) -> Result<(), ProgramError> {
        self.require_admin(caller)?;
        validate_daily_swap_limit_numerator(numerator)?;
        self.config.borrow_mut().daily_swap_limit_numerator = numerator;
        self.emit_limit_set(SwapLimitKind::DailySwapLimitNumerator, numerator);
        Ok(())
    }

    pub fn set_single_swap_limit_numerator(
        &self,
        caller: &Pubkey,
        numerator: u64,
    ) -> Result<(), ProgramError> {
        self.require_admin(caller)?;
        validate_single_swap_limit_numerator(numerator)?;
        self.config.borrow_mut().single_swap_limit_numerator = numerator;
        self.emit_limit_set(SwapLimitKind::SingleSwapLimitNumerator, numerator);
        Ok(())
    }

    pub fn set_number_of_swaps_limit_per_user(
        &self,
        caller: &Pubkey,
        limit: u64,
    ) -> Result<(), ProgramError> {
        self.require_admin(caller)?;
        validate_at_least_one(limit, "swaps per user")?;
        self.config.borrow_mut().number_of_swaps_limit_per_user = limit;
        self.emit_limit_set(SwapLimitKind::NumberOfSwapsLimitPerUser, limit);
        Ok(())
    }

    pub fn set_blocks_per_limit(&self, caller: &Pubkey, blocks: u64) -> Result<(), ProgramError> {
        self.require_admin(caller)?;
        validate_at_least_one(blocks, "blocks per limit")?;
        self.config.borrow_mut().blocks_per_limit = blocks;
        self.emit_limit_set(SwapLimitKind::BlocksPerLimit, blocks);
        Ok(())
    }

    fn emit_limit_set(&self, limit: SwapLimitKind, value: u64) {
        msg!("Swap limit {:?} set to {}", limit, value);
        SwapLimitSet {
            pool: self.address,
            limit,
            value,
        }
        .emit();
    }

    /// Switching decentralized mode on starts a fresh daily window. Not
    /// callable while a token movement is in flight.
    pub fn set_decentralized_state(
        &self,
        caller: &Pubkey,
        is_decentralized: bool,
        clock: &Clock,
    ) -> Result<(), ProgramError> {
        self.require_admin(caller)?;
        let _context = self.guard.enter()?;
        self.config.borrow_mut().is_decentralized_state = is_decentralized;
        if is_decentralized {
            let config = self.config();
            self.state
                .borrow_mut()
                .refresh_daily_limit(&config, clock.unix_timestamp)?;
        }

        msg!("Decentralized state set to {}", is_decentralized);
        DecentralizedStateSet {
            pool: self.address,
            is_decentralized,
        }
        .emit();
        Ok(())
    }

    pub fn add_to_whitelist(&self, caller: &Pubkey, account: Pubkey) -> Result<(), ProgramError> {
        self.set_whitelisted(caller, account, true)
    }

    pub fn remove_from_whitelist(
        &self,
        caller: &Pubkey,
        account: Pubkey,
    ) -> Result<(), ProgramError> {
        self.set_whitelisted(caller, account, false)
    }

    fn set_whitelisted(
        &self,
        caller: &Pubkey,
        account: Pubkey,
        whitelisted: bool,
    ) -> Result<(), ProgramError> {
        self.require_admin(caller)?;
        {
            let mut config = self.config.borrow_mut();
            if whitelisted {
                config.whitelist.insert(account);
            } else {
                config.whitelist.remove(&account);
            }
        }

        msg!("Whitelist {}: {}", account, whitelisted);
        WhitelistUpdated {
            pool: self.address,
            account,
            whitelisted,
        }
        .emit();
        Ok(())
    }

    pub fn set_stableswap_wrapper(
        &self,
        caller: &Pubkey,
        wrapper: Pubkey,
    ) -> Result<(), ProgramError> {
        self.require_admin(caller)?;
        self.config.borrow_mut().stableswap_wrapper = wrapper;

        msg!("Stableswap wrapper set to {}", wrapper);
        StableswapWrapperSet {
            pool: self.address,
            wrapper,
        }
        .emit();
        Ok(())
    }

    pub fn pause(&self, caller: &Pubkey) -> Result<(), ProgramError> {
        self.set_paused(caller, true)
    }

    pub fn unpause(&self, caller: &Pubkey) -> Result<(), ProgramError> {
        self.set_paused(caller, false)
    }

    fn set_paused(&self, caller: &Pubkey, paused: bool) -> Result<(), ProgramError> {
        self.require_admin(caller)?;
        self.config.borrow_mut().paused = paused;

        msg!("Swap pool paused: {}", paused);
        PauseStateChanged {
            component: self.address,
            paused,
            authority: *caller,
        }
        .emit();
        Ok(())
    }
}
