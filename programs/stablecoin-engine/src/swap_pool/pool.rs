use solana_program::{clock::Clock, msg, program_error::ProgramError, pubkey::Pubkey};
use std::cell::RefCell;

use crate::{
    custody::{execute_transfers, Asset, AssetAmount, TokenCustody, Transfer},
    error::StablecoinEngineError,
    events::{
        EmergencyWithdrawal, Event, FeesWithdrawn, LiquidityDeposited, LiquidityWithdrawn,
        SwapExecuted,
    },
    math::{convert_decimals, wad_mul, Wad, U256},
    security::{require_owner_or_governor, AccessControl, ReentrancyGuard},
    swap_pool::{SwapDirection, SwapPoolConfig, SwapPoolState, SwapReceipt},
};

/// Swap pool
///
/// Every operation that moves tokens commits its state change first, then
/// calls the custody. If the custody fails the pool restores its previous
/// state and reverses the transfers already made.
pub struct RateLimitedSwapPool {
    /// Custody account holding the pool's tokens
    pub(crate) address: Pubkey,
    pub(crate) access_control: Box<dyn AccessControl>,
    pub(crate) config: RefCell<SwapPoolConfig>,
    pub(crate) state: RefCell<SwapPoolState>,
    pub(crate) guard: ReentrancyGuard,
}

impl RateLimitedSwapPool {
    pub fn new(
        address: Pubkey,
        config: SwapPoolConfig,
        access_control: Box<dyn AccessControl>,
    ) -> Result<Self, ProgramError> {
        config.validate()?;
        msg!(
            "Swap pool {} created, token decimals {}",
            address,
            config.token_decimals
        );
        Ok(Self {
            address,
            access_control,
            config: RefCell::new(config),
            state: RefCell::new(SwapPoolState::default()),
            guard: ReentrancyGuard::new(),
        })
    }

    pub fn address(&self) -> &Pubkey {
        &self.address
    }

    pub fn config(&self) -> SwapPoolConfig {
        self.config.borrow().clone()
    }

    pub fn state(&self) -> SwapPoolState {
        self.state.borrow().clone()
    }

    pub fn swap_token_to_stablecoin(
        &self,
        caller: &Pubkey,
        recipient: &Pubkey,
        token_amount: u64,
        clock: &Clock,
        custody: &mut dyn TokenCustody,
    ) -> Result<SwapReceipt, ProgramError> {
        let _context = self.guard.enter()?;
        let config = self.config();
        check_swap_access(&config, caller)?;
        if token_amount == 0 {
            msg!("Swap amount is zero");
            return Err(StablecoinEngineError::ZeroAmount.into());
        }

        let amount = AssetAmount::Token(token_amount).normalized(config.token_decimals)?;
        let fee = wad_mul(amount, config.fee_in)?;
        let amount_out = amount.safe_sub(fee)?;

        let snapshot = self.state();
        let mut state = snapshot.clone();
        if state.stablecoin_balance < amount {
            msg!(
                "Pool holds {} stablecoin, swap needs {}",
                state.stablecoin_balance,
                amount
            );
            return Err(StablecoinEngineError::InsufficientLiquidity.into());
        }
        state.apply_swap_limits(&config, caller, amount, clock)?;

        state.token_balance = state
            .token_balance
            .checked_add(token_amount)
            .ok_or(StablecoinEngineError::ArithmeticOverflow)?;
        state.stablecoin_balance = state.stablecoin_balance.safe_sub(amount)?;
        state.total_stablecoin_fee_balance = state.total_stablecoin_fee_balance.safe_add(fee)?;
        *self.state.borrow_mut() = state;

        self.move_tokens(
            snapshot,
            custody,
            &[
                Transfer::new(AssetAmount::Token(token_amount), *caller, self.address),
                Transfer::new(AssetAmount::Stablecoin(amount_out), self.address, *recipient),
            ],
        )?;

        let receipt = SwapReceipt {
            direction: SwapDirection::TokenToStablecoin,
            amount_in: amount,
            amount_out,
            fee,
        };
        self.log_swap(caller, recipient, &receipt);
        Ok(receipt)
    }

    pub fn swap_stablecoin_to_token(
        &self,
        caller: &Pubkey,
        recipient: &Pubkey,
        amount: Wad,
        clock: &Clock,
        custody: &mut dyn TokenCustody,
    ) -> Result<SwapReceipt, ProgramError> {
        let _context = self.guard.enter()?;
        let config = self.config();
        check_swap_access(&config, caller)?;
        if amount.is_zero() {
            msg!("Swap amount is zero");
            return Err(StablecoinEngineError::ZeroAmount.into());
        }

        let fee = wad_mul(amount, config.fee_out)?;
        let total_token = to_token_units(amount, config.token_decimals)?;
        let token_out = to_token_units(amount.safe_sub(fee)?, config.token_decimals)?;
        if total_token == 0 {
            msg!("Swap of {} is below one token unit", amount);
            return Err(StablecoinEngineError::ZeroAmount.into());
        }

        let snapshot = self.state();
        let mut state = snapshot.clone();
        if state.token_balance < total_token {
            msg!(
                "Pool holds {} token units, swap needs {}",
                state.token_balance,
                total_token
            );
            return Err(StablecoinEngineError::InsufficientLiquidity.into());
        }
        state.apply_swap_limits(&config, caller, amount, clock)?;

        // value that stays in the swap balances; the sub-unit remainder
        // lost to truncation is kept as stablecoin fee
        let retained = AssetAmount::Token(total_token).normalized(config.token_decimals)?;
        let dust = amount.safe_sub(retained)?;
        state.token_balance -= total_token;
        state.total_token_fee_balance = state
            .total_token_fee_balance
            .checked_add(total_token - token_out)
            .ok_or(StablecoinEngineError::ArithmeticOverflow)?;
        state.stablecoin_balance = state.stablecoin_balance.safe_add(retained)?;
        state.total_stablecoin_fee_balance = state.total_stablecoin_fee_balance.safe_add(dust)?;
        *self.state.borrow_mut() = state;

        self.move_tokens(
            snapshot,
            custody,
            &[
                Transfer::new(AssetAmount::Stablecoin(amount), *caller, self.address),
                Transfer::new(AssetAmount::Token(token_out), self.address, *recipient),
            ],
        )?;

        let amount_out = AssetAmount::Token(token_out).normalized(config.token_decimals)?;
        let receipt = SwapReceipt {
            direction: SwapDirection::StablecoinToToken,
            amount_in: amount,
            amount_out,
            fee: amount.safe_sub(amount_out)?,
        };
        self.log_swap(caller, recipient, &receipt);
        Ok(receipt)
    }

    /// Adds liquidity on behalf of the stableswap wrapper.
    pub fn deposit_token(
        &self,
        caller: &Pubkey,
        amount: AssetAmount,
        clock: &Clock,
        custody: &mut dyn TokenCustody,
    ) -> Result<(), ProgramError> {
        let _context = self.guard.enter()?;
        let config = self.config();
        check_liquidity_access(&config, caller)?;
        if amount.is_zero() {
            msg!("Deposit amount is zero");
            return Err(StablecoinEngineError::ZeroAmount.into());
        }
        let normalized = amount.normalized(config.token_decimals)?;

        let snapshot = self.state();
        let mut state = snapshot.clone();
        match amount {
            AssetAmount::Token(units) => {
                state.token_balance = state
                    .token_balance
                    .checked_add(units)
                    .ok_or(StablecoinEngineError::ArithmeticOverflow)?;
            }
            AssetAmount::Stablecoin(value) => {
                state.stablecoin_balance = state.stablecoin_balance.safe_add(value)?;
            }
        }
        state.total_value_deposited = state.total_value_deposited.safe_add(normalized)?;
        if config.is_decentralized_state {
            state.refresh_daily_limit(&config, clock.unix_timestamp)?;
        }
        let total_value_deposited = state.total_value_deposited;
        *self.state.borrow_mut() = state;

        self.move_tokens(snapshot, custody, &[Transfer::new(amount, *caller, self.address)])?;

        msg!("Deposited {:?}, total value deposited {}", amount, total_value_deposited);
        LiquidityDeposited {
            pool: self.address,
            depositor: *caller,
            asset: amount.asset(),
            amount: normalized,
            total_value_deposited,
        }
        .emit();
        Ok(())
    }

    /// Removes liquidity on behalf of the stableswap wrapper.
    pub fn withdraw_token(
        &self,
        caller: &Pubkey,
        amount: AssetAmount,
        custody: &mut dyn TokenCustody,
    ) -> Result<(), ProgramError> {
        let _context = self.guard.enter()?;
        let config = self.config();
        check_liquidity_access(&config, caller)?;
        if amount.is_zero() {
            msg!("Withdrawal amount is zero");
            return Err(StablecoinEngineError::ZeroAmount.into());
        }
        let normalized = amount.normalized(config.token_decimals)?;

        let snapshot = self.state();
        let mut state = snapshot.clone();
        match amount {
            AssetAmount::Token(units) => {
                if state.token_balance < units {
                    msg!(
                        "Pool holds {} token units, withdrawal of {}",
                        state.token_balance,
                        units
                    );
                    return Err(StablecoinEngineError::InsufficientBalance.into());
                }
                state.token_balance -= units;
            }
            AssetAmount::Stablecoin(value) => {
                if state.stablecoin_balance < value {
                    msg!(
                        "Pool holds {} stablecoin, withdrawal of {}",
                        state.stablecoin_balance,
                        value
                    );
                    return Err(StablecoinEngineError::InsufficientBalance.into());
                }
                state.stablecoin_balance = state.stablecoin_balance.safe_sub(value)?;
            }
        }
        state.total_value_deposited = state.total_value_deposited.safe_sub(normalized)?;
        if config.is_decentralized_state {
            state.clamp_daily_limit(&config)?;
        }
        let total_value_deposited = state.total_value_deposited;
        *self.state.borrow_mut() = state;

        self.move_tokens(snapshot, custody, &[Transfer::new(amount, self.address, *caller)])?;

        msg!("Withdrew {:?}, total value deposited {}", amount, total_value_deposited);
        LiquidityWithdrawn {
            pool: self.address,
            recipient: *caller,
            asset: amount.asset(),
            amount: normalized,
            total_value_deposited,
        }
        .emit();
        Ok(())
    }

    /// Sends both fee balances to `destination` and returns what was sent.
    pub fn withdraw_fees(
        &self,
        caller: &Pubkey,
        destination: &Pubkey,
        custody: &mut dyn TokenCustody,
    ) -> Result<(u64, Wad), ProgramError> {
        require_owner_or_governor(self.access_control.as_ref(), caller)?;
        let _context = self.guard.enter()?;

        let snapshot = self.state();
        let mut state = snapshot.clone();
        let token_fee = state.total_token_fee_balance;
        let stablecoin_fee = state.total_stablecoin_fee_balance;
        state.total_token_fee_balance = 0;
        state.total_stablecoin_fee_balance = Wad::zero();
        *self.state.borrow_mut() = state;

        self.move_tokens(
            snapshot,
            custody,
            &[
                Transfer::new(AssetAmount::Token(token_fee), self.address, *destination),
                Transfer::new(AssetAmount::Stablecoin(stablecoin_fee), self.address, *destination),
            ],
        )?;

        msg!("Withdrew fees: {} token units, {} stablecoin", token_fee, stablecoin_fee);
        FeesWithdrawn {
            pool: self.address,
            destination: *destination,
            token_fee,
            stablecoin_fee,
        }
        .emit();
        Ok((token_fee, stablecoin_fee))
    }

    /// Zeroes all balance accounting and sweeps whatever the custody holds
    /// for the pool to `recovery`. Only while paused.
    pub fn emergency_withdraw(
        &self,
        caller: &Pubkey,
        recovery: &Pubkey,
        custody: &mut dyn TokenCustody,
    ) -> Result<(), ProgramError> {
        require_owner_or_governor(self.access_control.as_ref(), caller)?;
        let _context = self.guard.enter()?;
        if !self.config.borrow().paused {
            msg!("Emergency withdrawal requires a paused pool");
            return Err(StablecoinEngineError::NotPaused.into());
        }

        let token_held = custody.balance_of(Asset::Token, &self.address);
        let stablecoin_held = custody.balance_of(Asset::Stablecoin, &self.address);

        let snapshot = self.state();
        let mut state = snapshot.clone();
        state.token_balance = 0;
        state.stablecoin_balance = Wad::zero();
        state.total_token_fee_balance = 0;
        state.total_stablecoin_fee_balance = Wad::zero();
        state.total_value_deposited = Wad::zero();
        state.remaining_daily_swap_amount = Wad::zero();
        *self.state.borrow_mut() = state;

        self.move_tokens(
            snapshot,
            custody,
            &[
                Transfer::new(token_held, self.address, *recovery),
                Transfer::new(stablecoin_held, self.address, *recovery),
            ],
        )?;

        let token_amount = match token_held {
            AssetAmount::Token(units) => units,
            AssetAmount::Stablecoin(_) => 0,
        };
        let stablecoin_amount = match stablecoin_held {
            AssetAmount::Stablecoin(value) => value,
            AssetAmount::Token(_) => Wad::zero(),
        };
        msg!(
            "Emergency withdrawal to {}: {} token units, {} stablecoin",
            recovery,
            token_amount,
            stablecoin_amount
        );
        EmergencyWithdrawal {
            pool: self.address,
            recovery: *recovery,
            token_amount,
            stablecoin_amount,
        }
        .emit();
        Ok(())
    }

    /// Runs the custody transfers, restoring `snapshot` if any fails.
    fn move_tokens(
        &self,
        snapshot: SwapPoolState,
        custody: &mut dyn TokenCustody,
        transfers: &[Transfer],
    ) -> Result<(), ProgramError> {
        if let Err(err) = execute_transfers(custody, transfers) {
            msg!("Token movement failed, restoring pool state");
            *self.state.borrow_mut() = snapshot;
            return Err(err);
        }
        Ok(())
    }

    fn log_swap(&self, caller: &Pubkey, recipient: &Pubkey, receipt: &SwapReceipt) {
        msg!(
            "Swap {:?}: in {}, out {}, fee {}",
            receipt.direction,
            receipt.amount_in,
            receipt.amount_out,
            receipt.fee
        );
        SwapExecuted {
            pool: self.address,
            user: *caller,
            recipient: *recipient,
            direction: receipt.direction,
            amount_in: receipt.amount_in,
            amount_out: receipt.amount_out,
            fee: receipt.fee,
        }
        .emit();
    }
}

fn check_swap_access(config: &SwapPoolConfig, caller: &Pubkey) -> Result<(), ProgramError> {
    if config.paused {
        msg!("Swap pool is paused");
        return Err(StablecoinEngineError::EnginePaused.into());
    }
    if !config.is_decentralized_state && !config.is_whitelisted(caller) {
        msg!("{} is not whitelisted", caller);
        return Err(StablecoinEngineError::AccessDenied.into());
    }
    Ok(())
}

fn check_liquidity_access(config: &SwapPoolConfig, caller: &Pubkey) -> Result<(), ProgramError> {
    if config.paused {
        msg!("Swap pool is paused");
        return Err(StablecoinEngineError::EnginePaused.into());
    }
    if *caller != config.stableswap_wrapper {
        msg!("{} is not the stableswap wrapper", caller);
        return Err(StablecoinEngineError::AccessDenied.into());
    }
    Ok(())
}

/// 18-decimal amount in token units, truncated.
fn to_token_units(amount: Wad, token_decimals: u8) -> Result<u64, ProgramError> {
    let units = convert_decimals(amount.raw(), Wad::DECIMALS, token_decimals)?;
    if units > U256::from(u64::MAX) {
        msg!("{} does not fit in token units", amount);
        return Err(StablecoinEngineError::ArithmeticOverflow.into());
    }
    Ok(units.low_u64())
}
