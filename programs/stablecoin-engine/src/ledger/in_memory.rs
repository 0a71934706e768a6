//! In-memory ledger
//!
//! Reference implementation of every collaborator trait the orchestrator and
//! the stability fee collector consume. Cloning it stages a whole operation.

use solana_program::{
    clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey,
};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    constants::{POSITION_SEED, PROXY_SEED},
    error::StablecoinEngineError,
    ledger::{CollateralPoolConfig, Ledger, PositionManager, TokenAdapter},
    math::{debt_value, to_rad, Rad, Ray, Wad, U256},
    state::{CollateralPool, Position, PositionHandle},
};

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    pools: BTreeMap<Pubkey, CollateralPool>,
    positions: BTreeMap<(Pubkey, Pubkey), Position>,
    stablecoin: BTreeMap<Pubkey, Rad>,
    collateral: BTreeMap<(Pubkey, Pubkey), Wad>,
    total_stablecoin_issued: Rad,

    handles: BTreeMap<u64, PositionHandle>,
    next_position_id: u64,
    proxies: BTreeMap<Pubkey, Pubkey>,
    opaque_contracts: BTreeSet<Pubkey>,

    collateral_wallets: BTreeMap<(Pubkey, Pubkey), Wad>,
    stablecoin_wallets: BTreeMap<Pubkey, Wad>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            next_position_id: 1,
            ..Self::default()
        }
    }

    pub fn add_collateral_pool(&mut self, pool: CollateralPool) -> Result<(), ProgramError> {
        pool.validate()?;
        msg!("Collateral pool {} registered", pool.pool_id);
        self.pools.insert(pool.pool_id, pool);
        Ok(())
    }

    pub fn collateral_pool(&self, pool_id: &Pubkey) -> Result<&CollateralPool, ProgramError> {
        self.pools.get(pool_id).ok_or_else(|| {
            msg!("Unknown collateral pool {}", pool_id);
            StablecoinEngineError::PoolNotFound.into()
        })
    }

    fn collateral_pool_mut(
        &mut self,
        pool_id: &Pubkey,
    ) -> Result<&mut CollateralPool, ProgramError> {
        self.pools.get_mut(pool_id).ok_or_else(|| {
            msg!("Unknown collateral pool {}", pool_id);
            StablecoinEngineError::PoolNotFound.into()
        })
    }

    /// Marks an account as a program that cannot own positions through a proxy.
    pub fn register_opaque_contract(&mut self, account: Pubkey) {
        self.opaque_contracts.insert(account);
    }

    /// Credits collateral tokens to a user wallet.
    pub fn fund_collateral_wallet(
        &mut self,
        pool_id: &Pubkey,
        wallet: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        credit_wad(&mut self.collateral_wallets, (*pool_id, *wallet), amount)
    }

    /// Credits stablecoin tokens to a user wallet.
    pub fn fund_stablecoin_wallet(
        &mut self,
        wallet: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        credit_wad(&mut self.stablecoin_wallets, *wallet, amount)
    }

    pub fn collateral_wallet(&self, pool_id: &Pubkey, wallet: &Pubkey) -> Wad {
        self.collateral_wallets
            .get(&(*pool_id, *wallet))
            .copied()
            .unwrap_or_default()
    }

    pub fn stablecoin_wallet(&self, wallet: &Pubkey) -> Wad {
        self.stablecoin_wallets.get(wallet).copied().unwrap_or_default()
    }

    /// Stablecoin value created by debt and fee accrual, net of repayments
    pub fn total_stablecoin_issued(&self) -> Rad {
        self.total_stablecoin_issued
    }

    fn credit_stablecoin(&mut self, account: &Pubkey, value: Rad) -> Result<(), ProgramError> {
        let balance = self.stablecoin.entry(*account).or_default();
        *balance = balance.safe_add(value)?;
        Ok(())
    }

    fn debit_stablecoin(&mut self, account: &Pubkey, value: Rad) -> Result<(), ProgramError> {
        let balance = self.stablecoin(account);
        if balance < value {
            msg!("Stablecoin balance of {} is {}, needs {}", account, balance, value);
            return Err(StablecoinEngineError::InsufficientBalance.into());
        }
        self.stablecoin.insert(*account, balance.safe_sub(value)?);
        Ok(())
    }
}

fn credit_wad<K: Ord>(
    balances: &mut BTreeMap<K, Wad>,
    key: K,
    amount: Wad,
) -> Result<(), ProgramError> {
    let balance = balances.entry(key).or_default();
    *balance = balance.safe_add(amount)?;
    Ok(())
}

fn debit_wad<K: Ord + std::fmt::Debug>(
    balances: &mut BTreeMap<K, Wad>,
    key: K,
    amount: Wad,
) -> Result<(), ProgramError> {
    let balance = balances.get(&key).copied().unwrap_or_default();
    if balance < amount {
        msg!("Balance of {:?} is {}, needs {}", key, balance, amount);
        return Err(StablecoinEngineError::InsufficientBalance.into());
    }
    balances.insert(key, balance.safe_sub(amount)?);
    Ok(())
}

impl CollateralPoolConfig for InMemoryLedger {
    fn get_debt_accumulated_rate(&self, pool_id: &Pubkey) -> Result<Ray, ProgramError> {
        Ok(self.collateral_pool(pool_id)?.debt_accumulated_rate)
    }

    fn get_stability_fee_rate(&self, pool_id: &Pubkey) -> Result<Ray, ProgramError> {
        Ok(self.collateral_pool(pool_id)?.stability_fee_rate)
    }

    fn get_last_accumulation_time(&self, pool_id: &Pubkey) -> Result<UnixTimestamp, ProgramError> {
        Ok(self.collateral_pool(pool_id)?.last_accumulation_time)
    }

    fn update_last_accumulation_time(
        &mut self,
        pool_id: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError> {
        let pool = self.collateral_pool_mut(pool_id)?;
        if now < pool.last_accumulation_time {
            msg!(
                "Accumulation time {} precedes {}",
                now,
                pool.last_accumulation_time
            );
            return Err(StablecoinEngineError::InvalidTimestamp.into());
        }
        pool.last_accumulation_time = now;
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    fn position(&self, pool_id: &Pubkey, position: &Pubkey) -> Result<Position, ProgramError> {
        self.collateral_pool(pool_id)?;
        Ok(self
            .positions
            .get(&(*pool_id, *position))
            .copied()
            .unwrap_or_default())
    }

    fn stablecoin(&self, account: &Pubkey) -> Rad {
        self.stablecoin.get(account).copied().unwrap_or_default()
    }

    fn collateral_balance(&self, pool_id: &Pubkey, account: &Pubkey) -> Wad {
        self.collateral
            .get(&(*pool_id, *account))
            .copied()
            .unwrap_or_default()
    }

    fn accrue_stability_fee(
        &mut self,
        pool_id: &Pubkey,
        debt_sink: &Pubkey,
        rate_delta: i128,
    ) -> Result<(), ProgramError> {
        let pool = self.collateral_pool(pool_id)?;
        let new_rate = pool.debt_accumulated_rate.apply_delta(rate_delta)?;
        let rate_change = Ray::from_raw(U256::from(rate_delta.unsigned_abs()));
        let value = debt_value(pool.total_debt_share, rate_change)?;

        if rate_delta >= 0 {
            self.credit_stablecoin(debt_sink, value)?;
            self.total_stablecoin_issued = self.total_stablecoin_issued.safe_add(value)?;
        } else {
            self.debit_stablecoin(debt_sink, value)?;
            self.total_stablecoin_issued = self.total_stablecoin_issued.safe_sub(value)?;
        }
        self.collateral_pool_mut(pool_id)?.debt_accumulated_rate = new_rate;
        Ok(())
    }

    fn adjust_position(
        &mut self,
        pool_id: &Pubkey,
        position: &Pubkey,
        collateral_owner: &Pubkey,
        stablecoin_owner: &Pubkey,
        collateral_delta: i128,
        debt_share_delta: i128,
    ) -> Result<(), ProgramError> {
        let pool = self.collateral_pool(pool_id)?;
        let rate = pool.debt_accumulated_rate;
        let total_debt_share = pool.total_debt_share.apply_delta(debt_share_delta)?;

        let mut record = self.position(pool_id, position)?;
        let collateral_amount = Wad::from_raw(U256::from(collateral_delta.unsigned_abs()));
        if collateral_delta < 0 && record.locked_collateral < collateral_amount {
            msg!(
                "Cannot unlock {} of {} locked collateral",
                collateral_amount,
                record.locked_collateral
            );
            return Err(StablecoinEngineError::InsufficientBalance.into());
        }
        if collateral_delta > 0
            && self.collateral_balance(pool_id, collateral_owner) < collateral_amount
        {
            msg!("{} lacks {} free collateral", collateral_owner, collateral_amount);
            return Err(StablecoinEngineError::InsufficientBalance.into());
        }
        record.locked_collateral = record.locked_collateral.apply_delta(collateral_delta)?;
        record.debt_share = record.debt_share.apply_delta(debt_share_delta)?;

        let debt_change = debt_value(
            Wad::from_raw(U256::from(debt_share_delta.unsigned_abs())),
            rate,
        )?;
        if debt_share_delta < 0 && self.stablecoin(stablecoin_owner) < debt_change {
            msg!("{} cannot repay {}", stablecoin_owner, debt_change);
            return Err(StablecoinEngineError::InsufficientBalance.into());
        }

        if collateral_delta >= 0 {
            debit_wad(&mut self.collateral, (*pool_id, *collateral_owner), collateral_amount)?;
        } else {
            credit_wad(&mut self.collateral, (*pool_id, *collateral_owner), collateral_amount)?;
        }
        if debt_share_delta >= 0 {
            self.credit_stablecoin(stablecoin_owner, debt_change)?;
            self.total_stablecoin_issued = self.total_stablecoin_issued.safe_add(debt_change)?;
        } else {
            self.debit_stablecoin(stablecoin_owner, debt_change)?;
            self.total_stablecoin_issued = self.total_stablecoin_issued.safe_sub(debt_change)?;
        }
        self.collateral_pool_mut(pool_id)?.total_debt_share = total_debt_share;
        self.positions.insert((*pool_id, *position), record);
        Ok(())
    }

    fn move_stablecoin(
        &mut self,
        from: &Pubkey,
        to: &Pubkey,
        value: Rad,
    ) -> Result<(), ProgramError> {
        self.debit_stablecoin(from, value)?;
        self.credit_stablecoin(to, value)
    }

    fn move_collateral(
        &mut self,
        pool_id: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        debit_wad(&mut self.collateral, (*pool_id, *from), amount)?;
        credit_wad(&mut self.collateral, (*pool_id, *to), amount)
    }

    fn collateral_pool_config(&self) -> &dyn CollateralPoolConfig {
        self
    }

    fn collateral_pool_config_mut(&mut self) -> &mut dyn CollateralPoolConfig {
        self
    }
}

impl PositionManager for InMemoryLedger {
    fn open_position(&mut self, pool_id: &Pubkey, owner: &Pubkey) -> Result<u64, ProgramError> {
        self.collateral_pool(pool_id)?;

        let position_id = self.next_position_id.max(1);
        self.next_position_id = position_id
            .checked_add(1)
            .ok_or(StablecoinEngineError::ArithmeticOverflow)?;

        let (address, _bump) = Pubkey::find_program_address(
            &[POSITION_SEED, pool_id.as_ref(), &position_id.to_le_bytes()],
            &crate::id(),
        );
        self.handles.insert(
            position_id,
            PositionHandle {
                position_id,
                pool_id: *pool_id,
                address,
                owner: *owner,
            },
        );
        msg!("Opened position {} at {} for {}", position_id, address, owner);
        Ok(position_id)
    }

    fn position_handle(&self, position_id: u64) -> Result<PositionHandle, ProgramError> {
        self.handles.get(&position_id).copied().ok_or_else(|| {
            msg!("Unknown position {}", position_id);
            StablecoinEngineError::PositionNotFound.into()
        })
    }

    fn give_position(
        &mut self,
        position_id: u64,
        caller: &Pubkey,
        new_owner: &Pubkey,
    ) -> Result<(), ProgramError> {
        let handle = self.handles.get_mut(&position_id).ok_or_else(|| {
            msg!("Unknown position {}", position_id);
            ProgramError::from(StablecoinEngineError::PositionNotFound)
        })?;
        if handle.owner != *caller {
            msg!("{} does not own position {}", caller, position_id);
            return Err(StablecoinEngineError::AccessDenied.into());
        }
        handle.owner = *new_owner;
        Ok(())
    }

    fn proxy_of(&self, owner: &Pubkey) -> Option<Pubkey> {
        self.proxies.get(owner).copied()
    }

    fn build_proxy(&mut self, owner: &Pubkey) -> Result<Pubkey, ProgramError> {
        if let Some(proxy) = self.proxy_of(owner) {
            return Ok(proxy);
        }
        let (proxy, _bump) =
            Pubkey::find_program_address(&[PROXY_SEED, owner.as_ref()], &crate::id());
        self.proxies.insert(*owner, proxy);
        msg!("Built proxy {} for {}", proxy, owner);
        Ok(proxy)
    }

    fn is_opaque_contract(&self, account: &Pubkey) -> bool {
        self.opaque_contracts.contains(account)
    }
}

impl TokenAdapter for InMemoryLedger {
    fn deposit_collateral(
        &mut self,
        pool_id: &Pubkey,
        wallet: &Pubkey,
        account: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        self.collateral_pool(pool_id)?;
        debit_wad(&mut self.collateral_wallets, (*pool_id, *wallet), amount)?;
        credit_wad(&mut self.collateral, (*pool_id, *account), amount)
    }

    fn withdraw_collateral(
        &mut self,
        pool_id: &Pubkey,
        account: &Pubkey,
        wallet: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        debit_wad(&mut self.collateral, (*pool_id, *account), amount)?;
        credit_wad(&mut self.collateral_wallets, (*pool_id, *wallet), amount)
    }

    fn deposit_stablecoin(
        &mut self,
        wallet: &Pubkey,
        account: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        debit_wad(&mut self.stablecoin_wallets, *wallet, amount)?;
        self.credit_stablecoin(account, to_rad(amount)?)
    }

    fn withdraw_stablecoin(
        &mut self,
        account: &Pubkey,
        wallet: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        self.debit_stablecoin(account, to_rad(amount)?)?;
        credit_wad(&mut self.stablecoin_wallets, *wallet, amount)
    }
}

/// Stablecoin value owed by a position, exposed for reporting.
pub fn position_debt(
    ledger: &dyn Ledger,
    pool_id: &Pubkey,
    position: &Pubkey,
) -> Result<Rad, ProgramError> {
    let rate = ledger.collateral_pool_config().get_debt_accumulated_rate(pool_id)?;
    ledger.position(pool_id, position)?.debt(rate)
}
