//! Composite position actions
//!
//! Each action runs against a staged copy of the ledger and is committed
//! only when every step succeeded. Value routed through the proxy is
//! forwarded to the proxy owner before the action returns.

use solana_program::{clock::Clock, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    debt_share::{draw_debt_share, wipe_all_stablecoin_amount, wipe_debt_share},
    error::StablecoinEngineError,
    events::{Event, PositionOpened, PositionOwnershipTransferred},
    ledger::{Ledger, PositionManager, TokenAdapter},
    math::{safe_to_signed, to_rad, Wad},
    stability_fee::StabilityFeeCollector,
    state::PositionHandle,
};

/// Stability fee collector and the instant to accrue up to
#[derive(Clone, Copy)]
pub struct Accrual<'a> {
    pub collector: &'a StabilityFeeCollector,
    pub clock: &'a Clock,
}

impl<'a> Accrual<'a> {
    pub fn new(collector: &'a StabilityFeeCollector, clock: &'a Clock) -> Self {
        Self { collector, clock }
    }
}

/// Actions on behalf of `owner`, executed through `proxy`, which owns the
/// positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeActionOrchestrator {
    proxy: Pubkey,
    owner: Pubkey,
}

impl CompositeActionOrchestrator {
    pub fn new(proxy: Pubkey, owner: Pubkey) -> Self {
        Self { proxy, owner }
    }

    /// Uses the owner's registered proxy, building one if needed.
    pub fn for_owner<L: PositionManager>(
        ledger: &mut L,
        owner: Pubkey,
    ) -> Result<Self, ProgramError> {
        let proxy = match ledger.proxy_of(&owner) {
            Some(proxy) => proxy,
            None => ledger.build_proxy(&owner)?,
        };
        Ok(Self::new(proxy, owner))
    }

    pub fn proxy(&self) -> &Pubkey {
        &self.proxy
    }

    pub fn owner(&self) -> &Pubkey {
        &self.owner
    }

    pub fn open_position<L>(&self, ledger: &mut L, pool_id: &Pubkey) -> Result<u64, ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        self.stage(ledger, pool_id, |staged| self.open_inner(staged, pool_id))
    }

    pub fn lock_token<L>(
        &self,
        ledger: &mut L,
        position_id: u64,
        amount: Wad,
    ) -> Result<(), ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        let handle = self.owned_handle(ledger, position_id)?;
        self.stage(ledger, &handle.pool_id, |staged| self.lock_inner(staged, &handle, amount))
    }

    pub fn unlock_token<L>(
        &self,
        ledger: &mut L,
        position_id: u64,
        amount: Wad,
    ) -> Result<(), ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        let handle = self.owned_handle(ledger, position_id)?;
        self.stage(ledger, &handle.pool_id, |staged| self.unlock_inner(staged, &handle, amount))
    }

    /// Mints `amount` stablecoin against the position and sends it to the owner.
    pub fn draw<L>(
        &self,
        accrual: Accrual<'_>,
        ledger: &mut L,
        position_id: u64,
        amount: Wad,
    ) -> Result<(), ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        let handle = self.owned_handle(ledger, position_id)?;
        self.stage(ledger, &handle.pool_id, |staged| {
            self.draw_inner(accrual, staged, &handle, amount)
        })
    }

    /// Pays `amount` of the owner's stablecoin towards the position's debt.
    pub fn wipe<L>(
        &self,
        accrual: Accrual<'_>,
        ledger: &mut L,
        position_id: u64,
        amount: Wad,
    ) -> Result<(), ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        let handle = self.owned_handle(ledger, position_id)?;
        self.stage(ledger, &handle.pool_id, |staged| {
            self.wipe_inner(accrual, staged, &handle, amount)
        })
    }

    /// Repays the whole debt, returning the stablecoin amount paid.
    pub fn wipe_all<L>(
        &self,
        accrual: Accrual<'_>,
        ledger: &mut L,
        position_id: u64,
    ) -> Result<Wad, ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        let handle = self.owned_handle(ledger, position_id)?;
        self.stage(ledger, &handle.pool_id, |staged| {
            self.wipe_all_inner(accrual, staged, &handle)
        })
    }

    pub fn open_lock_token_and_draw<L>(
        &self,
        accrual: Accrual<'_>,
        ledger: &mut L,
        pool_id: &Pubkey,
        collateral: Wad,
        stablecoin: Wad,
    ) -> Result<u64, ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        self.stage(ledger, pool_id, |staged| {
            let position_id = self.open_inner(staged, pool_id)?;
            let handle = staged.position_handle(position_id)?;
            self.lock_inner(staged, &handle, collateral)?;
            self.draw_inner(accrual, staged, &handle, stablecoin)?;
            Ok(position_id)
        })
    }

    pub fn lock_token_and_draw<L>(
        &self,
        accrual: Accrual<'_>,
        ledger: &mut L,
        position_id: u64,
        collateral: Wad,
        stablecoin: Wad,
    ) -> Result<(), ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        let handle = self.owned_handle(ledger, position_id)?;
        self.stage(ledger, &handle.pool_id, |staged| {
            self.lock_inner(staged, &handle, collateral)?;
            self.draw_inner(accrual, staged, &handle, stablecoin)
        })
    }

    pub fn wipe_and_unlock_token<L>(
        &self,
        accrual: Accrual<'_>,
        ledger: &mut L,
        position_id: u64,
        collateral: Wad,
        stablecoin: Wad,
    ) -> Result<(), ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        let handle = self.owned_handle(ledger, position_id)?;
        self.stage(ledger, &handle.pool_id, |staged| {
            self.wipe_inner(accrual, staged, &handle, stablecoin)?;
            self.unlock_inner(staged, &handle, collateral)
        })
    }

    pub fn wipe_all_and_unlock_token<L>(
        &self,
        accrual: Accrual<'_>,
        ledger: &mut L,
        position_id: u64,
        collateral: Wad,
    ) -> Result<Wad, ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        let handle = self.owned_handle(ledger, position_id)?;
        self.stage(ledger, &handle.pool_id, |staged| {
            let paid = self.wipe_all_inner(accrual, staged, &handle)?;
            self.unlock_inner(staged, &handle, collateral)?;
            Ok(paid)
        })
    }

    pub fn transfer_ownership<L>(
        &self,
        ledger: &mut L,
        position_id: u64,
        new_owner: &Pubkey,
    ) -> Result<(), ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        let handle = self.owned_handle(ledger, position_id)?;
        self.stage(ledger, &handle.pool_id, |staged| {
            self.give_inner(staged, position_id, new_owner)
        })
    }

    /// Hands the position to `destination`'s proxy, building the proxy if
    /// needed. Returns the proxy address.
    pub fn transfer_ownership_to_proxy<L>(
        &self,
        ledger: &mut L,
        position_id: u64,
        destination: &Pubkey,
    ) -> Result<Pubkey, ProgramError>
    where
        L: Ledger + PositionManager + TokenAdapter + Clone,
    {
        let handle = self.owned_handle(ledger, position_id)?;
        if ledger.is_opaque_contract(destination) {
            msg!("{} cannot operate a proxy", destination);
            return Err(StablecoinEngineError::UnsafeOwnershipTransfer.into());
        }

        self.stage(ledger, &handle.pool_id, |staged| {
            let proxy = match staged.proxy_of(destination) {
                Some(proxy) => proxy,
                None => staged.build_proxy(destination)?,
            };
            self.give_inner(staged, position_id, &proxy)?;
            Ok(proxy)
        })
    }

    /// Runs `operation` on a copy of the ledger and commits it only if it
    /// succeeds and the proxy ends with the balances it started with.
    ///
    /// The whole ledger is cloned per call. Ledgers backed by large stores
    /// should make `Clone` cheap, e.g. copy-on-write.
    fn stage<L, T, F>(
        &self,
        ledger: &mut L,
        pool_id: &Pubkey,
        operation: F,
    ) -> Result<T, ProgramError>
    where
        L: Ledger + Clone,
        F: FnOnce(&mut L) -> Result<T, ProgramError>,
    {
        let mut staged = ledger.clone();
        let stablecoin_before = staged.stablecoin(&self.proxy);
        let collateral_before = staged.collateral_balance(pool_id, &self.proxy);

        let result = operation(&mut staged)?;

        if staged.stablecoin(&self.proxy) != stablecoin_before
            || staged.collateral_balance(pool_id, &self.proxy) != collateral_before
        {
            msg!("Proxy {} would retain a balance", self.proxy);
            return Err(StablecoinEngineError::TransientBalanceRetained.into());
        }

        *ledger = staged;
        Ok(result)
    }

    fn owned_handle<L: PositionManager>(
        &self,
        ledger: &L,
        position_id: u64,
    ) -> Result<PositionHandle, ProgramError> {
        let handle = ledger.position_handle(position_id)?;
        if handle.owner != self.proxy {
            msg!("Position {} is not owned by proxy {}", position_id, self.proxy);
            return Err(StablecoinEngineError::AccessDenied.into());
        }
        Ok(handle)
    }

    fn open_inner<L: PositionManager>(
        &self,
        ledger: &mut L,
        pool_id: &Pubkey,
    ) -> Result<u64, ProgramError> {
        let position_id = ledger.open_position(pool_id, &self.proxy)?;
        PositionOpened {
            position_id,
            pool_id: *pool_id,
            owner: self.proxy,
        }
        .emit();
        Ok(position_id)
    }

    fn lock_inner<L: Ledger + TokenAdapter>(
        &self,
        ledger: &mut L,
        handle: &PositionHandle,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        require_nonzero(amount)?;
        let address = handle.address;
        ledger.deposit_collateral(&handle.pool_id, &self.owner, &address, amount)?;
        ledger.adjust_position(
            &handle.pool_id,
            &address,
            &address,
            &address,
            safe_to_signed(amount.raw())?,
            0,
        )?;
        msg!("Locked {} collateral in position {}", amount, handle.position_id);
        Ok(())
    }

    fn unlock_inner<L: Ledger + TokenAdapter>(
        &self,
        ledger: &mut L,
        handle: &PositionHandle,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        require_nonzero(amount)?;
        let address = handle.address;
        ledger.adjust_position(
            &handle.pool_id,
            &address,
            &address,
            &address,
            -safe_to_signed(amount.raw())?,
            0,
        )?;
        ledger.move_collateral(&handle.pool_id, &address, &self.proxy, amount)?;
        ledger.withdraw_collateral(&handle.pool_id, &self.proxy, &self.owner, amount)?;
        msg!("Unlocked {} collateral from position {}", amount, handle.position_id);
        Ok(())
    }

    fn draw_inner<L: Ledger + TokenAdapter>(
        &self,
        accrual: Accrual<'_>,
        ledger: &mut L,
        handle: &PositionHandle,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        require_nonzero(amount)?;
        let address = handle.address;
        let rate = accrual.collector.collect(&handle.pool_id, accrual.clock, ledger)?;

        let debt_share = draw_debt_share(ledger.stablecoin(&address), rate, amount)?;
        ledger.adjust_position(&handle.pool_id, &address, &address, &address, 0, debt_share)?;
        ledger.move_stablecoin(&address, &self.proxy, to_rad(amount)?)?;
        ledger.withdraw_stablecoin(&self.proxy, &self.owner, amount)?;

        msg!(
            "Drew {} stablecoin from position {} ({} debt share)",
            amount,
            handle.position_id,
            debt_share
        );
        Ok(())
    }

    fn wipe_inner<L: Ledger + TokenAdapter>(
        &self,
        accrual: Accrual<'_>,
        ledger: &mut L,
        handle: &PositionHandle,
        amount: Wad,
    ) -> Result<(), ProgramError> {
        require_nonzero(amount)?;
        let address = handle.address;
        let rate = accrual.collector.collect(&handle.pool_id, accrual.clock, ledger)?;

        ledger.deposit_stablecoin(&self.owner, &address, amount)?;
        let position = ledger.position(&handle.pool_id, &address)?;
        let debt_share = wipe_debt_share(ledger.stablecoin(&address), rate, position.debt_share)?;
        ledger.adjust_position(&handle.pool_id, &address, &address, &address, 0, debt_share)?;

        msg!(
            "Wiped {} stablecoin into position {} ({} debt share)",
            amount,
            handle.position_id,
            debt_share
        );
        Ok(())
    }

    fn wipe_all_inner<L: Ledger + TokenAdapter>(
        &self,
        accrual: Accrual<'_>,
        ledger: &mut L,
        handle: &PositionHandle,
    ) -> Result<Wad, ProgramError> {
        let address = handle.address;
        let rate = accrual.collector.collect(&handle.pool_id, accrual.clock, ledger)?;

        let position = ledger.position(&handle.pool_id, &address)?;
        let required =
            wipe_all_stablecoin_amount(position.debt_share, rate, ledger.stablecoin(&address))?;
        if !required.is_zero() {
            ledger.deposit_stablecoin(&self.owner, &address, required)?;
        }
        ledger.adjust_position(
            &handle.pool_id,
            &address,
            &address,
            &address,
            0,
            -safe_to_signed(position.debt_share.raw())?,
        )?;

        msg!(
            "Wiped all debt of position {}, paid {} stablecoin",
            handle.position_id,
            required
        );
        Ok(required)
    }

    fn give_inner<L: PositionManager>(
        &self,
        ledger: &mut L,
        position_id: u64,
        new_owner: &Pubkey,
    ) -> Result<(), ProgramError> {
        ledger.give_position(position_id, &self.proxy, new_owner)?;
        msg!("Position {} transferred to {}", position_id, new_owner);
        PositionOwnershipTransferred {
            position_id,
            previous_owner: self.proxy,
            new_owner: *new_owner,
        }
        .emit();
        Ok(())
    }
}

fn require_nonzero(amount: Wad) -> Result<(), ProgramError> {
    if amount.is_zero() {
        msg!("Amount is zero");
        return Err(StablecoinEngineError::ZeroAmount.into());
    }
    Ok(())
}
