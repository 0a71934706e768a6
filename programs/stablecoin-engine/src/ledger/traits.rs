use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    math::{Rad, Ray, Wad},
    state::{Position, PositionHandle},
};

/// Per-pool rate registry
pub trait CollateralPoolConfig {
    fn get_debt_accumulated_rate(&self, pool_id: &Pubkey) -> Result<Ray, ProgramError>;

    fn get_stability_fee_rate(&self, pool_id: &Pubkey) -> Result<Ray, ProgramError>;

    fn get_last_accumulation_time(&self, pool_id: &Pubkey) -> Result<UnixTimestamp, ProgramError>;

    fn update_last_accumulation_time(
        &mut self,
        pool_id: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError>;
}

/// Authoritative store of positions and internal stablecoin balances
pub trait Ledger {
    /// An address with no recorded position reads as an empty position.
    fn position(&self, pool_id: &Pubkey, position: &Pubkey) -> Result<Position, ProgramError>;

    /// Internal stablecoin balance of an account
    fn stablecoin(&self, account: &Pubkey) -> Rad;

    /// Free (unlocked) collateral held by an account
    fn collateral_balance(&self, pool_id: &Pubkey, account: &Pubkey) -> Wad;

    /// Raises the pool's accumulated rate by `rate_delta` and credits the
    /// resulting debt to `debt_sink`.
    fn accrue_stability_fee(
        &mut self,
        pool_id: &Pubkey,
        debt_sink: &Pubkey,
        rate_delta: i128,
    ) -> Result<(), ProgramError>;

    /// Moves `collateral_delta` between `collateral_owner`'s free
    /// collateral and the position, and mints or burns
    /// `debt_share_delta * rate` against `stablecoin_owner`.
    fn adjust_position(
        &mut self,
        pool_id: &Pubkey,
        position: &Pubkey,
        collateral_owner: &Pubkey,
        stablecoin_owner: &Pubkey,
        collateral_delta: i128,
        debt_share_delta: i128,
    ) -> Result<(), ProgramError>;

    fn move_stablecoin(
        &mut self,
        from: &Pubkey,
        to: &Pubkey,
        value: Rad,
    ) -> Result<(), ProgramError>;

    fn move_collateral(
        &mut self,
        pool_id: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError>;

    fn collateral_pool_config(&self) -> &dyn CollateralPoolConfig;

    fn collateral_pool_config_mut(&mut self) -> &mut dyn CollateralPoolConfig;
}

/// Position ownership and proxy registry
pub trait PositionManager {
    fn open_position(&mut self, pool_id: &Pubkey, owner: &Pubkey) -> Result<u64, ProgramError>;

    fn position_handle(&self, position_id: u64) -> Result<PositionHandle, ProgramError>;

    /// Fails with `AccessDenied` unless `caller` owns the position.
    fn give_position(
        &mut self,
        position_id: u64,
        caller: &Pubkey,
        new_owner: &Pubkey,
    ) -> Result<(), ProgramError>;

    fn proxy_of(&self, owner: &Pubkey) -> Option<Pubkey>;

    fn build_proxy(&mut self, owner: &Pubkey) -> Result<Pubkey, ProgramError>;

    /// True for accounts that cannot act through a proxy wallet.
    fn is_opaque_contract(&self, account: &Pubkey) -> bool;
}

/// Moves tokens between user wallets and internal ledger balances
pub trait TokenAdapter {
    fn deposit_collateral(
        &mut self,
        pool_id: &Pubkey,
        wallet: &Pubkey,
        account: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError>;

    fn withdraw_collateral(
        &mut self,
        pool_id: &Pubkey,
        account: &Pubkey,
        wallet: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError>;

    fn deposit_stablecoin(
        &mut self,
        wallet: &Pubkey,
        account: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError>;

    fn withdraw_stablecoin(
        &mut self,
        account: &Pubkey,
        wallet: &Pubkey,
        amount: Wad,
    ) -> Result<(), ProgramError>;
}
