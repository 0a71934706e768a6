//! Event logging
//!
//! Events are borsh-encoded and written to the program log as base58 so
//! off-chain indexers can follow fee accrual, swaps and admin changes.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, msg, pubkey::Pubkey};

use crate::{
    custody::Asset,
    math::{Ray, Wad},
    swap_pool::SwapDirection,
};

/// Event type discriminator
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq)]
pub enum EventType {
    // Stability fee events
    StabilityFeeCollected = 1,
    DebtSinkSet = 2,

    // Swap pool events
    SwapExecuted = 10,
    SwapFeeSet = 11,
    SwapLimitSet = 12,
    DecentralizedStateSet = 13,
    LiquidityDeposited = 14,
    LiquidityWithdrawn = 15,
    FeesWithdrawn = 16,
    WhitelistUpdated = 17,
    StableswapWrapperSet = 18,
    EmergencyWithdrawal = 19,

    // Shared
    PauseStateChanged = 20,

    // Position events
    PositionOpened = 30,
    PositionOwnershipTransferred = 31,
}

/// Which limit a `SwapLimitSet` event refers to
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapLimitKind {
    DailySwapLimitNumerator,
    SingleSwapLimitNumerator,
    NumberOfSwapsLimitPerUser,
    BlocksPerLimit,
}

/// Base event trait
pub trait Event: BorshSerialize {
    fn event_type() -> EventType;

    fn emit(&self) {
        msg!("STABLECOIN_ENGINE_EVENT");
        msg!("TYPE:{:?}", Self::event_type());

        if let Ok(data) = self.try_to_vec() {
            msg!("DATA:{}", bs58::encode(&data).into_string());
        }
    }
}

/// Defines an event struct whose name is also its `EventType` variant
#[macro_export]
macro_rules! define_event {
    ($name:ident { $($field:ident: $type:ty),* $(,)? }) => {
        #[derive(::borsh::BorshSerialize, ::borsh::BorshDeserialize, Debug, Clone, PartialEq)]
        pub struct $name {
            $(pub $field: $type,)*
        }

        impl $crate::events::Event for $name {
            fn event_type() -> $crate::events::EventType {
                $crate::events::EventType::$name
            }
        }
    };
}

// === Stability fee events ===

define_event!(StabilityFeeCollected {
    pool_id: Pubkey,
    previous_rate: Ray,
    new_rate: Ray,
    rate_delta: i128,
    elapsed: u64,
    timestamp: UnixTimestamp,
});

define_event!(DebtSinkSet {
    debt_sink: Pubkey,
    authority: Pubkey,
});

// === Swap pool events ===

define_event!(SwapExecuted {
    pool: Pubkey,
    user: Pubkey,
    recipient: Pubkey,
    direction: SwapDirection,
    amount_in: Wad,
    amount_out: Wad,
    fee: Wad,
});

define_event!(SwapFeeSet {
    pool: Pubkey,
    direction: SwapDirection,
    fee: Wad,
});

define_event!(SwapLimitSet {
    pool: Pubkey,
    limit: SwapLimitKind,
    value: u64,
});

define_event!(DecentralizedStateSet {
    pool: Pubkey,
    is_decentralized: bool,
});

define_event!(LiquidityDeposited {
    pool: Pubkey,
    depositor: Pubkey,
    asset: Asset,
    amount: Wad,
    total_value_deposited: Wad,
});

define_event!(LiquidityWithdrawn {
    pool: Pubkey,
    recipient: Pubkey,
    asset: Asset,
    amount: Wad,
    total_value_deposited: Wad,
});

define_event!(FeesWithdrawn {
    pool: Pubkey,
    destination: Pubkey,
    token_fee: u64,
    stablecoin_fee: Wad,
});

define_event!(WhitelistUpdated {
    pool: Pubkey,
    account: Pubkey,
    whitelisted: bool,
});

define_event!(StableswapWrapperSet {
    pool: Pubkey,
    wrapper: Pubkey,
});

define_event!(EmergencyWithdrawal {
    pool: Pubkey,
    recovery: Pubkey,
    token_amount: u64,
    stablecoin_amount: Wad,
});

define_event!(PauseStateChanged {
    component: Pubkey,
    paused: bool,
    authority: Pubkey,
});

// === Position events ===

define_event!(PositionOpened {
    position_id: u64,
    pool_id: Pubkey,
    owner: Pubkey,
});

define_event!(PositionOwnershipTransferred {
    position_id: u64,
    previous_owner: Pubkey,
    new_owner: Pubkey,
});
