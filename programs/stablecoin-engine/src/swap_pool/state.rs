use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::{Slot, UnixTimestamp},
    program_error::ProgramError,
    pubkey::Pubkey,
};
use std::collections::BTreeMap;

use crate::{custody::AssetAmount, math::Wad};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    TokenToStablecoin,
    StablecoinToToken,
}

/// Per-user swap count window
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserSwapWindow {
    pub swaps_remaining: u64,
    /// Slot at which the current window opened
    pub last_window_boundary: Slot,
}

/// Swap pool balances and limit counters
///
/// `per_user` keeps one window for every account that ever swapped and is
/// cloned with the rest of the state for each operation's rollback
/// snapshot, so snapshot cost grows with the number of distinct traders.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq)]
pub struct SwapPoolState {
    /// Reference token held for swaps, native units
    pub token_balance: u64,

    /// Stablecoin held for swaps
    pub stablecoin_balance: Wad,

    /// Token fees collected, native units
    pub total_token_fee_balance: u64,

    pub total_stablecoin_fee_balance: Wad,

    /// Token balance (normalized) plus stablecoin balance
    pub total_value_deposited: Wad,

    pub remaining_daily_swap_amount: Wad,

    /// Start of the current daily window
    pub last_update: UnixTimestamp,

    pub per_user: BTreeMap<Pubkey, UserSwapWindow>,
}

impl SwapPoolState {
    pub fn normalized_token_balance(&self, token_decimals: u8) -> Result<Wad, ProgramError> {
        AssetAmount::Token(self.token_balance).normalized(token_decimals)
    }

    /// Swaps move value between the two balances and into the fee buckets
    /// but never change their sum.
    pub fn conservation_holds(&self, token_decimals: u8) -> bool {
        self.normalized_token_balance(token_decimals)
            .and_then(|token| token.safe_add(self.stablecoin_balance))
            .map(|total| total == self.total_value_deposited)
            .unwrap_or(false)
    }
}

/// Outcome of a swap, all amounts on the 18-decimal scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapReceipt {
    pub direction: SwapDirection,
    pub amount_in: Wad,
    pub amount_out: Wad,
    /// Value retained by the pool as fees
    pub fee: Wad,
}
