//! Token custody
//!
//! The swap pool moves real tokens only through `TokenCustody`. Token
//! amounts are in the token's native units, stablecoin amounts are `Wad`.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};
use std::collections::BTreeMap;

use crate::{
    error::StablecoinEngineError,
    math::{convert_decimals, Wad, U256},
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Asset {
    Token,
    Stablecoin,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetAmount {
    Token(u64),
    Stablecoin(Wad),
}

impl AssetAmount {
    pub fn asset(&self) -> Asset {
        match self {
            AssetAmount::Token(_) => Asset::Token,
            AssetAmount::Stablecoin(_) => Asset::Stablecoin,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            AssetAmount::Token(amount) => *amount == 0,
            AssetAmount::Stablecoin(amount) => amount.is_zero(),
        }
    }

    /// Value on the 18-decimal scale.
    pub fn normalized(&self, token_decimals: u8) -> Result<Wad, ProgramError> {
        match self {
            AssetAmount::Token(amount) => {
                convert_decimals(U256::from(*amount), token_decimals, Wad::DECIMALS)
                    .map(Wad::from_raw)
            }
            AssetAmount::Stablecoin(amount) => Ok(*amount),
        }
    }
}

pub trait TokenCustody {
    fn transfer(
        &mut self,
        amount: AssetAmount,
        from: &Pubkey,
        to: &Pubkey,
    ) -> Result<(), ProgramError>;

    fn balance_of(&self, asset: Asset, account: &Pubkey) -> AssetAmount;
}

/// A transfer the pool has executed or intends to execute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    pub amount: AssetAmount,
    pub from: Pubkey,
    pub to: Pubkey,
}

impl Transfer {
    pub fn new(amount: AssetAmount, from: Pubkey, to: Pubkey) -> Self {
        Self { amount, from, to }
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.amount, self.to, self.from)
    }
}

/// Executes `transfers` in order. On failure, already executed transfers
/// are reversed newest first and the original error is returned.
pub fn execute_transfers(
    custody: &mut dyn TokenCustody,
    transfers: &[Transfer],
) -> Result<(), ProgramError> {
    for (executed, transfer) in transfers.iter().enumerate() {
        if transfer.amount.is_zero() {
            continue;
        }
        if let Err(err) = custody.transfer(transfer.amount, &transfer.from, &transfer.to) {
            msg!("Transfer {:?} failed, compensating", transfer);
            for done in transfers[..executed].iter().rev() {
                if done.amount.is_zero() {
                    continue;
                }
                let undo = done.reversed();
                if custody.transfer(undo.amount, &undo.from, &undo.to).is_err() {
                    msg!("Compensating transfer {:?} failed", undo);
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

/// Balance book keyed by (asset, account)
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustody {
    token_balances: BTreeMap<Pubkey, u64>,
    stablecoin_balances: BTreeMap<Pubkey, Wad>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, amount: AssetAmount, to: &Pubkey) -> Result<(), ProgramError> {
        match amount {
            AssetAmount::Token(amount) => {
                let balance = self.token_balances.entry(*to).or_insert(0);
                *balance = balance
                    .checked_add(amount)
                    .ok_or(StablecoinEngineError::ArithmeticOverflow)?;
            }
            AssetAmount::Stablecoin(amount) => {
                let balance = self.stablecoin_balances.entry(*to).or_default();
                *balance = balance.safe_add(amount)?;
            }
        }
        Ok(())
    }

    pub fn token_balance(&self, account: &Pubkey) -> u64 {
        self.token_balances.get(account).copied().unwrap_or(0)
    }

    pub fn stablecoin_balance(&self, account: &Pubkey) -> Wad {
        self.stablecoin_balances
            .get(account)
            .copied()
            .unwrap_or_default()
    }
}

impl TokenCustody for InMemoryCustody {
    fn transfer(
        &mut self,
        amount: AssetAmount,
        from: &Pubkey,
        to: &Pubkey,
    ) -> Result<(), ProgramError> {
        match amount {
            AssetAmount::Token(amount) => {
                let available = self.token_balance(from);
                if available < amount {
                    msg!("Token balance of {} is {}, needs {}", from, available, amount);
                    return Err(StablecoinEngineError::InsufficientBalance.into());
                }
                self.token_balances.insert(*from, available - amount);
                let balance = self.token_balances.entry(*to).or_insert(0);
                *balance = balance
                    .checked_add(amount)
                    .ok_or(StablecoinEngineError::ArithmeticOverflow)?;
            }
            AssetAmount::Stablecoin(amount) => {
                let available = self.stablecoin_balance(from);
                if available < amount {
                    msg!("Stablecoin balance of {} is {}, needs {}", from, available, amount);
                    return Err(StablecoinEngineError::InsufficientBalance.into());
                }
                self.stablecoin_balances
                    .insert(*from, available.safe_sub(amount)?);
                let balance = self.stablecoin_balances.entry(*to).or_default();
                *balance = balance.safe_add(amount)?;
            }
        }
        Ok(())
    }

    fn balance_of(&self, asset: Asset, account: &Pubkey) -> AssetAmount {
        match asset {
            Asset::Token => AssetAmount::Token(self.token_balance(account)),
            Asset::Stablecoin => AssetAmount::Stablecoin(self.stablecoin_balance(account)),
        }
    }
}
