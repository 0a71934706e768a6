//! Reentrancy Guard
//!
//! Per-instance guard for operations that commit state and then call out to
//! collaborators. A nested call into the same instance fails instead of
//! interleaving with the outer one.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError};
use std::cell::Cell;

use crate::error::StablecoinEngineError;

/// Reentrancy guard states
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReentrancyState {
    /// Not entered - ready for new operation
    NotEntered = 0,
    /// Entered - operation in progress
    Entered = 1,
}

#[derive(Debug)]
pub struct ReentrancyGuard {
    state: Cell<ReentrancyState>,
    operation_count: Cell<u64>,
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self {
            state: Cell::new(ReentrancyState::NotEntered),
            operation_count: Cell::new(0),
        }
    }

    /// Enter guarded section. The guard is released when the returned
    /// context is dropped.
    pub fn enter(&self) -> Result<ReentrancyContext<'_>, ProgramError> {
        match self.state.get() {
            ReentrancyState::NotEntered => {
                self.state.set(ReentrancyState::Entered);
                self.operation_count
                    .set(self.operation_count.get().saturating_add(1));
                Ok(ReentrancyContext { guard: self })
            }
            ReentrancyState::Entered => {
                msg!("Reentrancy detected");
                Err(StablecoinEngineError::ReentrancyBlocked.into())
            }
        }
    }

    /// Exit guarded section
    pub fn exit(&self) -> Result<(), ProgramError> {
        match self.state.get() {
            ReentrancyState::Entered => {
                self.state.set(ReentrancyState::NotEntered);
                Ok(())
            }
            state => {
                msg!("Invalid exit state: {:?}", state);
                Err(StablecoinEngineError::InvalidGuardState.into())
            }
        }
    }

    pub fn state(&self) -> ReentrancyState {
        self.state.get()
    }

    pub fn is_entered(&self) -> bool {
        self.state.get() == ReentrancyState::Entered
    }

    /// Number of guarded sections entered so far
    pub fn operation_count(&self) -> u64 {
        self.operation_count.get()
    }
}

/// Reentrancy guard context for automatic cleanup
#[derive(Debug)]
pub struct ReentrancyContext<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for ReentrancyContext<'_> {
    fn drop(&mut self) {
        if self.guard.is_entered() {
            let _ = self.guard.exit();
        }
    }
}
