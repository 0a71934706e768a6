//! Access Control
//!
//! Administrative operations consult an injected `AccessControl` policy.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};
use std::collections::BTreeMap;

use crate::error::StablecoinEngineError;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Owner,
    Governor,
}

/// Role set stored as bit flags
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Roles(pub u8);

impl Roles {
    pub const NONE: Self = Self(0);
    pub const OWNER: Self = Self(1 << 0);
    pub const GOVERNOR: Self = Self(1 << 1);

    pub fn has(&self, roles: Self) -> bool {
        roles.0 != 0 && (self.0 & roles.0) == roles.0
    }

    pub fn add(&mut self, roles: Self) {
        self.0 |= roles.0;
    }

    pub fn remove(&mut self, roles: Self) {
        self.0 &= !roles.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl From<Role> for Roles {
    fn from(role: Role) -> Self {
        match role {
            Role::Owner => Self::OWNER,
            Role::Governor => Self::GOVERNOR,
        }
    }
}

pub trait AccessControl {
    fn has_role(&self, account: &Pubkey, role: Role) -> bool;
}

/// Fails with `AccessDenied` unless `caller` holds Owner or Governor.
pub fn require_owner_or_governor(
    access_control: &dyn AccessControl,
    caller: &Pubkey,
) -> Result<(), ProgramError> {
    if access_control.has_role(caller, Role::Owner)
        || access_control.has_role(caller, Role::Governor)
    {
        return Ok(());
    }
    msg!("{} lacks owner or governor role", caller);
    Err(StablecoinEngineError::AccessDenied.into())
}

/// In-memory role registry
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default)]
pub struct RoleRegistry {
    members: BTreeMap<Pubkey, Roles>,
}

impl RoleRegistry {
    pub fn new(owner: Pubkey) -> Self {
        let mut members = BTreeMap::new();
        members.insert(owner, Roles::OWNER);
        Self { members }
    }

    /// Builder used when wiring a registry up front.
    pub fn with_role(mut self, account: Pubkey, role: Role) -> Self {
        self.members.entry(account).or_default().add(role.into());
        self
    }

    pub fn grant_role(
        &mut self,
        caller: &Pubkey,
        account: Pubkey,
        role: Role,
    ) -> Result<(), ProgramError> {
        self.require_owner(caller)?;
        self.members.entry(account).or_default().add(role.into());
        msg!("Granted {:?} to {}", role, account);
        Ok(())
    }

    pub fn revoke_role(
        &mut self,
        caller: &Pubkey,
        account: &Pubkey,
        role: Role,
    ) -> Result<(), ProgramError> {
        self.require_owner(caller)?;
        if let Some(roles) = self.members.get_mut(account) {
            roles.remove(role.into());
            if roles.is_empty() {
                self.members.remove(account);
            }
        }
        msg!("Revoked {:?} from {}", role, account);
        Ok(())
    }

    fn require_owner(&self, caller: &Pubkey) -> Result<(), ProgramError> {
        if self.has_role(caller, Role::Owner) {
            Ok(())
        } else {
            msg!("{} is not an owner", caller);
            Err(StablecoinEngineError::AccessDenied.into())
        }
    }
}

impl AccessControl for RoleRegistry {
    fn has_role(&self, account: &Pubkey, role: Role) -> bool {
        self.members
            .get(account)
            .map(|roles| roles.has(role.into()))
            .unwrap_or(false)
    }
}
