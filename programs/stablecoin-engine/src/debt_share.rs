//! Debt share conversion
//!
//! Translates stablecoin amounts into debt share deltas. Anything the user
//! owes rounds up; any debt relieved rounds down and is clamped to what
//! exists.

use solana_program::{msg, program_error::ProgramError};

use crate::math::{
    debt_value, rad_div_ray_ceil, rad_div_ray_floor, rad_to_wad_ceil, safe_sub, safe_to_signed,
    to_rad, Rad, Ray, Wad,
};

/// Debt share to mint so that `existing_balance` plus the new debt covers
/// `desired`. Zero when the existing balance already covers it.
pub fn draw_debt_share(
    existing_balance: Rad,
    accumulated_rate: Ray,
    desired: Wad,
) -> Result<i128, ProgramError> {
    let desired_value = to_rad(desired)?;
    if existing_balance >= desired_value {
        return Ok(0);
    }

    let shortfall = Rad::from_raw(safe_sub(desired_value.raw(), existing_balance.raw())?);
    let debt_share = rad_div_ray_ceil(shortfall, accumulated_rate)?;
    safe_to_signed(debt_share.raw())
}

/// Negative debt share retired by paying `value` into a position holding
/// `existing_debt_share`.
pub fn wipe_debt_share(
    value: Rad,
    accumulated_rate: Ray,
    existing_debt_share: Wad,
) -> Result<i128, ProgramError> {
    let mut debt_share = rad_div_ray_floor(value, accumulated_rate)?;
    if debt_share > existing_debt_share {
        msg!(
            "Clamping wipe of {} to existing debt share {}",
            debt_share,
            existing_debt_share
        );
        debt_share = existing_debt_share;
    }
    Ok(-safe_to_signed(debt_share.raw())?)
}

/// Stablecoin needed, on top of `balance`, to clear `debt_share` entirely.
pub fn wipe_all_stablecoin_amount(
    debt_share: Wad,
    accumulated_rate: Ray,
    balance: Rad,
) -> Result<Wad, ProgramError> {
    let debt = debt_value(debt_share, accumulated_rate)?;
    if balance >= debt {
        return Ok(Wad::zero());
    }
    rad_to_wad_ceil(Rad::from_raw(safe_sub(debt.raw(), balance.raw())?))
}
