//! Fixed-point scales and safe arithmetic
//!
//! Balances are `Wad` (10^18), rates and accumulators are `Ray` (10^27) and
//! internal ledger value is `Rad` (10^45 = Wad * Ray). Each scale is its own
//! type; moving between scales goes through the named conversions below.
//! Every multiply, subtraction and signed cast in the engine goes through
//! `safe_mul`, `safe_sub` and `safe_to_signed`.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError};
use std::{fmt, io};

use crate::{error::StablecoinEngineError, math::u256::U256};

/// 10^18
pub const WAD: U256 = U256([0x0de0_b6b3_a764_0000, 0, 0, 0]);
/// 10^27
pub const RAY: U256 = U256([0x9fd0_803c_e800_0000, 0x033b_2e3c, 0, 0]);
/// 10^45
pub const RAD: U256 = U256([0x0b22_a000_0000_0000, 0xe086_b93c_e2f7_68a0, 0x002c_d76f, 0]);

/// Largest power of ten that fits in 256 bits.
pub const MAX_DECIMALS: u8 = 77;

macro_rules! fixed_point_scale {
    ($(#[$meta:meta])* $name:ident, $decimals:expr, $one:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(U256);

        impl $name {
            pub const DECIMALS: u8 = $decimals;

            pub const fn from_raw(raw: U256) -> Self {
                Self(raw)
            }

            pub fn from_raw_u128(raw: u128) -> Self {
                Self(U256::from(raw))
            }

            /// Whole units, e.g. `from_units(5)` is 5.0 on this scale.
            pub fn from_units(units: u128) -> Result<Self, ProgramError> {
                safe_mul(U256::from(units), $one).map(Self)
            }

            pub const fn zero() -> Self {
                Self(U256([0; 4]))
            }

            pub const fn one() -> Self {
                Self($one)
            }

            pub fn raw(&self) -> U256 {
                self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            pub fn safe_add(self, other: Self) -> Result<Self, ProgramError> {
                safe_add(self.0, other.0).map(Self)
            }

            pub fn safe_sub(self, other: Self) -> Result<Self, ProgramError> {
                safe_sub(self.0, other.0).map(Self)
            }

            /// Applies a signed ledger delta.
            pub fn apply_delta(self, delta: i128) -> Result<Self, ProgramError> {
                let magnitude = U256::from(delta.unsigned_abs());
                if delta >= 0 {
                    safe_add(self.0, magnitude).map(Self)
                } else {
                    safe_sub(self.0, magnitude).map(Self)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let one: U256 = $one;
                let fraction = (self.0 % one).to_string();
                write!(
                    f,
                    "{}.{:0>width$}",
                    self.0 / one,
                    fraction,
                    width = $decimals as usize
                )
            }
        }

        impl BorshSerialize for $name {
            fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
                for limb in self.0 .0.iter() {
                    limb.serialize(writer)?;
                }
                Ok(())
            }
        }

        impl BorshDeserialize for $name {
            fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
                let mut limbs = [0u64; 4];
                for limb in limbs.iter_mut() {
                    *limb = u64::deserialize_reader(reader)?;
                }
                Ok(Self(U256(limbs)))
            }
        }
    };
}

fixed_point_scale!(
    /// 18-decimal balance or amount.
    Wad,
    18,
    WAD
);
fixed_point_scale!(
    /// 27-decimal rate or accumulator.
    Ray,
    27,
    RAY
);
fixed_point_scale!(
    /// 45-decimal internal ledger value.
    Rad,
    45,
    RAD
);

pub fn safe_add(x: U256, y: U256) -> Result<U256, ProgramError> {
    x.checked_add(y).ok_or_else(|| {
        msg!("Addition overflow: {} + {}", x, y);
        StablecoinEngineError::ArithmeticOverflow.into()
    })
}

/// Wrapping subtraction, rejected when the result exceeds the minuend.
pub fn safe_sub(x: U256, y: U256) -> Result<U256, ProgramError> {
    let (z, _) = x.overflowing_sub(y);
    if z > x {
        msg!("Subtraction underflow: {} - {}", x, y);
        return Err(StablecoinEngineError::ArithmeticUnderflow.into());
    }
    Ok(z)
}

/// Wrapping multiplication, rejected unless dividing back recovers `x`.
pub fn safe_mul(x: U256, y: U256) -> Result<U256, ProgramError> {
    let (z, _) = x.overflowing_mul(y);
    if !y.is_zero() && z / y != x {
        msg!("Multiplication overflow: {} * {}", x, y);
        return Err(StablecoinEngineError::ArithmeticOverflow.into());
    }
    Ok(z)
}

pub fn safe_div(x: U256, y: U256) -> Result<U256, ProgramError> {
    if y.is_zero() {
        msg!("Division by zero");
        return Err(StablecoinEngineError::DivisionByZero.into());
    }
    Ok(x / y)
}

pub fn safe_div_ceil(x: U256, y: U256) -> Result<U256, ProgramError> {
    let quotient = safe_div(x, y)?;
    if (x % y).is_zero() {
        Ok(quotient)
    } else {
        safe_add(quotient, U256::one())
    }
}

pub fn safe_to_signed(x: U256) -> Result<i128, ProgramError> {
    if x > U256::from(i128::MAX as u128) {
        msg!("Value {} exceeds the signed range", x);
        return Err(StablecoinEngineError::ArithmeticOverflow.into());
    }
    Ok(x.low_u128() as i128)
}

/// `new - old` as a signed delta.
pub fn signed_difference(new: U256, old: U256) -> Result<i128, ProgramError> {
    if new >= old {
        safe_to_signed(safe_sub(new, old)?)
    } else {
        Ok(-safe_to_signed(safe_sub(old, new)?)?)
    }
}

pub fn mul_div_floor(x: U256, y: U256, denominator: U256) -> Result<U256, ProgramError> {
    safe_div(safe_mul(x, y)?, denominator)
}

pub fn mul_div_ceil(x: U256, y: U256, denominator: U256) -> Result<U256, ProgramError> {
    safe_div_ceil(safe_mul(x, y)?, denominator)
}

pub fn to_rad(amount: Wad) -> Result<Rad, ProgramError> {
    safe_mul(amount.raw(), RAY).map(Rad::from_raw)
}

/// Stablecoin-denominated debt of a debt share at the given accumulated rate.
pub fn debt_value(debt_share: Wad, rate: Ray) -> Result<Rad, ProgramError> {
    safe_mul(debt_share.raw(), rate.raw()).map(Rad::from_raw)
}

pub fn rad_div_ray_floor(value: Rad, rate: Ray) -> Result<Wad, ProgramError> {
    safe_div(value.raw(), rate.raw()).map(Wad::from_raw)
}

pub fn rad_div_ray_ceil(value: Rad, rate: Ray) -> Result<Wad, ProgramError> {
    safe_div_ceil(value.raw(), rate.raw()).map(Wad::from_raw)
}

/// Rad to Wad, rounding up on any remainder.
pub fn rad_to_wad_ceil(value: Rad) -> Result<Wad, ProgramError> {
    safe_div_ceil(value.raw(), RAY).map(Wad::from_raw)
}

/// `x * y / RAY`, rounded down.
pub fn ray_mul(x: Ray, y: Ray) -> Result<Ray, ProgramError> {
    mul_div_floor(x.raw(), y.raw(), RAY).map(Ray::from_raw)
}

/// `x * y / WAD`, rounded down.
pub fn wad_mul(x: Wad, y: Wad) -> Result<Wad, ProgramError> {
    mul_div_floor(x.raw(), y.raw(), WAD).map(Wad::from_raw)
}

/// `x^n` in Ray precision by repeated squaring, rounding half up after
/// every multiply. Any intermediate overflow fails the whole call.
pub fn ray_pow(x: Ray, n: u64) -> Result<Ray, ProgramError> {
    let mut base = x.raw();
    if base.is_zero() {
        return Ok(if n == 0 { Ray::one() } else { Ray::zero() });
    }

    let half = RAY / U256::from(2u8);
    let mut result = if n % 2 == 0 { RAY } else { base };
    let mut n = n / 2;

    while n > 0 {
        let squared = safe_mul(base, base)?;
        base = safe_add(squared, half)? / RAY;

        if n % 2 == 1 {
            let product = safe_mul(result, base)?;
            result = safe_add(product, half)? / RAY;
        }
        n /= 2;
    }

    Ok(Ray::from_raw(result))
}

/// Rescales an integer amount between decimal precisions. Truncates when
/// scaling down.
pub fn convert_decimals(amount: U256, from: u8, to: u8) -> Result<U256, ProgramError> {
    if from > MAX_DECIMALS || to > MAX_DECIMALS {
        msg!("Unsupported decimals: {} -> {}", from, to);
        return Err(StablecoinEngineError::InvalidDecimals.into());
    }

    if from == to {
        Ok(amount)
    } else if from < to {
        safe_mul(amount, U256::exp10((to - from) as usize))
    } else {
        Ok(amount / U256::exp10((from - to) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray(raw: u128) -> Ray {
        Ray::from_raw_u128(raw)
    }

    #[test]
    fn test_scale_constants() {
        assert_eq!(WAD, U256::exp10(18));
        assert_eq!(RAY, U256::exp10(27));
        assert_eq!(RAD, U256::exp10(45));
        assert_eq!(safe_mul(WAD, RAY).unwrap(), RAD);
    }

    #[test]
    fn test_safe_mul_detects_overflow() {
        assert_eq!(safe_mul(U256::MAX, U256::zero()).unwrap(), U256::zero());
        assert_eq!(safe_mul(U256::MAX, U256::one()).unwrap(), U256::MAX);
        assert_eq!(
            safe_mul(U256::MAX, U256::from(2u8)),
            Err(StablecoinEngineError::ArithmeticOverflow.into())
        );
        assert_eq!(
            safe_mul(U256::exp10(40), U256::exp10(40)),
            Err(StablecoinEngineError::ArithmeticOverflow.into())
        );
    }

    #[test]
    fn test_safe_sub_detects_underflow() {
        assert_eq!(safe_sub(U256::from(5u8), U256::from(5u8)).unwrap(), U256::zero());
        assert_eq!(
            safe_sub(U256::from(5u8), U256::from(6u8)),
            Err(StablecoinEngineError::ArithmeticUnderflow.into())
        );
        assert_eq!(
            safe_sub(U256::zero(), U256::MAX),
            Err(StablecoinEngineError::ArithmeticUnderflow.into())
        );
    }

    #[test]
    fn test_safe_to_signed_range() {
        let max = U256::from(i128::MAX as u128);
        assert_eq!(safe_to_signed(max).unwrap(), i128::MAX);
        assert_eq!(
            safe_to_signed(max + U256::one()),
            Err(StablecoinEngineError::ArithmeticOverflow.into())
        );
        assert_eq!(signed_difference(U256::from(3u8), U256::from(10u8)).unwrap(), -7);
    }

    #[test]
    fn test_division_rounding() {
        assert_eq!(safe_div_ceil(U256::from(10u8), U256::from(3u8)).unwrap(), U256::from(4u8));
        assert_eq!(safe_div_ceil(U256::from(9u8), U256::from(3u8)).unwrap(), U256::from(3u8));
        assert_eq!(
            safe_div(U256::one(), U256::zero()),
            Err(StablecoinEngineError::DivisionByZero.into())
        );
        assert_eq!(
            rad_to_wad_ceil(Rad::from_raw(RAY + U256::one())).unwrap(),
            Wad::from_raw_u128(2)
        );
    }

    #[test]
    fn test_ray_pow_conventions() {
        assert_eq!(ray_pow(Ray::zero(), 0).unwrap(), Ray::one());
        assert_eq!(ray_pow(Ray::zero(), 7).unwrap(), Ray::zero());
        assert_eq!(ray_pow(ray(123_456), 0).unwrap(), Ray::one());
        assert_eq!(ray_pow(Ray::one(), 1_000_000).unwrap(), Ray::one());

        let two = Ray::from_units(2).unwrap();
        assert_eq!(ray_pow(two, 10).unwrap(), Ray::from_units(1024).unwrap());
    }

    #[test]
    fn test_ray_pow_overflow_fails() {
        let huge = Ray::from_raw(U256::exp10(40));
        assert_eq!(
            ray_pow(huge, 8),
            Err(StablecoinEngineError::ArithmeticOverflow.into())
        );
    }

    #[test]
    fn test_ray_pow_rounds_half_up() {
        // 1.5^2 = 2.25 exactly, 0.5^3 = 0.125 exactly
        let one_and_half = Ray::from_raw(RAY + RAY / U256::from(2u8));
        assert_eq!(
            ray_pow(one_and_half, 2).unwrap(),
            Ray::from_raw(RAY * U256::from(9u8) / U256::from(4u8))
        );
        assert_eq!(
            ray_pow(Ray::from_raw(RAY / U256::from(2u8)), 3).unwrap(),
            Ray::from_raw(RAY / U256::from(8u8))
        );

        // (1e-27)^2 rounds to zero
        assert_eq!(ray_pow(ray(1), 2).unwrap(), Ray::zero());
    }

    #[test]
    fn test_convert_decimals_truncates() {
        assert_eq!(
            convert_decimals(U256::from(1_500_000u64), 6, 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(
            convert_decimals(U256::from(1_999_999_999_999u64), 18, 6).unwrap(),
            U256::from(1u8)
        );
        assert_eq!(convert_decimals(U256::from(42u8), 18, 18).unwrap(), U256::from(42u8));
        assert_eq!(
            convert_decimals(U256::one(), 6, 78),
            Err(StablecoinEngineError::InvalidDecimals.into())
        );
    }

    #[test]
    fn test_apply_delta() {
        let share = Wad::from_units(10).unwrap();
        let more = share.apply_delta(5).unwrap();
        assert_eq!(more.raw(), WAD * U256::from(10u8) + U256::from(5u8));
        assert_eq!(more.apply_delta(-5).unwrap(), share);
        assert_eq!(
            Wad::zero().apply_delta(-1),
            Err(StablecoinEngineError::ArithmeticUnderflow.into())
        );
    }

    #[test]
    fn test_display_and_borsh() {
        let amount = Wad::from_raw_u128(1_050_000_000_000_000_001);
        assert_eq!(amount.to_string(), "1.050000000000000001");
        assert_eq!(Ray::one().to_string(), "1.000000000000000000000000000");

        let bytes = amount.try_to_vec().unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(Wad::try_from_slice(&bytes).unwrap(), amount);
    }
}
