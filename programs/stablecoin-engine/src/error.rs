use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq)]
pub enum StablecoinEngineError {
    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 0,

    #[error("Arithmetic underflow")]
    ArithmeticUnderflow = 1,

    #[error("Division by zero")]
    DivisionByZero = 2,

    #[error("Timestamp is earlier than the last accumulation time")]
    InvalidTimestamp = 3,

    #[error("Engine not configured")]
    EngineNotConfigured = 4,

    #[error("Engine is paused")]
    EnginePaused = 5,

    #[error("Engine is not paused")]
    NotPaused = 6,

    #[error("Access denied")]
    AccessDenied = 7,

    #[error("Single swap limit exceeded")]
    SingleSwapLimitExceeded = 8,

    #[error("Daily swap limit exceeded")]
    DailyLimitExceeded = 9,

    #[error("Swap count limit exceeded")]
    SwapCountExceeded = 10,

    #[error("Insufficient liquidity")]
    InsufficientLiquidity = 11,

    #[error("Insufficient balance")]
    InsufficientBalance = 12,

    #[error("Reentrant call blocked")]
    ReentrancyBlocked = 13,

    #[error("Destination cannot receive position ownership")]
    UnsafeOwnershipTransfer = 14,

    #[error("Amount must be greater than zero")]
    ZeroAmount = 15,

    #[error("Fee exceeds the maximum")]
    InvalidFee = 16,

    #[error("Invalid limit configuration")]
    InvalidLimitConfig = 17,

    #[error("Stability fee rate below one")]
    InvalidStabilityFeeRate = 18,

    #[error("Invalid token decimals")]
    InvalidDecimals = 19,

    #[error("Collateral pool not found")]
    PoolNotFound = 20,

    #[error("Position not found")]
    PositionNotFound = 21,

    #[error("Proxy retained a transient balance")]
    TransientBalanceRetained = 22,

    #[error("Invalid reentrancy guard state")]
    InvalidGuardState = 23,
}

impl PrintProgramError for StablecoinEngineError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("StablecoinEngineError: {}", self);
    }
}

impl From<StablecoinEngineError> for ProgramError {
    fn from(e: StablecoinEngineError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for StablecoinEngineError {
    fn type_of() -> &'static str {
        "StablecoinEngineError"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_error_codes_round_trip() {
        let err: ProgramError = StablecoinEngineError::DailyLimitExceeded.into();
        assert_eq!(err, ProgramError::Custom(9));

        if let ProgramError::Custom(code) = err {
            assert_eq!(
                StablecoinEngineError::from_u32(code),
                Some(StablecoinEngineError::DailyLimitExceeded)
            );
        }
        assert_eq!(StablecoinEngineError::from_u32(999), None);
    }
}
