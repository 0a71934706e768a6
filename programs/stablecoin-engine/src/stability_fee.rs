//! Stability fee accrual
//!
//! Compounds each pool's accumulated rate by its per-second stability fee
//! and books the newly recognised debt to the debt sink.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::Clock, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::StablecoinEngineError,
    events::{DebtSinkSet, Event, PauseStateChanged, StabilityFeeCollected},
    ledger::Ledger,
    math::{ray_mul, ray_pow, signed_difference, Ray},
    security::{require_owner_or_governor, AccessControl, ReentrancyGuard},
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq)]
pub struct StabilityFeeCollectorConfig {
    /// Account credited with accrued stability fees
    pub debt_sink: Option<Pubkey>,
    pub paused: bool,
}

impl StabilityFeeCollectorConfig {
    pub fn new(debt_sink: Pubkey) -> Self {
        Self {
            debt_sink: Some(debt_sink),
            paused: false,
        }
    }

    pub fn debt_sink(&self) -> Result<Pubkey, ProgramError> {
        self.debt_sink.ok_or_else(|| {
            msg!("Debt sink is not set");
            StablecoinEngineError::EngineNotConfigured.into()
        })
    }
}

pub struct StabilityFeeCollector {
    address: Pubkey,
    access_control: Box<dyn AccessControl>,
    config: StabilityFeeCollectorConfig,
    guard: ReentrancyGuard,
}

impl StabilityFeeCollector {
    pub fn new(
        address: Pubkey,
        config: StabilityFeeCollectorConfig,
        access_control: Box<dyn AccessControl>,
    ) -> Self {
        Self {
            address,
            access_control,
            config,
            guard: ReentrancyGuard::new(),
        }
    }

    pub fn address(&self) -> &Pubkey {
        &self.address
    }

    pub fn config(&self) -> &StabilityFeeCollectorConfig {
        &self.config
    }

    /// Brings `pool_id`'s accumulated rate up to `clock.unix_timestamp` and
    /// returns it. Calling twice at the same instant accrues nothing.
    pub fn collect(
        &self,
        pool_id: &Pubkey,
        clock: &Clock,
        ledger: &mut dyn Ledger,
    ) -> Result<Ray, ProgramError> {
        let _context = self.guard.enter()?;

        if self.config.paused {
            msg!("Stability fee collection is paused");
            return Err(StablecoinEngineError::EnginePaused.into());
        }
        let debt_sink = self.config.debt_sink()?;
        let now = clock.unix_timestamp;

        let registry = ledger.collateral_pool_config();
        let previous_rate = registry.get_debt_accumulated_rate(pool_id)?;
        let stability_fee_rate = registry.get_stability_fee_rate(pool_id)?;
        let last_accumulation_time = registry.get_last_accumulation_time(pool_id)?;

        if now < last_accumulation_time {
            msg!(
                "Timestamp {} precedes last accumulation {}",
                now,
                last_accumulation_time
            );
            return Err(StablecoinEngineError::InvalidTimestamp.into());
        }
        if stability_fee_rate < Ray::one() {
            msg!("Stability fee rate {} is below one", stability_fee_rate);
            return Err(StablecoinEngineError::InvalidStabilityFeeRate.into());
        }

        let elapsed = now
            .checked_sub(last_accumulation_time)
            .ok_or(StablecoinEngineError::ArithmeticOverflow)? as u64;
        let factor = ray_pow(stability_fee_rate, elapsed)?;
        let new_rate = ray_mul(factor, previous_rate)?;
        let rate_delta = signed_difference(new_rate.raw(), previous_rate.raw())?;

        ledger.accrue_stability_fee(pool_id, &debt_sink, rate_delta)?;
        ledger
            .collateral_pool_config_mut()
            .update_last_accumulation_time(pool_id, now)?;

        msg!(
            "Collected stability fee for {}: rate {} -> {} over {}s",
            pool_id,
            previous_rate,
            new_rate,
            elapsed
        );
        StabilityFeeCollected {
            pool_id: *pool_id,
            previous_rate,
            new_rate,
            rate_delta,
            elapsed,
            timestamp: now,
        }
        .emit();

        Ok(new_rate)
    }

    pub fn set_debt_sink(
        &mut self,
        caller: &Pubkey,
        debt_sink: Pubkey,
    ) -> Result<(), ProgramError> {
        require_owner_or_governor(self.access_control.as_ref(), caller)?;
        self.config.debt_sink = Some(debt_sink);

        msg!("Debt sink set to {}", debt_sink);
        DebtSinkSet {
            debt_sink,
            authority: *caller,
        }
        .emit();
        Ok(())
    }

    pub fn pause(&mut self, caller: &Pubkey) -> Result<(), ProgramError> {
        self.set_paused(caller, true)
    }

    pub fn unpause(&mut self, caller: &Pubkey) -> Result<(), ProgramError> {
        self.set_paused(caller, false)
    }

    fn set_paused(&mut self, caller: &Pubkey, paused: bool) -> Result<(), ProgramError> {
        require_owner_or_governor(self.access_control.as_ref(), caller)?;
        self.config.paused = paused;

        msg!("Stability fee collector paused: {}", paused);
        PauseStateChanged {
            component: self.address,
            paused,
            authority: *caller,
        }
        .emit();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ledger::{CollateralPoolConfig, InMemoryLedger},
        security::RoleRegistry,
        state::CollateralPool,
    };

    fn clock_at(unix_timestamp: i64) -> Clock {
        Clock {
            unix_timestamp,
            ..Clock::default()
        }
    }

    fn setup(
        config: StabilityFeeCollectorConfig,
    ) -> (StabilityFeeCollector, InMemoryLedger, Pubkey, Pubkey) {
        let owner = Pubkey::new_unique();
        let pool_id = Pubkey::new_unique();
        let mut ledger = InMemoryLedger::new();
        // 1% per second keeps the numbers readable
        let rate = Ray::from_raw_u128(1_010_000_000_000_000_000_000_000_000);
        ledger
            .add_collateral_pool(CollateralPool::new(pool_id, rate, 1_000).unwrap())
            .unwrap();

        let collector = StabilityFeeCollector::new(
            Pubkey::new_unique(),
            config,
            Box::new(RoleRegistry::new(owner)),
        );
        (collector, ledger, pool_id, owner)
    }

    #[test]
    fn test_collect_compounds_rate() {
        let sink = Pubkey::new_unique();
        let (collector, mut ledger, pool_id, _) = setup(StabilityFeeCollectorConfig::new(sink));

        let rate = collector.collect(&pool_id, &clock_at(1_002), &mut ledger).unwrap();
        assert_eq!(rate, Ray::from_raw_u128(1_020_100_000_000_000_000_000_000_000));
        assert_eq!(ledger.get_last_accumulation_time(&pool_id).unwrap(), 1_002);

        // same instant accrues nothing
        let again = collector.collect(&pool_id, &clock_at(1_002), &mut ledger).unwrap();
        assert_eq!(again, rate);
    }

    #[test]
    fn test_collect_rejects_time_travel() {
        let sink = Pubkey::new_unique();
        let (collector, mut ledger, pool_id, _) = setup(StabilityFeeCollectorConfig::new(sink));

        assert_eq!(
            collector.collect(&pool_id, &clock_at(999), &mut ledger),
            Err(StablecoinEngineError::InvalidTimestamp.into())
        );
        assert_eq!(
            collector.collect(&Pubkey::new_unique(), &clock_at(1_000), &mut ledger),
            Err(StablecoinEngineError::PoolNotFound.into())
        );
    }

    #[test]
    fn test_collect_requires_sink_and_unpaused() {
        let (mut collector, mut ledger, pool_id, owner) =
            setup(StabilityFeeCollectorConfig::default());
        assert_eq!(
            collector.collect(&pool_id, &clock_at(1_001), &mut ledger),
            Err(StablecoinEngineError::EngineNotConfigured.into())
        );

        let stranger = Pubkey::new_unique();
        assert_eq!(
            collector.set_debt_sink(&stranger, stranger),
            Err(StablecoinEngineError::AccessDenied.into())
        );
        collector.set_debt_sink(&owner, Pubkey::new_unique()).unwrap();

        collector.pause(&owner).unwrap();
        assert_eq!(
            collector.collect(&pool_id, &clock_at(1_001), &mut ledger),
            Err(StablecoinEngineError::EnginePaused.into())
        );
        collector.unpause(&owner).unwrap();
        assert!(collector.collect(&pool_id, &clock_at(1_001), &mut ledger).is_ok());
    }
}
