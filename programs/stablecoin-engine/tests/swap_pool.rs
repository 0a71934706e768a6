use solana_program::{clock::Clock, program_error::ProgramError, pubkey::Pubkey};
use stablecoin_engine::{
    custody::{Asset, AssetAmount, InMemoryCustody, TokenCustody},
    math::Wad,
    security::{Role, RoleRegistry},
    swap_pool::{RateLimitedSwapPool, SwapPoolConfig, SwapPoolState},
    StablecoinEngineError,
};
use std::rc::Rc;

const TOKEN_DECIMALS: u8 = 6;
const ONE_TOKEN: u64 = 1_000_000;

struct TestPool {
    pool: RateLimitedSwapPool,
    custody: InMemoryCustody,
    owner: Pubkey,
    wrapper: Pubkey,
}

fn wad(units: u128) -> Wad {
    Wad::from_units(units).unwrap()
}

fn clock(unix_timestamp: i64, slot: u64) -> Clock {
    Clock {
        unix_timestamp,
        slot,
        ..Clock::default()
    }
}

/// Pool holding `tokens` whole tokens and `stablecoin` whole stablecoin of
/// wrapper liquidity.
fn setup(config: SwapPoolConfig, tokens: u64, stablecoin: u128) -> TestPool {
    let owner = Pubkey::new_unique();
    let wrapper = config.stableswap_wrapper;
    let pool = RateLimitedSwapPool::new(
        Pubkey::new_unique(),
        config,
        Box::new(RoleRegistry::new(owner)),
    )
    .unwrap();

    let mut custody = InMemoryCustody::new();
    custody.mint(AssetAmount::Token(tokens * ONE_TOKEN), &wrapper).unwrap();
    custody.mint(AssetAmount::Stablecoin(wad(stablecoin)), &wrapper).unwrap();
    pool.deposit_token(
        &wrapper,
        AssetAmount::Token(tokens * ONE_TOKEN),
        &clock(0, 0),
        &mut custody,
    )
    .unwrap();
    pool.deposit_token(
        &wrapper,
        AssetAmount::Stablecoin(wad(stablecoin)),
        &clock(0, 0),
        &mut custody,
    )
    .unwrap();

    TestPool {
        pool,
        custody,
        owner,
        wrapper,
    }
}

fn assert_custody_matches(t: &TestPool) {
    let state = t.pool.state();
    let address = t.pool.address();
    assert!(state.conservation_holds(TOKEN_DECIMALS));
    assert_eq!(
        t.custody.token_balance(address),
        state.token_balance + state.total_token_fee_balance
    );
    assert_eq!(
        t.custody.stablecoin_balance(address),
        state
            .stablecoin_balance
            .safe_add(state.total_stablecoin_fee_balance)
            .unwrap()
    );
}

#[test]
fn test_whitelist_gates_centralized_pool() {
    let mut t = setup(SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique()), 1_000, 1_000);
    let trader = Pubkey::new_unique();
    t.custody.mint(AssetAmount::Token(10 * ONE_TOKEN), &trader).unwrap();

    assert_eq!(
        t.pool
            .swap_token_to_stablecoin(&trader, &trader, ONE_TOKEN, &clock(1, 1), &mut t.custody),
        Err(StablecoinEngineError::AccessDenied.into())
    );

    t.pool.add_to_whitelist(&t.owner, trader).unwrap();
    let receipt = t
        .pool
        .swap_token_to_stablecoin(&trader, &trader, ONE_TOKEN, &clock(1, 1), &mut t.custody)
        .unwrap();
    assert_eq!(receipt.amount_out, wad(1));
    assert_eq!(t.custody.stablecoin_balance(&trader), wad(1));
    assert_custody_matches(&t);
}

#[test]
fn test_daily_limit_scenario() {
    // 1,000,000 deposited, 2% a day, no single-swap cap
    let config = SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique())
        .with_limits(200, 10_000, 10, 150)
        .decentralized();
    let mut t = setup(config, 500_000, 500_000);
    let trader = Pubkey::new_unique();
    t.custody.mint(AssetAmount::Token(50_000 * ONE_TOKEN), &trader).unwrap();
    assert_eq!(t.pool.state().remaining_daily_swap_amount, wad(20_000));

    t.pool
        .swap_token_to_stablecoin(
            &trader,
            &trader,
            20_000 * ONE_TOKEN,
            &clock(100, 10),
            &mut t.custody,
        )
        .unwrap();
    assert_eq!(t.pool.state().remaining_daily_swap_amount, Wad::zero());

    assert_eq!(
        t.pool
            .swap_token_to_stablecoin(&trader, &trader, 1, &clock(200, 20), &mut t.custody),
        Err(StablecoinEngineError::DailyLimitExceeded.into())
    );

    t.pool
        .swap_token_to_stablecoin(
            &trader,
            &trader,
            20_000 * ONE_TOKEN,
            &clock(86_400 + 100, 500),
            &mut t.custody,
        )
        .unwrap();
    assert_eq!(t.custody.stablecoin_balance(&trader), wad(40_000));
    assert_custody_matches(&t);

    println!("✅ Daily limit resets after 24h");
}

#[test]
fn test_single_swap_limit_boundary() {
    // single swap capped at 1% of 1,000,000
    let config = SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique())
        .with_limits(10_000, 100, 10, 150)
        .decentralized();
    let mut t = setup(config, 500_000, 500_000);
    let trader = Pubkey::new_unique();
    t.custody.mint(AssetAmount::Token(30_000 * ONE_TOKEN), &trader).unwrap();

    assert_eq!(
        t.pool.swap_token_to_stablecoin(
            &trader,
            &trader,
            10_000 * ONE_TOKEN + 1,
            &clock(1, 1),
            &mut t.custody
        ),
        Err(StablecoinEngineError::SingleSwapLimitExceeded.into())
    );
    t.pool
        .swap_token_to_stablecoin(
            &trader,
            &trader,
            10_000 * ONE_TOKEN,
            &clock(1, 1),
            &mut t.custody,
        )
        .unwrap();
}

#[test]
fn test_per_user_swap_count() {
    let config = SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique())
        .with_limits(10_000, 10_000, 2, 100)
        .decentralized();
    let mut t = setup(config, 1_000, 1_000);
    let trader = Pubkey::new_unique();
    let other = Pubkey::new_unique();
    t.custody.mint(AssetAmount::Token(10 * ONE_TOKEN), &trader).unwrap();
    t.custody.mint(AssetAmount::Token(10 * ONE_TOKEN), &other).unwrap();

    for _ in 0..2 {
        t.pool
            .swap_token_to_stablecoin(&trader, &trader, ONE_TOKEN, &clock(1, 50), &mut t.custody)
            .unwrap();
    }
    assert_eq!(
        t.pool
            .swap_token_to_stablecoin(&trader, &trader, ONE_TOKEN, &clock(1, 149), &mut t.custody),
        Err(StablecoinEngineError::SwapCountExceeded.into())
    );
    // other users keep their own window
    t.pool
        .swap_token_to_stablecoin(&other, &other, ONE_TOKEN, &clock(1, 149), &mut t.custody)
        .unwrap();
    t.pool
        .swap_token_to_stablecoin(&trader, &trader, ONE_TOKEN, &clock(1, 150), &mut t.custody)
        .unwrap();
}

#[test]
fn test_fees_dust_and_conservation() {
    let fee_in = Wad::from_raw_u128(10_000_000_000_000_000); // 1%
    let fee_out = Wad::from_raw_u128(20_000_000_000_000_000); // 2%
    let config =
        SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique()).with_fees(fee_in, fee_out);
    let mut t = setup(config, 10_000, 10_000);
    let trader = Pubkey::new_unique();
    t.pool.add_to_whitelist(&t.owner, trader).unwrap();
    t.custody.mint(AssetAmount::Token(1_000 * ONE_TOKEN), &trader).unwrap();

    let receipt = t
        .pool
        .swap_token_to_stablecoin(&trader, &trader, 1_000 * ONE_TOKEN, &clock(1, 1), &mut t.custody)
        .unwrap();
    assert_eq!(receipt.fee, wad(10));
    assert_eq!(t.custody.stablecoin_balance(&trader), wad(990));
    assert_custody_matches(&t);

    // 500.0000005 carries half a token unit of dust
    let amount = Wad::from_raw_u128(500_000_000_500_000_000_000);
    t.pool
        .swap_stablecoin_to_token(&trader, &trader, amount, &clock(2, 2), &mut t.custody)
        .unwrap();
    assert_eq!(t.custody.token_balance(&trader), 490 * ONE_TOKEN);

    let state = t.pool.state();
    assert_eq!(state.total_token_fee_balance, 10 * ONE_TOKEN);
    assert_eq!(
        state.total_stablecoin_fee_balance,
        Wad::from_raw_u128(10_000_000_500_000_000_000)
    );
    assert_custody_matches(&t);

    assert_eq!(
        t.pool.swap_stablecoin_to_token(
            &trader,
            &trader,
            Wad::from_raw_u128(999_999_999_999),
            &clock(3, 3),
            &mut t.custody
        ),
        Err(StablecoinEngineError::ZeroAmount.into())
    );
}

#[test]
fn test_liquidity_round_trip() {
    let mut t = setup(SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique()), 1_000, 1_000);
    assert_eq!(t.pool.state().total_value_deposited, wad(2_000));

    t.pool
        .withdraw_token(&t.wrapper, AssetAmount::Token(400 * ONE_TOKEN), &mut t.custody)
        .unwrap();
    t.pool
        .withdraw_token(&t.wrapper, AssetAmount::Stablecoin(wad(100)), &mut t.custody)
        .unwrap();
    assert_eq!(t.pool.state().total_value_deposited, wad(1_500));
    assert_eq!(t.custody.token_balance(&t.wrapper), 400 * ONE_TOKEN);
    assert_eq!(t.custody.stablecoin_balance(&t.wrapper), wad(100));

    assert_eq!(
        t.pool
            .withdraw_token(&t.wrapper, AssetAmount::Token(601 * ONE_TOKEN), &mut t.custody),
        Err(StablecoinEngineError::InsufficientBalance.into())
    );
    let stranger = Pubkey::new_unique();
    assert_eq!(
        t.pool
            .withdraw_token(&stranger, AssetAmount::Token(ONE_TOKEN), &mut t.custody),
        Err(StablecoinEngineError::AccessDenied.into())
    );
    assert_custody_matches(&t);
}

/// Deposits and withdraws `units` of fresh token liquidity and checks the
/// pool's books come back to where they were.
fn deposit_then_withdraw(t: &mut TestPool, units: u64, now: &Clock) -> SwapPoolState {
    let before = t.pool.state();
    t.custody.mint(AssetAmount::Token(units), &t.wrapper).unwrap();
    t.pool
        .deposit_token(&t.wrapper, AssetAmount::Token(units), now, &mut t.custody)
        .unwrap();
    t.pool
        .withdraw_token(&t.wrapper, AssetAmount::Token(units), &mut t.custody)
        .unwrap();

    let after = t.pool.state();
    assert_eq!(after.token_balance, before.token_balance);
    assert_eq!(after.stablecoin_balance, before.stablecoin_balance);
    assert_eq!(after.total_value_deposited, before.total_value_deposited);
    assert_eq!(t.custody.token_balance(&t.wrapper), units);
    assert_custody_matches(t);
    after
}

#[test]
fn test_deposit_withdraw_round_trip_centralized() {
    let mut t = setup(SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique()), 5, 5);
    let before = t.pool.state();

    let after = deposit_then_withdraw(&mut t, 1_234_567, &clock(10, 10));
    assert_eq!(after, before);
}

#[test]
fn test_deposit_withdraw_round_trip_keeps_daily_cap() {
    let config = SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique()).decentralized();
    let mut t = setup(config, 5, 5);
    let cap = t.pool.state().daily_swap_limit(&t.pool.config()).unwrap();
    assert_eq!(t.pool.state().remaining_daily_swap_amount, cap);

    // use part of the day's allowance first
    let trader = Pubkey::new_unique();
    t.custody.mint(AssetAmount::Token(ONE_TOKEN / 2), &trader).unwrap();
    t.pool
        .swap_token_to_stablecoin(&trader, &trader, ONE_TOKEN / 2, &clock(5, 5), &mut t.custody)
        .unwrap();
    let used = t.pool.state();
    assert!(used.remaining_daily_swap_amount < cap);

    let after = deposit_then_withdraw(&mut t, 1_234_567, &clock(10, 10));
    assert_eq!(after.daily_swap_limit(&t.pool.config()).unwrap(), cap);
    assert_eq!(after.remaining_daily_swap_amount, cap);

    println!("✅ Daily allowance capped at {} after liquidity round trip", cap);
}

#[test]
fn test_withdraw_fees() {
    let fee = Wad::from_raw_u128(10_000_000_000_000_000);
    let config = SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique()).with_fees(fee, fee);
    let mut t = setup(config, 1_000, 1_000);
    let trader = Pubkey::new_unique();
    let treasury = Pubkey::new_unique();
    t.pool.add_to_whitelist(&t.owner, trader).unwrap();
    t.custody.mint(AssetAmount::Token(100 * ONE_TOKEN), &trader).unwrap();
    t.pool
        .swap_token_to_stablecoin(&trader, &trader, 100 * ONE_TOKEN, &clock(1, 1), &mut t.custody)
        .unwrap();
    t.pool
        .swap_stablecoin_to_token(&trader, &trader, wad(50), &clock(2, 2), &mut t.custody)
        .unwrap();

    assert_eq!(
        t.pool.withdraw_fees(&trader, &treasury, &mut t.custody),
        Err(StablecoinEngineError::AccessDenied.into())
    );
    let (token_fee, stablecoin_fee) = t
        .pool
        .withdraw_fees(&t.owner, &treasury, &mut t.custody)
        .unwrap();
    assert_eq!(token_fee, ONE_TOKEN / 2);
    assert_eq!(stablecoin_fee, wad(1));
    assert_eq!(t.custody.token_balance(&treasury), token_fee);
    assert_eq!(t.custody.stablecoin_balance(&treasury), stablecoin_fee);

    let state = t.pool.state();
    assert_eq!(state.total_token_fee_balance, 0);
    assert!(state.total_stablecoin_fee_balance.is_zero());
    assert_custody_matches(&t);
}

#[test]
fn test_emergency_withdraw() {
    let mut t = setup(SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique()), 1_000, 1_000);
    let recovery = Pubkey::new_unique();

    assert_eq!(
        t.pool.emergency_withdraw(&t.owner, &recovery, &mut t.custody),
        Err(StablecoinEngineError::NotPaused.into())
    );

    t.pool.pause(&t.owner).unwrap();
    t.pool.emergency_withdraw(&t.owner, &recovery, &mut t.custody).unwrap();

    assert_eq!(t.custody.token_balance(&recovery), 1_000 * ONE_TOKEN);
    assert_eq!(t.custody.stablecoin_balance(&recovery), wad(1_000));
    assert_eq!(
        t.custody.balance_of(Asset::Token, t.pool.address()),
        AssetAmount::Token(0)
    );
    let state = t.pool.state();
    assert_eq!(state.token_balance, 0);
    assert!(state.total_value_deposited.is_zero());

    let trader = Pubkey::new_unique();
    assert_eq!(
        t.pool
            .swap_token_to_stablecoin(&trader, &trader, ONE_TOKEN, &clock(1, 1), &mut t.custody),
        Err(StablecoinEngineError::EnginePaused.into())
    );
}

#[test]
fn test_governor_can_administer() {
    let owner = Pubkey::new_unique();
    let governor = Pubkey::new_unique();
    let pool = RateLimitedSwapPool::new(
        Pubkey::new_unique(),
        SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique()),
        Box::new(RoleRegistry::new(owner).with_role(governor, Role::Governor)),
    )
    .unwrap();

    pool.set_decentralized_state(&governor, true, &clock(5, 5)).unwrap();
    assert!(pool.config().is_decentralized_state);
    assert_eq!(pool.state().last_update, 5);
}

/// Custody that swaps back into the pool in the middle of a transfer
struct ReentrantCustody {
    inner: InMemoryCustody,
    pool: Rc<RateLimitedSwapPool>,
    attacker: Pubkey,
}

impl TokenCustody for ReentrantCustody {
    fn transfer(
        &mut self,
        amount: AssetAmount,
        from: &Pubkey,
        to: &Pubkey,
    ) -> Result<(), ProgramError> {
        let pool = Rc::clone(&self.pool);
        let attacker = self.attacker;
        pool.swap_token_to_stablecoin(
            &attacker,
            &attacker,
            ONE_TOKEN,
            &clock(1, 1),
            &mut self.inner,
        )?;
        self.inner.transfer(amount, from, to)
    }

    fn balance_of(&self, asset: Asset, account: &Pubkey) -> AssetAmount {
        self.inner.balance_of(asset, account)
    }
}

#[test]
fn test_reentrant_custody_is_blocked() {
    let t = setup(SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique()), 1_000, 1_000);
    let attacker = Pubkey::new_unique();
    t.pool.add_to_whitelist(&t.owner, attacker).unwrap();

    let mut inner = t.custody;
    inner.mint(AssetAmount::Token(10 * ONE_TOKEN), &attacker).unwrap();
    let pool = Rc::new(t.pool);
    let before: SwapPoolState = pool.state();

    let mut custody = ReentrantCustody {
        inner,
        pool: Rc::clone(&pool),
        attacker,
    };
    assert_eq!(
        pool.swap_token_to_stablecoin(&attacker, &attacker, ONE_TOKEN, &clock(1, 1), &mut custody),
        Err(StablecoinEngineError::ReentrancyBlocked.into())
    );
    assert_eq!(pool.state(), before);
    assert_eq!(custody.inner.token_balance(&attacker), 10 * ONE_TOKEN);

    println!("🔒 Reentrant swap rejected, pool state untouched");
}

/// Custody that flips the pool into decentralized mode mid-transfer
struct AdminReentrantCustody {
    inner: InMemoryCustody,
    pool: Rc<RateLimitedSwapPool>,
    admin: Pubkey,
}

impl TokenCustody for AdminReentrantCustody {
    fn transfer(
        &mut self,
        amount: AssetAmount,
        from: &Pubkey,
        to: &Pubkey,
    ) -> Result<(), ProgramError> {
        let pool = Rc::clone(&self.pool);
        pool.set_decentralized_state(&self.admin, true, &clock(7, 7))?;
        self.inner.transfer(amount, from, to)
    }

    fn balance_of(&self, asset: Asset, account: &Pubkey) -> AssetAmount {
        self.inner.balance_of(asset, account)
    }
}

#[test]
fn test_admin_reentry_during_transfer_is_blocked() {
    let t = setup(SwapPoolConfig::new(TOKEN_DECIMALS, Pubkey::new_unique()), 5, 5);
    let mut inner = t.custody;
    inner.mint(AssetAmount::Token(ONE_TOKEN), &t.wrapper).unwrap();
    let pool = Rc::new(t.pool);
    let before = pool.state();

    let mut custody = AdminReentrantCustody {
        inner,
        pool: Rc::clone(&pool),
        admin: t.owner,
    };
    assert_eq!(
        pool.deposit_token(
            &t.wrapper,
            AssetAmount::Token(ONE_TOKEN),
            &clock(7, 7),
            &mut custody
        ),
        Err(StablecoinEngineError::ReentrancyBlocked.into())
    );
    assert!(!pool.config().is_decentralized_state);
    assert_eq!(pool.state(), before);

    // outside a transfer the same call goes through
    pool.set_decentralized_state(&t.owner, true, &clock(8, 8)).unwrap();
    assert_eq!(pool.state().last_update, 8);
}
