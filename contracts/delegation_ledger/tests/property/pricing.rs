//! Share pricing properties of a single pool.
//!
//! The pool is driven directly with a generated registry address and mocked
//! auths, so only the offset pricing is under test.

use proptest::prelude::*;
use soroban_sdk::{testutils::Address as _, token::StellarAssetClient, Address, Env};
use strategy_pool::{StrategyPoolContract, StrategyPoolContractClient};

const QUOTE_SHARES: i128 = 1_000_000;

struct Pool {
    env: Env,
    client: StrategyPoolContractClient<'static>,
    token: Address,
}

impl Pool {
    fn new() -> Self {
        let env = Env::default();
        env.mock_all_auths();
        let token = env
            .register_stellar_asset_contract_v2(Address::generate(&env))
            .address();
        let id = env.register(StrategyPoolContract, ());
        let client = StrategyPoolContractClient::new(&env, &id);
        client.initialize(
            &Address::generate(&env),
            &Address::generate(&env),
            &token,
            &(i128::MAX - 1),
            &i128::MAX,
        );
        Pool { env, client, token }
    }

    fn mint_to_pool(&self, amount: i128) {
        StellarAssetClient::new(&self.env, &self.token).mint(&self.client.address, &amount);
    }

    fn deposit(&self, amount: i128) -> Option<i128> {
        self.mint_to_pool(amount);
        match self.client.try_deposit(&self.token, &amount) {
            Ok(Ok(shares)) => Some(shares),
            _ => None,
        }
    }

    fn price(&self) -> i128 {
        self.client.shares_to_underlying_view(&QUOTE_SHARES)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The first deposit into an empty pool mints shares at par.
    #[test]
    fn prop_first_deposit_mints_at_par(amount in 1i128..1_000_000_000_000) {
        let pool = Pool::new();
        prop_assert_eq!(pool.deposit(amount), Some(amount));
        prop_assert_eq!(pool.client.total_shares(), amount);
    }

    /// Depositing and immediately withdrawing never returns more than was put
    /// in, whatever yield the pool accrued beforehand.
    #[test]
    fn prop_round_trip_never_profits(
        seed in 1i128..1_000_000_000,
        accrued in 0i128..1_000_000_000,
        amount in 1i128..1_000_000_000,
    ) {
        let pool = Pool::new();
        pool.deposit(seed);
        if accrued > 0 {
            pool.mint_to_pool(accrued);
        }

        if let Some(shares) = pool.deposit(amount) {
            let recipient = Address::generate(&pool.env);
            let out = pool.client.withdraw(&recipient, &pool.token, &shares);
            prop_assert!(out <= amount, "paid {} for a deposit of {}", out, amount);
        }
    }

    /// Neither deposits nor withdrawals lower the value of a share.
    #[test]
    fn prop_share_price_never_drops(
        seed in 1i128..1_000_000_000,
        accrued in 0i128..1_000_000_000,
        amount in 1i128..1_000_000_000,
        burn_bps in 0i128..=10_000,
    ) {
        let pool = Pool::new();
        pool.deposit(seed);
        if accrued > 0 {
            pool.mint_to_pool(accrued);
        }

        let before_deposit = pool.price();
        pool.deposit(amount);
        let after_deposit = pool.price();
        prop_assert!(after_deposit >= before_deposit);

        let burn = pool.client.total_shares() * burn_bps / 10_000;
        pool.client.withdraw(&Address::generate(&pool.env), &pool.token, &burn);
        prop_assert!(pool.price() >= after_deposit);
    }

    /// Total shares always equal minted minus burned.
    #[test]
    fn prop_total_shares_track_mints_and_burns(
        deposits in prop::collection::vec(1i128..1_000_000, 1..8),
        burn_bps in 0i128..=10_000,
    ) {
        let pool = Pool::new();
        let minted: i128 = deposits.iter().filter_map(|amount| pool.deposit(*amount)).sum();
        prop_assert_eq!(pool.client.total_shares(), minted);

        let burn = minted * burn_bps / 10_000;
        pool.client.withdraw(&Address::generate(&pool.env), &pool.token, &burn);
        prop_assert_eq!(pool.client.total_shares(), minted - burn);
    }
}
