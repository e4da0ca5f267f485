//! Random action sequences across the registry, the ledger and two pools.
//!
//! Invariants checked after every step:
//! - Conservation: ledger balances plus queued shares equal each pool's `total_shares`
//! - Aggregates: an operator's shares equal the sum of its delegators' balances
//! - Pool lists: a pool is listed for a staker iff that balance is nonzero

use delegation_ledger::{QueuedWithdrawalParams, Withdrawal};
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use soroban_sdk::{testutils::Address as _, token::StellarAssetClient, Address};

use crate::common::*;

const STAKERS: usize = 3;
const OPERATORS: usize = 2;
const POOLS: usize = 2;

#[derive(Debug, Clone, Arbitrary)]
enum Action {
    Deposit {
        #[proptest(strategy = "0..STAKERS + OPERATORS")]
        account: usize,
        #[proptest(strategy = "0..POOLS")]
        pool: usize,
        #[proptest(strategy = "1i128..5_000")]
        amount: i128,
    },
    Delegate {
        #[proptest(strategy = "0..STAKERS")]
        staker: usize,
        #[proptest(strategy = "0..OPERATORS")]
        operator: usize,
    },
    Undelegate {
        #[proptest(strategy = "0..STAKERS")]
        staker: usize,
    },
    Queue {
        #[proptest(strategy = "0..STAKERS")]
        staker: usize,
        #[proptest(strategy = "0..POOLS")]
        pool: usize,
        #[proptest(strategy = "1i128..3_000")]
        shares: i128,
    },
    Complete {
        #[proptest(strategy = "0usize..8")]
        index: usize,
        receive_as_tokens: bool,
    },
    Yield {
        #[proptest(strategy = "0..POOLS")]
        pool: usize,
        #[proptest(strategy = "1i128..2_000")]
        amount: i128,
    },
}

// ── Model ─────────────────────────────────────────────────────────────────────

struct World {
    ctx: TestContext,
    pools: Vec<Address>,
    stakers: Vec<Address>,
    operators: Vec<Address>,
    guardian: Address,
    queued: Vec<Withdrawal>,
}

impl World {
    fn new() -> Self {
        let ctx = setup();
        let pools = [ctx.pool.clone(), add_pool(&ctx, false)].to_vec();
        let operators = (0..OPERATORS)
            .map(|_| register_operator(&ctx, 0, None))
            .collect();
        let stakers = (0..STAKERS).map(|_| Address::generate(&ctx.env)).collect();
        let guardian = Address::generate(&ctx.env);
        World {
            ctx,
            pools,
            stakers,
            operators,
            guardian,
            queued: Vec::new(),
        }
    }

    /// Every account that can ever hold a balance.
    fn holders(&self) -> Vec<Address> {
        let mut all = self.stakers.clone();
        all.extend(self.operators.iter().cloned());
        all.push(self.guardian.clone());
        all
    }

    fn apply(&mut self, action: Action) {
        let ctx = &self.ctx;
        match action {
            Action::Deposit {
                account,
                pool,
                amount,
            } => {
                let account = if account < STAKERS {
                    self.stakers[account].clone()
                } else {
                    self.operators[account - STAKERS].clone()
                };
                StellarAssetClient::new(&ctx.env, &ctx.token).mint(&account, &amount);
                let _ = ctx.registry.try_deposit_into_pool(
                    &account,
                    &self.pools[pool],
                    &ctx.token,
                    &amount,
                );
            }
            Action::Delegate { staker, operator } => {
                let _ = ctx.ledger.try_delegate(
                    &self.stakers[staker],
                    &self.operators[operator],
                    &None,
                    &zero_salt(&ctx.env),
                );
            }
            Action::Undelegate { staker } => {
                let staker = self.stakers[staker].clone();
                let deposits = ctx.registry.get_deposits(&staker);
                let operator = ctx.ledger.delegated_to(&staker);
                let first_nonce = ctx.ledger.cumulative_withdrawals_queued(&staker);
                let block = current_block(ctx);

                if let (Ok(Ok(_)), Some(operator)) =
                    (ctx.ledger.try_undelegate(&staker, &staker), operator)
                {
                    for (i, (pool, shares)) in
                        deposits.pools.iter().zip(deposits.shares.iter()).enumerate()
                    {
                        self.queued.push(withdrawal(
                            &staker,
                            &operator,
                            &staker,
                            first_nonce + i as u64,
                            block,
                            &pool,
                            shares,
                        ));
                    }
                }
            }
            Action::Queue {
                staker,
                pool,
                shares,
            } => {
                let staker = self.stakers[staker].clone();
                let pool = self.pools[pool].clone();
                let operator = ctx.ledger.delegated_to(&staker);
                let nonce = ctx.ledger.cumulative_withdrawals_queued(&staker);
                let block = current_block(ctx);
                let request = QueuedWithdrawalParams {
                    staker: staker.clone(),
                    pools: soroban_sdk::vec![&ctx.env, pool.clone()],
                    shares: soroban_sdk::vec![&ctx.env, shares],
                };

                if let (Ok(Ok(_)), Some(operator)) = (
                    ctx.ledger.try_queue_withdrawals(
                        &self.guardian,
                        &soroban_sdk::vec![&ctx.env, request],
                    ),
                    operator,
                ) {
                    self.queued.push(withdrawal(
                        &staker,
                        &operator,
                        &self.guardian,
                        nonce,
                        block,
                        &pool,
                        shares,
                    ));
                }
            }
            Action::Complete {
                index,
                receive_as_tokens,
            } => {
                if self.queued.is_empty() {
                    return;
                }
                let index = index % self.queued.len();
                let entry = self.queued[index].clone();
                advance_blocks(ctx, 10);
                let result = ctx.ledger.try_complete_queued_withdrawal(
                    &entry.withdrawer,
                    &entry,
                    &ctx.token,
                    &receive_as_tokens,
                );
                if let Ok(Ok(())) = result {
                    self.queued.remove(index);
                }
            }
            Action::Yield { pool, amount } => {
                StellarAssetClient::new(&ctx.env, &ctx.token).mint(&self.pools[pool], &amount);
            }
        }
    }

    fn check(&self) -> Result<(), TestCaseError> {
        let ctx = &self.ctx;
        let holders = self.holders();

        for pool in &self.pools {
            let ledger_total: i128 = holders
                .iter()
                .map(|holder| ctx.registry.staker_shares(holder, pool))
                .sum();
            let queued_total: i128 = self
                .queued
                .iter()
                .filter(|entry| entry.pool == *pool)
                .map(|entry| entry.shares)
                .sum();
            prop_assert_eq!(
                ledger_total + queued_total,
                pool_client(ctx, pool).total_shares()
            );

            for operator in &self.operators {
                let delegated: i128 = holders
                    .iter()
                    .filter(|holder| ctx.ledger.delegated_to(holder) == Some(operator.clone()))
                    .map(|holder| ctx.registry.staker_shares(holder, pool))
                    .sum();
                prop_assert_eq!(ctx.ledger.operator_shares(operator, pool), delegated);
            }
        }

        for holder in &holders {
            let list = ctx.registry.staker_pool_list(holder);
            let mut nonzero = 0u32;
            for pool in &self.pools {
                let shares = ctx.registry.staker_shares(holder, pool);
                let listed = list.iter().any(|listed| listed == *pool);
                prop_assert_eq!(listed, shares > 0);
                if shares > 0 {
                    nonzero += 1;
                }
            }
            prop_assert_eq!(list.len(), nonzero);
        }
        Ok(())
    }
}

// ── proptest! blocks ──────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Conservation, aggregate and pool-list invariants hold after every step
    /// of any action sequence.
    #[test]
    fn prop_accounting_invariants_hold(actions in prop::collection::vec(any::<Action>(), 1..40)) {
        let mut world = World::new();
        world.check()?;
        for action in actions {
            world.apply(action);
            world.check()?;
        }
    }

    /// Completing any queued withdrawal a second time always fails.
    #[test]
    fn prop_completion_is_single_use(amount in 1i128..10_000, as_tokens in any::<bool>()) {
        let world = World::new();
        let ctx = &world.ctx;
        let staker = world.stakers[0].clone();
        let operator = world.operators[0].clone();
        fund_and_deposit(ctx, &staker, &ctx.pool, amount);
        ctx.ledger.delegate(&staker, &operator, &None, &zero_salt(&ctx.env));

        let block = current_block(ctx);
        ctx.ledger.undelegate(&staker, &staker);
        let entry = withdrawal(&staker, &operator, &staker, 0, block, &ctx.pool, amount);
        advance_blocks(ctx, 10);

        ctx.ledger.complete_queued_withdrawal(&staker, &entry, &ctx.token, &as_tokens);
        let second = ctx.ledger.try_complete_queued_withdrawal(&staker, &entry, &ctx.token, &as_tokens);
        prop_assert!(matches!(
            second,
            Err(Ok(::common::LedgerError::UnknownOrAlreadyCompleted))
        ));
    }
}
