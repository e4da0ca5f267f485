#![allow(dead_code)]

use delegation_ledger::{
    DelegationLedgerContract, DelegationLedgerContractClient, OperatorDetails, Withdrawal,
};
use ed25519_dalek::{Signer as _, SigningKey};
use soroban_sdk::{
    contract, contractimpl, symbol_short,
    testutils::{Address as _, Ledger as _},
    token::StellarAssetClient,
    vec, Address, Bytes, BytesN, Env, String,
};
use strategy_pool::{StrategyPoolContract, StrategyPoolContractClient};
use strategy_registry::{StrategyRegistryContract, StrategyRegistryContractClient};

// ── Contract-validator wallet ────────────────────────────────────────────────

/// Smart wallet that accepts any signature over a digest it pre-approved.
#[contract]
pub struct ApprovingWallet;

#[contractimpl]
impl ApprovingWallet {
    pub fn approve(env: Env, digest: BytesN<32>) {
        env.storage().persistent().set(&(symbol_short!("OK"), digest), &true);
    }

    pub fn is_valid_signature(env: Env, digest: BytesN<32>, _signature: Bytes) -> bool {
        env.storage()
            .persistent()
            .get(&(symbol_short!("OK"), digest))
            .unwrap_or(false)
    }
}

// ── Deployment ────────────────────────────────────────────────────────────────

pub struct TestContext {
    pub env: Env,
    pub ledger: DelegationLedgerContractClient<'static>,
    pub registry: StrategyRegistryContractClient<'static>,
    pub owner: Address,
    pub token: Address,
    pub pool: Address,
}

/// Deploys token, ledger, registry and one whitelisted pool, wired together,
/// with every auth mocked.
pub fn setup_with_delay(min_withdrawal_delay_blocks: u32) -> TestContext {
    let env = Env::default();
    env.mock_all_auths();

    let token = env
        .register_stellar_asset_contract_v2(Address::generate(&env))
        .address();
    let ledger_id = env.register(DelegationLedgerContract, ());
    let registry_id = env.register(StrategyRegistryContract, ());

    let owner = Address::generate(&env);
    let ledger = DelegationLedgerContractClient::new(&env, &ledger_id);
    let registry = StrategyRegistryContractClient::new(&env, &registry_id);
    ledger.initialize(&owner, &registry_id, &min_withdrawal_delay_blocks);
    registry.initialize(&owner, &ledger_id);

    let mut ctx = TestContext {
        pool: registry_id.clone(),
        env,
        ledger,
        registry,
        owner,
        token,
    };
    ctx.pool = add_pool(&ctx, false);
    ctx
}

pub fn setup() -> TestContext {
    setup_with_delay(10)
}

/// Deploys another pool over the shared token and whitelists it.
pub fn add_pool(ctx: &TestContext, third_party_forbidden: bool) -> Address {
    let pool = ctx.env.register(StrategyPoolContract, ());
    StrategyPoolContractClient::new(&ctx.env, &pool).initialize(
        &ctx.owner,
        &ctx.registry.address,
        &ctx.token,
        &1_000_000_000_000,
        &1_000_000_000_000_000,
    );
    ctx.registry.add_pools(
        &ctx.owner,
        &vec![&ctx.env, pool.clone()],
        &vec![&ctx.env, third_party_forbidden],
    );
    pool
}

pub fn pool_client(ctx: &TestContext, pool: &Address) -> StrategyPoolContractClient<'static> {
    StrategyPoolContractClient::new(&ctx.env, pool)
}

// ── Actors ────────────────────────────────────────────────────────────────────

pub fn register_operator(
    ctx: &TestContext,
    notice_blocks: u32,
    approver: Option<Address>,
) -> Address {
    let operator = Address::generate(&ctx.env);
    ctx.ledger.register_as_operator(
        &operator,
        &OperatorDetails {
            earnings_receiver: operator.clone(),
            delegation_approver: approver,
            min_undelegation_notice_blocks: notice_blocks,
        },
        &String::from_str(&ctx.env, "ipfs://operator"),
    );
    operator
}

/// Mints `amount` to `staker` and deposits it into `pool`. Returns the shares.
pub fn fund_and_deposit(ctx: &TestContext, staker: &Address, pool: &Address, amount: i128) -> i128 {
    StellarAssetClient::new(&ctx.env, &ctx.token).mint(staker, &amount);
    ctx.registry
        .deposit_into_pool(staker, pool, &ctx.token, &amount)
}

pub fn delegated_staker(ctx: &TestContext, operator: &Address, amount: i128) -> Address {
    let staker = Address::generate(&ctx.env);
    fund_and_deposit(ctx, &staker, &ctx.pool, amount);
    ctx.ledger.delegate(&staker, operator, &None, &zero_salt(&ctx.env));
    staker
}

// ── Chain state ───────────────────────────────────────────────────────────────

pub fn current_block(ctx: &TestContext) -> u32 {
    ctx.env.ledger().sequence()
}

pub fn advance_blocks(ctx: &TestContext, blocks: u32) {
    ctx.env.ledger().with_mut(|li| {
        li.sequence_number += blocks;
    });
}

pub fn set_timestamp(ctx: &TestContext, timestamp: u64) {
    ctx.env.ledger().set_timestamp(timestamp);
}

/// Rebuilds the withdrawal a queueing call recorded, so it can be completed.
#[allow(clippy::too_many_arguments)]
pub fn withdrawal(
    staker: &Address,
    operator: &Address,
    withdrawer: &Address,
    nonce: u64,
    start_block: u32,
    pool: &Address,
    shares: i128,
) -> Withdrawal {
    Withdrawal {
        staker: staker.clone(),
        delegated_to: operator.clone(),
        withdrawer: withdrawer.clone(),
        nonce,
        start_block,
        pool: pool.clone(),
        shares,
    }
}

// ── Signatures ────────────────────────────────────────────────────────────────

pub fn zero_salt(env: &Env) -> BytesN<32> {
    BytesN::from_array(env, &[0u8; 32])
}

pub fn salt(env: &Env, byte: u8) -> BytesN<32> {
    BytesN::from_array(env, &[byte; 32])
}

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn public_key(env: &Env, key: &SigningKey) -> BytesN<32> {
    BytesN::from_array(env, &key.verifying_key().to_bytes())
}

pub fn sign(env: &Env, key: &SigningKey, digest: &BytesN<32>) -> Bytes {
    Bytes::from_array(env, &key.sign(&digest.to_array()).to_bytes())
}

/// Generates an account and binds `key` to it on the ledger.
pub fn key_holder(ctx: &TestContext, key: &SigningKey) -> Address {
    let account = Address::generate(&ctx.env);
    ctx.ledger
        .set_signing_key(&account, &public_key(&ctx.env, key));
    account
}
