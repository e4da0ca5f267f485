#![allow(deprecated)] // events().publish migration tracked separately

use soroban_sdk::{symbol_short, Address, BytesN, Env};

// ── Event payloads ──────────────────────────────────────────────────────────

/// Fired once when the registry is bootstrapped.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegistryInitializedEvent {
    pub owner: Address,
    pub delegation: Address,
    pub timestamp: u64,
}

/// Fired when a pool joins the whitelist.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolWhitelistedEvent {
    pub pool: Address,
    pub third_party_forbidden: bool,
    pub timestamp: u64,
}

/// Fired when a pool leaves the whitelist.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolRemovedEvent {
    pub pool: Address,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ThirdPartyFlagSetEvent {
    pub pool: Address,
    pub forbidden: bool,
    pub timestamp: u64,
}

/// Fired for every deposit. `payer` differs from `staker` only for
/// signature-authorized deposits.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositEvent {
    pub staker: Address,
    pub payer: Address,
    pub pool: Address,
    pub token: Address,
    pub amount: i128,
    pub shares: i128,
    pub timestamp: u64,
}

/// Fired whenever a staker's balance in a pool moves.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SharesChangedEvent {
    pub staker: Address,
    pub pool: Address,
    pub shares_before: i128,
    pub shares_after: i128,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningKeySetEvent {
    pub account: Address,
    pub public_key: Option<BytesN<32>>,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PauseStatusEvent {
    pub caller: Address,
    pub previous_status: u32,
    pub new_status: u32,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OwnerTransferEvent {
    pub previous_owner: Address,
    pub new_owner: Address,
    pub timestamp: u64,
}

// ── Publishers ──────────────────────────────────────────────────────────────

pub fn publish_initialized(env: &Env, owner: Address, delegation: Address) {
    env.events().publish(
        (symbol_short!("INIT"),),
        RegistryInitializedEvent {
            owner,
            delegation,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_pool_whitelisted(env: &Env, pool: Address, third_party_forbidden: bool) {
    env.events().publish(
        (symbol_short!("POOL_ADD"), pool.clone()),
        PoolWhitelistedEvent {
            pool,
            third_party_forbidden,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_pool_removed(env: &Env, pool: Address) {
    env.events().publish(
        (symbol_short!("POOL_RM"), pool.clone()),
        PoolRemovedEvent {
            pool,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_third_party_flag_set(env: &Env, pool: Address, forbidden: bool) {
    env.events().publish(
        (symbol_short!("TP_FLAG"), pool.clone()),
        ThirdPartyFlagSetEvent {
            pool,
            forbidden,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_deposit(
    env: &Env,
    staker: Address,
    payer: Address,
    pool: Address,
    token: Address,
    amount: i128,
    shares: i128,
) {
    env.events().publish(
        (symbol_short!("DEPOSIT"), staker.clone()),
        DepositEvent {
            staker,
            payer,
            pool,
            token,
            amount,
            shares,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_shares_changed(
    env: &Env,
    staker: Address,
    pool: Address,
    shares_before: i128,
    shares_after: i128,
) {
    env.events().publish(
        (symbol_short!("SHARES"), staker.clone()),
        SharesChangedEvent {
            staker,
            pool,
            shares_before,
            shares_after,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_signing_key_set(env: &Env, account: Address, public_key: Option<BytesN<32>>) {
    env.events().publish(
        (symbol_short!("SIG_KEY"), account.clone()),
        SigningKeySetEvent {
            account,
            public_key,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_pause_status(env: &Env, caller: Address, previous_status: u32, new_status: u32) {
    env.events().publish(
        (symbol_short!("PAUSE"),),
        PauseStatusEvent {
            caller,
            previous_status,
            new_status,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_owner_transferred(env: &Env, previous_owner: Address, new_owner: Address) {
    env.events().publish(
        (symbol_short!("OWN_XFER"), new_owner.clone()),
        OwnerTransferEvent {
            previous_owner,
            new_owner,
            timestamp: env.ledger().timestamp(),
        },
    );
}
