#![allow(deprecated)] // events().publish migration tracked separately

use soroban_sdk::{symbol_short, Address, Env};

// ── Event payloads ──────────────────────────────────────────────────────────

/// Fired once when the pool is bootstrapped.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolInitializedEvent {
    pub owner: Address,
    pub registry: Address,
    pub token: Address,
    pub max_per_deposit: i128,
    pub max_total_deposit: i128,
    pub timestamp: u64,
}

/// Fired when the registry mints shares against freshly deposited assets.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SharesMintedEvent {
    pub amount: i128,
    pub shares: i128,
    pub total_shares_before: i128,
    pub total_shares_after: i128,
    pub timestamp: u64,
}

/// Fired when shares are burned and the underlying asset released.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SharesBurnedEvent {
    pub recipient: Address,
    pub shares: i128,
    pub amount_out: i128,
    pub total_shares_before: i128,
    pub total_shares_after: i128,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositLimitsSetEvent {
    pub previous_max_per_deposit: i128,
    pub new_max_per_deposit: i128,
    pub previous_max_total_deposit: i128,
    pub new_max_total_deposit: i128,
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

pub fn publish_initialized(
    env: &Env,
    owner: Address,
    registry: Address,
    token: Address,
    max_per_deposit: i128,
    max_total_deposit: i128,
) {
    env.events().publish(
        (symbol_short!("INIT"),),
        PoolInitializedEvent {
            owner,
            registry,
            token,
            max_per_deposit,
            max_total_deposit,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_shares_minted(
    env: &Env,
    amount: i128,
    shares: i128,
    total_shares_before: i128,
    total_shares_after: i128,
) {
    env.events().publish(
        (symbol_short!("MINTED"),),
        SharesMintedEvent {
            amount,
            shares,
            total_shares_before,
            total_shares_after,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_shares_burned(
    env: &Env,
    recipient: Address,
    shares: i128,
    amount_out: i128,
    total_shares_before: i128,
    total_shares_after: i128,
) {
    env.events().publish(
        (symbol_short!("BURNED"), recipient.clone()),
        SharesBurnedEvent {
            recipient,
            shares,
            amount_out,
            total_shares_before,
            total_shares_after,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_deposit_limits_set(
    env: &Env,
    previous_max_per_deposit: i128,
    new_max_per_deposit: i128,
    previous_max_total_deposit: i128,
    new_max_total_deposit: i128,
) {
    env.events().publish(
        (symbol_short!("LIMITS"),),
        DepositLimitsSetEvent {
            previous_max_per_deposit,
            new_max_per_deposit,
            previous_max_total_deposit,
            new_max_total_deposit,
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
