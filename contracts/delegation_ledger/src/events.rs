#![allow(deprecated)] // events().publish migration tracked separately

use soroban_sdk::{symbol_short, Address, BytesN, Env, String};

use crate::{OperatorDetails, Withdrawal};

// ── Event payloads ──────────────────────────────────────────────────────────

/// Fired once when the ledger is bootstrapped.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LedgerInitializedEvent {
    pub owner: Address,
    pub registry: Address,
    pub min_withdrawal_delay_blocks: u32,
    pub timestamp: u64,
}

/// Fired when an account registers as an operator.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperatorRegisteredEvent {
    pub operator: Address,
    pub details: OperatorDetails,
    pub timestamp: u64,
}

/// Fired on registration and on every later details change.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperatorDetailsModifiedEvent {
    pub operator: Address,
    pub previous_notice_blocks: u32,
    pub details: OperatorDetails,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperatorMetadataUriEvent {
    pub operator: Address,
    pub metadata_uri: String,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakerDelegatedEvent {
    pub staker: Address,
    pub operator: Address,
    pub timestamp: u64,
}

/// `forced` is set when the operator or its approver ended the delegation.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakerUndelegatedEvent {
    pub staker: Address,
    pub operator: Address,
    pub caller: Address,
    pub forced: bool,
    pub timestamp: u64,
}

/// Fired whenever an operator's aggregate in a pool moves.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperatorSharesChangedEvent {
    pub operator: Address,
    pub staker: Address,
    pub pool: Address,
    pub shares_before: i128,
    pub shares_after: i128,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawalQueuedEvent {
    pub root: BytesN<32>,
    pub withdrawal: Withdrawal,
    pub timestamp: u64,
}

/// `amount_out` is the token payout, or the re-credited shares when the
/// withdrawer kept the position.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawalCompletedEvent {
    pub root: BytesN<32>,
    pub withdrawer: Address,
    pub receive_as_tokens: bool,
    pub amount_out: i128,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MinWithdrawalDelaySetEvent {
    pub previous_blocks: u32,
    pub new_blocks: u32,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolWithdrawalDelaySetEvent {
    pub pool: Address,
    pub previous_blocks: u32,
    pub new_blocks: u32,
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

pub fn publish_initialized(
    env: &Env,
    owner: Address,
    registry: Address,
    min_withdrawal_delay_blocks: u32,
) {
    env.events().publish(
        (symbol_short!("INIT"),),
        LedgerInitializedEvent {
            owner,
            registry,
            min_withdrawal_delay_blocks,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_operator_registered(env: &Env, operator: Address, details: OperatorDetails) {
    env.events().publish(
        (symbol_short!("OP_REG"), operator.clone()),
        OperatorRegisteredEvent {
            operator,
            details,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_operator_details_modified(
    env: &Env,
    operator: Address,
    previous_notice_blocks: u32,
    details: OperatorDetails,
) {
    env.events().publish(
        (symbol_short!("OP_DTLS"), operator.clone()),
        OperatorDetailsModifiedEvent {
            operator,
            previous_notice_blocks,
            details,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_operator_metadata_uri(env: &Env, operator: Address, metadata_uri: String) {
    env.events().publish(
        (symbol_short!("OP_META"), operator.clone()),
        OperatorMetadataUriEvent {
            operator,
            metadata_uri,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_staker_delegated(env: &Env, staker: Address, operator: Address) {
    env.events().publish(
        (symbol_short!("DELEGATE"), staker.clone()),
        StakerDelegatedEvent {
            staker,
            operator,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_staker_undelegated(
    env: &Env,
    staker: Address,
    operator: Address,
    caller: Address,
) {
    let forced = caller != staker;
    env.events().publish(
        (symbol_short!("UNDELEG"), staker.clone()),
        StakerUndelegatedEvent {
            staker,
            operator,
            caller,
            forced,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_operator_shares_changed(
    env: &Env,
    operator: Address,
    staker: Address,
    pool: Address,
    shares_before: i128,
    shares_after: i128,
) {
    env.events().publish(
        (symbol_short!("OP_SHR"), operator.clone()),
        OperatorSharesChangedEvent {
            operator,
            staker,
            pool,
            shares_before,
            shares_after,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_withdrawal_queued(env: &Env, root: BytesN<32>, withdrawal: Withdrawal) {
    env.events().publish(
        (symbol_short!("WD_QUEUE"), withdrawal.staker.clone()),
        WithdrawalQueuedEvent {
            root,
            withdrawal,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_withdrawal_completed(
    env: &Env,
    root: BytesN<32>,
    withdrawer: Address,
    receive_as_tokens: bool,
    amount_out: i128,
) {
    env.events().publish(
        (symbol_short!("WD_DONE"), withdrawer.clone()),
        WithdrawalCompletedEvent {
            root,
            withdrawer,
            receive_as_tokens,
            amount_out,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_min_withdrawal_delay_set(env: &Env, previous_blocks: u32, new_blocks: u32) {
    env.events().publish(
        (symbol_short!("MIN_DLY"),),
        MinWithdrawalDelaySetEvent {
            previous_blocks,
            new_blocks,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_pool_withdrawal_delay_set(
    env: &Env,
    pool: Address,
    previous_blocks: u32,
    new_blocks: u32,
) {
    env.events().publish(
        (symbol_short!("POOL_DLY"), pool.clone()),
        PoolWithdrawalDelaySetEvent {
            pool,
            previous_blocks,
            new_blocks,
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
