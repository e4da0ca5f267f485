//! Capability traits for cross-contract calls.
//!
//! The pool, registry and delegation ledger never link against each other;
//! each holds the address of its collaborator (set at `initialize`) and calls
//! it through one of the clients generated here. Only the entry points a
//! collaborator actually needs are declared.

use soroban_sdk::{contractclient, contracttype, Address, Bytes, BytesN, Env, Vec};

use crate::LedgerError;

/// A staker's full position: `shares[i]` is held in `pools[i]`, in the order
/// of the staker's pool list.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deposits {
    pub pools: Vec<Address>,
    pub shares: Vec<i128>,
}

/// Registry → pool.
#[contractclient(name = "PoolClient")]
pub trait PoolInterface {
    fn deposit(env: Env, token: Address, amount: i128) -> Result<i128, LedgerError>;
    fn withdraw(
        env: Env,
        recipient: Address,
        token: Address,
        shares: i128,
    ) -> Result<i128, LedgerError>;
    fn total_shares(env: Env) -> i128;
}

/// Ledger → registry, plus the read the pool uses for per-staker views.
#[contractclient(name = "RegistryClient")]
pub trait RegistryInterface {
    fn add_shares(env: Env, staker: Address, pool: Address, shares: i128)
        -> Result<(), LedgerError>;
    fn remove_shares(
        env: Env,
        staker: Address,
        pool: Address,
        shares: i128,
    ) -> Result<bool, LedgerError>;
    fn withdraw_shares_as_tokens(
        env: Env,
        recipient: Address,
        pool: Address,
        shares: i128,
        token: Address,
    ) -> Result<i128, LedgerError>;
    fn get_deposits(env: Env, staker: Address) -> Deposits;
    fn staker_shares(env: Env, staker: Address, pool: Address) -> i128;
    fn third_party_forbidden(env: Env, pool: Address) -> bool;
}

/// Registry → ledger.
#[contractclient(name = "DelegationClient")]
pub trait DelegationInterface {
    fn increase_delegated_shares(
        env: Env,
        staker: Address,
        pool: Address,
        shares: i128,
    ) -> Result<(), LedgerError>;
    fn decrease_delegated_shares(
        env: Env,
        staker: Address,
        pool: Address,
        shares: i128,
    ) -> Result<(), LedgerError>;
    fn delegated_to(env: Env, staker: Address) -> Option<Address>;
}

/// Implemented by smart-contract signers (wallets, multisigs) that approve
/// digests themselves instead of holding a single ed25519 key.
#[contractclient(name = "SignatureValidatorClient")]
pub trait SignatureValidator {
    fn is_valid_signature(env: Env, digest: BytesN<32>, signature: Bytes) -> bool;
}

/// Collapse the outcome of a `try_*` call on one of the clients above.
///
/// A `LedgerError` raised by the callee is forwarded unchanged; anything else
/// (host trap, undecodable value) becomes `ExternalCallFailed`.
pub fn settle<T, C, I>(
    outcome: Result<Result<T, C>, Result<LedgerError, I>>,
) -> Result<T, LedgerError> {
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Err(Ok(err)) => Err(err),
        _ => Err(LedgerError::ExternalCallFailed),
    }
}
