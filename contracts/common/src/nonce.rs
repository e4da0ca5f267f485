//! # Signer nonces
//!
//! Per-signer strictly-monotonic counters for staker self-authorizations.
//! Every signed digest embeds the signer's current nonce; once the signature
//! is accepted the counter advances, so the same signature can never be
//! replayed. There is no separate replay window beyond the digest's own
//! `expiry`.
//!
//! ```ignore
//! let nonce = nonce::current_nonce(&env, &staker);
//! let digest = authorization::staker_delegation_digest(&env, &staker, &operator, nonce, expiry);
//! authorization::verify_account_signature(&env, &staker, &digest, &signature)?;
//! nonce::consume_nonce(&env, &staker)?;
//! ```

use soroban_sdk::{contracttype, Address, Env};

use crate::constants::{TTL_EXTEND_TO, TTL_THRESHOLD};
use crate::LedgerError;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum NonceKey {
    Nonce(Address),
}

fn load_nonce(env: &Env, signer: &Address) -> u64 {
    env.storage()
        .persistent()
        .get(&NonceKey::Nonce(signer.clone()))
        .unwrap_or(0u64)
}

fn store_nonce(env: &Env, signer: &Address, value: u64) {
    let key = NonceKey::Nonce(signer.clone());
    env.storage().persistent().set(&key, &value);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

/// Return the nonce the next signature from `signer` must embed.
///
/// New signers start at `0`.
pub fn current_nonce(env: &Env, signer: &Address) -> u64 {
    load_nonce(env, signer)
}

/// Advance `signer`'s counter and return the value that was consumed.
///
/// Returns [`LedgerError::NonceOverflow`] if the counter would exceed `u64::MAX`.
pub fn consume_nonce(env: &Env, signer: &Address) -> Result<u64, LedgerError> {
    let current = load_nonce(env, signer);
    let next = current.checked_add(1).ok_or(LedgerError::NonceOverflow)?;
    store_nonce(env, signer, next);
    Ok(current)
}
