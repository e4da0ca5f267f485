//! # Off-chain authorization
//!
//! Verifies actions a party authorized without calling the contract itself:
//! an operator's delegation approver signing off on a new delegator, or a
//! staker authorizing a relayed deposit or delegation.
//!
//! ## Digests
//!
//! Every digest is `sha256(tag || domain_separator || xdr(payload))`. The
//! domain separator binds the network id and the verifying contract's address,
//! so a signature for one deployment can never be replayed against another.
//!
//! ## Signers
//!
//! An account is resolved to a [`Signer`] through [`resolve_signer`]:
//!
//! - accounts that bound an ed25519 key with [`bind_signing_key`] are direct
//!   key-holders and are checked with strict ed25519 verification;
//! - every other account is treated as a contract exposing
//!   `is_valid_signature(digest, signature) -> bool`.
//!
//! A malformed or forged ed25519 signature, and a contract validator that
//! refuses (or does not exist), all yield `InvalidSignature`.

use ed25519_dalek::{Signature, VerifyingKey};
use soroban_sdk::{contracttype, xdr::ToXdr, Address, Bytes, BytesN, Env};

use crate::constants::{TTL_EXTEND_TO, TTL_THRESHOLD};
use crate::interfaces::SignatureValidatorClient;
use crate::LedgerError;

const DOMAIN_NAME: &[u8] = b"STAKE_LEDGER";
const DELEGATION_APPROVAL_TAG: &[u8] = b"DELEGATION_APPROVAL";
const STAKER_DELEGATION_TAG: &[u8] = b"STAKER_DELEGATION";
const STAKER_DEPOSIT_TAG: &[u8] = b"STAKER_DEPOSIT";

// ── Types ────────────────────────────────────────────────────────────────────

/// How a signature from a given account is checked.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Signer {
    DirectKey(BytesN<32>),
    ContractValidator(Address),
}

/// A signature together with the ledger timestamp at which it stops being valid.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignatureWithExpiry {
    pub signature: Bytes,
    pub expiry: u64,
}

/// Payload an operator's approver signs to admit `staker`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DelegationApproval {
    pub staker: Address,
    pub operator: Address,
    pub approver: Address,
    pub salt: BytesN<32>,
    pub expiry: u64,
}

/// Payload a staker signs to have someone else delegate on its behalf.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakerDelegation {
    pub staker: Address,
    pub operator: Address,
    pub nonce: u64,
    pub expiry: u64,
}

/// Payload a staker signs to accept a deposit funded by someone else.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakerDeposit {
    pub staker: Address,
    pub pool: Address,
    pub token: Address,
    pub amount: i128,
    pub nonce: u64,
    pub expiry: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum AuthKey {
    SigningKey(Address),
    SpentSalt(Address, BytesN<32>),
}

fn extend_ttl(env: &Env, key: &AuthKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

// ── Digests ──────────────────────────────────────────────────────────────────

pub fn domain_separator(env: &Env) -> BytesN<32> {
    let mut msg = Bytes::from_slice(env, DOMAIN_NAME);
    msg.append(&Bytes::from_array(env, &env.ledger().network_id().to_array()));
    msg.append(&env.current_contract_address().to_xdr(env));
    env.crypto().sha256(&msg).to_bytes()
}

fn typed_digest(env: &Env, tag: &[u8], payload: Bytes) -> BytesN<32> {
    let mut msg = Bytes::from_slice(env, tag);
    msg.append(&Bytes::from_array(env, &domain_separator(env).to_array()));
    msg.append(&payload);
    env.crypto().sha256(&msg).to_bytes()
}

pub fn delegation_approval_digest(
    env: &Env,
    staker: &Address,
    operator: &Address,
    approver: &Address,
    salt: &BytesN<32>,
    expiry: u64,
) -> BytesN<32> {
    let payload = DelegationApproval {
        staker: staker.clone(),
        operator: operator.clone(),
        approver: approver.clone(),
        salt: salt.clone(),
        expiry,
    };
    typed_digest(env, DELEGATION_APPROVAL_TAG, payload.to_xdr(env))
}

pub fn staker_delegation_digest(
    env: &Env,
    staker: &Address,
    operator: &Address,
    nonce: u64,
    expiry: u64,
) -> BytesN<32> {
    let payload = StakerDelegation {
        staker: staker.clone(),
        operator: operator.clone(),
        nonce,
        expiry,
    };
    typed_digest(env, STAKER_DELEGATION_TAG, payload.to_xdr(env))
}

pub fn deposit_digest(
    env: &Env,
    staker: &Address,
    pool: &Address,
    token: &Address,
    amount: i128,
    nonce: u64,
    expiry: u64,
) -> BytesN<32> {
    let payload = StakerDeposit {
        staker: staker.clone(),
        pool: pool.clone(),
        token: token.clone(),
        amount,
        nonce,
        expiry,
    };
    typed_digest(env, STAKER_DEPOSIT_TAG, payload.to_xdr(env))
}

// ── Signing keys ─────────────────────────────────────────────────────────────

/// Declare `account` a direct key-holder. The caller must have run
/// `account.require_auth()`.
pub fn bind_signing_key(env: &Env, account: &Address, public_key: &BytesN<32>) {
    let key = AuthKey::SigningKey(account.clone());
    env.storage().persistent().set(&key, public_key);
    extend_ttl(env, &key);
}

pub fn unbind_signing_key(env: &Env, account: &Address) {
    env.storage()
        .persistent()
        .remove(&AuthKey::SigningKey(account.clone()));
}

pub fn signing_key(env: &Env, account: &Address) -> Option<BytesN<32>> {
    env.storage()
        .persistent()
        .get(&AuthKey::SigningKey(account.clone()))
}

pub fn resolve_signer(env: &Env, account: &Address) -> Signer {
    match signing_key(env, account) {
        Some(public_key) => Signer::DirectKey(public_key),
        None => Signer::ContractValidator(account.clone()),
    }
}

// ── Verification ─────────────────────────────────────────────────────────────

/// Fails with `SignatureExpired` unless `expiry` is strictly in the future.
pub fn check_expiry(env: &Env, expiry: u64) -> Result<(), LedgerError> {
    if env.ledger().timestamp() >= expiry {
        return Err(LedgerError::SignatureExpired);
    }
    Ok(())
}

pub fn verify_digest(
    env: &Env,
    signer: &Signer,
    digest: &BytesN<32>,
    signature: &Bytes,
) -> Result<(), LedgerError> {
    match signer {
        Signer::DirectKey(public_key) => {
            let signature = BytesN::<64>::try_from(signature.clone())
                .map_err(|_| LedgerError::InvalidSignature)?;
            let key = VerifyingKey::from_bytes(&public_key.to_array())
                .map_err(|_| LedgerError::InvalidSignature)?;
            key.verify_strict(
                &digest.to_array(),
                &Signature::from_bytes(&signature.to_array()),
            )
            .map_err(|_| LedgerError::InvalidSignature)
        }
        Signer::ContractValidator(account) => {
            let validator = SignatureValidatorClient::new(env, account);
            match validator.try_is_valid_signature(digest, signature) {
                Ok(Ok(true)) => Ok(()),
                _ => Err(LedgerError::InvalidSignature),
            }
        }
    }
}

/// Expiry check followed by signer resolution and verification.
pub fn verify_account_signature(
    env: &Env,
    account: &Address,
    digest: &BytesN<32>,
    signature: &SignatureWithExpiry,
) -> Result<(), LedgerError> {
    check_expiry(env, signature.expiry)?;
    let signer = resolve_signer(env, account);
    verify_digest(env, &signer, digest, &signature.signature)
}

// ── Approval salts ───────────────────────────────────────────────────────────

pub fn is_salt_spent(env: &Env, approver: &Address, salt: &BytesN<32>) -> bool {
    env.storage()
        .persistent()
        .has(&AuthKey::SpentSalt(approver.clone(), salt.clone()))
}

/// Mark `salt` consumed for `approver`; a second use fails `SaltAlreadySpent`.
pub fn spend_salt(env: &Env, approver: &Address, salt: &BytesN<32>) -> Result<(), LedgerError> {
    if is_salt_spent(env, approver, salt) {
        return Err(LedgerError::SaltAlreadySpent);
    }
    let key = AuthKey::SpentSalt(approver.clone(), salt.clone());
    env.storage().persistent().set(&key, &true);
    extend_ttl(env, &key);
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
