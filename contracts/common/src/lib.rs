//! Shared building blocks for the stake-ledger contract suite.
//!
//! This crate provides:
//! - [`LedgerError`]: error codes returned by every ledger contract.
//! - Off-chain authorization: typed digests, signer resolution, salts and nonces.
//! - Capability traits used for cross-contract calls between the pool, the
//!   registry and the delegation ledger.
//! - Role tiers, pause flags and protocol-wide constants.

#![no_std]

use soroban_sdk::contracterror;

// ── Modules ──────────────────────────────────────────────────────────────────

pub mod access;
pub mod authorization;
pub mod constants;
pub mod interfaces;
pub mod nonce;
pub mod pausable;

pub use access::AccessTier;
pub use authorization::{SignatureWithExpiry, Signer};
pub use interfaces::Deposits;

// ── Shared error enum ────────────────────────────────────────────────────────

/// Error codes shared by the pool, registry and delegation ledger.
///
/// A single enum is used across all three contracts so a failure raised deep
/// inside a cross-contract call surfaces to the original caller unchanged.
///
/// # Code ranges
/// | Range   | Purpose                          |
/// |---------|----------------------------------|
/// | 1 – 9   | Lifecycle / initialisation       |
/// | 10 – 19 | Authentication & authorisation   |
/// | 20 – 39 | State preconditions              |
/// | 40 – 49 | Accounting bounds                |
/// | 50 – 59 | Input validation                 |
#[contracterror]
#[derive(Clone, Debug, Eq, PartialEq, Copy)]
#[repr(u32)]
pub enum LedgerError {
    // ── Lifecycle (1–9) ──────────────────────────────────────
    NotInitialized = 1,
    AlreadyInitialized = 2,

    // ── Auth (10–19) ─────────────────────────────────────────
    /// The caller does not hold the role or identity the entry point requires.
    Unauthorized = 10,
    /// `expiry` is not strictly in the future.
    SignatureExpired = 11,
    /// The signature is missing, malformed, or rejected by its signer.
    InvalidSignature = 12,
    /// The approver already consumed this salt.
    SaltAlreadySpent = 13,
    /// A signer's nonce counter cannot advance any further.
    NonceOverflow = 14,
    /// The pool does not allow shares to move to a third party.
    ForbiddenThirdParty = 15,
    /// Only the recorded withdrawer may complete a withdrawal.
    NotAuthorizedWithdrawer = 16,
    /// Third-party queueing requires a withdrawer other than the staker.
    WithdrawerMustNotBeStaker = 17,

    // ── State preconditions (20–39) ──────────────────────────
    AlreadyRegistered = 20,
    OperatorNotRegistered = 21,
    AlreadyDelegated = 22,
    StakerNotDelegated = 23,
    OperatorCannotUndelegate = 24,
    UnknownOrAlreadyCompleted = 25,
    NoticeNotElapsed = 26,
    NotWhitelisted = 27,
    /// The staker's pool list does not contain a pool it holds shares in.
    PoolNotFound = 28,
    Paused = 29,
    NoticeCannotDecrease = 30,

    // ── Accounting (40–49) ───────────────────────────────────
    ZeroSharesMinted = 40,
    ZeroShares = 41,
    SharesExceedBalance = 42,
    SharesExceedTotal = 43,
    PerDepositLimitExceeded = 44,
    TotalDepositLimitExceeded = 45,
    ArithmeticOverflow = 46,
    TotalSharesExceedMax = 47,
    MaxPoolsExceeded = 48,

    // ── Validation (50–59) ───────────────────────────────────
    LengthMismatch = 50,
    EmptyPoolList = 51,
    InvalidInput = 52,
    WrongAsset = 53,
    ExceedsCeiling = 54,
    InvalidDepositLimits = 55,
    InvalidPauseStatus = 56,
    /// A cross-contract call failed with something other than a `LedgerError`.
    ExternalCallFailed = 57,
}
