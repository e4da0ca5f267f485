//! Protocol-wide constants shared by the pool, registry and delegation ledger.

/// Virtual share count added to `total_shares` in every pricing formula.
pub const SHARES_OFFSET: i128 = 1_000;

/// Virtual asset balance added to the pool balance in every pricing formula.
pub const BALANCE_OFFSET: i128 = 1_000;

/// Upper bound on a pool's outstanding shares (10^38 - 1).
pub const MAX_TOTAL_SHARES: i128 = 100_000_000_000_000_000_000_000_000_000_000_000_000 - 1;

/// Maximum number of distinct pools a staker may hold shares in.
pub const MAX_STAKER_POOL_LIST_LENGTH: u32 = 32;

/// Ceiling for any withdrawal delay (global or per pool), in ledgers.
pub const MAX_WITHDRAWAL_DELAY_BLOCKS: u32 = 216_000;

/// Ceiling for an operator's undelegation notice, in ledgers.
pub const MAX_UNDELEGATION_NOTICE_BLOCKS: u32 = 1_296_000;

// Persistent entry TTLs, in ledgers.
pub const TTL_THRESHOLD: u32 = 5_184_000;
pub const TTL_EXTEND_TO: u32 = 10_368_000;
