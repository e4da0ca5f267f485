#![allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]
//! Property-based test suite entry point.
//!
//! Run with:
//!
//! ```bash
//! cargo test -p delegation_ledger --test property
//! ```
//!
//! To increase the number of generated cases:
//!
//! ```bash
//! PROPTEST_CASES=256 cargo test -p delegation_ledger --test property
//! ```

#[path = "../common/mod.rs"]
mod common;

mod accounting;
mod pricing;
