//! Rank-ordered access tiers and two-step ownership transfer.
//!
//! Every ledger contract bootstraps its owner at `initialize`. The owner holds
//! the highest tier and can hand lower tiers to other accounts:
//!
//! - `Pauser`      – may only raise pause flags.
//! - `Whitelister` – may manage the pool whitelist (and pause).
//! - `Owner`       – everything, including configuration and tier grants.
//!
//! Callers must run `require_auth()` on the account before asking this module
//! whether it holds a tier.

use soroban_sdk::{contracttype, symbol_short, Address, Env, Symbol};

use crate::constants::{TTL_EXTEND_TO, TTL_THRESHOLD};
use crate::LedgerError;

// ── Storage keys ─────────────────────────────────────────────────────────────

const OWNER: Symbol = symbol_short!("OWNER");
const PENDING_OWNER: Symbol = symbol_short!("PEND_OWN");

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum AccessKey {
    Tier(Address),
}

// ── Tier enum ────────────────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum AccessTier {
    Pauser = 1,
    Whitelister = 2,
    Owner = 3,
}

impl AccessTier {
    pub fn rank(&self) -> u32 {
        *self as u32
    }

    /// Returns true if this tier is at least as high as `min_tier`.
    pub fn has_at_least(&self, min_tier: AccessTier) -> bool {
        self.rank() >= min_tier.rank()
    }
}

// ── Storage helpers ──────────────────────────────────────────────────────────

fn store_tier(env: &Env, account: &Address, tier: AccessTier) {
    let key = AccessKey::Tier(account.clone());
    env.storage().persistent().set(&key, &tier);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn clear_tier(env: &Env, account: &Address) {
    env.storage()
        .persistent()
        .remove(&AccessKey::Tier(account.clone()));
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Record `owner` as the contract owner. Called once from `initialize`.
pub fn bootstrap_owner(env: &Env, owner: &Address) {
    env.storage().instance().set(&OWNER, owner);
    store_tier(env, owner, AccessTier::Owner);
}

pub fn owner(env: &Env) -> Result<Address, LedgerError> {
    env.storage()
        .instance()
        .get(&OWNER)
        .ok_or(LedgerError::NotInitialized)
}

pub fn tier_of(env: &Env, account: &Address) -> Option<AccessTier> {
    env.storage()
        .persistent()
        .get(&AccessKey::Tier(account.clone()))
}

/// Guard: fails with `Unauthorized` unless `caller` holds at least `min_tier`.
pub fn require_tier(env: &Env, caller: &Address, min_tier: AccessTier) -> Result<(), LedgerError> {
    match tier_of(env, caller) {
        Some(tier) if tier.has_at_least(min_tier) => Ok(()),
        _ => Err(LedgerError::Unauthorized),
    }
}

/// Assign `tier` to `target`. Owner-only; the owner tier itself only moves
/// through the two-step transfer below.
pub fn grant_tier(
    env: &Env,
    caller: &Address,
    target: &Address,
    tier: AccessTier,
) -> Result<(), LedgerError> {
    require_tier(env, caller, AccessTier::Owner)?;
    if tier == AccessTier::Owner || *target == owner(env)? {
        return Err(LedgerError::InvalidInput);
    }
    store_tier(env, target, tier);
    Ok(())
}

/// Remove any tier held by `target`. Owner-only; the owner cannot revoke itself.
pub fn revoke_tier(env: &Env, caller: &Address, target: &Address) -> Result<(), LedgerError> {
    require_tier(env, caller, AccessTier::Owner)?;
    if *target == owner(env)? {
        return Err(LedgerError::InvalidInput);
    }
    clear_tier(env, target);
    Ok(())
}

// ── Ownership transfer (two-step) ────────────────────────────────────────────

pub fn propose_owner(env: &Env, caller: &Address, proposed: &Address) -> Result<(), LedgerError> {
    require_tier(env, caller, AccessTier::Owner)?;
    env.storage().instance().set(&PENDING_OWNER, proposed);
    Ok(())
}

/// Complete a pending transfer. Returns the previous owner.
pub fn accept_owner(env: &Env, proposed: &Address) -> Result<Address, LedgerError> {
    let pending: Address = env
        .storage()
        .instance()
        .get(&PENDING_OWNER)
        .ok_or(LedgerError::InvalidInput)?;
    if *proposed != pending {
        return Err(LedgerError::Unauthorized);
    }

    let previous = owner(env)?;
    clear_tier(env, &previous);
    bootstrap_owner(env, proposed);
    env.storage().instance().remove(&PENDING_OWNER);
    Ok(previous)
}

/// Drop a pending transfer. Returns the address that had been proposed.
pub fn cancel_owner_transfer(env: &Env, caller: &Address) -> Result<Address, LedgerError> {
    require_tier(env, caller, AccessTier::Owner)?;
    let pending: Address = env
        .storage()
        .instance()
        .get(&PENDING_OWNER)
        .ok_or(LedgerError::InvalidInput)?;
    env.storage().instance().remove(&PENDING_OWNER);
    Ok(pending)
}

pub fn pending_owner(env: &Env) -> Option<Address> {
    env.storage().instance().get(&PENDING_OWNER)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::{contract, contractimpl, testutils::Address as _, Env};

    #[contract]
    pub struct TestContract;

    #[contractimpl]
    impl TestContract {}

    fn with_contract_env<F: FnOnce(&Env)>(f: F) {
        let env = Env::default();
        let contract_id = env.register(TestContract, ());
        env.as_contract(&contract_id, || {
            f(&env);
        });
    }

    #[test]
    fn owner_satisfies_every_tier() {
        with_contract_env(|env| {
            let owner_addr = Address::generate(env);
            bootstrap_owner(env, &owner_addr);
            assert_eq!(owner(env), Ok(owner_addr.clone()));
            assert!(require_tier(env, &owner_addr, AccessTier::Pauser).is_ok());
            assert!(require_tier(env, &owner_addr, AccessTier::Whitelister).is_ok());
            assert!(require_tier(env, &owner_addr, AccessTier::Owner).is_ok());
        });
    }

    #[test]
    fn pauser_cannot_act_as_whitelister() {
        with_contract_env(|env| {
            let owner_addr = Address::generate(env);
            let pauser = Address::generate(env);
            bootstrap_owner(env, &owner_addr);
            grant_tier(env, &owner_addr, &pauser, AccessTier::Pauser).unwrap();

            assert!(require_tier(env, &pauser, AccessTier::Pauser).is_ok());
            assert_eq!(
                require_tier(env, &pauser, AccessTier::Whitelister),
                Err(LedgerError::Unauthorized)
            );
        });
    }

    #[test]
    fn only_owner_grants_and_owner_tier_is_not_grantable() {
        with_contract_env(|env| {
            let owner_addr = Address::generate(env);
            let whitelister = Address::generate(env);
            let outsider = Address::generate(env);
            bootstrap_owner(env, &owner_addr);
            grant_tier(env, &owner_addr, &whitelister, AccessTier::Whitelister).unwrap();

            assert_eq!(
                grant_tier(env, &whitelister, &outsider, AccessTier::Pauser),
                Err(LedgerError::Unauthorized)
            );
            assert_eq!(
                grant_tier(env, &owner_addr, &outsider, AccessTier::Owner),
                Err(LedgerError::InvalidInput)
            );

            revoke_tier(env, &owner_addr, &whitelister).unwrap();
            assert_eq!(tier_of(env, &whitelister), None);
            assert_eq!(
                revoke_tier(env, &owner_addr, &owner_addr),
                Err(LedgerError::InvalidInput)
            );
        });
    }

    #[test]
    fn two_step_transfer_moves_owner_tier() {
        with_contract_env(|env| {
            let old_owner = Address::generate(env);
            let new_owner = Address::generate(env);
            let stranger = Address::generate(env);
            bootstrap_owner(env, &old_owner);

            propose_owner(env, &old_owner, &new_owner).unwrap();
            assert_eq!(pending_owner(env), Some(new_owner.clone()));
            assert_eq!(accept_owner(env, &stranger), Err(LedgerError::Unauthorized));

            assert_eq!(accept_owner(env, &new_owner), Ok(old_owner.clone()));
            assert_eq!(owner(env), Ok(new_owner.clone()));
            assert_eq!(tier_of(env, &old_owner), None);
            assert_eq!(tier_of(env, &new_owner), Some(AccessTier::Owner));
            assert_eq!(pending_owner(env), None);
        });
    }

    #[test]
    fn cancel_clears_pending_owner() {
        with_contract_env(|env| {
            let owner_addr = Address::generate(env);
            let proposed = Address::generate(env);
            bootstrap_owner(env, &owner_addr);

            assert_eq!(
                cancel_owner_transfer(env, &owner_addr),
                Err(LedgerError::InvalidInput)
            );
            propose_owner(env, &owner_addr, &proposed).unwrap();
            assert_eq!(cancel_owner_transfer(env, &owner_addr), Ok(proposed.clone()));
            assert_eq!(accept_owner(env, &proposed), Err(LedgerError::InvalidInput));
        });
    }
}
