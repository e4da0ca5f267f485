//! Bitmask kill-switches.
//!
//! Each contract assigns its own meaning to bit indices (deposits, new
//! delegations, entering / exiting the withdrawal queue). Pausers can only set
//! more bits; clearing bits requires the owner.

use soroban_sdk::{symbol_short, Address, Env, Symbol};

use crate::access::{self, AccessTier};
use crate::LedgerError;

const PAUSED: Symbol = symbol_short!("PAUSED");

pub fn paused_status(env: &Env) -> u32 {
    env.storage().instance().get(&PAUSED).unwrap_or(0)
}

pub fn is_paused(env: &Env, index: u32) -> bool {
    paused_status(env) & (1 << index) != 0
}

pub fn require_not_paused(env: &Env, index: u32) -> Result<(), LedgerError> {
    if is_paused(env, index) {
        return Err(LedgerError::Paused);
    }
    Ok(())
}

/// Raise pause bits. `new_status` must keep every bit that is already set.
/// Returns the previous status.
pub fn pause(env: &Env, caller: &Address, new_status: u32) -> Result<u32, LedgerError> {
    access::require_tier(env, caller, AccessTier::Pauser)?;
    let current = paused_status(env);
    if new_status & current != current {
        return Err(LedgerError::InvalidPauseStatus);
    }
    env.storage().instance().set(&PAUSED, &new_status);
    Ok(current)
}

/// Clear pause bits. `new_status` may not set any bit that is currently clear.
/// Returns the previous status.
pub fn unpause(env: &Env, caller: &Address, new_status: u32) -> Result<u32, LedgerError> {
    access::require_tier(env, caller, AccessTier::Owner)?;
    let current = paused_status(env);
    if !current & new_status != 0 {
        return Err(LedgerError::InvalidPauseStatus);
    }
    env.storage().instance().set(&PAUSED, &new_status);
    Ok(current)
}
