#![no_std]

pub mod events;

use common::{
    access::{self, AccessTier},
    authorization,
    constants::{MAX_STAKER_POOL_LIST_LENGTH, TTL_EXTEND_TO, TTL_THRESHOLD},
    interfaces::{settle, DelegationClient, PoolClient},
    nonce, pausable, Deposits, LedgerError, SignatureWithExpiry,
};
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, Bytes, BytesN, Env,
    Symbol, Vec,
};

// ── Storage key constants ────────────────────────────────────────────────────

const INITIALIZED: Symbol = symbol_short!("INIT");
const DELEGATION: Symbol = symbol_short!("DELEGATN");

/// Pause bit guarding both deposit entry points.
pub const PAUSED_DEPOSITS: u32 = 0;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum RegistryKey {
    Whitelisted(Address),
    ThirdPartyForbidden(Address),
    Shares(Address, Address),
    PoolList(Address),
}

fn extend_ttl(env: &Env, key: &RegistryKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

// ── Contract ─────────────────────────────────────────────────────────────────

/// Pool whitelist and per-staker share ledger.
///
/// Stakers enter pools only through this contract. For each staker it keeps a
/// share balance per pool and the ordered list of pools where that balance is
/// nonzero. The delegation ledger is the only other contract allowed to move
/// balances, which it does while queueing and completing withdrawals.
#[contract]
pub struct StrategyRegistryContract;

#[contractimpl]
impl StrategyRegistryContract {
    // ── Initialisation ──────────────────────────────────────────────────────

    pub fn initialize(env: Env, owner: Address, delegation: Address) -> Result<(), LedgerError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(LedgerError::AlreadyInitialized);
        }
        env.storage().instance().set(&INITIALIZED, &true);
        env.storage().instance().set(&DELEGATION, &delegation);
        access::bootstrap_owner(&env, &owner);

        events::publish_initialized(&env, owner, delegation);
        Ok(())
    }

    // ── Whitelist ───────────────────────────────────────────────────────────

    /// Whitelist `pools`. `third_party_forbidden[i]` applies to `pools[i]`,
    /// including pools that are already whitelisted.
    pub fn add_pools(
        env: Env,
        caller: Address,
        pools: Vec<Address>,
        third_party_forbidden: Vec<bool>,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        access::require_tier(&env, &caller, AccessTier::Whitelister)?;
        if pools.is_empty() {
            return Err(LedgerError::EmptyPoolList);
        }
        if pools.len() != third_party_forbidden.len() {
            return Err(LedgerError::LengthMismatch);
        }

        for (pool, forbidden) in pools.iter().zip(third_party_forbidden.iter()) {
            if !Self::is_whitelisted(env.clone(), pool.clone()) {
                let key = RegistryKey::Whitelisted(pool.clone());
                env.storage().persistent().set(&key, &true);
                extend_ttl(&env, &key);
                Self::store_third_party_flag(&env, &pool, forbidden);
                events::publish_pool_whitelisted(&env, pool, forbidden);
            } else if Self::third_party_forbidden(env.clone(), pool.clone()) != forbidden {
                Self::store_third_party_flag(&env, &pool, forbidden);
                events::publish_third_party_flag_set(&env, pool, forbidden);
            }
        }
        Ok(())
    }

    /// Drop `pools` from the whitelist. Existing balances stay withdrawable.
    pub fn remove_pools(env: Env, caller: Address, pools: Vec<Address>) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        access::require_tier(&env, &caller, AccessTier::Whitelister)?;
        if pools.is_empty() {
            return Err(LedgerError::EmptyPoolList);
        }

        for pool in pools.iter() {
            if Self::is_whitelisted(env.clone(), pool.clone()) {
                env.storage()
                    .persistent()
                    .remove(&RegistryKey::Whitelisted(pool.clone()));
                Self::store_third_party_flag(&env, &pool, false);
                events::publish_pool_removed(&env, pool);
            }
        }
        Ok(())
    }

    pub fn set_third_party_forbidden(
        env: Env,
        caller: Address,
        pool: Address,
        forbidden: bool,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        access::require_tier(&env, &caller, AccessTier::Whitelister)?;
        Self::store_third_party_flag(&env, &pool, forbidden);
        events::publish_third_party_flag_set(&env, pool, forbidden);
        Ok(())
    }

    // ── Deposits ────────────────────────────────────────────────────────────

    /// Move `amount` of `token` from `staker` into `pool` and credit the
    /// minted shares. Returns the shares.
    pub fn deposit_into_pool(
        env: Env,
        staker: Address,
        pool: Address,
        token: Address,
        amount: i128,
    ) -> Result<i128, LedgerError> {
        Self::require_initialized(&env)?;
        staker.require_auth();
        Self::deposit_for(&env, &staker, &staker, &pool, &token, amount)
    }

    /// Deposit funded by `payer` on behalf of `staker`, who authorized it
    /// off-chain by signing the deposit digest at its current nonce.
    #[allow(clippy::too_many_arguments)]
    pub fn deposit_with_signature(
        env: Env,
        payer: Address,
        pool: Address,
        token: Address,
        amount: i128,
        staker: Address,
        expiry: u64,
        signature: Bytes,
    ) -> Result<i128, LedgerError> {
        Self::require_initialized(&env)?;
        payer.require_auth();
        if Self::third_party_forbidden(env.clone(), pool.clone()) {
            return Err(LedgerError::ForbiddenThirdParty);
        }

        authorization::check_expiry(&env, expiry)?;
        let staker_nonce = nonce::current_nonce(&env, &staker);
        let digest = authorization::deposit_digest(
            &env,
            &staker,
            &pool,
            &token,
            amount,
            staker_nonce,
            expiry,
        );
        authorization::verify_account_signature(
            &env,
            &staker,
            &digest,
            &SignatureWithExpiry { signature, expiry },
        )?;
        nonce::consume_nonce(&env, &staker)?;

        Self::deposit_for(&env, &payer, &staker, &pool, &token, amount)
    }

    // ── Ledger-only mutations ───────────────────────────────────────────────

    pub fn add_shares(
        env: Env,
        staker: Address,
        pool: Address,
        shares: i128,
    ) -> Result<(), LedgerError> {
        Self::require_delegation(&env)?;
        if shares <= 0 {
            return Err(LedgerError::ZeroShares);
        }
        Self::credit(&env, &staker, &pool, shares)
    }

    /// Debit `shares` from `staker`'s balance in `pool`. Returns `true` when
    /// the balance reached zero and the pool left the staker's list.
    pub fn remove_shares(
        env: Env,
        staker: Address,
        pool: Address,
        shares: i128,
    ) -> Result<bool, LedgerError> {
        Self::require_delegation(&env)?;
        if shares <= 0 {
            return Err(LedgerError::ZeroShares);
        }

        let before = Self::staker_shares(env.clone(), staker.clone(), pool.clone());
        if shares > before {
            return Err(LedgerError::SharesExceedBalance);
        }
        let after = before - shares;
        Self::store_shares(&env, &staker, &pool, after);

        let emptied = after == 0;
        if emptied {
            Self::remove_from_pool_list(&env, &staker, &pool)?;
        }

        events::publish_shares_changed(&env, staker, pool, before, after);
        Ok(emptied)
    }

    /// Release `shares` of `pool` as tokens to `recipient`. The caller has
    /// already debited the staker ledger.
    pub fn withdraw_shares_as_tokens(
        env: Env,
        recipient: Address,
        pool: Address,
        shares: i128,
        token: Address,
    ) -> Result<i128, LedgerError> {
        Self::require_delegation(&env)?;
        settle(PoolClient::new(&env, &pool).try_withdraw(&recipient, &token, &shares))
    }

    // ── Signing keys ────────────────────────────────────────────────────────

    /// Declare `account` a direct ed25519 key-holder for signed deposits.
    pub fn set_signing_key(
        env: Env,
        account: Address,
        public_key: BytesN<32>,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        account.require_auth();
        authorization::bind_signing_key(&env, &account, &public_key);
        events::publish_signing_key_set(&env, account, Some(public_key));
        Ok(())
    }

    pub fn clear_signing_key(env: Env, account: Address) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        account.require_auth();
        authorization::unbind_signing_key(&env, &account);
        events::publish_signing_key_set(&env, account, None);
        Ok(())
    }

    // ── Admin ───────────────────────────────────────────────────────────────

    pub fn pause(env: Env, caller: Address, new_status: u32) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        let previous = pausable::pause(&env, &caller, new_status)?;
        events::publish_pause_status(&env, caller, previous, new_status);
        Ok(())
    }

    pub fn unpause(env: Env, caller: Address, new_status: u32) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        let previous = pausable::unpause(&env, &caller, new_status)?;
        events::publish_pause_status(&env, caller, previous, new_status);
        Ok(())
    }

    pub fn grant_tier(
        env: Env,
        caller: Address,
        target: Address,
        tier: AccessTier,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        access::grant_tier(&env, &caller, &target, tier)
    }

    pub fn revoke_tier(env: Env, caller: Address, target: Address) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        access::revoke_tier(&env, &caller, &target)
    }

    pub fn propose_owner(env: Env, caller: Address, new_owner: Address) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        access::propose_owner(&env, &caller, &new_owner)
    }

    pub fn accept_owner(env: Env, new_owner: Address) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        new_owner.require_auth();
        let previous = access::accept_owner(&env, &new_owner)?;
        events::publish_owner_transferred(&env, previous, new_owner);
        Ok(())
    }

    pub fn cancel_owner_transfer(env: Env, caller: Address) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        access::cancel_owner_transfer(&env, &caller).map(|_| ())
    }

    // ── View functions ───────────────────────────────────────────────────────

    pub fn staker_shares(env: Env, staker: Address, pool: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&RegistryKey::Shares(staker, pool))
            .unwrap_or(0)
    }

    /// Every pool `staker` holds shares in, with the matching balances.
    pub fn get_deposits(env: Env, staker: Address) -> Deposits {
        let pools = Self::staker_pool_list(env.clone(), staker.clone());
        let mut shares = Vec::new(&env);
        for pool in pools.iter() {
            shares.push_back(Self::staker_shares(env.clone(), staker.clone(), pool));
        }
        Deposits { pools, shares }
    }

    pub fn staker_pool_list(env: Env, staker: Address) -> Vec<Address> {
        env.storage()
            .persistent()
            .get(&RegistryKey::PoolList(staker))
            .unwrap_or_else(|| Vec::new(&env))
    }

    pub fn staker_pool_list_length(env: Env, staker: Address) -> u32 {
        Self::staker_pool_list(env, staker).len()
    }

    pub fn is_whitelisted(env: Env, pool: Address) -> bool {
        env.storage()
            .persistent()
            .get(&RegistryKey::Whitelisted(pool))
            .unwrap_or(false)
    }

    pub fn third_party_forbidden(env: Env, pool: Address) -> bool {
        env.storage()
            .persistent()
            .get(&RegistryKey::ThirdPartyForbidden(pool))
            .unwrap_or(false)
    }

    /// Nonce the next signed deposit from `staker` must embed.
    pub fn nonce(env: Env, staker: Address) -> u64 {
        nonce::current_nonce(&env, &staker)
    }

    pub fn deposit_digest(
        env: Env,
        staker: Address,
        pool: Address,
        token: Address,
        amount: i128,
        nonce: u64,
        expiry: u64,
    ) -> BytesN<32> {
        authorization::deposit_digest(&env, &staker, &pool, &token, amount, nonce, expiry)
    }

    pub fn signing_key(env: Env, account: Address) -> Option<BytesN<32>> {
        authorization::signing_key(&env, &account)
    }

    pub fn delegation(env: Env) -> Result<Address, LedgerError> {
        env.storage()
            .instance()
            .get(&DELEGATION)
            .ok_or(LedgerError::NotInitialized)
    }

    pub fn paused_status(env: Env) -> u32 {
        pausable::paused_status(&env)
    }

    pub fn owner(env: Env) -> Result<Address, LedgerError> {
        access::owner(&env)
    }

    pub fn pending_owner(env: Env) -> Option<Address> {
        access::pending_owner(&env)
    }

    pub fn tier_of(env: Env, account: Address) -> Option<AccessTier> {
        access::tier_of(&env, &account)
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn require_initialized(env: &Env) -> Result<(), LedgerError> {
        if !env.storage().instance().has(&INITIALIZED) {
            return Err(LedgerError::NotInitialized);
        }
        Ok(())
    }

    /// Guard: the delegation ledger must be the invoker.
    fn require_delegation(env: &Env) -> Result<(), LedgerError> {
        let delegation = Self::delegation(env.clone())?;
        delegation.require_auth();
        Ok(())
    }

    fn deposit_for(
        env: &Env,
        payer: &Address,
        staker: &Address,
        pool: &Address,
        token: &Address,
        amount: i128,
    ) -> Result<i128, LedgerError> {
        pausable::require_not_paused(env, PAUSED_DEPOSITS)?;
        if !Self::is_whitelisted(env.clone(), pool.clone()) {
            return Err(LedgerError::NotWhitelisted);
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidInput);
        }

        token::Client::new(env, token).transfer(payer, pool, &amount);
        let shares = settle(PoolClient::new(env, pool).try_deposit(token, &amount))?;
        if shares <= 0 {
            return Err(LedgerError::ZeroShares);
        }

        Self::credit(env, staker, pool, shares)?;
        let delegation = Self::delegation(env.clone())?;
        settle(
            DelegationClient::new(env, &delegation).try_increase_delegated_shares(
                staker, pool, &shares,
            ),
        )?;

        events::publish_deposit(
            env,
            staker.clone(),
            payer.clone(),
            pool.clone(),
            token.clone(),
            amount,
            shares,
        );
        Ok(shares)
    }

    /// Add `shares` to the staker's balance, appending `pool` to the list on
    /// the first credit.
    fn credit(env: &Env, staker: &Address, pool: &Address, shares: i128) -> Result<(), LedgerError> {
        let before = Self::staker_shares(env.clone(), staker.clone(), pool.clone());
        if before == 0 {
            let mut list = Self::staker_pool_list(env.clone(), staker.clone());
            if list.len() >= MAX_STAKER_POOL_LIST_LENGTH {
                return Err(LedgerError::MaxPoolsExceeded);
            }
            list.push_back(pool.clone());
            Self::store_pool_list(env, staker, &list);
        }

        let after = before
            .checked_add(shares)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Self::store_shares(env, staker, pool, after);

        events::publish_shares_changed(env, staker.clone(), pool.clone(), before, after);
        Ok(())
    }

    /// Swap-with-last removal.
    fn remove_from_pool_list(env: &Env, staker: &Address, pool: &Address) -> Result<(), LedgerError> {
        let mut list = Self::staker_pool_list(env.clone(), staker.clone());
        let mut index = None;
        for (i, listed) in list.iter().enumerate() {
            if listed == *pool {
                index = Some(i as u32);
                break;
            }
        }
        let index = index.ok_or(LedgerError::PoolNotFound)?;
        let last = list.last().ok_or(LedgerError::PoolNotFound)?;
        list.set(index, last);
        list.pop_back();
        Self::store_pool_list(env, staker, &list);
        Ok(())
    }

    fn store_shares(env: &Env, staker: &Address, pool: &Address, shares: i128) {
        let key = RegistryKey::Shares(staker.clone(), pool.clone());
        if shares == 0 {
            env.storage().persistent().remove(&key);
        } else {
            env.storage().persistent().set(&key, &shares);
            extend_ttl(env, &key);
        }
    }

    fn store_pool_list(env: &Env, staker: &Address, list: &Vec<Address>) {
        let key = RegistryKey::PoolList(staker.clone());
        if list.is_empty() {
            env.storage().persistent().remove(&key);
        } else {
            env.storage().persistent().set(&key, list);
            extend_ttl(env, &key);
        }
    }

    fn store_third_party_flag(env: &Env, pool: &Address, forbidden: bool) {
        let key = RegistryKey::ThirdPartyForbidden(pool.clone());
        if forbidden {
            env.storage().persistent().set(&key, &true);
            extend_ttl(env, &key);
        } else {
            env.storage().persistent().remove(&key);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
