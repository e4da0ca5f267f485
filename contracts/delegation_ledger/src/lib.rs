#![no_std]

pub mod events;

use common::{
    access::{self, AccessTier},
    authorization,
    constants::{
        MAX_UNDELEGATION_NOTICE_BLOCKS, MAX_WITHDRAWAL_DELAY_BLOCKS, TTL_EXTEND_TO, TTL_THRESHOLD,
    },
    interfaces::{settle, RegistryClient},
    nonce, pausable, Deposits, LedgerError, SignatureWithExpiry,
};
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, xdr::ToXdr, Address, BytesN, Env, String,
    Symbol, Vec,
};

// ── Storage key constants ────────────────────────────────────────────────────

const INITIALIZED: Symbol = symbol_short!("INIT");
const REGISTRY: Symbol = symbol_short!("REGISTRY");
const MIN_WITHDRAWAL_DELAY: Symbol = symbol_short!("MIN_DLY");

// ── Pause bits ───────────────────────────────────────────────────────────────

pub const PAUSED_NEW_DELEGATION: u32 = 0;
pub const PAUSED_ENTER_WITHDRAWAL_QUEUE: u32 = 1;
pub const PAUSED_EXIT_WITHDRAWAL_QUEUE: u32 = 2;

// ── Public-facing types ──────────────────────────────────────────────────────

/// Registration record of an operator. Its presence is what makes an
/// account an operator.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperatorDetails {
    pub earnings_receiver: Address,
    /// When set, new delegations need this account's signed approval unless
    /// it (or the operator) submits them.
    pub delegation_approver: Option<Address>,
    pub min_undelegation_notice_blocks: u32,
}

/// A queued withdrawal of `shares` from one pool. Identified by its root,
/// `sha256(xdr(withdrawal))`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Withdrawal {
    pub staker: Address,
    pub delegated_to: Address,
    pub withdrawer: Address,
    pub nonce: u64,
    pub start_block: u32,
    pub pool: Address,
    pub shares: i128,
}

/// One staker's slice of a `queue_withdrawals` request.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueuedWithdrawalParams {
    pub staker: Address,
    pub pools: Vec<Address>,
    pub shares: Vec<i128>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum LedgerKey {
    Operator(Address),
    DelegatedTo(Address),
    OperatorShares(Address, Address),
    PoolDelay(Address),
    Pending(BytesN<32>),
    CumulativeWithdrawals(Address),
}

fn extend_ttl(env: &Env, key: &LedgerKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

// ── Contract ─────────────────────────────────────────────────────────────────

/// Delegation and withdrawal state machine.
///
/// Each staker is either undelegated or delegated to exactly one operator.
/// Operators delegate to themselves when they register and stay that way.
/// For every operator the ledger keeps, per pool, the sum of its delegators'
/// share balances. Leaving a delegation, or queueing a withdrawal, moves
/// shares out of the registry into a pending withdrawal that can be completed
/// once its notice period has elapsed.
#[contract]
pub struct DelegationLedgerContract;

#[contractimpl]
impl DelegationLedgerContract {
    // ── Initialisation ──────────────────────────────────────────────────────

    pub fn initialize(
        env: Env,
        owner: Address,
        registry: Address,
        min_withdrawal_delay_blocks: u32,
    ) -> Result<(), LedgerError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(LedgerError::AlreadyInitialized);
        }
        if min_withdrawal_delay_blocks > MAX_WITHDRAWAL_DELAY_BLOCKS {
            return Err(LedgerError::ExceedsCeiling);
        }

        env.storage().instance().set(&INITIALIZED, &true);
        env.storage().instance().set(&REGISTRY, &registry);
        env.storage()
            .instance()
            .set(&MIN_WITHDRAWAL_DELAY, &min_withdrawal_delay_blocks);
        access::bootstrap_owner(&env, &owner);

        events::publish_initialized(&env, owner, registry, min_withdrawal_delay_blocks);
        Ok(())
    }

    // ── Operators ───────────────────────────────────────────────────────────

    /// Register `operator` and delegate it to itself. Any shares it already
    /// holds are copied into its own aggregate.
    pub fn register_as_operator(
        env: Env,
        operator: Address,
        details: OperatorDetails,
        metadata_uri: String,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        operator.require_auth();
        if Self::is_operator(env.clone(), operator.clone()) {
            return Err(LedgerError::AlreadyRegistered);
        }
        if Self::delegated_to(env.clone(), operator.clone()).is_some() {
            return Err(LedgerError::AlreadyDelegated);
        }
        if details.min_undelegation_notice_blocks > MAX_UNDELEGATION_NOTICE_BLOCKS {
            return Err(LedgerError::ExceedsCeiling);
        }
        pausable::require_not_paused(&env, PAUSED_NEW_DELEGATION)?;

        Self::store_operator_details(&env, &operator, &details);
        events::publish_operator_registered(&env, operator.clone(), details.clone());
        events::publish_operator_details_modified(&env, operator.clone(), 0, details);

        Self::record_delegation(&env, &operator, &operator)?;
        events::publish_operator_metadata_uri(&env, operator, metadata_uri);
        Ok(())
    }

    /// Replace the operator's details. The undelegation notice may only grow.
    pub fn modify_operator_details(
        env: Env,
        operator: Address,
        details: OperatorDetails,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        operator.require_auth();
        let current = Self::registered_details(&env, &operator)?;
        if details.min_undelegation_notice_blocks > MAX_UNDELEGATION_NOTICE_BLOCKS {
            return Err(LedgerError::ExceedsCeiling);
        }
        if details.min_undelegation_notice_blocks < current.min_undelegation_notice_blocks {
            return Err(LedgerError::NoticeCannotDecrease);
        }

        Self::store_operator_details(&env, &operator, &details);
        events::publish_operator_details_modified(
            &env,
            operator,
            current.min_undelegation_notice_blocks,
            details,
        );
        Ok(())
    }

    pub fn update_operator_metadata_uri(
        env: Env,
        operator: Address,
        metadata_uri: String,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        operator.require_auth();
        Self::registered_details(&env, &operator)?;
        events::publish_operator_metadata_uri(&env, operator, metadata_uri);
        Ok(())
    }

    // ── Delegation ──────────────────────────────────────────────────────────

    /// Delegate `staker` to `operator`. `approver_signature` and
    /// `approver_salt` are only read when the operator has an approver.
    pub fn delegate(
        env: Env,
        staker: Address,
        operator: Address,
        approver_signature: Option<SignatureWithExpiry>,
        approver_salt: BytesN<32>,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        staker.require_auth();
        Self::delegate_checked(
            &env,
            &staker,
            &operator,
            &staker,
            approver_signature,
            &approver_salt,
        )
    }

    /// Delegate `staker` to `operator` on the strength of the staker's
    /// signature over its current nonce. `caller` relays the request.
    pub fn delegate_with_signature(
        env: Env,
        caller: Address,
        staker: Address,
        operator: Address,
        staker_signature: SignatureWithExpiry,
        approver_signature: Option<SignatureWithExpiry>,
        approver_salt: BytesN<32>,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();

        authorization::check_expiry(&env, staker_signature.expiry)?;
        let staker_nonce = nonce::current_nonce(&env, &staker);
        let digest = authorization::staker_delegation_digest(
            &env,
            &staker,
            &operator,
            staker_nonce,
            staker_signature.expiry,
        );
        authorization::verify_account_signature(&env, &staker, &digest, &staker_signature)?;
        nonce::consume_nonce(&env, &staker)?;

        Self::delegate_checked(
            &env,
            &staker,
            &operator,
            &caller,
            approver_signature,
            &approver_salt,
        )
    }

    /// End `staker`'s delegation and queue a withdrawal of every position it
    /// holds. The staker, its operator or the operator's approver may call.
    /// Returns one root per pool, in pool-list order.
    pub fn undelegate(
        env: Env,
        caller: Address,
        staker: Address,
    ) -> Result<Vec<BytesN<32>>, LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        pausable::require_not_paused(&env, PAUSED_ENTER_WITHDRAWAL_QUEUE)?;

        let operator =
            Self::delegated_to(env.clone(), staker.clone()).ok_or(LedgerError::StakerNotDelegated)?;
        if Self::is_operator(env.clone(), staker.clone()) {
            return Err(LedgerError::OperatorCannotUndelegate);
        }
        if caller != staker {
            let details = Self::registered_details(&env, &operator)?;
            let is_approver = details.delegation_approver.as_ref() == Some(&caller);
            if caller != operator && !is_approver {
                return Err(LedgerError::Unauthorized);
            }
        }

        env.storage()
            .persistent()
            .remove(&LedgerKey::DelegatedTo(staker.clone()));
        events::publish_staker_undelegated(&env, staker.clone(), operator.clone(), caller);

        let deposits = Self::registry_client(&env)?.get_deposits(&staker);
        let mut roots = Vec::new(&env);
        for (pool, shares) in deposits.pools.iter().zip(deposits.shares.iter()) {
            let root = Self::remove_and_queue(&env, &staker, &operator, &staker, &pool, shares)?;
            roots.push_back(root);
        }
        Ok(roots)
    }

    // ── Withdrawal queue ────────────────────────────────────────────────────

    /// Queue withdrawals on behalf of delegated stakers, with `withdrawer` as
    /// the sole party able to complete them. Each staker must authorize its
    /// part. Returns every root in input order.
    pub fn queue_withdrawals(
        env: Env,
        withdrawer: Address,
        params: Vec<QueuedWithdrawalParams>,
    ) -> Result<Vec<BytesN<32>>, LedgerError> {
        Self::require_initialized(&env)?;
        withdrawer.require_auth();
        pausable::require_not_paused(&env, PAUSED_ENTER_WITHDRAWAL_QUEUE)?;

        let registry = Self::registry_client(&env)?;
        let mut roots = Vec::new(&env);
        for request in params.iter() {
            if request.staker == withdrawer {
                return Err(LedgerError::WithdrawerMustNotBeStaker);
            }
            request.staker.require_auth();
            if request.pools.is_empty() {
                return Err(LedgerError::EmptyPoolList);
            }
            if request.pools.len() != request.shares.len() {
                return Err(LedgerError::LengthMismatch);
            }
            let operator = Self::delegated_to(env.clone(), request.staker.clone())
                .ok_or(LedgerError::StakerNotDelegated)?;

            for (pool, shares) in request.pools.iter().zip(request.shares.iter()) {
                if registry.third_party_forbidden(&pool) {
                    return Err(LedgerError::ForbiddenThirdParty);
                }
                if shares <= 0 {
                    return Err(LedgerError::ZeroShares);
                }
                let root = Self::remove_and_queue(
                    &env,
                    &request.staker,
                    &operator,
                    &withdrawer,
                    &pool,
                    shares,
                )?;
                roots.push_back(root);
            }
        }
        Ok(roots)
    }

    /// Complete `withdrawals[i]` in order. `tokens[i]` is the pool asset and
    /// `receive_as_tokens[i]` chooses between a payout and re-crediting the
    /// shares to the caller. The first failing entry aborts the call.
    pub fn complete_queued_withdrawals(
        env: Env,
        caller: Address,
        withdrawals: Vec<Withdrawal>,
        tokens: Vec<Address>,
        receive_as_tokens: Vec<bool>,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        pausable::require_not_paused(&env, PAUSED_EXIT_WITHDRAWAL_QUEUE)?;
        if withdrawals.len() != tokens.len() || withdrawals.len() != receive_as_tokens.len() {
            return Err(LedgerError::LengthMismatch);
        }

        for i in 0..withdrawals.len() {
            let withdrawal = withdrawals.get(i).ok_or(LedgerError::LengthMismatch)?;
            let token = tokens.get(i).ok_or(LedgerError::LengthMismatch)?;
            let as_tokens = receive_as_tokens.get(i).ok_or(LedgerError::LengthMismatch)?;
            Self::complete(&env, &caller, &withdrawal, &token, as_tokens)?;
        }
        Ok(())
    }

    pub fn complete_queued_withdrawal(
        env: Env,
        caller: Address,
        withdrawal: Withdrawal,
        token: Address,
        receive_as_tokens: bool,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        pausable::require_not_paused(&env, PAUSED_EXIT_WITHDRAWAL_QUEUE)?;
        Self::complete(&env, &caller, &withdrawal, &token, receive_as_tokens)
    }

    // ── Registry hooks ──────────────────────────────────────────────────────

    /// Raise the aggregate of `staker`'s operator after a deposit. No-op for
    /// undelegated stakers.
    pub fn increase_delegated_shares(
        env: Env,
        staker: Address,
        pool: Address,
        shares: i128,
    ) -> Result<(), LedgerError> {
        Self::require_registry(&env)?;
        if let Some(operator) = Self::delegated_to(env.clone(), staker.clone()) {
            Self::add_operator_shares(&env, &operator, &staker, &pool, shares)?;
        }
        Ok(())
    }

    pub fn decrease_delegated_shares(
        env: Env,
        staker: Address,
        pool: Address,
        shares: i128,
    ) -> Result<(), LedgerError> {
        Self::require_registry(&env)?;
        if let Some(operator) = Self::delegated_to(env.clone(), staker.clone()) {
            Self::sub_operator_shares(&env, &operator, &staker, &pool, shares)?;
        }
        Ok(())
    }

    // ── Signing keys ────────────────────────────────────────────────────────

    /// Declare `account` a direct ed25519 key-holder for delegation
    /// signatures and approvals.
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

    pub fn set_min_withdrawal_delay_blocks(
        env: Env,
        caller: Address,
        blocks: u32,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        access::require_tier(&env, &caller, AccessTier::Owner)?;
        if blocks > MAX_WITHDRAWAL_DELAY_BLOCKS {
            return Err(LedgerError::ExceedsCeiling);
        }
        let previous = Self::min_withdrawal_delay_blocks(env.clone());
        env.storage().instance().set(&MIN_WITHDRAWAL_DELAY, &blocks);
        events::publish_min_withdrawal_delay_set(&env, previous, blocks);
        Ok(())
    }

    pub fn set_pool_withdrawal_delay_blocks(
        env: Env,
        caller: Address,
        pools: Vec<Address>,
        blocks: Vec<u32>,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        access::require_tier(&env, &caller, AccessTier::Owner)?;
        if pools.len() != blocks.len() {
            return Err(LedgerError::LengthMismatch);
        }

        for (pool, delay) in pools.iter().zip(blocks.iter()) {
            if delay > MAX_WITHDRAWAL_DELAY_BLOCKS {
                return Err(LedgerError::ExceedsCeiling);
            }
            let previous = Self::pool_withdrawal_delay_blocks(env.clone(), pool.clone());
            let key = LedgerKey::PoolDelay(pool.clone());
            env.storage().persistent().set(&key, &delay);
            extend_ttl(&env, &key);
            events::publish_pool_withdrawal_delay_set(&env, pool, previous, delay);
        }
        Ok(())
    }

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

    pub fn delegated_to(env: Env, staker: Address) -> Option<Address> {
        env.storage()
            .persistent()
            .get(&LedgerKey::DelegatedTo(staker))
    }

    pub fn is_delegated(env: Env, staker: Address) -> bool {
        Self::delegated_to(env, staker).is_some()
    }

    pub fn is_operator(env: Env, account: Address) -> bool {
        env.storage()
            .persistent()
            .has(&LedgerKey::Operator(account))
    }

    pub fn operator_details(env: Env, operator: Address) -> Option<OperatorDetails> {
        env.storage()
            .persistent()
            .get(&LedgerKey::Operator(operator))
    }

    pub fn earnings_receiver(env: Env, operator: Address) -> Result<Address, LedgerError> {
        Ok(Self::registered_details(&env, &operator)?.earnings_receiver)
    }

    pub fn delegation_approver(env: Env, operator: Address) -> Option<Address> {
        Self::operator_details(env, operator).and_then(|details| details.delegation_approver)
    }

    pub fn min_undelegation_notice_blocks(env: Env, operator: Address) -> u32 {
        Self::operator_details(env, operator)
            .map(|details| details.min_undelegation_notice_blocks)
            .unwrap_or(0)
    }

    pub fn operator_shares(env: Env, operator: Address, pool: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&LedgerKey::OperatorShares(operator, pool))
            .unwrap_or(0)
    }

    pub fn operator_shares_batch(env: Env, operator: Address, pools: Vec<Address>) -> Vec<i128> {
        let mut shares = Vec::new(&env);
        for pool in pools.iter() {
            shares.push_back(Self::operator_shares(env.clone(), operator.clone(), pool));
        }
        shares
    }

    /// Every position `staker` could delegate, straight from the registry.
    pub fn get_delegatable_shares(env: Env, staker: Address) -> Result<Deposits, LedgerError> {
        Ok(Self::registry_client(&env)?.get_deposits(&staker))
    }

    pub fn min_withdrawal_delay_blocks(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&MIN_WITHDRAWAL_DELAY)
            .unwrap_or(0)
    }

    pub fn pool_withdrawal_delay_blocks(env: Env, pool: Address) -> u32 {
        env.storage()
            .persistent()
            .get(&LedgerKey::PoolDelay(pool))
            .unwrap_or(0)
    }

    /// Largest of the global delay and each listed pool's delay.
    pub fn withdrawal_delay(env: Env, pools: Vec<Address>) -> u32 {
        let mut delay = Self::min_withdrawal_delay_blocks(env.clone());
        for pool in pools.iter() {
            delay = delay.max(Self::pool_withdrawal_delay_blocks(env.clone(), pool));
        }
        delay
    }

    pub fn is_pending_withdrawal(env: Env, root: BytesN<32>) -> bool {
        env.storage().persistent().has(&LedgerKey::Pending(root))
    }

    pub fn cumulative_withdrawals_queued(env: Env, staker: Address) -> u64 {
        env.storage()
            .persistent()
            .get(&LedgerKey::CumulativeWithdrawals(staker))
            .unwrap_or(0)
    }

    pub fn calculate_withdrawal_root(env: Env, withdrawal: Withdrawal) -> BytesN<32> {
        env.crypto().sha256(&withdrawal.to_xdr(&env)).to_bytes()
    }

    pub fn delegation_approval_digest(
        env: Env,
        staker: Address,
        operator: Address,
        approver: Address,
        salt: BytesN<32>,
        expiry: u64,
    ) -> BytesN<32> {
        authorization::delegation_approval_digest(&env, &staker, &operator, &approver, &salt, expiry)
    }

    pub fn staker_delegation_digest(
        env: Env,
        staker: Address,
        operator: Address,
        nonce: u64,
        expiry: u64,
    ) -> BytesN<32> {
        authorization::staker_delegation_digest(&env, &staker, &operator, nonce, expiry)
    }

    pub fn staker_nonce(env: Env, staker: Address) -> u64 {
        nonce::current_nonce(&env, &staker)
    }

    pub fn is_salt_spent(env: Env, approver: Address, salt: BytesN<32>) -> bool {
        authorization::is_salt_spent(&env, &approver, &salt)
    }

    pub fn signing_key(env: Env, account: Address) -> Option<BytesN<32>> {
        authorization::signing_key(&env, &account)
    }

    pub fn registry(env: Env) -> Result<Address, LedgerError> {
        env.storage()
            .instance()
            .get(&REGISTRY)
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

    /// Guard: the registry contract must be the invoker.
    fn require_registry(env: &Env) -> Result<(), LedgerError> {
        let registry = Self::registry(env.clone())?;
        registry.require_auth();
        Ok(())
    }

    fn registry_client(env: &Env) -> Result<RegistryClient<'_>, LedgerError> {
        let registry = Self::registry(env.clone())?;
        Ok(RegistryClient::new(env, &registry))
    }

    fn registered_details(env: &Env, operator: &Address) -> Result<OperatorDetails, LedgerError> {
        Self::operator_details(env.clone(), operator.clone()).ok_or(LedgerError::OperatorNotRegistered)
    }

    fn store_operator_details(env: &Env, operator: &Address, details: &OperatorDetails) {
        let key = LedgerKey::Operator(operator.clone());
        env.storage().persistent().set(&key, details);
        extend_ttl(env, &key);
    }

    /// Shared tail of both delegation entry points. `relayer` is the account
    /// that submitted the request; an approver is not asked to sign off on
    /// requests it relays itself.
    fn delegate_checked(
        env: &Env,
        staker: &Address,
        operator: &Address,
        relayer: &Address,
        approver_signature: Option<SignatureWithExpiry>,
        approver_salt: &BytesN<32>,
    ) -> Result<(), LedgerError> {
        pausable::require_not_paused(env, PAUSED_NEW_DELEGATION)?;
        if Self::delegated_to(env.clone(), staker.clone()).is_some() {
            return Err(LedgerError::AlreadyDelegated);
        }
        let details = Self::registered_details(env, operator)?;

        if let Some(approver) = details.delegation_approver {
            if approver != *relayer && approver != *operator {
                let signature = approver_signature.ok_or(LedgerError::InvalidSignature)?;
                authorization::check_expiry(env, signature.expiry)?;
                if authorization::is_salt_spent(env, &approver, approver_salt) {
                    return Err(LedgerError::SaltAlreadySpent);
                }
                let digest = authorization::delegation_approval_digest(
                    env,
                    staker,
                    operator,
                    &approver,
                    approver_salt,
                    signature.expiry,
                );
                authorization::verify_account_signature(env, &approver, &digest, &signature)?;
                authorization::spend_salt(env, &approver, approver_salt)?;
            }
        }

        Self::record_delegation(env, staker, operator)
    }

    /// Write the edge and copy the staker's current positions into the
    /// operator's aggregate.
    fn record_delegation(env: &Env, staker: &Address, operator: &Address) -> Result<(), LedgerError> {
        let key = LedgerKey::DelegatedTo(staker.clone());
        env.storage().persistent().set(&key, operator);
        extend_ttl(env, &key);
        events::publish_staker_delegated(env, staker.clone(), operator.clone());

        let deposits = Self::registry_client(env)?.get_deposits(staker);
        for (pool, shares) in deposits.pools.iter().zip(deposits.shares.iter()) {
            Self::add_operator_shares(env, operator, staker, &pool, shares)?;
        }
        Ok(())
    }

    /// Debit the operator aggregate and the registry ledger, then record a
    /// pending withdrawal. Returns its root.
    fn remove_and_queue(
        env: &Env,
        staker: &Address,
        operator: &Address,
        withdrawer: &Address,
        pool: &Address,
        shares: i128,
    ) -> Result<BytesN<32>, LedgerError> {
        Self::sub_operator_shares(env, operator, staker, pool, shares)?;
        let registry = Self::registry_client(env)?;
        settle(registry.try_remove_shares(staker, pool, &shares))?;

        let nonce = Self::cumulative_withdrawals_queued(env.clone(), staker.clone());
        let counter_key = LedgerKey::CumulativeWithdrawals(staker.clone());
        let next = nonce.checked_add(1).ok_or(LedgerError::NonceOverflow)?;
        env.storage().persistent().set(&counter_key, &next);
        extend_ttl(env, &counter_key);

        let withdrawal = Withdrawal {
            staker: staker.clone(),
            delegated_to: operator.clone(),
            withdrawer: withdrawer.clone(),
            nonce,
            start_block: env.ledger().sequence(),
            pool: pool.clone(),
            shares,
        };
        let root = Self::calculate_withdrawal_root(env.clone(), withdrawal.clone());
        let pending_key = LedgerKey::Pending(root.clone());
        env.storage().persistent().set(&pending_key, &true);
        extend_ttl(env, &pending_key);

        events::publish_withdrawal_queued(env, root.clone(), withdrawal);
        Ok(root)
    }

    /// Load, validate, delete the root, then release. The root is gone before
    /// any asset leaves the pool.
    fn complete(
        env: &Env,
        caller: &Address,
        withdrawal: &Withdrawal,
        token: &Address,
        receive_as_tokens: bool,
    ) -> Result<(), LedgerError> {
        let root = Self::calculate_withdrawal_root(env.clone(), withdrawal.clone());
        if !Self::is_pending_withdrawal(env.clone(), root.clone()) {
            return Err(LedgerError::UnknownOrAlreadyCompleted);
        }

        let delay = Self::min_withdrawal_delay_blocks(env.clone())
            .max(Self::pool_withdrawal_delay_blocks(env.clone(), withdrawal.pool.clone()))
            .max(Self::min_undelegation_notice_blocks(
                env.clone(),
                withdrawal.delegated_to.clone(),
            ));
        let unlock_block = u64::from(withdrawal.start_block) + u64::from(delay);
        if u64::from(env.ledger().sequence()) < unlock_block {
            return Err(LedgerError::NoticeNotElapsed);
        }
        if *caller != withdrawal.withdrawer {
            return Err(LedgerError::NotAuthorizedWithdrawer);
        }

        env.storage().persistent().remove(&LedgerKey::Pending(root.clone()));

        let registry = Self::registry_client(env)?;
        let amount_out = if receive_as_tokens {
            settle(registry.try_withdraw_shares_as_tokens(
                caller,
                &withdrawal.pool,
                &withdrawal.shares,
                token,
            ))?
        } else {
            settle(registry.try_add_shares(caller, &withdrawal.pool, &withdrawal.shares))?;
            if let Some(operator) = Self::delegated_to(env.clone(), caller.clone()) {
                Self::add_operator_shares(env, &operator, caller, &withdrawal.pool, withdrawal.shares)?;
            }
            withdrawal.shares
        };

        events::publish_withdrawal_completed(
            env,
            root,
            caller.clone(),
            receive_as_tokens,
            amount_out,
        );
        Ok(())
    }

    fn add_operator_shares(
        env: &Env,
        operator: &Address,
        staker: &Address,
        pool: &Address,
        shares: i128,
    ) -> Result<(), LedgerError> {
        let before = Self::operator_shares(env.clone(), operator.clone(), pool.clone());
        let after = before
            .checked_add(shares)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Self::store_operator_shares(env, operator, pool, after);
        events::publish_operator_shares_changed(
            env,
            operator.clone(),
            staker.clone(),
            pool.clone(),
            before,
            after,
        );
        Ok(())
    }

    fn sub_operator_shares(
        env: &Env,
        operator: &Address,
        staker: &Address,
        pool: &Address,
        shares: i128,
    ) -> Result<(), LedgerError> {
        let before = Self::operator_shares(env.clone(), operator.clone(), pool.clone());
        let after = before
            .checked_sub(shares)
            .filter(|after| *after >= 0)
            .ok_or(LedgerError::SharesExceedBalance)?;
        Self::store_operator_shares(env, operator, pool, after);
        events::publish_operator_shares_changed(
            env,
            operator.clone(),
            staker.clone(),
            pool.clone(),
            before,
            after,
        );
        Ok(())
    }

    fn store_operator_shares(env: &Env, operator: &Address, pool: &Address, shares: i128) {
        let key = LedgerKey::OperatorShares(operator.clone(), pool.clone());
        if shares == 0 {
            env.storage().persistent().remove(&key);
        } else {
            env.storage().persistent().set(&key, &shares);
            extend_ttl(env, &key);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
