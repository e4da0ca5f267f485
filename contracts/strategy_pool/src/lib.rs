#![no_std]

pub mod events;

use common::{
    access::{self, AccessTier},
    constants::{BALANCE_OFFSET, MAX_TOTAL_SHARES, SHARES_OFFSET},
    interfaces::RegistryClient,
    LedgerError,
};
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, Env, Symbol, I256,
};

// ── Storage key constants ────────────────────────────────────────────────────

const INITIALIZED: Symbol = symbol_short!("INIT");
const REGISTRY: Symbol = symbol_short!("REGISTRY");
const TOKEN: Symbol = symbol_short!("TOKEN");
const TOTAL_SHARES: Symbol = symbol_short!("TOT_SHR");
const MAX_PER_DEPOSIT: Symbol = symbol_short!("MAX_PER");
const MAX_TOTAL_DEPOSIT: Symbol = symbol_short!("MAX_TOT");

// ── Public-facing types ──────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositLimits {
    pub max_per_deposit: i128,
    pub max_total_deposit: i128,
}

// ── Contract ─────────────────────────────────────────────────────────────────

/// A single-asset share pool.
///
/// Holders own shares rather than asset amounts. Shares are priced against the
/// pool's live token balance, padded on both sides by a virtual offset:
///
/// ```text
/// shares_out = amount * (total_shares + SHARES_OFFSET) / (balance_before + BALANCE_OFFSET)
/// amount_out = shares * (balance + BALANCE_OFFSET) / (total_shares + SHARES_OFFSET)
/// ```
///
/// Yield that lands in the pool raises the price for every holder at once, and
/// the offsets keep an empty pool from being priced by its first depositor.
/// Per-staker balances live in the registry; this contract only tracks the total.
#[contract]
pub struct StrategyPoolContract;

#[contractimpl]
impl StrategyPoolContract {
    // ── Initialisation ──────────────────────────────────────────────────────

    /// Bootstrap the pool.
    ///
    /// * `registry` – the only contract allowed to deposit and withdraw.
    /// * `token`    – the asset this pool accepts.
    pub fn initialize(
        env: Env,
        owner: Address,
        registry: Address,
        token: Address,
        max_per_deposit: i128,
        max_total_deposit: i128,
    ) -> Result<(), LedgerError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(LedgerError::AlreadyInitialized);
        }
        Self::validate_limits(max_per_deposit, max_total_deposit)?;

        env.storage().instance().set(&INITIALIZED, &true);
        env.storage().instance().set(&REGISTRY, &registry);
        env.storage().instance().set(&TOKEN, &token);
        env.storage().instance().set(&MAX_PER_DEPOSIT, &max_per_deposit);
        env.storage().instance().set(&MAX_TOTAL_DEPOSIT, &max_total_deposit);
        access::bootstrap_owner(&env, &owner);

        events::publish_initialized(
            &env,
            owner,
            registry,
            token,
            max_per_deposit,
            max_total_deposit,
        );
        Ok(())
    }

    // ── Registry-only mutations ─────────────────────────────────────────────

    /// Mint shares for `amount` of `token` the registry has already moved into
    /// this pool. Returns the minted shares.
    pub fn deposit(env: Env, token: Address, amount: i128) -> Result<i128, LedgerError> {
        Self::require_registry(&env)?;
        let underlying = Self::underlying_token(env.clone())?;
        if token != underlying {
            return Err(LedgerError::WrongAsset);
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidInput);
        }

        let limits = Self::deposit_limits(env.clone());
        if amount > limits.max_per_deposit {
            return Err(LedgerError::PerDepositLimitExceeded);
        }
        let balance = Self::balance(&env, &underlying);
        if balance > limits.max_total_deposit {
            return Err(LedgerError::TotalDepositLimitExceeded);
        }

        // The registry transfers before calling in, so the balance already
        // includes `amount`.
        let balance_before = balance
            .checked_sub(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let total_before = Self::total_shares(env.clone());
        let shares = Self::mul_div(
            &env,
            amount,
            Self::padded(total_before, SHARES_OFFSET)?,
            Self::padded(balance_before, BALANCE_OFFSET)?,
        )?;
        if shares == 0 {
            return Err(LedgerError::ZeroSharesMinted);
        }

        let total_after = total_before
            .checked_add(shares)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        if total_after > MAX_TOTAL_SHARES {
            return Err(LedgerError::TotalSharesExceedMax);
        }
        env.storage().instance().set(&TOTAL_SHARES, &total_after);

        events::publish_shares_minted(&env, amount, shares, total_before, total_after);
        Ok(shares)
    }

    /// Burn `shares` and send the corresponding amount of `token` to
    /// `recipient`. Returns the amount released, which may round to zero.
    pub fn withdraw(
        env: Env,
        recipient: Address,
        token: Address,
        shares: i128,
    ) -> Result<i128, LedgerError> {
        Self::require_registry(&env)?;
        let underlying = Self::underlying_token(env.clone())?;
        if token != underlying {
            return Err(LedgerError::WrongAsset);
        }
        if shares < 0 {
            return Err(LedgerError::InvalidInput);
        }
        let total_before = Self::total_shares(env.clone());
        if shares > total_before {
            return Err(LedgerError::SharesExceedTotal);
        }

        let balance = Self::balance(&env, &underlying);
        let amount_out = Self::mul_div(
            &env,
            shares,
            Self::padded(balance, BALANCE_OFFSET)?,
            Self::padded(total_before, SHARES_OFFSET)?,
        )?;

        // Burn the full share amount even when the payout rounds to zero.
        let total_after = total_before - shares;
        env.storage().instance().set(&TOTAL_SHARES, &total_after);

        if amount_out > 0 {
            token::Client::new(&env, &underlying).transfer(
                &env.current_contract_address(),
                &recipient,
                &amount_out,
            );
        }

        events::publish_shares_burned(
            &env,
            recipient,
            shares,
            amount_out,
            total_before,
            total_after,
        );
        Ok(amount_out)
    }

    // ── Admin ───────────────────────────────────────────────────────────────

    pub fn set_deposit_limits(
        env: Env,
        caller: Address,
        max_per_deposit: i128,
        max_total_deposit: i128,
    ) -> Result<(), LedgerError> {
        Self::require_initialized(&env)?;
        caller.require_auth();
        access::require_tier(&env, &caller, AccessTier::Owner)?;
        Self::validate_limits(max_per_deposit, max_total_deposit)?;

        let previous = Self::deposit_limits(env.clone());
        env.storage().instance().set(&MAX_PER_DEPOSIT, &max_per_deposit);
        env.storage().instance().set(&MAX_TOTAL_DEPOSIT, &max_total_deposit);

        events::publish_deposit_limits_set(
            &env,
            previous.max_per_deposit,
            max_per_deposit,
            previous.max_total_deposit,
            max_total_deposit,
        );
        Ok(())
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

    pub fn total_shares(env: Env) -> i128 {
        env.storage().instance().get(&TOTAL_SHARES).unwrap_or(0)
    }

    pub fn underlying_token(env: Env) -> Result<Address, LedgerError> {
        env.storage()
            .instance()
            .get(&TOKEN)
            .ok_or(LedgerError::NotInitialized)
    }

    pub fn registry(env: Env) -> Result<Address, LedgerError> {
        env.storage()
            .instance()
            .get(&REGISTRY)
            .ok_or(LedgerError::NotInitialized)
    }

    pub fn owner(env: Env) -> Result<Address, LedgerError> {
        access::owner(&env)
    }

    pub fn pending_owner(env: Env) -> Option<Address> {
        access::pending_owner(&env)
    }

    pub fn deposit_limits(env: Env) -> DepositLimits {
        DepositLimits {
            max_per_deposit: env.storage().instance().get(&MAX_PER_DEPOSIT).unwrap_or(0),
            max_total_deposit: env.storage().instance().get(&MAX_TOTAL_DEPOSIT).unwrap_or(0),
        }
    }

    /// Current asset value of `shares`, without mutating state.
    pub fn shares_to_underlying_view(env: Env, shares: i128) -> Result<i128, LedgerError> {
        let underlying = Self::underlying_token(env.clone())?;
        let balance = Self::balance(&env, &underlying);
        let total = Self::total_shares(env.clone());
        Self::mul_div(
            &env,
            shares,
            Self::padded(balance, BALANCE_OFFSET)?,
            Self::padded(total, SHARES_OFFSET)?,
        )
    }

    /// Shares a deposit of `amount` would mint right now.
    pub fn underlying_to_shares_view(env: Env, amount: i128) -> Result<i128, LedgerError> {
        let underlying = Self::underlying_token(env.clone())?;
        let balance = Self::balance(&env, &underlying);
        let total = Self::total_shares(env.clone());
        Self::mul_div(
            &env,
            amount,
            Self::padded(total, SHARES_OFFSET)?,
            Self::padded(balance, BALANCE_OFFSET)?,
        )
    }

    /// `staker`'s share balance in this pool, as recorded by the registry.
    pub fn shares(env: Env, staker: Address) -> Result<i128, LedgerError> {
        let registry = Self::registry(env.clone())?;
        Ok(RegistryClient::new(&env, &registry).staker_shares(&staker, &env.current_contract_address()))
    }

    pub fn user_underlying_view(env: Env, staker: Address) -> Result<i128, LedgerError> {
        let shares = Self::shares(env.clone(), staker)?;
        Self::shares_to_underlying_view(env, shares)
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

    fn validate_limits(max_per_deposit: i128, max_total_deposit: i128) -> Result<(), LedgerError> {
        if max_per_deposit < 0 || max_total_deposit < 0 || max_per_deposit >= max_total_deposit {
            return Err(LedgerError::InvalidDepositLimits);
        }
        Ok(())
    }

    fn balance(env: &Env, token: &Address) -> i128 {
        token::Client::new(env, token).balance(&env.current_contract_address())
    }

    fn padded(value: i128, offset: i128) -> Result<i128, LedgerError> {
        value.checked_add(offset).ok_or(LedgerError::ArithmeticOverflow)
    }

    /// `a * b / c`, rounding down. The product is taken in 256 bits so only a
    /// quotient that does not fit `i128` overflows.
    fn mul_div(env: &Env, a: i128, b: i128, c: i128) -> Result<i128, LedgerError> {
        if c == 0 {
            return Err(LedgerError::ArithmeticOverflow);
        }
        I256::from_i128(env, a)
            .mul(&I256::from_i128(env, b))
            .div(&I256::from_i128(env, c))
            .to_i128()
            .ok_or(LedgerError::ArithmeticOverflow)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
