#![no_main]

use arbitrary::Arbitrary;
use delegation_ledger::{
    DelegationLedgerContract, DelegationLedgerContractClient, OperatorDetails,
    QueuedWithdrawalParams, Withdrawal,
};
use libfuzzer_sys::fuzz_target;
use soroban_sdk::{
    testutils::{Address as _, Ledger as _},
    token::StellarAssetClient,
    vec, Address, BytesN, Env, String,
};
use strategy_pool::{StrategyPoolContract, StrategyPoolContractClient};
use strategy_registry::{StrategyRegistryContract, StrategyRegistryContractClient};

#[derive(Arbitrary, Debug)]
pub enum FuzzAction {
    Deposit { staker: u8, amount: u32 },
    Delegate { staker: u8, operator: u8 },
    Undelegate { caller: u8, staker: u8 },
    Queue { staker: u8, shares: u32 },
    AdvanceBlocks { blocks: u8 },
    RaiseNotice { operator: u8, blocks: u8 },
    Complete { index: u8, receive_as_tokens: bool },
}

fuzz_target!(|actions: Vec<FuzzAction>| {
    let env = Env::default();
    env.mock_all_auths();

    let token = env
        .register_stellar_asset_contract_v2(Address::generate(&env))
        .address();
    let ledger_id = env.register(DelegationLedgerContract, ());
    let registry_id = env.register(StrategyRegistryContract, ());
    let pool_id = env.register(StrategyPoolContract, ());
    let ledger = DelegationLedgerContractClient::new(&env, &ledger_id);
    let registry = StrategyRegistryContractClient::new(&env, &registry_id);

    let owner = Address::generate(&env);
    ledger.initialize(&owner, &registry_id, &5);
    registry.initialize(&owner, &ledger_id);
    StrategyPoolContractClient::new(&env, &pool_id).initialize(
        &owner,
        &registry_id,
        &token,
        &1_000_000_000_000,
        &1_000_000_000_000_000,
    );
    registry.add_pools(&owner, &vec![&env, pool_id.clone()], &vec![&env, false]);

    let mut operators = std::vec::Vec::new();
    for _ in 0..2 {
        let operator = Address::generate(&env);
        ledger.register_as_operator(
            &operator,
            &OperatorDetails {
                earnings_receiver: operator.clone(),
                delegation_approver: None,
                min_undelegation_notice_blocks: 0,
            },
            &String::from_str(&env, ""),
        );
        operators.push(operator);
    }
    let mut stakers = std::vec::Vec::new();
    for _ in 0..4 {
        stakers.push(Address::generate(&env));
    }
    let guardian = Address::generate(&env);
    let salt = BytesN::from_array(&env, &[0u8; 32]);
    let asset = StellarAssetClient::new(&env, &token);

    // try_* calls turn contract errors and host traps alike into Err, so only
    // the conservation assertion can fail the run. Queued withdrawals are
    // tracked so they can be completed and counted against the pool total.
    let mut queued: std::vec::Vec<Withdrawal> = std::vec::Vec::new();
    for action in actions {
        match action {
            FuzzAction::Deposit { staker, amount } => {
                let staker = &stakers[staker as usize % stakers.len()];
                let amount = amount as i128;
                if amount > 0 {
                    asset.mint(staker, &amount);
                }
                let _ = registry.try_deposit_into_pool(staker, &pool_id, &token, &amount);
            }
            FuzzAction::Delegate { staker, operator } => {
                let staker = &stakers[staker as usize % stakers.len()];
                let operator = &operators[operator as usize % operators.len()];
                let _ = ledger.try_delegate(staker, operator, &None, &salt);
            }
            FuzzAction::Undelegate { caller, staker } => {
                let staker = &stakers[staker as usize % stakers.len()];
                let caller = if caller % 2 == 0 {
                    staker.clone()
                } else {
                    operators[caller as usize % operators.len()].clone()
                };
                let shares = registry.staker_shares(staker, &pool_id);
                let operator = ledger.delegated_to(staker);
                let nonce = ledger.cumulative_withdrawals_queued(staker);
                let start_block = env.ledger().sequence();
                if let (Ok(Ok(_)), Some(operator)) = (ledger.try_undelegate(&caller, staker), operator)
                {
                    if shares > 0 {
                        queued.push(Withdrawal {
                            staker: staker.clone(),
                            delegated_to: operator,
                            withdrawer: staker.clone(),
                            nonce,
                            start_block,
                            pool: pool_id.clone(),
                            shares,
                        });
                    }
                }
            }
            FuzzAction::Queue { staker, shares } => {
                let staker = &stakers[staker as usize % stakers.len()];
                let shares = shares as i128;
                let operator = ledger.delegated_to(staker);
                let nonce = ledger.cumulative_withdrawals_queued(staker);
                let start_block = env.ledger().sequence();
                let request = QueuedWithdrawalParams {
                    staker: staker.clone(),
                    pools: vec![&env, pool_id.clone()],
                    shares: vec![&env, shares],
                };
                if let (Ok(Ok(_)), Some(operator)) = (
                    ledger.try_queue_withdrawals(&guardian, &vec![&env, request]),
                    operator,
                ) {
                    queued.push(Withdrawal {
                        staker: staker.clone(),
                        delegated_to: operator,
                        withdrawer: guardian.clone(),
                        nonce,
                        start_block,
                        pool: pool_id.clone(),
                        shares,
                    });
                }
            }
            FuzzAction::AdvanceBlocks { blocks } => {
                env.ledger().with_mut(|li| li.sequence_number += blocks as u32);
            }
            FuzzAction::RaiseNotice { operator, blocks } => {
                let operator = &operators[operator as usize % operators.len()];
                let current = ledger.min_undelegation_notice_blocks(operator);
                let _ = ledger.try_modify_operator_details(
                    operator,
                    &OperatorDetails {
                        earnings_receiver: operator.clone(),
                        delegation_approver: None,
                        min_undelegation_notice_blocks: current + blocks as u32,
                    },
                );
            }
            FuzzAction::Complete {
                index,
                receive_as_tokens,
            } => {
                if !queued.is_empty() {
                    let index = index as usize % queued.len();
                    let entry = queued[index].clone();
                    if let Ok(Ok(())) = ledger.try_complete_queued_withdrawal(
                        &entry.withdrawer,
                        &entry,
                        &token,
                        &receive_as_tokens,
                    ) {
                        queued.remove(index);
                    }
                }
            }
        }

        let held: i128 = stakers
            .iter()
            .chain(operators.iter())
            .chain(core::iter::once(&guardian))
            .map(|account| registry.staker_shares(account, &pool_id))
            .sum();
        let total = StrategyPoolContractClient::new(&env, &pool_id).total_shares();
        let pending: i128 = queued.iter().map(|entry| entry.shares).sum();
        assert_eq!(held + pending, total);
    }
});
