#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use soroban_sdk::{testutils::Address as _, token::StellarAssetClient, Address, Env};
use strategy_pool::{StrategyPoolContract, StrategyPoolContractClient};

#[derive(Arbitrary, Debug)]
pub enum FuzzAction {
    Deposit { amount: u64 },
    Withdraw { shares: u64 },
    Donate { amount: u32 },
}

fuzz_target!(|actions: Vec<FuzzAction>| {
    let env = Env::default();
    env.mock_all_auths();

    let token = env
        .register_stellar_asset_contract_v2(Address::generate(&env))
        .address();
    let contract_id = env.register(StrategyPoolContract, ());
    let client = StrategyPoolContractClient::new(&env, &contract_id);
    let asset = StellarAssetClient::new(&env, &token);

    let owner = Address::generate(&env);
    let registry = Address::generate(&env);
    let _ = client.try_initialize(&owner, &registry, &token, &(i128::MAX - 1), &i128::MAX);

    let recipient = Address::generate(&env);
    let mut minted = 0i128;

    // Looking for overflow panics in the offset math, and for a share burn
    // that ever leaves the supply negative.
    for action in actions {
        match action {
            FuzzAction::Deposit { amount } => {
                let amount = amount as i128;
                if amount > 0 {
                    asset.mint(&contract_id, &amount);
                }
                if let Ok(Ok(shares)) = client.try_deposit(&token, &amount) {
                    minted += shares;
                }
            }
            FuzzAction::Withdraw { shares } => {
                if let Ok(Ok(_)) = client.try_withdraw(&recipient, &token, &(shares as i128)) {
                    minted -= shares as i128;
                }
            }
            FuzzAction::Donate { amount } => {
                if amount > 0 {
                    asset.mint(&contract_id, &(amount as i128));
                }
            }
        }
        assert!(minted >= 0);
        assert_eq!(client.total_shares(), minted);
    }
});
