mod common;

use common::*;
use p5_lib::errors::FarmError;

fn boosted_farm(start_block: u64) -> TestRuntime {
    let mut rt = deploy(10, 10, start_block, 1000);
    rt.fund(100_000);
    rt.add_pool(&owner(), 100, lp(), true).unwrap();
    assert_eq!(rt.farm.total_alloc_point(), 100);
    rt
}

/// bob escrows 4 boost tokens and alice 5, both staking 10 lp before the start.
fn two_boosted_users(start_block: u64) -> TestRuntime {
    let mut rt = boosted_farm(start_block);
    rt.nft.gift(4, &bob());
    rt.nft.gift(5, &alice());
    rt.nft.set_approval_for_all(&bob(), &farm_acc(), true);
    rt.nft.set_approval_for_all(&alice(), &farm_acc(), true);
    rt.approve_ft(&lp(), &bob(), 1000);
    rt.approve_ft(&lp(), &alice(), 1000);
    rt.at(1).deposit(0, &bob(), 10).unwrap();
    rt.at(2).deposit(0, &alice(), 10).unwrap();
    assert_eq!(rt.ft.balance(&lp(), &farm_acc()), 20);

    rt.at(3).boost_all(0, &bob()).unwrap();
    assert_eq!(rt.nft.balance_of(&bob()), 0);
    rt.at(4).boost_all(0, &alice()).unwrap();
    assert_eq!(rt.nft.balance_of(&alice()), 0);
    rt
}

#[test]
fn boost_requires_stake() {
    let mut rt = deploy(100, 100, 100, 1000);
    rt.add_pool(&owner(), 100, lp(), true).unwrap();
    let token = rt.nft.gift(1, &bob()).remove(0);
    rt.nft.approve(&token, &farm_acc());
    assert_eq!(rt.nft.balance_of(&bob()), 1);

    assert_eq!(rt.at(5).boost(0, &bob(), token.clone()), Err(FarmError::NoDepositedStake));

    rt.approve_ft(&lp(), &bob(), 1000);
    rt.at(6).deposit(0, &bob(), 10).unwrap();
    rt.at(7).boost(0, &bob(), token.clone()).unwrap();
    assert_eq!(rt.nft.balance_of(&bob()), 0);
    assert_eq!(rt.nft.balance_of(&farm_acc()), 1);

    rt.at(3600);
    let boosted = rt.farm.boosted_tokens(0, &bob());
    assert_eq!(boosted.len(), 1);
    assert_eq!(boosted[0].token_id, token);
    assert!(boosted[0].boosted_at > 0);
}

#[test]
fn boost_doubles_reward() {
    let mut rt = boosted_farm(5000);
    rt.nft.gift(4, &bob());
    rt.nft.set_approval_for_all(&bob(), &farm_acc(), true);
    rt.approve_ft(&lp(), &bob(), 1000);
    rt.at(1).deposit(0, &bob(), 10).unwrap();
    assert_eq!(rt.ft.balance(&lp(), &farm_acc()), 10);
    rt.at(2).boost_all(0, &bob()).unwrap();
    assert_eq!(rt.nft.balance_of(&bob()), 0);

    rt.at(5010);
    assert_eq!(rt.pending_base_reward(0, &bob()).unwrap(), 100);
    assert_eq!(rt.pending_boost_reward(0, &bob()).unwrap(), 100);
    assert_eq!(rt.pending_reward(0, &bob()).unwrap(), 200);
}

#[test]
fn boost_pot_split_by_weight() {
    let mut rt = two_boosted_users(6000);
    let pool = rt.pool_info(0).unwrap();
    assert_eq!((pool.total_boost, pool.total_boost_weight.0), (9, 300));

    rt.at(6010).harvest(0, &bob()).unwrap();
    rt.at(6011).harvest(0, &alice()).unwrap();
    assert_eq!(rt.ann_balance(&bob()), 83);
    assert_eq!(rt.ann_balance(&alice()), 128);
}

#[test]
fn unboost_sequence() {
    let mut rt = two_boosted_users(7000);
    rt.at(7010);
    assert_eq!(rt.pending_reward(0, &bob()).unwrap(), 83);
    assert_eq!(rt.pending_reward(0, &alice()).unwrap(), 116);

    let s = rt.at(7011).unboost_partially(0, &alice(), 1).unwrap();
    assert_eq!(s.nft_out.len(), 1);
    assert_eq!(rt.ann_balance(&alice()), 128);
    assert_eq!(rt.nft.balance_of(&alice()), 1);

    rt.at(7020);
    assert_eq!(rt.pending_reward(0, &bob()).unwrap(), 181);
    assert_eq!(rt.pending_reward(0, &alice()).unwrap(), 90);

    rt.at(7021).unboost_all(0, &alice()).unwrap();
    assert_eq!(rt.nft.balance_of(&alice()), 5);
    assert_eq!(rt.pool_info(0).unwrap().total_boost, 4);

    rt.at(7030);
    assert_eq!(rt.pending_reward(0, &bob()).unwrap(), 326);
    assert_eq!(rt.pending_reward(0, &alice()).unwrap(), 45);
    assert_eq!(rt.ann_balance(&alice()), 228);

    rt.at(7031).harvest(0, &bob()).unwrap();
    rt.at(7032).harvest(0, &alice()).unwrap();
    assert_eq!(rt.ann_balance(&bob()), 341);
    assert_eq!(rt.ann_balance(&alice()), 283);

    rt.at(7041);
    assert_eq!(rt.pending_reward(0, &bob()).unwrap(), 150);
    assert_eq!(rt.pending_reward(0, &alice()).unwrap(), 45);
}

#[test]
fn unboost_releases_latest_first() {
    let mut rt = two_boosted_users(100);
    let escrowed: Vec<_> =
        rt.farm.boosted_tokens(0, &alice()).into_iter().map(|t| t.token_id).collect();
    let s = rt.at(10).unboost_partially(0, &alice(), 2).unwrap();
    let released: Vec<_> = s.nft_out.iter().map(|t| t.token_id.clone()).collect();
    assert_eq!(released, escrowed[3..].to_vec());
    assert_eq!(rt.farm.user_stake(0, &alice()).unwrap().boost_amount(), 3);
    assert_eq!(
        rt.unboost_partially(0, &alice(), 4),
        Err(FarmError::NotEnoughBoostTokens { requested: 4, available: 3 })
    );
    assert_eq!(
        rt.unboost_all(0, &carol()),
        Err(FarmError::NotEnoughBoostTokens { requested: 0, available: 0 })
    );
}

#[test]
fn boost_locked_until_unstakable_block() {
    let mut rt = two_boosted_users(100);
    rt.set_unstakable_block(&owner(), 500).unwrap();
    assert_eq!(
        rt.at(499).unboost_all(0, &bob()),
        Err(FarmError::NotUnstakableYet { unlocks_at: 500 })
    );
    assert_eq!(rt.nft.balance_of(&bob()), 0);
    rt.at(500).unboost_all(0, &bob()).unwrap();
    assert_eq!(rt.nft.balance_of(&bob()), 4);
}

#[test]
fn boost_partially_picks_owned_tokens() {
    let mut rt = boosted_farm(100);
    rt.nft.gift(5, &bob());
    rt.nft.set_approval_for_all(&bob(), &farm_acc(), true);
    rt.approve_ft(&lp(), &bob(), 1000);
    rt.at(1).deposit(0, &bob(), 10).unwrap();

    rt.at(2).boost_partially(0, &bob(), 2).unwrap();
    assert_eq!(rt.nft.balance_of(&bob()), 3);
    assert_eq!(rt.pool_info(0).unwrap().total_boost_weight.0, 30);
    assert_eq!(
        rt.boost_partially(0, &bob(), 4),
        Err(FarmError::NotEnoughBoostTokens { requested: 4, available: 3 })
    );
    assert!(rt.boost_partially(0, &bob(), 0).is_err());

    // tiers stop growing at five tokens
    rt.at(3).boost_all(0, &bob()).unwrap();
    let user = rt.farm.user_stake(0, &bob()).unwrap();
    assert_eq!((user.boost_amount(), user.boost_weight), (5, 200));
}

#[test]
fn boost_without_approval_is_rolled_back() {
    let mut rt = boosted_farm(100);
    let token = rt.nft.gift(1, &bob()).remove(0);
    rt.approve_ft(&lp(), &bob(), 1000);
    rt.at(1).deposit(0, &bob(), 10).unwrap();

    assert!(matches!(rt.at(2).boost_all(0, &bob()), Err(FarmError::TransferFailed(_))));
    assert!(matches!(rt.boost(0, &bob(), token.clone()), Err(FarmError::TransferFailed(_))));
    assert!(matches!(rt.boost(0, &bob(), "404".to_string()), Err(FarmError::TransferFailed(_))));

    let pool = rt.pool_info(0).unwrap();
    assert_eq!((pool.total_boost, pool.total_boost_weight.0), (0, 0));
    assert!(rt.farm.boosted_tokens(0, &bob()).is_empty());
    assert_eq!(rt.nft.balance_of(&bob()), 1);
}

#[test]
fn emergency_withdraw_forfeits_rewards_keeps_escrow() {
    let mut rt = two_boosted_users(100);
    assert!(rt.at(110).pending_reward(0, &bob()).unwrap() > 0);
    let s = rt.emergency_withdraw(0, &bob()).unwrap();
    assert_eq!((s.stake_out, s.reward(), s.dev_fee), (10, 0, 0));
    assert_eq!(rt.pending_reward(0, &bob()).unwrap(), 0);
    assert_eq!(rt.ft.balance(&lp(), &bob()), 1000);
    assert_eq!(rt.ann_balance(&bob()), 0);
    assert_eq!(rt.farm.boosted_tokens(0, &bob()).len(), 4);
    assert_eq!(rt.nft.balance_of(&bob()), 0);

    // the boost pot keeps paying the escrowed tokens, but boosting more needs stake
    rt.nft.gift(1, &bob());
    assert_eq!(rt.at(111).boost_all(0, &bob()), Err(FarmError::NoDepositedStake));
    rt.at(120).unboost_all(0, &bob()).unwrap();
    assert_eq!(rt.nft.balance_of(&bob()), 5);
    assert!(rt.ann_balance(&bob()) > 0);
}
