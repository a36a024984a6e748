use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::json_types::U128;
use near_sdk::{
    assert_one_yocto, env, log, near_bindgen, require, AccountId, Balance, BlockHeight,
    PanicOnDefault, Promise, PromiseOrValue, PromiseResult, ONE_YOCTO,
};

use p5_lib::boost::{BoostTier, BoostTiers};
use p5_lib::config::{DevFeeMode, FarmConfig};
use p5_lib::constants::*;
use p5_lib::errors::FarmError;
use p5_lib::farm::{Farm, Settlement};
use p5_lib::pool::{PoolId, PoolInfo};
use p5_lib::stake::{BoostedToken, UserInfo};
use p5_lib::TokenId;

pub mod helpers;
pub mod interfaces;
pub mod token_standards;

use crate::helpers::*;
use crate::interfaces::*;

/// MasterChef style farm: pools accrue the reward token per block and share it
/// between stakers proportionally to their stake. Boost NFTs escrowed by a
/// staker earn a share of a separate boost emission.
#[near_bindgen]
#[derive(BorshDeserialize, BorshSerialize, PanicOnDefault)]
pub struct Contract {
    /// Status
    pub is_active: bool,
    /// pools, user positions, boost escrow and the reward reserve
    farm: Farm,
}

#[near_bindgen]
impl Contract {
    /// Initializes the farm with the default boost tiers and a 10% dev fee.
    /// * `reward_per_block`: base emission shared by all pools
    /// * `boost_reward_per_block`: boost pot emission shared by boosted positions
    /// * `start_block`: first block accruing rewards, also the start of the bonus window
    /// * `bonus_end_block`: first block without the bonus multiplier
    #[init]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: AccountId,
        dev_id: AccountId,
        reward_token: AccountId,
        boost_nft: AccountId,
        reward_per_block: U128,
        boost_reward_per_block: U128,
        start_block: BlockHeight,
        bonus_end_block: BlockHeight,
    ) -> Self {
        let config = FarmConfig::new(
            owner_id,
            dev_id,
            reward_token,
            boost_nft,
            reward_per_block.0,
            boost_reward_per_block.0,
            start_block,
            bonus_end_block,
        );
        Self {
            is_active: true,
            farm: unwrap_or_panic(Farm::new(config)),
        }
    }

    // ************ //
    // view methods //

    pub fn get_contract_params(&self) -> P5ContractParams {
        let c = &self.farm.config;
        P5ContractParams {
            is_active: self.is_active,
            owner_id: c.owner_id.clone(),
            dev_id: c.dev_id.clone(),
            reward_token: c.reward_token.clone(),
            boost_nft: c.boost_nft.clone(),
            reward_per_block: c.reward_per_block.into(),
            boost_reward_per_block: c.boost_reward_per_block.into(),
            bonus_multiplier: c.bonus_multiplier,
            start_block: c.start_block,
            bonus_start_block: c.bonus_start_block,
            bonus_end_block: c.bonus_end_block,
            dev_fee_bps: c.dev_fee_bps,
            dev_fee_mode: c.dev_fee_mode,
            unstakable_block: c.unstakable_block,
            claim_base_reward_block: c.claim_base_reward_block,
            claim_boost_reward_block: c.claim_boost_reward_block,
            total_alloc_point: self.farm.total_alloc_point(),
            pool_length: self.farm.pool_length(),
            reward_reserve: self.farm.reward_reserve().into(),
            dev_fee_owed: self.farm.dev_fee_owed().into(),
            total_paid: self.farm.total_paid().into(),
        }
    }

    pub fn pool_length(&self) -> u32 {
        self.farm.pool_length()
    }

    pub fn total_alloc_point(&self) -> u64 {
        self.farm.total_alloc_point()
    }

    /// Reward tokens available for payouts. Staked tokens are not included.
    pub fn reward_reserve(&self) -> U128 {
        self.farm.reward_reserve().into()
    }

    pub fn get_pool_info(&self, pool_id: PoolId) -> PoolInfo {
        unwrap_or_panic(self.farm.pool_info(pool_id))
    }

    pub fn get_pools(&self) -> Vec<PoolInfo> {
        (0..self.farm.pool_length())
            .filter_map(|pool_id| self.farm.pool_info(pool_id).ok())
            .collect()
    }

    pub fn boost_tiers(&self) -> Vec<BoostTier> {
        self.farm.boost_curve().tiers().to_vec()
    }

    /// Returns None if the account has no position in the pool.
    pub fn user_info(&self, pool_id: PoolId, account_id: AccountId) -> Option<UserInfo> {
        self.farm.user_stake(pool_id, &account_id).map(|u| u.info())
    }

    pub fn boosted_tokens(&self, pool_id: PoolId, account_id: AccountId) -> Vec<BoostedToken> {
        self.farm.boosted_tokens(pool_id, &account_id)
    }

    pub fn pending_base_reward(&self, pool_id: PoolId, account_id: AccountId) -> U128 {
        let now = env::block_height();
        unwrap_or_panic(self.farm.pending_base_reward(pool_id, &account_id, now)).into()
    }

    pub fn pending_boost_reward(&self, pool_id: PoolId, account_id: AccountId) -> U128 {
        let now = env::block_height();
        unwrap_or_panic(self.farm.pending_boost_reward(pool_id, &account_id, now)).into()
    }

    /// Base and boost reward the account would receive if it harvested now.
    pub fn pending_reward(&self, pool_id: PoolId, account_id: AccountId) -> U128 {
        unwrap_or_panic(self.farm.pending_reward(pool_id, &account_id, env::block_height())).into()
    }

    // ******************* //
    // transaction methods //

    /// Pays out the base and boost reward of the caller's position.
    pub fn harvest(&mut self, pool_id: PoolId) {
        self.assert_is_active();
        let user = env::predecessor_account_id();
        let s = unwrap_or_panic(self.farm.deposit(pool_id, &user, 0, env::block_height()));
        self.settle(s);
    }

    /// Unstakes `amount` of the pool stake token and harvests the position.
    #[payable]
    pub fn withdraw(&mut self, pool_id: PoolId, amount: U128) {
        assert_one_yocto();
        self.assert_is_active();
        let user = env::predecessor_account_id();
        let s = unwrap_or_panic(self.farm.withdraw(pool_id, &user, amount.0, env::block_height()));
        self.settle(s);
    }

    /// Returns the whole stake without harvesting. Works when the farm is paused.
    /// Unpaid base and boost rewards are forfeited, boost tokens stay escrowed.
    #[payable]
    pub fn emergency_withdraw(&mut self, pool_id: PoolId) {
        assert_one_yocto();
        let user = env::predecessor_account_id();
        let s = unwrap_or_panic(self.farm.emergency_withdraw(pool_id, &user, env::block_height()));
        self.settle(s);
    }

    /// Releases the `count` most recently escrowed boost tokens.
    #[payable]
    pub fn unboost_partially(&mut self, pool_id: PoolId, count: u32) {
        assert_one_yocto();
        self.assert_is_active();
        let user = env::predecessor_account_id();
        let now = env::block_height();
        let s = unwrap_or_panic(self.farm.unboost_partially(pool_id, &user, count, now));
        self.settle(s);
    }

    #[payable]
    pub fn unboost_all(&mut self, pool_id: PoolId) {
        assert_one_yocto();
        self.assert_is_active();
        let user = env::predecessor_account_id();
        let s = unwrap_or_panic(self.farm.unboost_all(pool_id, &user, env::block_height()));
        self.settle(s);
    }

    // ******************* //
    // management          //

    /// Adds a pool for `stake_token`. Returns the new pool id.
    pub fn add_pool(
        &mut self,
        alloc_point: u64,
        stake_token: AccountId,
        with_update: bool,
    ) -> PoolId {
        let pool_id = unwrap_or_panic(self.farm.add_pool(
            &env::predecessor_account_id(),
            alloc_point,
            stake_token,
            with_update,
            env::block_height(),
        ));
        self.pay_dev_fee();
        pool_id
    }

    pub fn set_alloc_point(&mut self, pool_id: PoolId, alloc_point: u64, with_update: bool) {
        unwrap_or_panic(self.farm.set_alloc_point(
            &env::predecessor_account_id(),
            pool_id,
            alloc_point,
            with_update,
            env::block_height(),
        ));
        self.pay_dev_fee();
    }

    pub fn set_reward_per_block(&mut self, reward_per_block: U128) {
        let caller = env::predecessor_account_id();
        unwrap_or_panic(self.farm.set_reward_per_block(&caller, reward_per_block.0));
    }

    pub fn set_boost_reward_per_block(&mut self, boost_reward_per_block: U128) {
        let caller = env::predecessor_account_id();
        unwrap_or_panic(self.farm.set_boost_reward_per_block(&caller, boost_reward_per_block.0));
    }

    pub fn update_pool(&mut self, pool_id: PoolId) {
        let caller = env::predecessor_account_id();
        unwrap_or_panic(self.farm.update_pool(&caller, pool_id, env::block_height()));
        self.pay_dev_fee();
    }

    pub fn mass_update_pools(&mut self) {
        let caller = env::predecessor_account_id();
        unwrap_or_panic(self.farm.mass_update_pools(&caller, env::block_height()));
        self.pay_dev_fee();
    }

    /// Settles all pools under the current fee before switching to the new one.
    pub fn set_dev_fee(&mut self, dev_fee_bps: u32, dev_fee_mode: DevFeeMode) {
        unwrap_or_panic(self.farm.set_dev_fee(
            &env::predecessor_account_id(),
            dev_fee_bps,
            dev_fee_mode,
            env::block_height(),
        ));
        self.pay_dev_fee();
    }

    /// Replaces the boost tiers. Positions keep their weight until their boost changes.
    pub fn set_boost_tiers(&mut self, tiers: Vec<BoostTier>) {
        let curve = unwrap_or_panic(BoostTiers::new(tiers));
        unwrap_or_panic(self.farm.set_boost_curve(&env::predecessor_account_id(), curve));
    }

    pub fn set_unstakable_block(&mut self, block: BlockHeight) {
        unwrap_or_panic(self.farm.set_unstakable_block(&env::predecessor_account_id(), block));
    }

    pub fn set_claim_base_reward_block(&mut self, block: BlockHeight) {
        let caller = env::predecessor_account_id();
        unwrap_or_panic(self.farm.set_claim_base_reward_block(&caller, block));
    }

    pub fn set_claim_boost_reward_block(&mut self, block: BlockHeight) {
        let caller = env::predecessor_account_id();
        unwrap_or_panic(self.farm.set_claim_boost_reward_block(&caller, block));
    }

    pub fn set_owner(&mut self, owner_id: AccountId) {
        unwrap_or_panic(self.farm.set_owner(&env::predecessor_account_id(), owner_id));
    }

    /// Hands the dev role over. Only callable by the current dev.
    pub fn dev(&mut self, dev_id: AccountId) {
        unwrap_or_panic(self.farm.set_dev(&env::predecessor_account_id(), dev_id));
    }

    /// Opens or closes the farm for deposits, harvests and boosts.
    pub fn set_active(&mut self, is_open: bool) {
        self.assert_owner();
        self.is_active = is_open;
    }

    // ******************* //
    // callbacks           //

    #[private]
    pub fn on_stake_transfer(&mut self, pool_id: PoolId, account_id: AccountId, amount: U128) {
        if promise_result_as_failed() {
            log!(
                "transferring {} stake of pool {} to @{} failed. Recovering account state",
                amount.0,
                pool_id,
                account_id
            );
            let now = env::block_height();
            unwrap_or_panic(self.farm.restore_stake(pool_id, &account_id, amount.0, now));
        }
    }

    #[private]
    pub fn on_boost_nft_transfer(
        &mut self,
        pool_id: PoolId,
        account_id: AccountId,
        token: BoostedToken,
    ) {
        if promise_result_as_failed() {
            log!(
                "transferring boost token {} to @{} failed. Recovering account state",
                token.token_id,
                account_id
            );
            let now = env::block_height();
            unwrap_or_panic(self.farm.restore_boost(pool_id, &account_id, vec![token], now));
        }
    }

    #[private]
    pub fn on_reward_transfer(
        &mut self,
        pool_id: PoolId,
        account_id: AccountId,
        base: U128,
        boost: U128,
    ) {
        if promise_result_as_failed() {
            self.farm.restore_reward(pool_id, &account_id, base.0, boost.0);
        }
    }

    #[private]
    pub fn on_dev_fee_transfer(&mut self, amount: U128) {
        if promise_result_as_failed() {
            self.farm.restore_dev_fee(amount.0);
        }
    }
}

impl Contract {
    fn assert_is_active(&self) {
        assert!(self.is_active, "contract is not active");
    }

    fn assert_owner(&self) {
        assert!(
            env::predecessor_account_id() == self.farm.config.owner_id,
            "can only be called by the owner"
        );
    }

    /// Stakes tokens received through `ft_transfer_call`. Fails when `token`
    /// is not the stake token of the pool.
    pub(crate) fn internal_deposit(
        &mut self,
        token: &AccountId,
        pool_id: PoolId,
        sender_id: &AccountId,
        amount: Balance,
    ) -> Result<Settlement, FarmError> {
        let pool = self.farm.pool(pool_id)?;
        if &pool.stake_token != token {
            return Err(FarmError::InvalidPool(pool_id));
        }
        self.farm.deposit(pool_id, sender_id, amount, env::block_height())
    }

    /// Schedules the outgoing transfers of a settlement. Incoming tokens were
    /// already received by the token receivers. Every transfer has a callback
    /// which restores the ledger if it fails.
    pub(crate) fn settle(&mut self, s: Settlement) {
        if s.stake_out > 0 {
            self.transfer_stake(s.pool_id, &s.account_id, s.stake_out);
        }
        for token in s.nft_out.iter() {
            self.transfer_boost_nft(s.pool_id, &s.account_id, token.clone());
        }
        if s.dev_fee > 0 {
            self.transfer_dev_fee(s.dev_fee);
        }
        if s.reward() > 0 {
            self.transfer_reward(s.pool_id, &s.account_id, s.base_reward, s.boost_reward);
        }
    }

    /// Sends the dev fee the reserve can cover after owner operations settled pools.
    fn pay_dev_fee(&mut self) {
        let fee = self.farm.take_dev_fee();
        if fee > 0 {
            self.transfer_dev_fee(fee);
        }
    }

    fn transfer_stake(&mut self, pool_id: PoolId, user: &AccountId, amount: Balance) -> Promise {
        let stake_token = unwrap_or_panic(self.farm.pool(pool_id)).stake_token.clone();
        log!("@{} unstake {} {}", user, amount, stake_token);
        ext_ft::ext(stake_token)
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(user.clone(), amount.into(), Some("unstake".to_string()))
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .on_stake_transfer(pool_id, user.clone(), amount.into()),
            )
    }

    fn transfer_boost_nft(
        &mut self,
        pool_id: PoolId,
        user: &AccountId,
        token: BoostedToken,
    ) -> Promise {
        log!("releasing boost token {} to @{}", token.token_id, user);
        ext_nft::ext(self.farm.config.boost_nft.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_NFT_TRANSFER)
            .nft_transfer(user.clone(), token.token_id.clone(), None, Some("unboost".to_string()))
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .on_boost_nft_transfer(pool_id, user.clone(), token),
            )
    }

    fn transfer_reward(
        &mut self,
        pool_id: PoolId,
        user: &AccountId,
        base: Balance,
        boost: Balance,
    ) -> Promise {
        let amount: U128 = (base + boost).into();
        ext_ft::ext(self.farm.config.reward_token.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(user.clone(), amount, Some("farming".to_string()))
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .on_reward_transfer(pool_id, user.clone(), base.into(), boost.into()),
            )
    }

    fn transfer_dev_fee(&mut self, amount: Balance) -> Promise {
        ext_ft::ext(self.farm.config.reward_token.clone())
            .with_attached_deposit(ONE_YOCTO)
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(
                self.farm.config.dev_id.clone(),
                amount.into(),
                Some("dev fee".to_string()),
            )
            .then(
                Self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_CALLBACK)
                    .on_dev_fee_transfer(amount.into()),
            )
    }
}
