use std::collections::BTreeMap;

use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::{log, AccountId, Balance, BlockHeight};

use crate::boost::{BoostCurve, BoostTiers};
use crate::config::{DevFeeMode, FarmConfig};
use crate::errors::FarmError;
use crate::pool::{Accrual, Pool, PoolId, PoolInfo};
use crate::stake::{BoostedToken, UserStake};
use crate::TokenId;

/// Token movements an operation owes to the outside world. The ledger has
/// already accounted for all of them when the settlement is returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub pool_id: PoolId,
    pub account_id: AccountId,
    /// stake tokens to pull from the account into custody
    pub stake_in: Balance,
    /// stake tokens to send back to the account
    pub stake_out: Balance,
    /// boost tokens to pull into escrow
    pub nft_in: Vec<TokenId>,
    /// boost tokens to release, most recently escrowed last
    pub nft_out: Vec<BoostedToken>,
    pub base_reward: Balance,
    pub boost_reward: Balance,
    /// dev fee to send to the dev address
    pub dev_fee: Balance,
}

impl Settlement {
    fn new(pool_id: PoolId, account_id: &AccountId) -> Self {
        Self {
            pool_id,
            account_id: account_id.clone(),
            stake_in: 0,
            stake_out: 0,
            nft_in: vec![],
            nft_out: vec![],
            base_reward: 0,
            boost_reward: 0,
            dev_fee: 0,
        }
    }

    pub fn reward(&self) -> Balance {
        self.base_reward + self.boost_reward
    }
}

/// Snapshot of the state one user operation can touch.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pool: Option<(PoolId, Pool)>,
    stake: Option<((PoolId, AccountId), Option<UserStake>)>,
    reward_reserve: Balance,
    dev_fee_owed: Balance,
    total_paid: Balance,
}

/// Multi-pool farm ledger. It only does the accounting: callers move the
/// tokens described by the returned [`Settlement`]s and report failures back
/// through the `restore_*` methods.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug)]
pub struct Farm<C = BoostTiers> {
    pub config: FarmConfig,
    boost_curve: C,
    pools: Vec<Pool>,
    stakes: BTreeMap<(PoolId, AccountId), UserStake>,
    total_alloc_point: u64,
    /// reward tokens available for payouts, staked principal excluded
    reward_reserve: Balance,
    /// dev fee accrued and not paid yet
    dev_fee_owed: Balance,
    /// rewards paid out to stakers so far
    total_paid: Balance,
}

impl Farm<BoostTiers> {
    pub fn new(config: FarmConfig) -> Result<Self, FarmError> {
        Self::with_curve(config, BoostTiers::default())
    }
}

impl<C: BoostCurve> Farm<C> {
    pub fn with_curve(config: FarmConfig, boost_curve: C) -> Result<Self, FarmError> {
        config.validate()?;
        Ok(Self {
            config,
            boost_curve,
            pools: Vec::new(),
            stakes: BTreeMap::new(),
            total_alloc_point: 0,
            reward_reserve: 0,
            dev_fee_owed: 0,
            total_paid: 0,
        })
    }

    /**********
     * VIEWS
     **********/

    pub fn pool_length(&self) -> u32 {
        self.pools.len() as u32
    }

    pub fn pool(&self, pool_id: PoolId) -> Result<&Pool, FarmError> {
        self.pools.get(pool_id as usize).ok_or(FarmError::InvalidPool(pool_id))
    }

    pub fn pool_info(&self, pool_id: PoolId) -> Result<PoolInfo, FarmError> {
        Ok(self.pool(pool_id)?.info(pool_id))
    }

    pub fn total_alloc_point(&self) -> u64 {
        self.total_alloc_point
    }

    pub fn reward_reserve(&self) -> Balance {
        self.reward_reserve
    }

    pub fn dev_fee_owed(&self) -> Balance {
        self.dev_fee_owed
    }

    pub fn total_paid(&self) -> Balance {
        self.total_paid
    }

    pub fn boost_curve(&self) -> &C {
        &self.boost_curve
    }

    pub fn user_stake(&self, pool_id: PoolId, account_id: &AccountId) -> Option<&UserStake> {
        self.stakes.get(&(pool_id, account_id.clone()))
    }

    pub fn boosted_tokens(&self, pool_id: PoolId, account_id: &AccountId) -> Vec<BoostedToken> {
        self.user_stake(pool_id, account_id).map_or_else(Vec::new, |u| u.boosted.clone())
    }

    /// Base reward the account would be credited if its pool settled at `now`.
    pub fn pending_base_reward(
        &self,
        pool_id: PoolId,
        account_id: &AccountId,
        now: BlockHeight,
    ) -> Result<Balance, FarmError> {
        let p = self.pool(pool_id)?.projected(&self.config, self.total_alloc_point, now);
        Ok(self
            .user_stake(pool_id, account_id)
            .map_or(0, |u| u.pending_base(p.acc_reward_per_share)))
    }

    pub fn pending_boost_reward(
        &self,
        pool_id: PoolId,
        account_id: &AccountId,
        now: BlockHeight,
    ) -> Result<Balance, FarmError> {
        let p = self.pool(pool_id)?.projected(&self.config, self.total_alloc_point, now);
        Ok(self
            .user_stake(pool_id, account_id)
            .map_or(0, |u| u.pending_boost(p.acc_boost_reward_per_share)))
    }

    pub fn pending_reward(
        &self,
        pool_id: PoolId,
        account_id: &AccountId,
        now: BlockHeight,
    ) -> Result<Balance, FarmError> {
        Ok(self.pending_base_reward(pool_id, account_id, now)?
            + self.pending_boost_reward(pool_id, account_id, now)?)
    }

    /**********
     * ADMIN
     **********/

    fn assert_owner(&self, caller: &AccountId) -> Result<(), FarmError> {
        if *caller != self.config.owner_id {
            return Err(FarmError::Unauthorized(caller.clone()));
        }
        Ok(())
    }

    pub fn add_pool(
        &mut self,
        caller: &AccountId,
        alloc_point: u64,
        stake_token: AccountId,
        with_update: bool,
        now: BlockHeight,
    ) -> Result<PoolId, FarmError> {
        self.assert_owner(caller)?;
        if self.pools.iter().any(|p| p.stake_token == stake_token) {
            return Err(FarmError::PoolExists(stake_token));
        }
        if with_update {
            self.mass_update(now);
        }
        let pool_id = self.pools.len() as PoolId;
        let last_reward_block = now.max(self.config.start_block);
        log!("pool {} added for {} with {} alloc points", pool_id, stake_token, alloc_point);
        self.total_alloc_point += alloc_point;
        self.pools.push(Pool::new(stake_token, alloc_point, last_reward_block));
        Ok(pool_id)
    }

    pub fn set_alloc_point(
        &mut self,
        caller: &AccountId,
        pool_id: PoolId,
        alloc_point: u64,
        with_update: bool,
        now: BlockHeight,
    ) -> Result<(), FarmError> {
        self.assert_owner(caller)?;
        self.pool(pool_id)?;
        if with_update {
            self.mass_update(now);
        }
        let pool = &mut self.pools[pool_id as usize];
        self.total_alloc_point = self.total_alloc_point - pool.alloc_point + alloc_point;
        pool.alloc_point = alloc_point;
        Ok(())
    }

    /// Changes the base emission. Pools are not settled first, so blocks since
    /// each pool's last update are paid at the new rate.
    pub fn set_reward_per_block(
        &mut self,
        caller: &AccountId,
        reward_per_block: Balance,
    ) -> Result<(), FarmError> {
        self.assert_owner(caller)?;
        self.config.reward_per_block = reward_per_block;
        Ok(())
    }

    pub fn set_boost_reward_per_block(
        &mut self,
        caller: &AccountId,
        boost_reward_per_block: Balance,
    ) -> Result<(), FarmError> {
        self.assert_owner(caller)?;
        self.config.boost_reward_per_block = boost_reward_per_block;
        Ok(())
    }

    /// Hands the dev role over. Only the current dev can call it.
    pub fn set_dev(&mut self, caller: &AccountId, dev_id: AccountId) -> Result<(), FarmError> {
        if *caller != self.config.dev_id {
            return Err(FarmError::Unauthorized(caller.clone()));
        }
        self.config.dev_id = dev_id;
        Ok(())
    }

    pub fn set_owner(&mut self, caller: &AccountId, owner_id: AccountId) -> Result<(), FarmError> {
        self.assert_owner(caller)?;
        self.config.owner_id = owner_id;
        Ok(())
    }

    /// Settles every pool under the old fee, then switches to the new one.
    pub fn set_dev_fee(
        &mut self,
        caller: &AccountId,
        dev_fee_bps: u32,
        dev_fee_mode: DevFeeMode,
        now: BlockHeight,
    ) -> Result<(), FarmError> {
        self.assert_owner(caller)?;
        let mut config = self.config.clone();
        config.dev_fee_bps = dev_fee_bps;
        config.dev_fee_mode = dev_fee_mode;
        config.validate()?;
        self.mass_update(now);
        self.config = config;
        Ok(())
    }

    /// Replaces the boost curve. Existing positions keep their weight until
    /// their boost changes.
    pub fn set_boost_curve(&mut self, caller: &AccountId, boost_curve: C) -> Result<(), FarmError> {
        self.assert_owner(caller)?;
        self.boost_curve = boost_curve;
        Ok(())
    }

    pub fn set_unstakable_block(
        &mut self,
        caller: &AccountId,
        block: BlockHeight,
    ) -> Result<(), FarmError> {
        self.assert_owner(caller)?;
        self.config.unstakable_block = block;
        Ok(())
    }

    pub fn set_claim_base_reward_block(
        &mut self,
        caller: &AccountId,
        block: BlockHeight,
    ) -> Result<(), FarmError> {
        self.assert_owner(caller)?;
        self.config.claim_base_reward_block = block;
        Ok(())
    }

    pub fn set_claim_boost_reward_block(
        &mut self,
        caller: &AccountId,
        block: BlockHeight,
    ) -> Result<(), FarmError> {
        self.assert_owner(caller)?;
        self.config.claim_boost_reward_block = block;
        Ok(())
    }

    pub fn update_pool(
        &mut self,
        caller: &AccountId,
        pool_id: PoolId,
        now: BlockHeight,
    ) -> Result<Accrual, FarmError> {
        self.assert_owner(caller)?;
        self.settle(pool_id, now)
    }

    pub fn mass_update_pools(
        &mut self,
        caller: &AccountId,
        now: BlockHeight,
    ) -> Result<(), FarmError> {
        self.assert_owner(caller)?;
        self.mass_update(now);
        Ok(())
    }

    /// Adds reward tokens the farm received to the payout reserve.
    pub fn fund_rewards(&mut self, amount: Balance) {
        self.reward_reserve += amount;
        log!("reward reserve funded with {}, now {}", amount, self.reward_reserve);
    }

    /// Takes the dev fee that the reserve can cover. The caller must send it
    /// to the dev address.
    pub fn take_dev_fee(&mut self) -> Balance {
        let fee = self.dev_fee_owed.min(self.reward_reserve);
        self.dev_fee_owed -= fee;
        self.reward_reserve -= fee;
        fee
    }

    fn settle(&mut self, pool_id: PoolId, now: BlockHeight) -> Result<Accrual, FarmError> {
        let total_alloc_point = self.total_alloc_point;
        let pool = self.pools.get_mut(pool_id as usize).ok_or(FarmError::InvalidPool(pool_id))?;
        let accrual = pool.update(&self.config, total_alloc_point, now);
        self.dev_fee_owed = self.dev_fee_owed.saturating_add(accrual.dev_fee);
        Ok(accrual)
    }

    fn mass_update(&mut self, now: BlockHeight) {
        let total_alloc_point = self.total_alloc_point;
        for pool in self.pools.iter_mut() {
            let dev_fee = pool.update(&self.config, total_alloc_point, now).dev_fee;
            self.dev_fee_owed = self.dev_fee_owed.saturating_add(dev_fee);
        }
    }

    /**********
     * USER OPERATIONS
     **********/

    /// Stakes `amount` (possibly 0, which only harvests) and pays out what
    /// the position earned.
    pub fn deposit(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        amount: Balance,
        now: BlockHeight,
    ) -> Result<Settlement, FarmError> {
        self.settle(pool_id, now)?;
        let pool = &mut self.pools[pool_id as usize];
        let user = self.stakes.entry((pool_id, account_id.clone())).or_default();
        user.harvest(pool);
        user.amount += amount;
        pool.total_staked += amount;
        user.reset_debts(pool);

        let mut s = Settlement::new(pool_id, account_id);
        s.stake_in = amount;
        if amount > 0 {
            log!("@{} deposited {} to pool {}", account_id, amount, pool_id);
        }
        self.pay_out(&mut s, now);
        Ok(s)
    }

    pub fn withdraw(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        amount: Balance,
        now: BlockHeight,
    ) -> Result<Settlement, FarmError> {
        self.pool(pool_id)?;
        let staked = self.user_stake(pool_id, account_id).map_or(0, |u| u.amount);
        if amount > staked {
            return Err(FarmError::InsufficientStake { requested: amount, staked });
        }
        self.settle(pool_id, now)?;
        let pool = &mut self.pools[pool_id as usize];
        let user = self.stakes.entry((pool_id, account_id.clone())).or_default();
        user.harvest(pool);
        user.amount -= amount;
        pool.total_staked -= amount;
        user.reset_debts(pool);

        let mut s = Settlement::new(pool_id, account_id);
        s.stake_out = amount;
        if amount > 0 {
            log!("@{} withdrew {} from pool {}", account_id, amount, pool_id);
        }
        self.pay_out(&mut s, now);
        Ok(s)
    }

    /// Returns the whole stake and forfeits every unpaid reward, base and
    /// boost. The pool accumulators are brought up to `now` so the escrowed
    /// boost tokens, which stay with the position, earn again from this block.
    pub fn emergency_withdraw(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        now: BlockHeight,
    ) -> Result<Settlement, FarmError> {
        self.settle(pool_id, now)?;
        let mut s = Settlement::new(pool_id, account_id);
        let key = (pool_id, account_id.clone());
        if let Some(user) = self.stakes.get_mut(&key) {
            let pool = &mut self.pools[pool_id as usize];
            pool.total_staked -= user.amount;
            s.stake_out = user.amount;
            user.amount = 0;
            user.unclaimed_reward = 0;
            user.unclaimed_boost_reward = 0;
            user.reset_debts(pool);
            if user.is_empty() {
                self.stakes.remove(&key);
            }
        }
        log!("@{} emergency withdrew {} from pool {}", account_id, s.stake_out, pool_id);
        Ok(s)
    }

    /// Escrows `tokens` for the position. The position must hold stake.
    pub fn boost(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        tokens: Vec<TokenId>,
        now: BlockHeight,
    ) -> Result<Settlement, FarmError> {
        self.pool(pool_id)?;
        if self.user_stake(pool_id, account_id).map_or(0, |u| u.amount) == 0 {
            return Err(FarmError::NoDepositedStake);
        }
        if tokens.is_empty() {
            return Err(FarmError::NotEnoughBoostTokens { requested: 1, available: 0 });
        }
        self.settle(pool_id, now)?;
        let pool = &mut self.pools[pool_id as usize];
        let user = self.stakes.entry((pool_id, account_id.clone())).or_default();
        user.harvest(pool);
        user.boosted.extend(tokens.iter().map(|token_id| BoostedToken {
            token_id: token_id.clone(),
            boosted_at: now,
        }));
        pool.total_boost += tokens.len() as u32;
        reweight(&self.boost_curve, pool, user);

        log!("@{} boosted pool {} with {} tokens", account_id, pool_id, tokens.len());
        let mut s = Settlement::new(pool_id, account_id);
        s.nft_in = tokens;
        self.pay_out(&mut s, now);
        Ok(s)
    }

    /// Releases the `count` most recently escrowed boost tokens.
    pub fn unboost_partially(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        count: u32,
        now: BlockHeight,
    ) -> Result<Settlement, FarmError> {
        self.unboost(pool_id, account_id, Some(count), now)
    }

    pub fn unboost_all(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        now: BlockHeight,
    ) -> Result<Settlement, FarmError> {
        self.unboost(pool_id, account_id, None, now)
    }

    fn unboost(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        count: Option<u32>,
        now: BlockHeight,
    ) -> Result<Settlement, FarmError> {
        self.pool(pool_id)?;
        let available = self.user_stake(pool_id, account_id).map_or(0, |u| u.boost_amount());
        let requested = count.unwrap_or(available);
        if requested == 0 || requested > available {
            return Err(FarmError::NotEnoughBoostTokens { requested, available });
        }
        if now < self.config.unstakable_block {
            return Err(FarmError::NotUnstakableYet { unlocks_at: self.config.unstakable_block });
        }
        self.settle(pool_id, now)?;
        let pool = &mut self.pools[pool_id as usize];
        let user = self.stakes.entry((pool_id, account_id.clone())).or_default();
        user.harvest(pool);
        let released = user.boosted.split_off((available - requested) as usize);
        pool.total_boost -= requested;
        reweight(&self.boost_curve, pool, user);

        log!("@{} unboosted {} tokens from pool {}", account_id, requested, pool_id);
        let mut s = Settlement::new(pool_id, account_id);
        s.nft_out = released;
        self.pay_out(&mut s, now);
        Ok(s)
    }

    /// Fills the payout part of `s`: the owed dev fee first, then the
    /// position's unclaimed rewards, each capped by the reserve and gated by
    /// the claim blocks. What can't be paid stays unclaimed.
    fn pay_out(&mut self, s: &mut Settlement, now: BlockHeight) {
        s.dev_fee = self.take_dev_fee();
        let key = (s.pool_id, s.account_id.clone());
        let user = match self.stakes.get_mut(&key) {
            Some(user) => user,
            None => return,
        };
        if self.config.can_claim_base(now) {
            s.base_reward = user.unclaimed_reward.min(self.reward_reserve);
            user.unclaimed_reward -= s.base_reward;
            self.reward_reserve -= s.base_reward;
        }
        if self.config.can_claim_boost(now) {
            s.boost_reward = user.unclaimed_boost_reward.min(self.reward_reserve);
            user.unclaimed_boost_reward -= s.boost_reward;
            self.reward_reserve -= s.boost_reward;
        }
        if user.unclaimed_reward + user.unclaimed_boost_reward > 0 {
            log!(
                "@{} has {} base and {} boost reward left unclaimed",
                s.account_id,
                user.unclaimed_reward,
                user.unclaimed_boost_reward
            );
        }
        if user.is_empty() {
            self.stakes.remove(&key);
        }
        self.total_paid += s.reward();
    }

    /**********
     * RECOVERY
     **********/

    /// Credits back a reward payout that failed.
    pub fn restore_reward(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        base: Balance,
        boost: Balance,
    ) {
        let user = self.stakes.entry((pool_id, account_id.clone())).or_default();
        user.unclaimed_reward += base;
        user.unclaimed_boost_reward += boost;
        self.reward_reserve += base + boost;
        self.total_paid -= base + boost;
        log!("reward transfer to @{} failed, {} credited back", account_id, base + boost);
    }

    pub fn restore_dev_fee(&mut self, amount: Balance) {
        self.dev_fee_owed += amount;
        self.reward_reserve += amount;
        log!("dev fee transfer failed, {} credited back", amount);
    }

    /// Re-stakes principal whose transfer back to the account failed.
    pub fn restore_stake(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        amount: Balance,
        now: BlockHeight,
    ) -> Result<(), FarmError> {
        self.settle(pool_id, now)?;
        let pool = &mut self.pools[pool_id as usize];
        let user = self.stakes.entry((pool_id, account_id.clone())).or_default();
        user.harvest(pool);
        user.amount += amount;
        pool.total_staked += amount;
        user.reset_debts(pool);
        log!("stake transfer to @{} failed, {} restaked", account_id, amount);
        Ok(())
    }

    /// Puts back into escrow boost tokens whose release failed.
    pub fn restore_boost(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        tokens: Vec<BoostedToken>,
        now: BlockHeight,
    ) -> Result<(), FarmError> {
        self.settle(pool_id, now)?;
        let pool = &mut self.pools[pool_id as usize];
        let user = self.stakes.entry((pool_id, account_id.clone())).or_default();
        user.harvest(pool);
        pool.total_boost += tokens.len() as u32;
        log!(
            "boost token transfer to @{} failed, {} tokens escrowed again",
            account_id,
            tokens.len()
        );
        user.boosted.extend(tokens);
        reweight(&self.boost_curve, pool, user);
        Ok(())
    }

    /// Snapshot of everything an operation on `(pool_id, account_id)` touches.
    pub fn checkpoint(&self, pool_id: PoolId, account_id: &AccountId) -> Checkpoint {
        let key = (pool_id, account_id.clone());
        Checkpoint {
            pool: self.pools.get(pool_id as usize).map(|p| (pool_id, p.clone())),
            stake: Some((key.clone(), self.stakes.get(&key).cloned())),
            reward_reserve: self.reward_reserve,
            dev_fee_owed: self.dev_fee_owed,
            total_paid: self.total_paid,
        }
    }

    /// Snapshot of the reserve only, for funding.
    pub fn reserve_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pool: None,
            stake: None,
            reward_reserve: self.reward_reserve,
            dev_fee_owed: self.dev_fee_owed,
            total_paid: self.total_paid,
        }
    }

    pub fn rollback(&mut self, cp: Checkpoint) {
        if let Some((pool_id, pool)) = cp.pool {
            if let Some(p) = self.pools.get_mut(pool_id as usize) {
                *p = pool;
            }
        }
        if let Some((key, stake)) = cp.stake {
            match stake {
                Some(stake) => {
                    self.stakes.insert(key, stake);
                }
                None => {
                    self.stakes.remove(&key);
                }
            }
        }
        self.reward_reserve = cp.reward_reserve;
        self.dev_fee_owed = cp.dev_fee_owed;
        self.total_paid = cp.total_paid;
    }
}

/// Recomputes the position weight from its escrowed tokens and refreshes the
/// debts. The position must be harvested first.
fn reweight<C: BoostCurve>(curve: &C, pool: &mut Pool, user: &mut UserStake) {
    let weight = curve.weight(user.boost_amount());
    pool.total_boost_weight = pool.total_boost_weight - user.boost_weight + weight;
    user.boost_weight = weight;
    user.reset_debts(pool);
}
