use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::json_types::U128;
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::{AccountId, Balance, BlockHeight};

use crate::config::FarmConfig;
use crate::constants::ACC_SCALE;
use crate::helpers::{mul_div, mul_div_wide, U256};

pub type PoolId = u32;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Pool {
    pub stake_token: AccountId,
    pub alloc_point: u64,
    /// last block the accumulators were brought up to
    pub last_reward_block: BlockHeight,
    /// base reward per staked unit, scaled by `ACC_SCALE`
    pub acc_reward_per_share: U256,
    /// boost reward per unit of boost weight, scaled by `ACC_SCALE`
    pub acc_boost_reward_per_share: U256,
    pub total_staked: Balance,
    /// number of boost tokens escrowed in the pool
    pub total_boost: u32,
    pub total_boost_weight: u128,
}

/// Rewards a pool emitted over one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accrual {
    /// base reward credited to stakers
    pub base: Balance,
    /// boost reward credited to boosted positions
    pub boost: Balance,
    pub dev_fee: Balance,
}

/// Accumulator values a pool would have at a given block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub acc_reward_per_share: U256,
    pub acc_boost_reward_per_share: U256,
    pub accrual: Accrual,
}

impl Pool {
    pub fn new(stake_token: AccountId, alloc_point: u64, last_reward_block: BlockHeight) -> Self {
        Self {
            stake_token,
            alloc_point,
            last_reward_block,
            acc_reward_per_share: U256::zero(),
            acc_boost_reward_per_share: U256::zero(),
            total_staked: 0,
            total_boost: 0,
            total_boost_weight: 0,
        }
    }

    /// Computes the accumulators at block `now` without modifying the pool.
    /// Nothing accrues while the pool has no stake or no allocation, and the
    /// boost pot only accrues while someone holds boost weight.
    pub fn projected(
        &self,
        cfg: &FarmConfig,
        total_alloc_point: u64,
        now: BlockHeight,
    ) -> Projection {
        let mut p = Projection {
            acc_reward_per_share: self.acc_reward_per_share,
            acc_boost_reward_per_share: self.acc_boost_reward_per_share,
            accrual: Accrual::default(),
        };
        if now <= self.last_reward_block
            || self.total_staked == 0
            || self.alloc_point == 0
            || total_alloc_point == 0
        {
            return p;
        }
        let blocks = cfg.blocks_multiplier(self.last_reward_block, now);
        let alloc = self.alloc_point as u128;
        let total_alloc = total_alloc_point as u128;

        let emitted = blocks.saturating_mul(cfg.reward_per_block);
        let base = cfg.split_dev_fee(mul_div(emitted, alloc, total_alloc));
        p.acc_reward_per_share += mul_div_wide(base.stakers, ACC_SCALE.into(), self.total_staked);
        p.accrual.base = base.stakers;
        p.accrual.dev_fee = base.dev;

        if self.total_boost_weight > 0 && cfg.boost_reward_per_block > 0 {
            let emitted = blocks.saturating_mul(cfg.boost_reward_per_block);
            let boost = cfg.split_dev_fee(mul_div(emitted, alloc, total_alloc));
            p.acc_boost_reward_per_share +=
                mul_div_wide(boost.stakers, ACC_SCALE.into(), self.total_boost_weight);
            p.accrual.boost = boost.stakers;
            p.accrual.dev_fee = p.accrual.dev_fee.saturating_add(boost.dev);
        }
        p
    }

    /// Brings the accumulators up to block `now`. Repeated calls in the same
    /// block are no-ops.
    pub fn update(
        &mut self,
        cfg: &FarmConfig,
        total_alloc_point: u64,
        now: BlockHeight,
    ) -> Accrual {
        if now <= self.last_reward_block {
            return Accrual::default();
        }
        let p = self.projected(cfg, total_alloc_point, now);
        self.acc_reward_per_share = p.acc_reward_per_share;
        self.acc_boost_reward_per_share = p.acc_boost_reward_per_share;
        self.last_reward_block = now;
        p.accrual
    }

    pub fn info(&self, pool_id: PoolId) -> PoolInfo {
        PoolInfo {
            pool_id,
            stake_token: self.stake_token.clone(),
            alloc_point: self.alloc_point,
            last_reward_block: self.last_reward_block,
            acc_reward_per_share: self.acc_reward_per_share.to_string(),
            acc_boost_reward_per_share: self.acc_boost_reward_per_share.to_string(),
            total_staked: self.total_staked.into(),
            total_boost: self.total_boost,
            total_boost_weight: self.total_boost_weight.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(crate = "near_sdk::serde")]
#[cfg_attr(not(target_arch = "wasm32"), derive(Debug, Clone, PartialEq))]
pub struct PoolInfo {
    pub pool_id: PoolId,
    pub stake_token: AccountId,
    pub alloc_point: u64,
    pub last_reward_block: BlockHeight,
    /// decimal string, the accumulators are 256 bits wide
    pub acc_reward_per_share: String,
    pub acc_boost_reward_per_share: String,
    pub total_staked: U128,
    pub total_boost: u32,
    pub total_boost_weight: U128,
}
