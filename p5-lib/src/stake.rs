use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::json_types::U128;
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::{Balance, BlockHeight};

use crate::constants::ACC_SCALE;
use crate::helpers::{mul_div_wide, to_balance, U256};
use crate::pool::Pool;
use crate::TokenId;

/// A boost token held in escrow for a position.
#[derive(BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(crate = "near_sdk::serde")]
pub struct BoostedToken {
    pub token_id: TokenId,
    pub boosted_at: BlockHeight,
}

/// A user position in one pool.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq)]
pub struct UserStake {
    pub amount: Balance,
    /// `amount * acc_reward_per_share / ACC_SCALE` at the last settlement
    pub reward_debt: U256,
    /// escrowed boost tokens, oldest first
    pub boosted: Vec<BoostedToken>,
    pub boost_weight: u128,
    pub boost_reward_debt: U256,
    /// settled base reward that could not be paid yet
    pub unclaimed_reward: Balance,
    /// settled boost reward that could not be paid yet
    pub unclaimed_boost_reward: Balance,
}

impl UserStake {
    pub fn boost_amount(&self) -> u32 {
        self.boosted.len() as u32
    }

    pub fn pending_base(&self, acc_reward_per_share: U256) -> Balance {
        let earned = mul_div_wide(self.amount, acc_reward_per_share, ACC_SCALE);
        self.unclaimed_reward + to_balance(earned.saturating_sub(self.reward_debt))
    }

    pub fn pending_boost(&self, acc_boost_reward_per_share: U256) -> Balance {
        let earned = mul_div_wide(self.boost_weight, acc_boost_reward_per_share, ACC_SCALE);
        self.unclaimed_boost_reward + to_balance(earned.saturating_sub(self.boost_reward_debt))
    }

    /// Moves what the position earned since its last settlement into the
    /// unclaimed buckets. `pool` must be up to date.
    pub fn harvest(&mut self, pool: &Pool) {
        self.unclaimed_reward = self.pending_base(pool.acc_reward_per_share);
        self.unclaimed_boost_reward = self.pending_boost(pool.acc_boost_reward_per_share);
        self.reset_debts(pool);
    }

    /// Snapshots the accumulators after `amount` or `boost_weight` changed.
    pub fn reset_debts(&mut self, pool: &Pool) {
        self.reward_debt = mul_div_wide(self.amount, pool.acc_reward_per_share, ACC_SCALE);
        self.boost_reward_debt =
            mul_div_wide(self.boost_weight, pool.acc_boost_reward_per_share, ACC_SCALE);
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
            && self.boosted.is_empty()
            && self.unclaimed_reward == 0
            && self.unclaimed_boost_reward == 0
    }

    pub fn info(&self) -> UserInfo {
        UserInfo {
            amount: self.amount.into(),
            reward_debt: self.reward_debt.to_string(),
            boost_amount: self.boost_amount(),
            boost_weight: self.boost_weight.into(),
            boost_reward_debt: self.boost_reward_debt.to_string(),
            unclaimed_reward: self.unclaimed_reward.into(),
            unclaimed_boost_reward: self.unclaimed_boost_reward.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(crate = "near_sdk::serde")]
#[cfg_attr(not(target_arch = "wasm32"), derive(Debug, Clone, PartialEq))]
pub struct UserInfo {
    pub amount: U128,
    pub reward_debt: String,
    pub boost_amount: u32,
    pub boost_weight: U128,
    pub boost_reward_debt: String,
    pub unclaimed_reward: U128,
    pub unclaimed_boost_reward: U128,
}
