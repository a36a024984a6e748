use std::cmp::{max, min};

use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::{AccountId, Balance, BlockHeight};

use crate::constants::*;
use crate::errors::FarmError;
use crate::helpers::mul_div;

/// How the dev fee relates to the reward a pool accrues.
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
)]
#[serde(crate = "near_sdk::serde")]
pub enum DevFeeMode {
    /// The fee is carved out of the accrual: stakers share `reward - fee`.
    Deducted,
    /// Stakers share the whole accrual and the dev fee is paid on top of it.
    OnTop,
}

/// An accrual after the dev fee was applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeSplit {
    pub stakers: Balance,
    pub dev: Balance,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct FarmConfig {
    pub owner_id: AccountId,
    /// Receives the dev fee. Only the current dev can hand the role over.
    pub dev_id: AccountId,
    pub reward_token: AccountId,
    /// NFT contract whose tokens are escrowed to boost a position.
    pub boost_nft: AccountId,
    /// Base reward emitted per block, shared by pools proportionally to `alloc_point`.
    pub reward_per_block: Balance,
    /// Boost pot emitted per block, shared the same way and then split by boost weight.
    pub boost_reward_per_block: Balance,
    pub bonus_multiplier: u64,
    /// No pool accrues before this block.
    pub start_block: BlockHeight,
    /// Blocks in `[bonus_start_block, bonus_end_block)` emit `bonus_multiplier` times more.
    pub bonus_start_block: BlockHeight,
    pub bonus_end_block: BlockHeight,
    /// dev fee in basis points
    pub dev_fee_bps: u32,
    pub dev_fee_mode: DevFeeMode,
    /// Escrowed boost tokens can't be taken back before this block.
    pub unstakable_block: BlockHeight,
    pub claim_base_reward_block: BlockHeight,
    pub claim_boost_reward_block: BlockHeight,
}

impl FarmConfig {
    /// Config with the default fee (10%, deducted), a bonus window starting at
    /// `start_block` and every claim gate open.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: AccountId,
        dev_id: AccountId,
        reward_token: AccountId,
        boost_nft: AccountId,
        reward_per_block: Balance,
        boost_reward_per_block: Balance,
        start_block: BlockHeight,
        bonus_end_block: BlockHeight,
    ) -> Self {
        Self {
            owner_id,
            dev_id,
            reward_token,
            boost_nft,
            reward_per_block,
            boost_reward_per_block,
            bonus_multiplier: BONUS_MULTIPLIER,
            start_block,
            bonus_start_block: start_block,
            bonus_end_block,
            dev_fee_bps: DEV_FEE_BPS,
            dev_fee_mode: DevFeeMode::Deducted,
            unstakable_block: 0,
            claim_base_reward_block: 0,
            claim_boost_reward_block: 0,
        }
    }

    pub fn validate(&self) -> Result<(), FarmError> {
        if self.bonus_multiplier == 0 {
            return Err(FarmError::InvalidConfig("bonus multiplier must be positive"));
        }
        if self.dev_fee_bps > BASIS_P {
            return Err(FarmError::InvalidConfig("dev fee can't exceed 100%"));
        }
        Ok(())
    }

    /// Reward-weighted number of blocks in `[from, to)`. Blocks inside the
    /// bonus window count `bonus_multiplier` times.
    pub fn blocks_multiplier(&self, from: BlockHeight, to: BlockHeight) -> u128 {
        if to <= from {
            return 0;
        }
        let bonus_from = max(from, self.bonus_start_block);
        let bonus_to = min(to, self.bonus_end_block);
        let bonus = bonus_to.saturating_sub(bonus_from);
        (to - from - bonus) as u128 + bonus as u128 * self.bonus_multiplier as u128
    }

    pub fn split_dev_fee(&self, reward: Balance) -> FeeSplit {
        let dev = mul_div(reward, self.dev_fee_bps.into(), BASIS_P.into());
        match self.dev_fee_mode {
            DevFeeMode::Deducted => FeeSplit { stakers: reward - dev, dev },
            DevFeeMode::OnTop => FeeSplit { stakers: reward, dev },
        }
    }

    pub fn can_claim_base(&self, now: BlockHeight) -> bool {
        now >= self.claim_base_reward_block
    }

    pub fn can_claim_boost(&self, now: BlockHeight) -> bool {
        now >= self.claim_boost_reward_block
    }
}
