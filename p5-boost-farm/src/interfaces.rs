use near_sdk::ext_contract;
use near_sdk::serde::{Deserialize, Serialize};

use crate::*;

#[ext_contract(ext_ft)]
pub trait FungibleToken {
    fn ft_transfer(&mut self, receiver_id: AccountId, amount: U128, memo: Option<String>);
}

#[ext_contract(ext_nft)]
pub trait NonFungibleToken {
    fn nft_transfer(
        &mut self,
        receiver_id: AccountId,
        token_id: TokenId,
        approval_id: Option<u64>,
        memo: Option<String>,
    );
}

#[derive(Deserialize, Serialize)]
#[serde(crate = "near_sdk::serde")]
#[cfg_attr(not(target_arch = "wasm32"), derive(Debug))]
pub struct P5ContractParams {
    pub is_active: bool,
    pub owner_id: AccountId,
    pub dev_id: AccountId,
    pub reward_token: AccountId,
    /// NFT contract used for boost
    pub boost_nft: AccountId,
    pub reward_per_block: U128,
    pub boost_reward_per_block: U128,
    pub bonus_multiplier: u64,
    pub start_block: BlockHeight,
    pub bonus_start_block: BlockHeight,
    pub bonus_end_block: BlockHeight,
    pub dev_fee_bps: u32,
    pub dev_fee_mode: DevFeeMode,
    pub unstakable_block: BlockHeight,
    pub claim_base_reward_block: BlockHeight,
    pub claim_boost_reward_block: BlockHeight,
    pub total_alloc_point: u64,
    pub pool_length: u32,
    /// reward tokens available for payouts
    pub reward_reserve: U128,
    /// accrued dev fee waiting for the reserve
    pub dev_fee_owed: U128,
    /// total rewards paid to stakers
    pub total_paid: U128,
}
