//! Synchronous host for a [`Farm`]: moves the tokens the ledger settles
//! through pluggable token contracts.
//!
//! An operation commits its ledger changes first and then pulls tokens in. A
//! failed pull or a failed principal transfer rolls the operation back. A
//! failed reward or dev fee payout is credited back to the ledger and the
//! operation still succeeds.

use near_sdk::{log, AccountId, Balance, BlockHeight};

use crate::boost::{BoostCurve, BoostTiers};
use crate::config::DevFeeMode;
use crate::errors::FarmError;
use crate::farm::{Checkpoint, Farm, Settlement};
use crate::pool::{PoolId, PoolInfo};
use crate::TokenId;

pub trait Clock {
    fn block_height(&self) -> BlockHeight;
}

/// Fungible token ledger, one instance serving every token contract.
pub trait FungibleToken {
    fn ft_transfer(
        &mut self,
        token_id: &AccountId,
        sender_id: &AccountId,
        receiver_id: &AccountId,
        amount: Balance,
    ) -> Result<(), String>;

    /// Moves `amount` from `owner_id` using the allowance `owner_id` granted to `spender_id`.
    fn ft_transfer_from(
        &mut self,
        token_id: &AccountId,
        spender_id: &AccountId,
        owner_id: &AccountId,
        receiver_id: &AccountId,
        amount: Balance,
    ) -> Result<(), String>;

    fn ft_balance_of(&self, token_id: &AccountId, account_id: &AccountId) -> Balance;
}

/// The boost NFT contract.
pub trait NonFungibleToken {
    fn nft_transfer_from(
        &mut self,
        operator_id: &AccountId,
        owner_id: &AccountId,
        receiver_id: &AccountId,
        token_id: &TokenId,
    ) -> Result<(), String>;

    fn nft_is_approved_for_all(&self, owner_id: &AccountId, operator_id: &AccountId) -> bool;

    fn nft_owner_of(&self, token_id: &TokenId) -> Option<AccountId>;

    fn nft_tokens_for_owner(&self, owner_id: &AccountId) -> Vec<TokenId>;
}

pub struct Runtime<F, N, K, C = BoostTiers> {
    pub farm: Farm<C>,
    /// custody account for stake tokens, boost tokens and the reward reserve
    pub account_id: AccountId,
    pub ft: F,
    pub nft: N,
    pub clock: K,
}

impl<F, N, K, C> Runtime<F, N, K, C>
where
    F: FungibleToken,
    N: NonFungibleToken,
    K: Clock,
    C: BoostCurve,
{
    pub fn new(farm: Farm<C>, account_id: AccountId, ft: F, nft: N, clock: K) -> Self {
        Self { farm, account_id, ft, nft, clock }
    }

    pub fn now(&self) -> BlockHeight {
        self.clock.block_height()
    }

    /**********
     * VIEWS
     **********/

    pub fn pending_base_reward(
        &self,
        pool_id: PoolId,
        account_id: &AccountId,
    ) -> Result<Balance, FarmError> {
        self.farm.pending_base_reward(pool_id, account_id, self.now())
    }

    pub fn pending_boost_reward(
        &self,
        pool_id: PoolId,
        account_id: &AccountId,
    ) -> Result<Balance, FarmError> {
        self.farm.pending_boost_reward(pool_id, account_id, self.now())
    }

    pub fn pending_reward(
        &self,
        pool_id: PoolId,
        account_id: &AccountId,
    ) -> Result<Balance, FarmError> {
        self.farm.pending_reward(pool_id, account_id, self.now())
    }

    pub fn pool_info(&self, pool_id: PoolId) -> Result<PoolInfo, FarmError> {
        self.farm.pool_info(pool_id)
    }

    /// Balance of `token_id` held in custody.
    pub fn custody_balance(&self, token_id: &AccountId) -> Balance {
        self.ft.ft_balance_of(token_id, &self.account_id)
    }

    /**********
     * ADMIN
     **********/

    pub fn add_pool(
        &mut self,
        caller: &AccountId,
        alloc_point: u64,
        stake_token: AccountId,
        with_update: bool,
    ) -> Result<PoolId, FarmError> {
        let now = self.now();
        let pool_id = self.farm.add_pool(caller, alloc_point, stake_token, with_update, now)?;
        self.pay_dev_fee();
        Ok(pool_id)
    }

    pub fn set_alloc_point(
        &mut self,
        caller: &AccountId,
        pool_id: PoolId,
        alloc_point: u64,
        with_update: bool,
    ) -> Result<(), FarmError> {
        let now = self.now();
        self.farm.set_alloc_point(caller, pool_id, alloc_point, with_update, now)?;
        self.pay_dev_fee();
        Ok(())
    }

    pub fn set_reward_per_block(
        &mut self,
        caller: &AccountId,
        reward_per_block: Balance,
    ) -> Result<(), FarmError> {
        self.farm.set_reward_per_block(caller, reward_per_block)
    }

    pub fn set_boost_reward_per_block(
        &mut self,
        caller: &AccountId,
        amount: Balance,
    ) -> Result<(), FarmError> {
        self.farm.set_boost_reward_per_block(caller, amount)
    }

    pub fn set_dev(&mut self, caller: &AccountId, dev_id: AccountId) -> Result<(), FarmError> {
        self.farm.set_dev(caller, dev_id)
    }

    pub fn set_owner(&mut self, caller: &AccountId, owner_id: AccountId) -> Result<(), FarmError> {
        self.farm.set_owner(caller, owner_id)
    }

    pub fn set_dev_fee(
        &mut self,
        caller: &AccountId,
        dev_fee_bps: u32,
        mode: DevFeeMode,
    ) -> Result<(), FarmError> {
        let now = self.now();
        self.farm.set_dev_fee(caller, dev_fee_bps, mode, now)?;
        self.pay_dev_fee();
        Ok(())
    }

    pub fn set_boost_curve(&mut self, caller: &AccountId, curve: C) -> Result<(), FarmError> {
        self.farm.set_boost_curve(caller, curve)
    }

    pub fn set_unstakable_block(
        &mut self,
        caller: &AccountId,
        block: BlockHeight,
    ) -> Result<(), FarmError> {
        self.farm.set_unstakable_block(caller, block)
    }

    pub fn set_claim_base_reward_block(
        &mut self,
        caller: &AccountId,
        block: BlockHeight,
    ) -> Result<(), FarmError> {
        self.farm.set_claim_base_reward_block(caller, block)
    }

    pub fn set_claim_boost_reward_block(
        &mut self,
        caller: &AccountId,
        block: BlockHeight,
    ) -> Result<(), FarmError> {
        self.farm.set_claim_boost_reward_block(caller, block)
    }

    pub fn update_pool(&mut self, caller: &AccountId, pool_id: PoolId) -> Result<(), FarmError> {
        let now = self.now();
        self.farm.update_pool(caller, pool_id, now)?;
        self.pay_dev_fee();
        Ok(())
    }

    pub fn mass_update_pools(&mut self, caller: &AccountId) -> Result<(), FarmError> {
        let now = self.now();
        self.farm.mass_update_pools(caller, now)?;
        self.pay_dev_fee();
        Ok(())
    }

    /// Pulls `amount` reward tokens from `funder` into the payout reserve.
    pub fn fund_rewards(&mut self, funder: &AccountId, amount: Balance) -> Result<(), FarmError> {
        let cp = self.farm.reserve_checkpoint();
        self.farm.fund_rewards(amount);
        let token = self.farm.config.reward_token.clone();
        let custody = self.account_id.clone();
        if let Err(e) = self.ft.ft_transfer_from(&token, &custody, funder, &custody, amount) {
            self.farm.rollback(cp);
            return Err(FarmError::TransferFailed(e));
        }
        Ok(())
    }

    /**********
     * USER OPERATIONS
     **********/

    pub fn deposit(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        amount: Balance,
    ) -> Result<Settlement, FarmError> {
        let now = self.now();
        let cp = self.farm.checkpoint(pool_id, account_id);
        let s = self.farm.deposit(pool_id, account_id, amount, now)?;
        self.execute(cp, s)
    }

    /// Pays out pending rewards without changing the stake.
    pub fn harvest(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
    ) -> Result<Settlement, FarmError> {
        self.deposit(pool_id, account_id, 0)
    }

    pub fn withdraw(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        amount: Balance,
    ) -> Result<Settlement, FarmError> {
        let now = self.now();
        let cp = self.farm.checkpoint(pool_id, account_id);
        let s = self.farm.withdraw(pool_id, account_id, amount, now)?;
        self.execute(cp, s)
    }

    pub fn emergency_withdraw(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
    ) -> Result<Settlement, FarmError> {
        let now = self.now();
        let cp = self.farm.checkpoint(pool_id, account_id);
        let s = self.farm.emergency_withdraw(pool_id, account_id, now)?;
        self.execute(cp, s)
    }

    /// Escrows a single boost token. Works with a per-token approval.
    pub fn boost(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        token_id: TokenId,
    ) -> Result<Settlement, FarmError> {
        if self.nft.nft_owner_of(&token_id).as_ref() != Some(account_id) {
            return Err(FarmError::TransferFailed(format!(
                "@{} doesn't own boost token {}",
                account_id, token_id
            )));
        }
        self.boost_tokens(pool_id, account_id, vec![token_id])
    }

    /// Escrows every boost token the account holds.
    pub fn boost_all(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
    ) -> Result<Settlement, FarmError> {
        self.assert_approved_for_all(account_id)?;
        let tokens = self.nft.nft_tokens_for_owner(account_id);
        self.boost_tokens(pool_id, account_id, tokens)
    }

    /// Escrows `count` of the boost tokens the account holds.
    pub fn boost_partially(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        count: u32,
    ) -> Result<Settlement, FarmError> {
        self.assert_approved_for_all(account_id)?;
        let mut tokens = self.nft.nft_tokens_for_owner(account_id);
        let available = tokens.len() as u32;
        if count == 0 || count > available {
            return Err(FarmError::NotEnoughBoostTokens { requested: count, available });
        }
        tokens.truncate(count as usize);
        self.boost_tokens(pool_id, account_id, tokens)
    }

    pub fn unboost_partially(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        count: u32,
    ) -> Result<Settlement, FarmError> {
        let now = self.now();
        let cp = self.farm.checkpoint(pool_id, account_id);
        let s = self.farm.unboost_partially(pool_id, account_id, count, now)?;
        self.execute(cp, s)
    }

    pub fn unboost_all(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
    ) -> Result<Settlement, FarmError> {
        let now = self.now();
        let cp = self.farm.checkpoint(pool_id, account_id);
        let s = self.farm.unboost_all(pool_id, account_id, now)?;
        self.execute(cp, s)
    }

    fn boost_tokens(
        &mut self,
        pool_id: PoolId,
        account_id: &AccountId,
        tokens: Vec<TokenId>,
    ) -> Result<Settlement, FarmError> {
        let now = self.now();
        let cp = self.farm.checkpoint(pool_id, account_id);
        let s = self.farm.boost(pool_id, account_id, tokens, now)?;
        self.execute(cp, s)
    }

    fn assert_approved_for_all(&self, account_id: &AccountId) -> Result<(), FarmError> {
        if !self.nft.nft_is_approved_for_all(account_id, &self.account_id) {
            return Err(FarmError::TransferFailed(format!(
                "@{} didn't approve the farm for all boost tokens",
                account_id
            )));
        }
        Ok(())
    }

    /// Moves the tokens of a settlement the ledger already applied.
    fn execute(&mut self, cp: Checkpoint, mut s: Settlement) -> Result<Settlement, FarmError> {
        let stake_token = self.farm.pool(s.pool_id)?.stake_token.clone();
        let custody = self.account_id.clone();
        let user = s.account_id.clone();
        // a settlement pulls either stake or boost tokens, never both
        debug_assert!(s.stake_in == 0 || s.nft_in.is_empty());

        if s.stake_in > 0 {
            let pulled =
                self.ft.ft_transfer_from(&stake_token, &custody, &user, &custody, s.stake_in);
            if let Err(e) = pulled {
                self.farm.rollback(cp);
                return Err(FarmError::TransferFailed(e));
            }
        }
        for (i, token_id) in s.nft_in.iter().enumerate() {
            if let Err(e) = self.nft.nft_transfer_from(&custody, &user, &custody, token_id) {
                for moved in &s.nft_in[..i] {
                    if let Err(e) = self.nft.nft_transfer_from(&custody, &custody, &user, moved) {
                        log!("returning boost token {} to @{} failed: {}", moved, user, e);
                    }
                }
                self.farm.rollback(cp);
                return Err(FarmError::TransferFailed(e));
            }
        }

        if s.stake_out > 0 {
            if let Err(e) = self.ft.ft_transfer(&stake_token, &custody, &user, s.stake_out) {
                self.farm.rollback(cp);
                return Err(FarmError::TransferFailed(e));
            }
        }
        let missing = s
            .nft_out
            .iter()
            .find(|t| self.nft.nft_owner_of(&t.token_id).as_ref() != Some(&custody));
        if let Some(t) = missing {
            let reason = format!("boost token {} is not in custody", t.token_id);
            self.farm.rollback(cp);
            return Err(FarmError::TransferFailed(reason));
        }
        let mut released = Vec::with_capacity(s.nft_out.len());
        let mut failed = Vec::new();
        for t in std::mem::take(&mut s.nft_out) {
            match self.nft.nft_transfer_from(&custody, &custody, &user, &t.token_id) {
                Ok(()) => released.push(t),
                Err(e) => {
                    log!("releasing boost token {} to @{} failed: {}", t.token_id, user, e);
                    failed.push(t);
                }
            }
        }
        s.nft_out = released;
        if !failed.is_empty() {
            let now = self.now();
            self.farm.restore_boost(s.pool_id, &user, failed, now)?;
        }

        let reward_token = self.farm.config.reward_token.clone();
        if s.reward() > 0 {
            if let Err(e) = self.ft.ft_transfer(&reward_token, &custody, &user, s.reward()) {
                log!("reward transfer to @{} failed: {}", user, e);
                self.farm.restore_reward(s.pool_id, &user, s.base_reward, s.boost_reward);
                s.base_reward = 0;
                s.boost_reward = 0;
            }
        }
        if s.dev_fee > 0 {
            let dev_id = self.farm.config.dev_id.clone();
            if let Err(e) = self.ft.ft_transfer(&reward_token, &custody, &dev_id, s.dev_fee) {
                log!("dev fee transfer to @{} failed: {}", dev_id, e);
                self.farm.restore_dev_fee(s.dev_fee);
                s.dev_fee = 0;
            }
        }
        Ok(s)
    }

    fn pay_dev_fee(&mut self) {
        let fee = self.farm.take_dev_fee();
        if fee == 0 {
            return;
        }
        let token = self.farm.config.reward_token.clone();
        let dev_id = self.farm.config.dev_id.clone();
        if let Err(e) = self.ft.ft_transfer(&token, &self.account_id, &dev_id, fee) {
            log!("dev fee transfer to @{} failed: {}", dev_id, e);
            self.farm.restore_dev_fee(fee);
        }
    }
}
