use crate::*;

use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
use near_contract_standards::non_fungible_token::core::NonFungibleTokenReceiver;

/// NFT Receiver
/// Used when a boost NFT is transferred using `nft_transfer_call` with a
/// `"boost:<pool_id>"` message. The token is returned to its previous owner
/// when the boost is rejected.
#[allow(unused_variables)]
#[near_bindgen]
impl NonFungibleTokenReceiver for Contract {
    fn nft_on_transfer(
        &mut self,
        sender_id: AccountId,
        previous_owner_id: AccountId,
        token_id: TokenId,
        msg: String,
    ) -> PromiseOrValue<bool> {
        let nft_contract_id = env::predecessor_account_id();
        if nft_contract_id != self.farm.config.boost_nft {
            log!(
                "@{} is not the boost NFT contract, returning token {}",
                nft_contract_id,
                token_id
            );
            return PromiseOrValue::Value(true);
        }
        match TransferInstruction::from(msg) {
            TransferInstruction::Boost(pool_id) => {
                self.assert_is_active();
                let now = env::block_height();
                let r = self.farm.boost(pool_id, &previous_owner_id, vec![token_id], now);
                match r {
                    Ok(s) => {
                        self.settle(s);
                        PromiseOrValue::Value(false)
                    }
                    Err(e) => {
                        log!("boost rejected: {}", e);
                        PromiseOrValue::Value(true)
                    }
                }
            }
            _ => {
                log!("ERR_UNKNOWN_MESSAGE");
                PromiseOrValue::Value(true)
            }
        }
    }
}

/// FT Receiver
/// Reward deposits use the `"fund"` message, stake deposits `"deposit:<pool_id>"`.
/// Returns the unused amount: zero on success, everything when the deposit is rejected.
#[near_bindgen]
impl FungibleTokenReceiver for Contract {
    fn ft_on_transfer(
        &mut self,
        sender_id: AccountId,
        amount: U128,
        msg: String,
    ) -> PromiseOrValue<U128> {
        let token_id = env::predecessor_account_id();
        assert!(amount.0 > 0, "deposited amount must be positive");

        match TransferInstruction::from(msg) {
            TransferInstruction::Fund => {
                if token_id != self.farm.config.reward_token {
                    log!("only the reward token funds the farm, refunding @{}", sender_id);
                    return PromiseOrValue::Value(amount);
                }
                self.farm.fund_rewards(amount.0);
                PromiseOrValue::Value(U128(0))
            }
            TransferInstruction::Deposit(pool_id) => {
                self.assert_is_active();
                match self.internal_deposit(&token_id, pool_id, &sender_id, amount.0) {
                    Ok(s) => {
                        self.settle(s);
                        PromiseOrValue::Value(U128(0))
                    }
                    Err(e) => {
                        log!("deposit of {} {} refunded: {}", amount.0, token_id, e);
                        PromiseOrValue::Value(amount)
                    }
                }
            }
            _ => {
                log!(
                    "ERR_UNKNOWN_MESSAGE, refunding {} {} to @{}",
                    amount.0,
                    token_id,
                    sender_id
                );
                PromiseOrValue::Value(amount)
            }
        }
    }
}
