#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use near_sdk::{AccountId, Balance, BlockHeight};

use p5_lib::config::{DevFeeMode, FarmConfig};
use p5_lib::farm::Farm;
use p5_lib::runtime::{Clock, FungibleToken, NonFungibleToken, Runtime};
use p5_lib::TokenId;

pub type TestRuntime = Runtime<MemFt, MemNft, TestClock>;

pub fn acc(s: &str) -> AccountId {
    s.parse().unwrap()
}

pub fn owner() -> AccountId {
    acc("owner.near")
}
pub fn dev() -> AccountId {
    acc("dev.near")
}
pub fn alice() -> AccountId {
    acc("alice.near")
}
pub fn bob() -> AccountId {
    acc("bob.near")
}
pub fn carol() -> AccountId {
    acc("carol.near")
}
pub fn vaulter() -> AccountId {
    acc("vaulter.near")
}
pub fn farm_acc() -> AccountId {
    acc("farm.near")
}
/// reward token
pub fn ann() -> AccountId {
    acc("ann.near")
}
/// boost NFT contract
pub fn awbc() -> AccountId {
    acc("awbc.near")
}
pub fn lp() -> AccountId {
    acc("lp.near")
}
pub fn lp2() -> AccountId {
    acc("lp2.near")
}

#[derive(Default)]
pub struct MemFt {
    balances: HashMap<(AccountId, AccountId), Balance>,
    /// (token, owner, spender) -> allowance
    allowances: HashMap<(AccountId, AccountId, AccountId), Balance>,
    /// transfers to these accounts fail
    pub blocked: HashSet<AccountId>,
}

impl MemFt {
    pub fn mint(&mut self, token: &AccountId, account: &AccountId, amount: Balance) {
        *self.balances.entry((token.clone(), account.clone())).or_default() += amount;
    }

    pub fn approve(
        &mut self,
        token: &AccountId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Balance,
    ) {
        self.allowances.insert((token.clone(), owner.clone(), spender.clone()), amount);
    }

    pub fn balance(&self, token: &AccountId, account: &AccountId) -> Balance {
        self.balances.get(&(token.clone(), account.clone())).copied().unwrap_or(0)
    }

    fn move_balance(
        &mut self,
        token: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Balance,
    ) -> Result<(), String> {
        if self.blocked.contains(to) {
            return Err(format!("{} can't receive {}", to, token));
        }
        let from_balance = self.balance(token, from);
        if from_balance < amount {
            return Err(format!("{} has {} {}, needs {}", from, from_balance, token, amount));
        }
        self.balances.insert((token.clone(), from.clone()), from_balance - amount);
        self.mint(token, to, amount);
        Ok(())
    }
}

impl FungibleToken for MemFt {
    fn ft_transfer(
        &mut self,
        token_id: &AccountId,
        sender_id: &AccountId,
        receiver_id: &AccountId,
        amount: Balance,
    ) -> Result<(), String> {
        self.move_balance(token_id, sender_id, receiver_id, amount)
    }

    fn ft_transfer_from(
        &mut self,
        token_id: &AccountId,
        spender_id: &AccountId,
        owner_id: &AccountId,
        receiver_id: &AccountId,
        amount: Balance,
    ) -> Result<(), String> {
        let key = (token_id.clone(), owner_id.clone(), spender_id.clone());
        let allowance = self.allowances.get(&key).copied().unwrap_or(0);
        if spender_id != owner_id && allowance < amount {
            return Err(format!("allowance {} is below {}", allowance, amount));
        }
        self.move_balance(token_id, owner_id, receiver_id, amount)?;
        if spender_id != owner_id {
            self.allowances.insert(key, allowance - amount);
        }
        Ok(())
    }

    fn ft_balance_of(&self, token_id: &AccountId, account_id: &AccountId) -> Balance {
        self.balance(token_id, account_id)
    }
}

#[derive(Default)]
pub struct MemNft {
    /// tokens in mint order
    tokens: Vec<(TokenId, AccountId)>,
    approvals: HashMap<TokenId, AccountId>,
    operators: HashSet<(AccountId, AccountId)>,
    next_id: u64,
}

impl MemNft {
    /// Mints `count` new tokens to `owner`.
    pub fn gift(&mut self, count: u32, owner: &AccountId) -> Vec<TokenId> {
        (0..count)
            .map(|_| {
                self.next_id += 1;
                let token_id = self.next_id.to_string();
                self.tokens.push((token_id.clone(), owner.clone()));
                token_id
            })
            .collect()
    }

    pub fn approve(&mut self, token_id: &str, spender: &AccountId) {
        self.approvals.insert(token_id.to_string(), spender.clone());
    }

    pub fn set_approval_for_all(
        &mut self,
        owner: &AccountId,
        operator: &AccountId,
        approved: bool,
    ) {
        if approved {
            self.operators.insert((owner.clone(), operator.clone()));
        } else {
            self.operators.remove(&(owner.clone(), operator.clone()));
        }
    }

    pub fn balance_of(&self, owner: &AccountId) -> usize {
        self.tokens.iter().filter(|(_, o)| o == owner).count()
    }
}

impl NonFungibleToken for MemNft {
    fn nft_transfer_from(
        &mut self,
        operator_id: &AccountId,
        owner_id: &AccountId,
        receiver_id: &AccountId,
        token_id: &TokenId,
    ) -> Result<(), String> {
        let authorized = operator_id == owner_id
            || self.approvals.get(token_id) == Some(operator_id)
            || self.operators.contains(&(owner_id.clone(), operator_id.clone()));
        if !authorized {
            return Err(format!("{} is not approved for token {}", operator_id, token_id));
        }
        let entry = self
            .tokens
            .iter_mut()
            .find(|(id, _)| id == token_id)
            .ok_or_else(|| format!("token {} not found", token_id))?;
        if entry.1 != *owner_id {
            return Err(format!("token {} is not owned by {}", token_id, owner_id));
        }
        entry.1 = receiver_id.clone();
        self.approvals.remove(token_id);
        Ok(())
    }

    fn nft_is_approved_for_all(&self, owner_id: &AccountId, operator_id: &AccountId) -> bool {
        self.operators.contains(&(owner_id.clone(), operator_id.clone()))
    }

    fn nft_owner_of(&self, token_id: &TokenId) -> Option<AccountId> {
        self.tokens.iter().find(|(id, _)| id == token_id).map(|(_, o)| o.clone())
    }

    fn nft_tokens_for_owner(&self, owner_id: &AccountId) -> Vec<TokenId> {
        self.tokens
            .iter()
            .filter(|(_, o)| o == owner_id)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[derive(Default)]
pub struct TestClock {
    pub height: BlockHeight,
}

impl Clock for TestClock {
    fn block_height(&self) -> BlockHeight {
        self.height
    }
}

/// Farm paying the dev fee on top of staker rewards, with `lp`, `lp2` and
/// `ann` balances handed out to the test accounts.
pub fn deploy(
    reward_per_block: Balance,
    boost_reward_per_block: Balance,
    start_block: BlockHeight,
    bonus_end_block: BlockHeight,
) -> TestRuntime {
    let mut config = FarmConfig::new(
        owner(),
        dev(),
        ann(),
        awbc(),
        reward_per_block,
        boost_reward_per_block,
        start_block,
        bonus_end_block,
    );
    config.dev_fee_mode = DevFeeMode::OnTop;
    let farm = Farm::new(config).unwrap();

    let mut ft = MemFt::default();
    ft.mint(&ann(), &owner(), 1_000_000_000);
    for user in [alice(), bob(), carol()] {
        ft.mint(&lp(), &user, 1000);
        ft.mint(&lp2(), &user, 1000);
    }
    ft.mint(&ann(), &vaulter(), 1000);
    Runtime::new(farm, farm_acc(), ft, MemNft::default(), TestClock::default())
}

/// Test-only shortcuts over [`TestRuntime`].
pub trait Harness {
    /// Moves the clock to `height`; the next call runs in that block.
    fn at(&mut self, height: BlockHeight) -> &mut Self;
    /// Owner moves `amount` reward tokens into the reserve.
    fn fund(&mut self, amount: Balance);
    fn approve_ft(&mut self, token: &AccountId, user: &AccountId, amount: Balance);
    fn ann_balance(&self, account: &AccountId) -> Balance;
}

impl Harness for TestRuntime {
    fn at(&mut self, height: BlockHeight) -> &mut Self {
        self.clock.height = height;
        self
    }

    fn fund(&mut self, amount: Balance) {
        self.ft.approve(&ann(), &owner(), &farm_acc(), amount);
        self.fund_rewards(&owner(), amount).unwrap();
    }

    fn approve_ft(&mut self, token: &AccountId, user: &AccountId, amount: Balance) {
        self.ft.approve(token, user, &farm_acc(), amount);
    }

    fn ann_balance(&self, account: &AccountId) -> Balance {
        self.ft.balance(&ann(), account)
    }
}
