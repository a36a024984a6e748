use std::fmt;

use near_sdk::{AccountId, Balance, BlockHeight};

use crate::pool::PoolId;

// Pools
pub const ERR10_INVALID_POOL: &str = "E10: invalid pool id";
pub const ERR11_POOL_EXISTS: &str = "E11: pool for this stake token already exists";

// Access
pub const ERR20_UNAUTHORIZED: &str = "E20: caller is not authorized";

// Stake
pub const ERR30_NOT_ENOUGH_STAKE: &str = "E30: not enough staked tokens";
pub const ERR31_NO_DEPOSITED_STAKE: &str = "E31: boost requires deposited stake tokens";

// Boost
pub const ERR40_NOT_UNSTAKABLE_YET: &str = "E40: boost tokens are locked";
pub const ERR41_NOT_ENOUGH_BOOST_TOKENS: &str = "E41: not enough boost tokens";

pub const ERR50_TRANSFER_FAILED: &str = "E50: token transfer failed";
pub const ERR60_INVALID_CONFIG: &str = "E60: invalid farm configuration";

/// Every way a farm operation can be rejected. A rejected operation leaves the
/// ledger untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FarmError {
    InvalidPool(PoolId),
    PoolExists(AccountId),
    Unauthorized(AccountId),
    InsufficientStake { requested: Balance, staked: Balance },
    NoDepositedStake,
    NotUnstakableYet { unlocks_at: BlockHeight },
    NotEnoughBoostTokens { requested: u32, available: u32 },
    TransferFailed(String),
    InvalidConfig(&'static str),
}

impl FarmError {
    /// Coded message prefix, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            FarmError::InvalidPool(_) => ERR10_INVALID_POOL,
            FarmError::PoolExists(_) => ERR11_POOL_EXISTS,
            FarmError::Unauthorized(_) => ERR20_UNAUTHORIZED,
            FarmError::InsufficientStake { .. } => ERR30_NOT_ENOUGH_STAKE,
            FarmError::NoDepositedStake => ERR31_NO_DEPOSITED_STAKE,
            FarmError::NotUnstakableYet { .. } => ERR40_NOT_UNSTAKABLE_YET,
            FarmError::NotEnoughBoostTokens { .. } => ERR41_NOT_ENOUGH_BOOST_TOKENS,
            FarmError::TransferFailed(_) => ERR50_TRANSFER_FAILED,
            FarmError::InvalidConfig(_) => ERR60_INVALID_CONFIG,
        }
    }
}

impl fmt::Display for FarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code();
        match self {
            FarmError::InvalidPool(pool_id) => write!(f, "{} ({})", code, pool_id),
            FarmError::PoolExists(token) => write!(f, "{} ({})", code, token),
            FarmError::Unauthorized(caller) => write!(f, "{} (@{})", code, caller),
            FarmError::InsufficientStake { requested, staked } => {
                write!(f, "{}: requested {}, staked {}", code, requested, staked)
            }
            FarmError::NotUnstakableYet { unlocks_at } => {
                write!(f, "{} until block {}", code, unlocks_at)
            }
            FarmError::NotEnoughBoostTokens { requested, available } => {
                write!(f, "{}: requested {}, available {}", code, requested, available)
            }
            FarmError::TransferFailed(reason) => write!(f, "{}: {}", code, reason),
            FarmError::InvalidConfig(reason) => write!(f, "{}: {}", code, reason),
            FarmError::NoDepositedStake => f.write_str(code),
        }
    }
}

impl std::error::Error for FarmError {}
