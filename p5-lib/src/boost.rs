use near_sdk::borsh::{self, BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_BOOST_TIERS;
use crate::errors::FarmError;

/// Maps the number of escrowed boost tokens to the weight a position holds in
/// the boost pot.
pub trait BoostCurve {
    /// Weight of a position escrowing `tokens` boost tokens. Must be 0 for 0
    /// tokens and non-decreasing.
    fn weight(&self, tokens: u32) -> u128;
}

#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
)]
#[serde(crate = "near_sdk::serde")]
pub struct BoostTier {
    pub min_tokens: u32,
    pub weight: u64,
}

/// Step-function boost curve. Tiers are sorted by `min_tokens`, the last tier
/// is the saturation level.
#[derive(BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(crate = "near_sdk::serde")]
pub struct BoostTiers {
    tiers: Vec<BoostTier>,
}

impl BoostTiers {
    pub fn new(tiers: Vec<BoostTier>) -> Result<Self, FarmError> {
        let first = tiers.first().ok_or(FarmError::InvalidConfig("boost curve needs a tier"))?;
        if first.min_tokens == 0 || first.weight == 0 {
            return Err(FarmError::InvalidConfig(
                "boost tiers start at one token with positive weight",
            ));
        }
        for w in tiers.windows(2) {
            if w[1].min_tokens <= w[0].min_tokens || w[1].weight < w[0].weight {
                return Err(FarmError::InvalidConfig("boost tiers must be increasing"));
            }
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[BoostTier] {
        &self.tiers
    }

    /// Number of tokens above which escrowing more adds no weight.
    pub fn saturation(&self) -> u32 {
        self.tiers.last().map_or(0, |t| t.min_tokens)
    }
}

impl Default for BoostTiers {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_BOOST_TIERS
                .iter()
                .map(|&(min_tokens, weight)| BoostTier { min_tokens, weight })
                .collect(),
        }
    }
}

impl BoostCurve for BoostTiers {
    fn weight(&self, tokens: u32) -> u128 {
        self.tiers
            .iter()
            .rev()
            .find(|t| tokens >= t.min_tokens)
            .map_or(0, |t| t.weight.into())
    }
}
