pub mod boost;
pub mod config;
pub mod errors;
pub mod farm;
pub mod pool;
pub mod runtime;
pub mod stake;

/// Identifier of a boost NFT, as used by NEP-171 contracts.
pub type TokenId = String;

pub mod constants {
    use near_sdk::{Balance, Gas};

    /// Gas constants
    /// Amount of gas for fungible token transfers.
    pub const TGAS: Gas = Gas::ONE_TERA;
    pub const GAS_FOR_FT_TRANSFER: Gas = Gas(10 * TGAS.0);
    pub const GAS_FOR_NFT_TRANSFER: Gas = Gas(20 * TGAS.0);
    pub const GAS_FOR_CALLBACK: Gas = Gas(5 * TGAS.0);

    /// Fixed-point scale of the reward accumulators.
    pub const ACC_SCALE: Balance = 1_000_000_000_000; // 1e12

    pub const BASIS_P: u32 = 10_000;
    /// default dev fee: 10% of every accrual
    pub const DEV_FEE_BPS: u32 = 1_000;
    /// emission multiplier inside the bonus window
    pub const BONUS_MULTIPLIER: u64 = 10;

    /// (min escrowed tokens, weight) pairs of the default boost curve.
    /// Five tokens or more saturate the curve.
    pub const DEFAULT_BOOST_TIERS: [(u32, u64); 5] =
        [(1, 10), (2, 30), (3, 60), (4, 100), (5, 200)];
}

pub mod helpers {
    use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
    use near_sdk::Balance;
    use uint::construct_uint;

    construct_uint! {
        /// 256-bit unsigned integer.
        pub struct U256(4);
    }

    impl BorshSerialize for U256 {
        fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
            self.0.serialize(writer)
        }
    }

    impl BorshDeserialize for U256 {
        fn deserialize(buf: &mut &[u8]) -> std::io::Result<Self> {
            Ok(U256(<[u64; 4]>::deserialize(buf)?))
        }
    }

    /// Returns `a * b / c` rounded down. The product is computed in 256 bits so
    /// only the final result has to fit in a `u128`.
    /// Panics when `c == 0`.
    pub fn mul_div(a: Balance, b: Balance, c: Balance) -> Balance {
        to_balance(U256::from(a) * U256::from(b) / U256::from(c))
    }

    /// `a * b / c` rounded down, kept in 256 bits. Accumulators grow past
    /// `u128` when a tiny stake earns a 24 decimals emission.
    pub fn mul_div_wide(a: Balance, b: U256, c: Balance) -> U256 {
        U256::from(a) * b / U256::from(c)
    }

    /// Saturates at `u128::MAX`.
    pub fn to_balance(x: U256) -> Balance {
        if x > U256::from(u128::MAX) {
            u128::MAX
        } else {
            x.as_u128()
        }
    }
}
