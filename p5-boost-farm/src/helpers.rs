use crate::*;

/// Token receiver message switcher.
/// * `"fund"`: reward tokens for the payout reserve
/// * `"deposit:<pool_id>"`: stake tokens for a pool
/// * `"boost:<pool_id>"`: a boost NFT for the sender's position in a pool
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TransferInstruction {
    Fund,
    Deposit(PoolId),
    Boost(PoolId),
    Unknown,
}

impl From<String> for TransferInstruction {
    fn from(msg: String) -> Self {
        match msg.split_once(':') {
            Some(("deposit", pool_id)) => {
                pool_id.trim().parse().map_or(Self::Unknown, Self::Deposit)
            }
            Some(("boost", pool_id)) => {
                pool_id.trim().parse().map_or(Self::Unknown, Self::Boost)
            }
            _ if msg == "fund" => Self::Fund,
            _ => Self::Unknown,
        }
    }
}

/// Aborts the call with the coded farm error.
pub(crate) fn unwrap_or_panic<T>(r: Result<T, FarmError>) -> T {
    r.unwrap_or_else(|e| env::panic_str(&e.to_string()))
}

/// Returns true if the promise was failed. Otherwise returns false.
/// Fails if called outside a callback that received 1 promise result.
pub fn promise_result_as_failed() -> bool {
    require!(env::promise_results_count() == 1, "Contract expected a result on the callback");
    matches!(env::promise_result(0), PromiseResult::Failed)
}

#[cfg(not(target_arch = "wasm32"))]
#[test]
fn test_transfer_instructions() {
    use TransferInstruction::*;
    assert_eq!(TransferInstruction::from("fund".to_string()), Fund);
    assert_eq!(TransferInstruction::from("deposit:3".to_string()), Deposit(3));
    assert_eq!(TransferInstruction::from("boost: 0".to_string()), Boost(0));
    assert_eq!(TransferInstruction::from("deposit:".to_string()), Unknown);
    assert_eq!(TransferInstruction::from("boost:x".to_string()), Unknown);
    assert_eq!(TransferInstruction::from("fund:1".to_string()), Unknown);
    assert_eq!(TransferInstruction::from("".to_string()), Unknown);
}
