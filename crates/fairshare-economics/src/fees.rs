// crates/fairshare-economics/src/fees.rs
//
// Transfer fees.
//
// A transfer of `amount` costs the sender exactly `amount`; the recipient
// receives `amount - fee`. The fee is either burned (removed from
// circulation) or collected into a treasury account in the same commit.

use serde::{Deserialize, Serialize};

use fairshare_core::{AccountId, Micros};

/// Basis points per whole: 10,000 bps = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default fee rate: 10 bps (0.1%).
pub const DEFAULT_FEE_BPS: u32 = 10;

/// Where transfer fees go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum FeePolicy {
    /// Fees leave circulation.
    #[default]
    Burn,
    /// Fees are credited to the treasury account.
    Collect { treasury: AccountId },
}

impl FeePolicy {
    pub fn treasury(&self) -> Option<AccountId> {
        match self {
            FeePolicy::Burn => None,
            FeePolicy::Collect { treasury } => Some(*treasury),
        }
    }
}

/// Fee on a transfer: `floor(amount * fee_bps / 10_000)`.
///
/// Computed in 128-bit arithmetic so large amounts cannot overflow. The fee
/// never exceeds the amount.
pub fn fee_for(amount: Micros, fee_bps: u32) -> Micros {
    let fee = amount as u128 * fee_bps as u128 / BPS_DENOMINATOR as u128;
    (fee as u64).min(amount)
}
