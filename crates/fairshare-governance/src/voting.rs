// crates/fairshare-governance/src/voting.rs
//
// Voting power.
//
//   power = stake_weight * balance / circulating_supply
//         + reputation_weight * pfi / 100
//
// With the default 0.6 / 0.4 split, power lies in [0, 1]. The stake term is
// zero while nothing circulates.

use serde::{Deserialize, Serialize};

use fairshare_core::{Micros, SCORE_MAX};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VotingWeights {
    pub stake: f64,
    pub reputation: f64,
}

impl Default for VotingWeights {
    fn default() -> Self {
        Self {
            stake: 0.6,
            reputation: 0.4,
        }
    }
}

pub fn voting_power(balance: Micros, supply: Micros, pfi: u8, weights: &VotingWeights) -> f64 {
    let stake = if supply == 0 {
        0.0
    } else {
        balance as f64 / supply as f64
    };
    let reputation = pfi.min(SCORE_MAX) as f64 / SCORE_MAX as f64;
    weights.stake * stake + weights.reputation * reputation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_blends_stake_and_reputation() {
        let w = VotingWeights::default();
        // 0.6 * 0.25 + 0.4 * 0.5
        assert!((voting_power(250, 1_000, 50, &w) - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_empty_supply_counts_reputation_only() {
        let w = VotingWeights::default();
        assert!((voting_power(0, 0, 80, &w) - 0.32).abs() < 1e-12);
    }

    #[test]
    fn test_whale_with_full_reputation_is_one() {
        let w = VotingWeights::default();
        assert!((voting_power(1_000, 1_000, 100, &w) - 1.0).abs() < 1e-12);
    }
}
