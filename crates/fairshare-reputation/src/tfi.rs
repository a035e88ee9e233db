// crates/fairshare-reputation/src/tfi.rs
//
// Trade Fairness Index (TFI) computation for merchants.
//
// Each customer rating scores four dimensions on 1-10. The TFI is the mean of
// the four per-dimension averages, scaled to 0-100 and floored at the
// merchant base score. Non-merchants always score 0.

use serde::{Deserialize, Serialize};

use fairshare_core::{Account, AccountId, Rating, SCORE_MAX};

use crate::pfi::clamp_score;

/// Per-dimension averages on the 1-10 rating scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionAverages {
    pub delivery: f64,
    pub quality: f64,
    pub transparency: f64,
    pub environmental: f64,
}

impl DimensionAverages {
    /// Average each dimension across the ratings. All zeros when empty.
    pub fn of(ratings: &[Rating]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }
        let mut sums = [0.0_f64; 4];
        for rating in ratings {
            for (sum, value) in sums.iter_mut().zip(rating.dimensions()) {
                *sum += value as f64;
            }
        }
        let n = ratings.len() as f64;
        Self {
            delivery: sums[0] / n,
            quality: sums[1] / n,
            transparency: sums[2] / n,
            environmental: sums[3] / n,
        }
    }

    pub fn mean(&self) -> f64 {
        (self.delivery + self.quality + self.transparency + self.environmental) / 4.0
    }
}

/// Full explanation of one merchant's TFI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfiBreakdown {
    pub merchant: AccountId,
    pub is_merchant: bool,
    pub rating_count: u64,
    pub dimensions: DimensionAverages,
    /// Mean dimension average times 10, before flooring and rounding.
    pub raw_score: f64,
    pub score: u8,
}

/// TFI from a rating log. `floor` is the merchant base score.
pub fn tfi_score(ratings: &[Rating], floor: u8) -> u8 {
    if ratings.is_empty() {
        return floor.min(SCORE_MAX);
    }
    let raw = DimensionAverages::of(ratings).mean() * 10.0;
    clamp_score(raw).max(floor).min(SCORE_MAX)
}

pub fn compute_tfi_breakdown(account: &Account, ratings: &[Rating], floor: u8) -> TfiBreakdown {
    let dimensions = DimensionAverages::of(ratings);
    let raw_score = dimensions.mean() * 10.0;
    let score = if account.is_merchant {
        tfi_score(ratings, floor)
    } else {
        0
    };
    TfiBreakdown {
        merchant: account.id,
        is_merchant: account.is_merchant,
        rating_count: ratings.len() as u64,
        dimensions,
        raw_score,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fairshare_core::{NewAccount, MERCHANT_BASE_TFI};
    use uuid::Uuid;

    fn rating(d: u8, q: u8, t: u8, e: u8) -> Rating {
        Rating {
            id: Uuid::now_v7(),
            customer: Uuid::now_v7(),
            merchant: Uuid::now_v7(),
            transaction: None,
            delivery: d,
            quality: q,
            transparency: t,
            environmental: e,
            comments: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_unrated_merchant_sits_at_floor() {
        assert_eq!(tfi_score(&[], MERCHANT_BASE_TFI), 30);
    }

    #[test]
    fn test_two_ratings_average_to_78() {
        let ratings = vec![rating(8, 9, 7, 9), rating(6, 7, 8, 8)];
        let averages = DimensionAverages::of(&ratings);
        assert_eq!(averages.delivery, 7.0);
        assert_eq!(averages.quality, 8.0);
        assert_eq!(averages.transparency, 7.5);
        assert_eq!(averages.environmental, 8.5);
        assert_eq!(tfi_score(&ratings, MERCHANT_BASE_TFI), 78);
    }

    #[test]
    fn test_poor_ratings_are_floored() {
        let ratings = vec![rating(1, 1, 2, 1)];
        assert_eq!(tfi_score(&ratings, MERCHANT_BASE_TFI), 30);
    }

    #[test]
    fn test_perfect_ratings_cap_at_100() {
        let ratings = vec![rating(10, 10, 10, 10)];
        assert_eq!(tfi_score(&ratings, MERCHANT_BASE_TFI), 100);
    }

    #[test]
    fn test_non_merchant_breakdown_scores_zero() {
        let member = Account::new(NewAccount::member("pat"), Utc::now());
        let breakdown = compute_tfi_breakdown(&member, &[rating(9, 9, 9, 9)], MERCHANT_BASE_TFI);
        assert_eq!(breakdown.score, 0);
        assert_eq!(breakdown.rating_count, 1);
    }
}
