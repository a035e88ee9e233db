// crates/fairshare-core/src/issuance.rs
//
// Monthly issuance bookkeeping.
//
// A month's issuance is computed once into an `IssuancePlan`, paid out share
// by share (each payout leaves an `IssuancePayout` marker written together
// with its credit), and sealed by a `MonthlyIssuanceRecord` once every share
// has been paid. The record is the canonical "this month is done" marker.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::{FairshareError, FairshareResult};
use crate::token::Micros;
use crate::transaction::TransactionId;

/// A calendar month in UTC, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> FairshareResult<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(FairshareError::InvalidValue(format!(
                "invalid calendar month {}-{}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    /// The month containing the given instant.
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Half-open `[start, end)` bounds of the month.
    pub fn bounds(&self) -> FairshareResult<(DateTime<Utc>, DateTime<Utc>)> {
        Ok((first_instant(*self)?, first_instant(self.next())?))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        Month::of(instant) == *self
    }
}

fn first_instant(month: Month) -> FairshareResult<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(month.year, month.month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| FairshareError::InvalidValue(format!("month {} out of range", month)))
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = FairshareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FairshareError::InvalidValue(format!("expected YYYY-MM, got {:?}", s));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Month::new(year, month)
    }
}

impl TryFrom<String> for Month {
    type Error = FairshareError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.to_string()
    }
}

/// One account's slice of a month's issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceShare {
    pub account: AccountId,
    /// PFI the share was weighted by.
    pub pfi: u8,
    pub amount: Micros,
}

/// The frozen computation for a month's issuance.
///
/// Persisted before the first credit so that a resumed run pays exactly the
/// shares the interrupted run computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuancePlan {
    pub month: Month,
    pub base_issuance: Micros,
    /// The closed month whose transfers set the activity factor.
    pub activity_month: Month,
    pub transfers_counted: u64,
    pub activity_factor: f64,
    pub fairness_factor: f64,
    pub total_issuance: Micros,
    pub circulating_supply_at_run: Micros,
    pub average_pfi: f64,
    pub shares: Vec<IssuanceShare>,
    pub created_at: DateTime<Utc>,
}

impl IssuancePlan {
    /// Sum of all planned shares. At most `total_issuance`; the difference
    /// is rounding dust that is never issued.
    pub fn planned(&self) -> Micros {
        self.shares.iter().map(|s| s.amount).sum()
    }
}

/// Marker that an account's share for a month has been credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuancePayout {
    pub month: Month,
    pub account: AccountId,
    pub amount: Micros,
    pub transaction: TransactionId,
    pub paid_at: DateTime<Utc>,
}

/// Canonical record of a completed monthly issuance. One per month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyIssuanceRecord {
    pub month: Month,
    pub base_issuance: Micros,
    pub activity_month: Month,
    pub activity_factor: f64,
    pub fairness_factor: f64,
    pub total_issuance: Micros,
    pub circulating_supply_at_run: Micros,
    pub average_pfi: f64,
    pub recipients: u64,
    /// Micros actually credited across all payouts.
    pub distributed: Micros,
    pub completed_at: DateTime<Utc>,
}

impl MonthlyIssuanceRecord {
    pub fn seal(plan: &IssuancePlan, distributed: Micros, now: DateTime<Utc>) -> Self {
        Self {
            month: plan.month,
            base_issuance: plan.base_issuance,
            activity_month: plan.activity_month,
            activity_factor: plan.activity_factor,
            fairness_factor: plan.fairness_factor,
            total_issuance: plan.total_issuance,
            circulating_supply_at_run: plan.circulating_supply_at_run,
            average_pfi: plan.average_pfi,
            recipients: plan.shares.len() as u64,
            distributed,
            completed_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_display_and_parse() {
        let month = Month::new(2026, 3).unwrap();
        assert_eq!(month.to_string(), "2026-03");
        assert_eq!("2026-03".parse::<Month>().unwrap(), month);
    }

    #[test]
    fn test_month_rejects_garbage() {
        assert!("2026-13".parse::<Month>().is_err());
        assert!("march".parse::<Month>().is_err());
        assert!(Month::new(2026, 0).is_err());
    }

    #[test]
    fn test_month_rolls_over_year() {
        let december = Month::new(2025, 12).unwrap();
        assert_eq!(december.next(), Month::new(2026, 1).unwrap());
        assert_eq!(Month::new(2026, 1).unwrap().previous(), december);
        assert_eq!(Month::new(2026, 7).unwrap().previous(), Month::new(2026, 6).unwrap());
    }

    #[test]
    fn test_month_bounds() {
        let month = Month::new(2026, 2).unwrap();
        let (start, end) = month.bounds().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
        assert!(month.contains(Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap()));
        assert!(!month.contains(end));
    }

    #[test]
    fn test_month_serde_as_string() {
        let month = Month::new(2026, 10).unwrap();
        let json = serde_json::to_string(&month).unwrap();
        assert_eq!(json, "\"2026-10\"");
        let back: Month = serde_json::from_str(&json).unwrap();
        assert_eq!(back, month);
    }
}
