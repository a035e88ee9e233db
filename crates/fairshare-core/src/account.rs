// crates/fairshare-core/src/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FairshareError, FairshareResult};
use crate::token::Micros;

/// Identity key shared by an account and its wallet.
pub type AccountId = Uuid;

/// Upper bound of both reputation scores.
pub const SCORE_MAX: u8 = 100;

/// TFI held by a registered merchant with no ratings, and the floor for
/// merchants with ratings.
pub const MERCHANT_BASE_TFI: u8 = 30;

/// Version of the inputs a stored score was computed from.
///
/// Attestations and ratings are append-only, so their counts identify the
/// input set the last recomputation saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub attestations_seen: u64,
    pub ratings_seen: u64,
    pub computed_at: DateTime<Utc>,
}

/// A community member.
///
/// Scores are written only by the fairness engine; identity fields only by
/// profile updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier (UUID v7 for time-ordering).
    pub id: AccountId,
    /// Unique login handle.
    pub username: String,
    /// Human-readable name shown in listings.
    pub display_name: String,
    /// Personal Fairness Index, 0-100.
    pub pfi: u8,
    /// Trade Fairness Index, 0-100. Always 0 for non-merchants.
    pub tfi: u8,
    pub is_merchant: bool,
    /// Admin accounts are excluded from all scoring.
    pub is_admin: bool,
    /// Verified community-service hours, never negative.
    pub community_service_hours: f64,
    /// Inputs version of the last score computation (None until first run).
    #[serde(default)]
    pub score_snapshot: Option<ScoreSnapshot>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh account from a registration request.
    pub fn new(request: NewAccount, now: DateTime<Utc>) -> Self {
        let display_name = request
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| request.username.clone());
        Self {
            id: Uuid::now_v7(),
            username: request.username,
            display_name,
            pfi: 0,
            tfi: if request.is_merchant {
                MERCHANT_BASE_TFI
            } else {
                0
            },
            is_merchant: request.is_merchant,
            is_admin: request.is_admin,
            community_service_hours: request.community_service_hours,
            score_snapshot: None,
            created_at: now,
        }
    }

    /// Whether the fairness engine recomputes this account's scores.
    pub fn is_scored(&self) -> bool {
        !self.is_admin
    }

    /// Store a recomputed PFI. Touches nothing but the PFI and its input
    /// count, so a concurrent profile change is never overwritten.
    pub fn record_pfi(&mut self, pfi: u8, attestations_seen: u64, now: DateTime<Utc>) {
        self.pfi = pfi.min(SCORE_MAX);
        let ratings_seen = self.score_snapshot.as_ref().map_or(0, |s| s.ratings_seen);
        self.score_snapshot = Some(ScoreSnapshot {
            attestations_seen,
            ratings_seen,
            computed_at: now,
        });
    }

    /// Store a recomputed TFI if the account is still a merchant. A
    /// non-merchant's TFI is owned by `apply_profile` and stays untouched.
    /// Returns whether the score was written.
    pub fn record_tfi(&mut self, tfi: u8, ratings_seen: u64, now: DateTime<Utc>) -> bool {
        if !self.is_merchant {
            return false;
        }
        self.tfi = tfi.min(SCORE_MAX);
        let attestations_seen = self
            .score_snapshot
            .as_ref()
            .map_or(0, |s| s.attestations_seen);
        self.score_snapshot = Some(ScoreSnapshot {
            attestations_seen,
            ratings_seen,
            computed_at: now,
        });
        true
    }

    /// Apply identity-field changes. Score fields are left alone except for
    /// the merchant TFI floor, which follows the merchant flag.
    pub fn apply_profile(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.display_name {
            self.display_name = name.clone();
        }
        if let Some(hours) = update.community_service_hours {
            self.community_service_hours = hours;
        }
        if let Some(is_merchant) = update.is_merchant {
            if is_merchant && !self.is_merchant && self.tfi == 0 {
                self.tfi = MERCHANT_BASE_TFI;
            }
            if !is_merchant {
                self.tfi = 0;
            }
            self.is_merchant = is_merchant;
        }
    }
}

/// Registration request for a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub display_name: Option<String>,
    pub is_merchant: bool,
    pub is_admin: bool,
    pub community_service_hours: f64,
}

impl NewAccount {
    /// A regular member with no service hours.
    pub fn member(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: None,
            is_merchant: false,
            is_admin: false,
            community_service_hours: 0.0,
        }
    }

    pub fn merchant(username: impl Into<String>) -> Self {
        Self {
            is_merchant: true,
            ..Self::member(username)
        }
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::member(username)
        }
    }

    pub fn with_service_hours(mut self, hours: f64) -> Self {
        self.community_service_hours = hours;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Reject empty usernames and negative or non-finite service hours.
    pub fn validate(&self) -> FairshareResult<()> {
        if self.username.trim().is_empty() {
            return Err(FairshareError::InvalidValue(
                "username must not be empty".to_string(),
            ));
        }
        validate_hours(self.community_service_hours)
    }
}

/// Partial update of an account's identity fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub community_service_hours: Option<f64>,
    pub is_merchant: Option<bool>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> FairshareResult<()> {
        if let Some(name) = &self.display_name {
            if name.trim().is_empty() {
                return Err(FairshareError::InvalidValue(
                    "display name must not be empty".to_string(),
                ));
            }
        }
        match self.community_service_hours {
            Some(hours) => validate_hours(hours),
            None => Ok(()),
        }
    }
}

fn validate_hours(hours: f64) -> FairshareResult<()> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(FairshareError::InvalidValue(format!(
            "community service hours must be a non-negative number, got {}",
            hours
        )));
    }
    Ok(())
}

/// The single wallet owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Owning account (1:1).
    pub account: AccountId,
    /// Total balance in micros. Never negative by construction.
    pub balance: Micros,
    /// Reserved portion of the balance; never exceeds `balance`.
    pub locked: Micros,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// An empty wallet for a newly created account.
    pub fn new(account: AccountId, now: DateTime<Utc>) -> Self {
        Self {
            account,
            balance: 0,
            locked: 0,
            updated_at: now,
        }
    }

    /// Amount available for transfers and debits.
    pub fn spendable(&self) -> Micros {
        self.balance.saturating_sub(self.locked)
    }
}
