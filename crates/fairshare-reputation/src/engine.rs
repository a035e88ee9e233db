// crates/fairshare-reputation/src/engine.rs
//
// FairnessEngine: intake of attestations and ratings, score recomputation,
// and read-only score queries.
//
// The engine reads accounts, signals, and transaction history through the
// store and writes only the score fields of accounts. It never touches
// wallets. Score writes for one account are serialized on a per-account lock
// so a PFI and a TFI recomputation cannot overwrite each other.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fairshare_core::error::{FairshareError, FairshareResult};
use fairshare_core::signals::{SIGNAL_MAX, SIGNAL_MIN};
use fairshare_core::{
    Account, AccountId, AccountLocks, AccountStore, Attestation, AttestationId, AttestationKind,
    Clock, CommunityStore, LedgerStore, Rating, SignalStore, TransactionId,
    MERCHANT_BASE_TFI,
};

use crate::pfi::{compute_pfi_breakdown, PfiBreakdown, PfiWeights};
use crate::stats::{rank_council, CommunityStats};
use crate::tfi::{compute_tfi_breakdown, tfi_score, TfiBreakdown};

/// Scoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessConfig {
    pub pfi: PfiWeights,
    /// Minimum TFI for any merchant, rated or not.
    pub tfi_floor: u8,
    /// Window used for the activity signal in PFI breakdowns.
    pub recent_activity_days: i64,
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self {
            pfi: PfiWeights::default(),
            tfi_floor: MERCHANT_BASE_TFI,
            recent_activity_days: 30,
        }
    }
}

/// The four dimensions of a customer rating, each 1-10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScores {
    pub delivery: u8,
    pub quality: u8,
    pub transparency: u8,
    pub environmental: u8,
}

impl RatingScores {
    pub fn new(delivery: u8, quality: u8, transparency: u8, environmental: u8) -> Self {
        Self {
            delivery,
            quality,
            transparency,
            environmental,
        }
    }
}

/// Result of recomputing one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    /// The score was recomputed and stored.
    Scored { previous: u8, score: u8 },
    /// The account is an admin; its stored score was left alone.
    Exempt { score: u8 },
}

impl ScoreOutcome {
    pub fn score(&self) -> u8 {
        match self {
            ScoreOutcome::Scored { score, .. } | ScoreOutcome::Exempt { score } => *score,
        }
    }
}

/// Summary of one `update_all_scores` sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreSweepReport {
    pub pfi_updated: u64,
    pub tfi_updated: u64,
    pub exempt: u64,
    /// Accounts whose recomputation failed, with the error text.
    pub failed: Vec<(AccountId, String)>,
}

fn check_signal(name: &str, value: u8) -> FairshareResult<()> {
    if !(SIGNAL_MIN..=SIGNAL_MAX).contains(&value) {
        return Err(FairshareError::InvalidValue(format!(
            "{} must be between {} and {}, got {}",
            name, SIGNAL_MIN, SIGNAL_MAX, value
        )));
    }
    Ok(())
}

pub struct FairnessEngine {
    store: Arc<dyn CommunityStore>,
    clock: Arc<dyn Clock>,
    config: FairnessConfig,
    score_locks: AccountLocks,
}

impl FairnessEngine {
    pub fn new(
        store: Arc<dyn CommunityStore>,
        clock: Arc<dyn Clock>,
        config: FairnessConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            score_locks: AccountLocks::new(),
        }
    }

    pub fn config(&self) -> &FairnessConfig {
        &self.config
    }

    async fn require_account(&self, id: &AccountId) -> FairshareResult<Account> {
        self.store
            .get_account(id)
            .await?
            .ok_or(FairshareError::UnknownAccount(*id))
    }

    /// Recompute and store an account's PFI.
    pub async fn compute_pfi(&self, id: &AccountId) -> FairshareResult<ScoreOutcome> {
        let _guard = self.score_locks.lock(id).await;
        let account = self.require_account(id).await?;
        if !account.is_scored() {
            return Ok(ScoreOutcome::Exempt { score: account.pfi });
        }

        let attestations = self.store.attestations_for(id).await?;
        let breakdown = compute_pfi_breakdown(&account, &attestations, 0, &self.config.pfi);
        let saved = self
            .store
            .save_pfi(
                id,
                breakdown.score,
                attestations.len() as u64,
                self.clock.now(),
            )
            .await?
            .ok_or(FairshareError::UnknownAccount(*id))?;

        if saved.pfi != account.pfi {
            tracing::debug!("PFI for {} changed {} -> {}", id, account.pfi, saved.pfi);
        }
        Ok(ScoreOutcome::Scored {
            previous: account.pfi,
            score: saved.pfi,
        })
    }

    /// Recompute and store a merchant's TFI.
    ///
    /// The write is skipped if the account is not a merchant when it lands,
    /// including a merchant demoted after the ratings were read; the
    /// returned score is always the TFI as stored.
    pub async fn compute_tfi(&self, id: &AccountId) -> FairshareResult<ScoreOutcome> {
        let _guard = self.score_locks.lock(id).await;
        let account = self.require_account(id).await?;
        if !account.is_scored() {
            return Ok(ScoreOutcome::Exempt { score: account.tfi });
        }

        let ratings = if account.is_merchant {
            self.store.ratings_for(id).await?
        } else {
            Vec::new()
        };
        let score = tfi_score(&ratings, self.config.tfi_floor);
        let saved = self
            .store
            .save_tfi(id, score, ratings.len() as u64, self.clock.now())
            .await?
            .ok_or(FairshareError::UnknownAccount(*id))?;

        if saved.tfi != account.tfi {
            tracing::debug!("TFI for {} changed {} -> {}", id, account.tfi, saved.tfi);
        }
        Ok(ScoreOutcome::Scored {
            previous: account.tfi,
            score: saved.tfi,
        })
    }

    /// Recompute PFI for every non-admin and TFI for every merchant.
    ///
    /// A failure for one account is logged and recorded in the report; the
    /// sweep continues with the next account.
    pub async fn update_all_scores(&self) -> FairshareResult<ScoreSweepReport> {
        let accounts = self.store.list_accounts().await?;
        let mut report = ScoreSweepReport::default();

        for account in &accounts {
            if !account.is_scored() {
                report.exempt += 1;
                continue;
            }
            match self.compute_pfi(&account.id).await {
                Ok(_) => report.pfi_updated += 1,
                Err(e) => {
                    tracing::warn!("PFI recomputation failed for {}: {}", account.id, e);
                    report.failed.push((account.id, e.to_string()));
                    continue;
                }
            }
            if account.is_merchant {
                match self.compute_tfi(&account.id).await {
                    Ok(_) => report.tfi_updated += 1,
                    Err(e) => {
                        tracing::warn!("TFI recomputation failed for {}: {}", account.id, e);
                        report.failed.push((account.id, e.to_string()));
                    }
                }
            }
        }

        tracing::info!(
            "Score sweep complete: {} PFI, {} TFI, {} exempt, {} failed",
            report.pfi_updated,
            report.tfi_updated,
            report.exempt,
            report.failed.len()
        );
        Ok(report)
    }

    /// Record a peer attestation. Attestations from admins are verified
    /// immediately; all others wait for `verify_attestation`.
    pub async fn create_attestation(
        &self,
        subject: &AccountId,
        attester: &AccountId,
        kind: AttestationKind,
        value: u8,
        description: &str,
    ) -> FairshareResult<Attestation> {
        check_signal("attestation value", value)?;
        if subject == attester {
            return Err(FairshareError::SelfReference(
                "an account cannot attest to itself".to_string(),
            ));
        }
        self.require_account(subject).await?;
        let attester_account = self.require_account(attester).await?;

        let attestation = Attestation {
            id: Uuid::now_v7(),
            subject: *subject,
            attester: *attester,
            kind,
            value,
            verified: attester_account.is_admin,
            description: description.to_string(),
            created_at: self.clock.now(),
        };
        self.store.insert_attestation(&attestation).await?;
        tracing::debug!(
            "Attestation {} ({}) from {} to {}",
            attestation.id,
            kind.as_str(),
            attester,
            subject
        );
        Ok(attestation)
    }

    /// Mark an attestation verified. Only admins may verify.
    pub async fn verify_attestation(
        &self,
        id: &AttestationId,
        verifier: &AccountId,
    ) -> FairshareResult<Attestation> {
        let verifier_account = self.require_account(verifier).await?;
        if !verifier_account.is_admin {
            return Err(FairshareError::Unauthorized(format!(
                "{} may not verify attestations",
                verifier_account.username
            )));
        }
        self.store
            .mark_attestation_verified(id)
            .await?
            .ok_or_else(|| FairshareError::InvalidValue(format!("unknown attestation {}", id)))
    }

    /// Record a customer rating of a merchant.
    ///
    /// A referenced transaction must exist and involve the merchant.
    pub async fn create_rating(
        &self,
        customer: &AccountId,
        merchant: &AccountId,
        transaction: Option<TransactionId>,
        scores: RatingScores,
        comments: &str,
    ) -> FairshareResult<Rating> {
        check_signal("delivery", scores.delivery)?;
        check_signal("quality", scores.quality)?;
        check_signal("transparency", scores.transparency)?;
        check_signal("environmental", scores.environmental)?;
        if customer == merchant {
            return Err(FairshareError::SelfReference(
                "a merchant cannot rate itself".to_string(),
            ));
        }
        self.require_account(customer).await?;
        let merchant_account = self.require_account(merchant).await?;
        if !merchant_account.is_merchant {
            return Err(FairshareError::InvalidValue(format!(
                "{} is not a merchant",
                merchant_account.username
            )));
        }
        if let Some(tx_id) = &transaction {
            let tx = self.store.get_transaction(tx_id).await?.ok_or_else(|| {
                FairshareError::InvalidValue(format!("unknown transaction {}", tx_id))
            })?;
            if !tx.involves(merchant) {
                return Err(FairshareError::InvalidValue(format!(
                    "transaction {} does not involve merchant {}",
                    tx_id, merchant
                )));
            }
        }

        let rating = Rating {
            id: Uuid::now_v7(),
            customer: *customer,
            merchant: *merchant,
            transaction,
            delivery: scores.delivery,
            quality: scores.quality,
            transparency: scores.transparency,
            environmental: scores.environmental,
            comments: comments.to_string(),
            created_at: self.clock.now(),
        };
        self.store.insert_rating(&rating).await?;
        tracing::debug!("Rating {} from {} for merchant {}", rating.id, customer, merchant);
        Ok(rating)
    }

    pub async fn pfi_breakdown(&self, id: &AccountId) -> FairshareResult<PfiBreakdown> {
        let account = self.require_account(id).await?;
        let attestations = self.store.attestations_for(id).await?;
        let since = self.clock.now() - Duration::days(self.config.recent_activity_days);
        let recent = self.store.count_account_transactions_since(id, since).await?;
        Ok(compute_pfi_breakdown(
            &account,
            &attestations,
            recent,
            &self.config.pfi,
        ))
    }

    pub async fn tfi_breakdown(&self, id: &AccountId) -> FairshareResult<TfiBreakdown> {
        let account = self.require_account(id).await?;
        let ratings = self.store.ratings_for(id).await?;
        Ok(compute_tfi_breakdown(
            &account,
            &ratings,
            self.config.tfi_floor,
        ))
    }

    pub async fn community_stats(&self) -> FairshareResult<CommunityStats> {
        let accounts = self.store.list_accounts().await?;
        let supply = self.store.circulating_supply().await?;
        let total_transactions = self.store.total_transactions().await?;
        Ok(CommunityStats::from_accounts(
            &accounts,
            supply,
            total_transactions,
        ))
    }

    /// The highest-ranked non-admin accounts.
    pub async fn council(&self, limit: usize) -> FairshareResult<Vec<Account>> {
        let accounts = self.store.list_accounts().await?;
        Ok(rank_council(accounts, limit))
    }
}
