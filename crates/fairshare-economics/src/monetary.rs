// crates/fairshare-economics/src/monetary.rs
//
// Reputation-weighted monthly issuance.
//
// Once per UTC calendar month new FAIR is issued:
//   total = base_monthly_issuance * activity_factor * fairness_factor
// where
//   activity_factor = min(transfers_last_month / expected_transactions,
//                         1 + max_growth_rate)
//   fairness_factor = average PFI of non-admin accounts / 100
//
// Transfers are counted over the closed calendar month before the month
// being issued, never the month in progress.
//
// The total is split across non-admin accounts with PFI > 0 in proportion
// to PFI, rounding each share down. Rounding dust is never issued.
//
// A run first freezes its computation as an `IssuancePlan`, then pays each
// share through the ledger with a payout marker in the same commit, and only
// then writes the month's `MonthlyIssuanceRecord`. A run that fails part way
// leaves the plan and the markers behind; the next run reuses the plan and
// skips shares already paid, so no account is ever credited twice.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use fairshare_core::error::{FairshareError, FairshareResult};
use fairshare_core::{
    AccountId, AccountStore, Clock, CommunityStore, Fair, IssuancePlan, IssuanceShare,
    IssuanceStore, LedgerStore, Micros, Month, MonthlyIssuanceRecord, TransactionKind,
    MICROS_PER_FAIR,
};
use fairshare_reputation::average_pfi;

use crate::ledger::Ledger;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonetaryConfig {
    /// Issuance at activity and fairness factors of 1.0, in micros.
    pub base_monthly_issuance: Micros,
    /// Transfers per month that count as full activity.
    pub expected_transactions: u64,
    /// How far above 1.0 the activity factor may rise.
    pub max_growth_rate: f64,
}

impl Default for MonetaryConfig {
    fn default() -> Self {
        Self {
            base_monthly_issuance: 10_000 * MICROS_PER_FAIR,
            expected_transactions: 1_000,
            max_growth_rate: 0.5,
        }
    }
}

/// Result of one issuance attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum IssuanceOutcome {
    /// The month already has a record; nothing was done.
    AlreadyIssued(Month),
    /// Every share is paid and the record has been written.
    Completed(MonthlyIssuanceRecord),
    /// Some credits failed. No record was written; the next run resumes.
    Incomplete { month: Month, paid: u64, failed: u64 },
}

/// `min(transfers / expected, 1 + max_growth_rate)`. With no expectation
/// configured, activity is treated as saturated.
pub fn activity_factor(transfers: u64, expected: u64, max_growth_rate: f64) -> f64 {
    let cap = 1.0 + max_growth_rate.max(0.0);
    if expected == 0 {
        return cap;
    }
    (transfers as f64 / expected as f64).min(cap)
}

/// Split `total` across accounts in proportion to PFI, rounding down.
///
/// Accounts with PFI 0, and shares that round down to zero, are omitted.
pub fn allocate_shares(total: Micros, scores: &[(AccountId, u8)]) -> Vec<IssuanceShare> {
    let pfi_sum: u128 = scores.iter().map(|(_, pfi)| *pfi as u128).sum();
    if pfi_sum == 0 || total == 0 {
        return Vec::new();
    }
    scores
        .iter()
        .filter(|(_, pfi)| *pfi > 0)
        .map(|(account, pfi)| IssuanceShare {
            account: *account,
            pfi: *pfi,
            amount: (total as u128 * *pfi as u128 / pfi_sum) as Micros,
        })
        .filter(|share| share.amount > 0)
        .collect()
}

pub struct MonetaryPolicy {
    store: Arc<dyn CommunityStore>,
    clock: Arc<dyn Clock>,
    ledger: Arc<Ledger>,
    config: MonetaryConfig,
    run_lock: Mutex<()>,
}

impl MonetaryPolicy {
    pub fn new(
        store: Arc<dyn CommunityStore>,
        clock: Arc<dyn Clock>,
        ledger: Arc<Ledger>,
        config: MonetaryConfig,
    ) -> Self {
        Self {
            store,
            clock,
            ledger,
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &MonetaryConfig {
        &self.config
    }

    /// Issue for the current calendar month if that has not happened yet.
    pub async fn process_monthly_issuance(&self) -> FairshareResult<IssuanceOutcome> {
        let month = Month::of(self.clock.now());
        let _run = self.run_lock.lock().await;
        if self.store.get_issuance_record(&month).await?.is_some() {
            tracing::debug!("Issuance for {} already recorded", month);
            return Ok(IssuanceOutcome::AlreadyIssued(month));
        }
        self.run(month).await
    }

    /// Issue for an explicit month. Fails if the month is already recorded.
    pub async fn issue_for_month(&self, month: Month) -> FairshareResult<IssuanceOutcome> {
        let _run = self.run_lock.lock().await;
        if self.store.get_issuance_record(&month).await?.is_some() {
            return Err(FairshareError::DuplicateIssuanceForMonth(month));
        }
        self.run(month).await
    }

    pub async fn issuance_record(
        &self,
        month: &Month,
    ) -> FairshareResult<Option<MonthlyIssuanceRecord>> {
        self.store.get_issuance_record(month).await
    }

    /// All completed months, oldest first.
    pub async fn issuance_history(&self) -> FairshareResult<Vec<MonthlyIssuanceRecord>> {
        self.store.list_issuance_records().await
    }

    /// Compute a month's plan from current state without persisting it.
    /// Activity is measured over the month before `month`.
    pub async fn compute_plan(&self, month: Month) -> FairshareResult<IssuancePlan> {
        let activity_month = month.previous();
        let (start, end) = activity_month.bounds()?;
        let transfers = self
            .store
            .count_transactions(Some(TransactionKind::Transfer), start, end)
            .await?;
        let accounts = self.store.list_accounts().await?;
        let supply = self.store.circulating_supply().await?;

        let activity = activity_factor(
            transfers,
            self.config.expected_transactions,
            self.config.max_growth_rate,
        );
        let avg_pfi = average_pfi(&accounts);
        let fairness = avg_pfi / 100.0;
        let total =
            (self.config.base_monthly_issuance as f64 * activity * fairness).floor() as Micros;

        let scores: Vec<(AccountId, u8)> = accounts
            .iter()
            .filter(|a| a.is_scored())
            .map(|a| (a.id, a.pfi))
            .collect();

        Ok(IssuancePlan {
            month,
            base_issuance: self.config.base_monthly_issuance,
            activity_month,
            transfers_counted: transfers,
            activity_factor: activity,
            fairness_factor: fairness,
            total_issuance: total,
            circulating_supply_at_run: supply,
            average_pfi: avg_pfi,
            shares: allocate_shares(total, &scores),
            created_at: self.clock.now(),
        })
    }

    async fn load_or_create_plan(&self, month: Month) -> FairshareResult<IssuancePlan> {
        if let Some(plan) = self.store.get_issuance_plan(&month).await? {
            tracing::info!("Resuming issuance for {} from saved plan", month);
            return Ok(plan);
        }
        let plan = self.compute_plan(month).await?;
        self.store.save_issuance_plan(&plan).await?;
        tracing::info!(
            "Planned issuance for {}: total {} (activity {:.3} from {} transfers in {}, fairness {:.3}) across {} accounts",
            month,
            Fair::from_micros(plan.total_issuance),
            plan.activity_factor,
            plan.transfers_counted,
            plan.activity_month,
            plan.fairness_factor,
            plan.shares.len()
        );
        Ok(plan)
    }

    async fn run(&self, month: Month) -> FairshareResult<IssuanceOutcome> {
        let plan = self.load_or_create_plan(month).await?;

        let mut paid = 0u64;
        let mut failed = 0u64;
        for share in &plan.shares {
            if self.store.get_payout(&month, &share.account).await?.is_some() {
                paid += 1;
                continue;
            }
            match self
                .ledger
                .credit_issuance(month, &share.account, share.amount)
                .await
            {
                Ok(_) => paid += 1,
                Err(e) => {
                    tracing::warn!(
                        "Issuance credit of {} to {} for {} failed: {}",
                        Fair::from_micros(share.amount),
                        share.account,
                        month,
                        e
                    );
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            tracing::warn!(
                "Issuance for {} incomplete: {} paid, {} failed",
                month,
                paid,
                failed
            );
            return Ok(IssuanceOutcome::Incomplete {
                month,
                paid,
                failed,
            });
        }

        let distributed: Micros = self
            .store
            .payouts_for(&month)
            .await?
            .iter()
            .map(|p| p.amount)
            .sum();
        let record = MonthlyIssuanceRecord::seal(&plan, distributed, self.clock.now());
        self.store.insert_issuance_record(&record).await?;
        tracing::info!(
            "Issuance for {} complete: {} distributed to {} accounts",
            month,
            Fair::from_micros(distributed),
            record.recipients
        );
        Ok(IssuanceOutcome::Completed(record))
    }
}
