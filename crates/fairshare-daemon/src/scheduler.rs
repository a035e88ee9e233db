// crates/fairshare-daemon/src/scheduler.rs
//
// Cycle scheduler for the Fairshare daemon.
//
// Every `interval_secs` the scheduler runs one cycle of three jobs in order:
//   1. Recompute all fairness scores.
//   2. Process monthly issuance (a no-op once the month is recorded).
//   3. Resolve proposals whose voting window has ended.
// A failing job is logged and the cycle moves on to the next one.

use std::time::Duration;

use fairshare_economics::IssuanceOutcome;
use fairshare_governance::ResolutionReport;
use fairshare_reputation::ScoreSweepReport;

use crate::shared::CommunityServices;

/// What one cycle did. A job that failed has `None` and an entry in `errors`.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub scores: Option<ScoreSweepReport>,
    pub issuance: Option<IssuanceOutcome>,
    pub resolutions: Option<ResolutionReport>,
    pub errors: Vec<String>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct CycleScheduler {
    services: CommunityServices,
    interval: Duration,
    cycles_run: u64,
}

impl CycleScheduler {
    pub fn new(services: CommunityServices, interval_secs: u64) -> Self {
        Self {
            services,
            interval: Duration::from_secs(interval_secs),
            cycles_run: 0,
        }
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    /// Run cycles until Ctrl-C. The first cycle starts immediately.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!(
            "Cycle scheduler started (interval_secs={})",
            self.interval.as_secs()
        );

        loop {
            self.run_cycle().await;
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Cycle scheduler received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        Ok(())
    }

    /// Run the three jobs once, in order.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles_run += 1;
        let mut report = CycleReport::default();

        match self.services.fairness.update_all_scores().await {
            Ok(sweep) => report.scores = Some(sweep),
            Err(e) => {
                tracing::error!("Score recomputation failed: {}", e);
                report.errors.push(format!("scores: {}", e));
            }
        }

        match self.services.monetary.process_monthly_issuance().await {
            Ok(outcome) => {
                if let IssuanceOutcome::Incomplete { month, failed, .. } = &outcome {
                    tracing::error!(
                        "Monthly issuance for {} incomplete: {} credits failed",
                        month,
                        failed
                    );
                }
                report.issuance = Some(outcome);
            }
            Err(e) => {
                tracing::error!("Monthly issuance failed: {}", e);
                report.errors.push(format!("issuance: {}", e));
            }
        }

        match self.services.governance.resolve_due().await {
            Ok(resolutions) => report.resolutions = Some(resolutions),
            Err(e) => {
                tracing::error!("Proposal resolution failed: {}", e);
                report.errors.push(format!("governance: {}", e));
            }
        }

        tracing::debug!(
            "Cycle {} finished with {} errors",
            self.cycles_run,
            report.errors.len()
        );
        report
    }
}
