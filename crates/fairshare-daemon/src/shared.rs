// crates/fairshare-daemon/src/shared.rs
//
// CommunityServices: the engines the daemon runs, wired over one store.
//
// Constructed once in main.rs, then handed to the scheduler. Every engine
// shares the same store, clock, and ledger, so the scheduler drives exactly
// the operations a request handler would.

use std::sync::Arc;
use std::time::Instant;

use fairshare_core::{AccountId, AccountStore, Clock, CommunityStore, FairshareResult, NewAccount};
use fairshare_economics::{Ledger, MonetaryPolicy};
use fairshare_governance::GovernanceEngine;
use fairshare_reputation::FairnessEngine;

use crate::config::DaemonConfig;

#[derive(Clone)]
pub struct CommunityServices {
    pub store: Arc<dyn CommunityStore>,
    pub clock: Arc<dyn Clock>,
    pub ledger: Arc<Ledger>,
    pub fairness: Arc<FairnessEngine>,
    pub monetary: Arc<MonetaryPolicy>,
    pub governance: Arc<GovernanceEngine>,
    /// Daemon start time for uptime reporting.
    pub start_time: Instant,
}

impl CommunityServices {
    pub async fn build(
        config: &DaemonConfig,
        store: Arc<dyn CommunityStore>,
        clock: Arc<dyn Clock>,
    ) -> FairshareResult<Self> {
        let treasury = if config.collects_fees() {
            Some(ensure_treasury(&store, clock.as_ref(), &config.ledger.treasury_username).await?)
        } else {
            None
        };

        let ledger = Arc::new(Ledger::new(
            store.clone(),
            clock.clone(),
            config.ledger_config(treasury),
        ));
        let fairness = Arc::new(FairnessEngine::new(
            store.clone(),
            clock.clone(),
            config.fairness_config(),
        ));
        let monetary = Arc::new(MonetaryPolicy::new(
            store.clone(),
            clock.clone(),
            ledger.clone(),
            config.monetary_config(),
        ));
        let governance = Arc::new(GovernanceEngine::new(
            store.clone(),
            clock.clone(),
            ledger.clone(),
            config.governance_config(),
        ));

        Ok(Self {
            store,
            clock,
            ledger,
            fairness,
            monetary,
            governance,
            start_time: Instant::now(),
        })
    }
}

/// Find the treasury account by username, creating it as an admin account
/// on first start.
async fn ensure_treasury(
    store: &Arc<dyn CommunityStore>,
    clock: &dyn Clock,
    username: &str,
) -> FairshareResult<AccountId> {
    if let Some(account) = store.find_account_by_username(username).await? {
        if !account.is_admin {
            tracing::warn!(
                "Treasury account {} is not an admin; its score will be recomputed",
                username
            );
        }
        return Ok(account.id);
    }

    let request = NewAccount::admin(username).with_display_name("Community treasury");
    request.validate()?;
    let now = clock.now();
    let account = fairshare_core::Account::new(request, now);
    let wallet = fairshare_core::Wallet::new(account.id, now);
    store.insert_account(&account, &wallet).await?;
    tracing::info!("Created treasury account {} ({})", username, account.id);
    Ok(account.id)
}
