// crates/fairshare-daemon/tests/integration_community.rs
//
// Integration tests for the Fairshare daemon.
//
// Exercises the full community cycle: accounts, transfers, signals, score
// sweeps, monthly issuance, and proposal resolution, over both store
// backends.
//
// These tests use the public APIs of the underlying library crates directly
// since the daemon is a binary crate with no lib.rs.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use fairshare_core::{
    AccountId, AccountStore, AttestationKind, Clock, CommunityStore, FairshareError, ManualClock,
    Month, NewAccount, ProposalKind, ProposalStatus, TransactionKind, MICROS_PER_FAIR,
};
use fairshare_economics::{
    FeePolicy, IssuanceOutcome, Ledger, LedgerConfig, MonetaryConfig, MonetaryPolicy,
};
use fairshare_governance::{GovernanceConfig, GovernanceEngine, NewProposal};
use fairshare_reputation::{FairnessConfig, FairnessEngine, RatingScores};
use fairshare_store::{MemoryStore, RocksStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory path using UUID to avoid conflicts.
fn temp_db_path(label: &str) -> String {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("fairshare_test_{}_{}", label, Uuid::now_v7()));
    path.to_string_lossy().to_string()
}

struct Community {
    store: Arc<dyn CommunityStore>,
    clock: Arc<ManualClock>,
    ledger: Arc<Ledger>,
    fairness: FairnessEngine,
    monetary: MonetaryPolicy,
    governance: GovernanceEngine,
}

impl Community {
    fn new(store: Arc<dyn CommunityStore>, ledger_config: LedgerConfig) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 15, 12, 0, 0).unwrap(),
        ));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let ledger = Arc::new(Ledger::new(store.clone(), dyn_clock.clone(), ledger_config));
        Self {
            fairness: FairnessEngine::new(store.clone(), dyn_clock.clone(), FairnessConfig::default()),
            monetary: MonetaryPolicy::new(
                store.clone(),
                dyn_clock.clone(),
                ledger.clone(),
                MonetaryConfig::default(),
            ),
            governance: GovernanceEngine::new(
                store.clone(),
                dyn_clock,
                ledger.clone(),
                GovernanceConfig::default(),
            ),
            store,
            clock,
            ledger,
        }
    }

    async fn balance(&self, id: &AccountId) -> u64 {
        self.ledger.balance(id).await.unwrap().balance.micros
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_full_cycle_persists_across_reopen() {
    let path = temp_db_path("full_cycle");

    let (ana_id, mo_id, ben_id, supply_after_issuance) = {
        let store: Arc<dyn CommunityStore> = Arc::new(RocksStore::open(&path).unwrap());
        let c = Community::new(store, LedgerConfig::default());

        let admin = c.ledger.open_account(NewAccount::admin("admin")).await.unwrap();
        let ana = c.ledger.open_account(NewAccount::member("ana")).await.unwrap();
        let mo = c.ledger.open_account(NewAccount::merchant("mo")).await.unwrap();
        let ben = c
            .ledger
            .open_account(NewAccount::member("ben").with_service_hours(20.0))
            .await
            .unwrap();
        assert_eq!(mo.tfi, 30);
        assert_eq!(ana.pfi, 0);

        // Transfers: 10 bps fee withheld from the recipient and burned.
        c.ledger
            .credit(&ana.id, 100 * MICROS_PER_FAIR, TransactionKind::FairnessReward, "")
            .await
            .unwrap();
        let purchase = c
            .ledger
            .transfer(&ana.id, &mo.id, 50 * MICROS_PER_FAIR, "bread")
            .await
            .unwrap();
        assert_eq!(purchase.fee, 50_000);
        assert_eq!(c.balance(&ana.id).await, 50 * MICROS_PER_FAIR);
        assert_eq!(c.balance(&mo.id).await, 49_950_000);
        assert_eq!(c.ledger.circulating_supply().await.unwrap(), 99_950_000);

        // Signals.
        c.fairness
            .create_rating(
                &ana.id,
                &mo.id,
                Some(purchase.id),
                RatingScores::new(8, 8, 8, 8),
                "fresh",
            )
            .await
            .unwrap();
        c.fairness
            .create_attestation(&ben.id, &admin.id, AttestationKind::DisputeResolution, 6, "")
            .await
            .unwrap();
        let pending = c
            .fairness
            .create_attestation(&ana.id, &ben.id, AttestationKind::CommunityService, 9, "")
            .await
            .unwrap();
        assert!(!pending.verified);
        assert!(matches!(
            c.fairness.verify_attestation(&pending.id, &ben.id).await,
            Err(FairshareError::Unauthorized(_))
        ));
        c.fairness.verify_attestation(&pending.id, &admin.id).await.unwrap();

        // Score sweep: admins are exempt.
        let sweep = c.fairness.update_all_scores().await.unwrap();
        assert_eq!(sweep.pfi_updated, 3);
        assert_eq!(sweep.exempt, 1);
        assert!(sweep.failed.is_empty());

        let ana_now = c.store.get_account(&ana.id).await.unwrap().unwrap();
        let mo_now = c.store.get_account(&mo.id).await.unwrap().unwrap();
        let ben_now = c.store.get_account(&ben.id).await.unwrap().unwrap();
        assert_eq!(ana_now.pfi, 65); // 0.5 * 90 + 20
        assert_eq!(ben_now.pfi, 56); // 0.5 * 60 + 0.3 * 20 + 20
        assert_eq!(mo_now.pfi, 20);
        assert_eq!(mo_now.tfi, 80);

        // May's issuance, weighted by April's transfers: every scored
        // account gets a PFI-weighted share.
        c.clock.set(Utc.with_ymd_and_hms(2026, 5, 1, 0, 30, 0).unwrap());
        let supply_before = c.ledger.circulating_supply().await.unwrap();
        let IssuanceOutcome::Completed(record) =
            c.monetary.process_monthly_issuance().await.unwrap()
        else {
            panic!("expected completed issuance");
        };
        assert_eq!(record.month, Month::new(2026, 5).unwrap());
        assert_eq!(record.activity_month, Month::new(2026, 4).unwrap());
        assert!(record.activity_factor > 0.0);
        assert_eq!(record.recipients, 3);
        assert!(record.distributed > 0);
        assert!(record.distributed <= record.total_issuance);
        let supply_after = c.ledger.circulating_supply().await.unwrap();
        assert_eq!(supply_after, supply_before + record.distributed);
        assert_eq!(c.balance(&admin.id).await, 0);

        assert!(matches!(
            c.monetary.process_monthly_issuance().await.unwrap(),
            IssuanceOutcome::AlreadyIssued(_)
        ));

        (ana.id, mo.id, ben.id, supply_after)
    };

    // Everything above survives a reopen of the same database.
    let store: Arc<dyn CommunityStore> = Arc::new(RocksStore::open(&path).unwrap());
    let c = Community::new(store, LedgerConfig::default());
    c.clock.set(Utc.with_ymd_and_hms(2026, 5, 2, 9, 0, 0).unwrap());
    assert_eq!(c.ledger.circulating_supply().await.unwrap(), supply_after_issuance);
    assert_eq!(
        c.store.get_account(&mo_id).await.unwrap().unwrap().tfi,
        80
    );
    assert!(matches!(
        c.monetary.process_monthly_issuance().await.unwrap(),
        IssuanceOutcome::AlreadyIssued(_)
    ));
    assert_eq!(c.monetary.issuance_history().await.unwrap().len(), 1);

    // Governance over the persisted balances and scores.
    let proposal = c
        .governance
        .create_proposal(
            &ana_id,
            NewProposal {
                title: "Lower the transfer fee".to_string(),
                description: "5 bps instead of 10".to_string(),
                kind: ProposalKind::FeeRate,
                voting_period: Duration::days(3),
            },
        )
        .await
        .unwrap();
    c.governance.vote(&ana_id, &proposal.id, true).await.unwrap();
    c.governance.vote(&ben_id, &proposal.id, true).await.unwrap();
    c.governance.vote(&mo_id, &proposal.id, false).await.unwrap();
    assert!(matches!(
        c.governance.vote(&mo_id, &proposal.id, true).await,
        Err(FairshareError::AlreadyVoted { .. })
    ));
    assert_eq!(c.governance.votes(&proposal.id).await.unwrap().len(), 3);
    assert!(matches!(
        c.governance.resolve(&proposal.id).await,
        Err(FairshareError::ProposalStillOpen(_))
    ));

    c.clock.advance(Duration::days(4));
    assert!(c.governance.active_proposals().await.unwrap().is_empty());
    let report = c.governance.resolve_due().await.unwrap();
    assert_eq!(report.passed, 1);
    let resolved = c.governance.proposal(&proposal.id).await.unwrap();
    assert_eq!(resolved.status, ProposalStatus::Passed);
    assert!(resolved.votes_for > resolved.votes_against);

    drop(c);
    let _ = std::fs::remove_dir_all(&path);
}

#[tokio::test]
async fn test_collected_fees_fund_the_treasury_across_months() {
    let store: Arc<dyn CommunityStore> = Arc::new(MemoryStore::new());
    let treasury = {
        let bootstrap = Community::new(store.clone(), LedgerConfig::default());
        bootstrap
            .ledger
            .open_account(NewAccount::admin("treasury"))
            .await
            .unwrap()
    };
    let c = Community::new(
        store,
        LedgerConfig {
            fee_bps: 100,
            fee_policy: FeePolicy::Collect {
                treasury: treasury.id,
            },
        },
    );

    let ana = c
        .ledger
        .open_account(NewAccount::member("ana").with_service_hours(100.0))
        .await
        .unwrap();
    let ben = c.ledger.open_account(NewAccount::member("ben")).await.unwrap();
    c.ledger
        .credit(&ana.id, 10 * MICROS_PER_FAIR, TransactionKind::FairnessReward, "")
        .await
        .unwrap();
    c.ledger
        .transfer(&ana.id, &ben.id, 10 * MICROS_PER_FAIR, "")
        .await
        .unwrap();

    // 1% of 10 FAIR goes to the treasury; nothing leaves circulation.
    assert_eq!(c.balance(&treasury.id).await, MICROS_PER_FAIR / 10);
    assert_eq!(c.balance(&ben.id).await, 9_900_000);
    assert_eq!(c.ledger.circulating_supply().await.unwrap(), 10 * MICROS_PER_FAIR);

    // ana: 0.3 * 100 + 20 = 50, ben: 20. Admins are not scored.
    c.fairness.update_all_scores().await.unwrap();

    // March was quiet, so April issues nothing.
    let IssuanceOutcome::Completed(april) = c.monetary.process_monthly_issuance().await.unwrap()
    else {
        panic!("expected completed issuance for April");
    };
    assert_eq!(april.activity_month, Month::new(2026, 3).unwrap());
    assert_eq!(april.total_issuance, 0);
    assert_eq!(c.balance(&treasury.id).await, MICROS_PER_FAIR / 10);

    // April's single transfer drives May: 10000 * (1 / 1000) * 0.35 = 3.5 FAIR.
    c.clock.set(Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 1).unwrap());
    let may = c.monetary.process_monthly_issuance().await.unwrap();
    let IssuanceOutcome::Completed(record) = may else {
        panic!("expected completed issuance for May");
    };
    assert_eq!(record.month, Month::new(2026, 5).unwrap());
    assert_eq!(record.activity_month, Month::new(2026, 4).unwrap());
    assert_eq!(record.total_issuance, 3_500_000);
    assert_eq!(record.distributed, 3_500_000);
    assert_eq!(c.balance(&ana.id).await, 2_500_000);
    assert_eq!(c.balance(&ben.id).await, 9_900_000 + MICROS_PER_FAIR);
    // Issuance credits are not transfers, so the treasury earns no fee.
    assert_eq!(c.balance(&treasury.id).await, MICROS_PER_FAIR / 10);

    let history = c.monetary.issuance_history().await.unwrap();
    assert_eq!(history.len(), 2);

    let stats = c.fairness.community_stats().await.unwrap();
    assert_eq!(stats.total_accounts, 3);
    assert_eq!(stats.admins, 1);
    let council = c.fairness.council(1).await.unwrap();
    assert_eq!(council[0].id, ana.id);
}
