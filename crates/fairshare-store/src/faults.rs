// crates/fairshare-store/src/faults.rs
//
// FaultyStore: a MemoryStore wrapper that injects storage errors and pauses
// on request. Only compiled with the `test-utils` feature; downstream crates
// enable it from their dev-dependencies.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use fairshare_core::error::{FairshareError, FairshareResult};
use fairshare_core::traits::{
    AccountStore, GovernanceStore, IssuanceStore, LedgerStore, LedgerWrite, SignalStore,
};
use fairshare_core::{
    Account, AccountId, Attestation, AttestationId, IssuancePayout, IssuancePlan, Micros, Month,
    MonthlyIssuanceRecord, Page, ProfileUpdate, Proposal, ProposalId, ProposalStatus, Rating,
    Transaction, TransactionId, TransactionKind, Vote, Wallet,
};

use crate::memory::MemoryStore;

/// Handshake for a paused account read.
///
/// `reached` fires once the read has started; the read then waits for
/// `release` before touching the inner store.
#[derive(Debug, Clone, Default)]
pub struct ReadPause {
    pub reached: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Debug, Default)]
struct Faults {
    failing_score_writes: HashSet<AccountId>,
    fail_issuance_plans: bool,
    read_pauses: HashMap<AccountId, ReadPause>,
}

#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    faults: Mutex<Faults>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().expect("Mutex poisoned")
    }

    /// Every PFI and TFI write for `id` fails with a storage error.
    pub fn fail_score_writes_for(&self, id: AccountId) {
        self.faults().failing_score_writes.insert(id);
    }

    /// Every issuance plan write fails with a storage error.
    pub fn fail_issuance_plans(&self) {
        self.faults().fail_issuance_plans = true;
    }

    /// Pause the next `get_account(id)` until the returned handle is
    /// released.
    pub fn pause_next_read_of(&self, id: AccountId) -> ReadPause {
        let pause = ReadPause::default();
        self.faults().read_pauses.insert(id, pause.clone());
        pause
    }

    fn check_score_write(&self, id: &AccountId) -> FairshareResult<()> {
        if self.faults().failing_score_writes.contains(id) {
            return Err(FairshareError::Storage(format!(
                "injected score write failure for {}",
                id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for FaultyStore {
    async fn insert_account(&self, account: &Account, wallet: &Wallet) -> FairshareResult<()> {
        self.inner.insert_account(account, wallet).await
    }

    async fn get_account(&self, id: &AccountId) -> FairshareResult<Option<Account>> {
        let pause = self.faults().read_pauses.remove(id);
        if let Some(pause) = pause {
            pause.reached.notify_one();
            pause.release.notified().await;
        }
        self.inner.get_account(id).await
    }

    async fn find_account_by_username(&self, username: &str) -> FairshareResult<Option<Account>> {
        self.inner.find_account_by_username(username).await
    }

    async fn list_accounts(&self) -> FairshareResult<Vec<Account>> {
        self.inner.list_accounts().await
    }

    async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
    ) -> FairshareResult<Option<Account>> {
        self.inner.update_profile(id, update).await
    }

    async fn save_pfi(
        &self,
        id: &AccountId,
        pfi: u8,
        attestations_seen: u64,
        computed_at: DateTime<Utc>,
    ) -> FairshareResult<Option<Account>> {
        self.check_score_write(id)?;
        self.inner.save_pfi(id, pfi, attestations_seen, computed_at).await
    }

    async fn save_tfi(
        &self,
        id: &AccountId,
        tfi: u8,
        ratings_seen: u64,
        computed_at: DateTime<Utc>,
    ) -> FairshareResult<Option<Account>> {
        self.check_score_write(id)?;
        self.inner.save_tfi(id, tfi, ratings_seen, computed_at).await
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn get_wallet(&self, account: &AccountId) -> FairshareResult<Option<Wallet>> {
        self.inner.get_wallet(account).await
    }

    async fn list_wallets(&self) -> FairshareResult<Vec<Wallet>> {
        self.inner.list_wallets().await
    }

    async fn commit_ledger(&self, write: LedgerWrite) -> FairshareResult<()> {
        self.inner.commit_ledger(write).await
    }

    async fn save_wallet(&self, wallet: &Wallet) -> FairshareResult<()> {
        self.inner.save_wallet(wallet).await
    }

    async fn get_transaction(&self, id: &TransactionId) -> FairshareResult<Option<Transaction>> {
        self.inner.get_transaction(id).await
    }

    async fn transactions_for(
        &self,
        account: &AccountId,
        page: Page,
    ) -> FairshareResult<Vec<Transaction>> {
        self.inner.transactions_for(account, page).await
    }

    async fn count_transactions(
        &self,
        kind: Option<TransactionKind>,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> FairshareResult<u64> {
        self.inner.count_transactions(kind, since, until).await
    }

    async fn count_account_transactions_since(
        &self,
        account: &AccountId,
        since: DateTime<Utc>,
    ) -> FairshareResult<u64> {
        self.inner.count_account_transactions_since(account, since).await
    }

    async fn total_transactions(&self) -> FairshareResult<u64> {
        self.inner.total_transactions().await
    }

    async fn circulating_supply(&self) -> FairshareResult<Micros> {
        self.inner.circulating_supply().await
    }
}

#[async_trait]
impl SignalStore for FaultyStore {
    async fn insert_attestation(&self, attestation: &Attestation) -> FairshareResult<()> {
        self.inner.insert_attestation(attestation).await
    }

    async fn get_attestation(&self, id: &AttestationId) -> FairshareResult<Option<Attestation>> {
        self.inner.get_attestation(id).await
    }

    async fn mark_attestation_verified(
        &self,
        id: &AttestationId,
    ) -> FairshareResult<Option<Attestation>> {
        self.inner.mark_attestation_verified(id).await
    }

    async fn attestations_for(&self, subject: &AccountId) -> FairshareResult<Vec<Attestation>> {
        self.inner.attestations_for(subject).await
    }

    async fn insert_rating(&self, rating: &Rating) -> FairshareResult<()> {
        self.inner.insert_rating(rating).await
    }

    async fn ratings_for(&self, merchant: &AccountId) -> FairshareResult<Vec<Rating>> {
        self.inner.ratings_for(merchant).await
    }
}

#[async_trait]
impl GovernanceStore for FaultyStore {
    async fn insert_proposal(&self, proposal: &Proposal) -> FairshareResult<()> {
        self.inner.insert_proposal(proposal).await
    }

    async fn get_proposal(&self, id: &ProposalId) -> FairshareResult<Option<Proposal>> {
        self.inner.get_proposal(id).await
    }

    async fn list_proposals(
        &self,
        status: Option<ProposalStatus>,
    ) -> FairshareResult<Vec<Proposal>> {
        self.inner.list_proposals(status).await
    }

    async fn save_proposal(&self, proposal: &Proposal) -> FairshareResult<()> {
        self.inner.save_proposal(proposal).await
    }

    async fn get_vote(
        &self,
        proposal: &ProposalId,
        voter: &AccountId,
    ) -> FairshareResult<Option<Vote>> {
        self.inner.get_vote(proposal, voter).await
    }

    async fn votes_for_proposal(&self, proposal: &ProposalId) -> FairshareResult<Vec<Vote>> {
        self.inner.votes_for_proposal(proposal).await
    }

    async fn commit_vote(&self, vote: &Vote, proposal: &Proposal) -> FairshareResult<()> {
        self.inner.commit_vote(vote, proposal).await
    }
}

#[async_trait]
impl IssuanceStore for FaultyStore {
    async fn get_issuance_plan(&self, month: &Month) -> FairshareResult<Option<IssuancePlan>> {
        self.inner.get_issuance_plan(month).await
    }

    async fn save_issuance_plan(&self, plan: &IssuancePlan) -> FairshareResult<()> {
        if self.faults().fail_issuance_plans {
            return Err(FairshareError::Storage(format!(
                "injected issuance plan failure for {}",
                plan.month
            )));
        }
        self.inner.save_issuance_plan(plan).await
    }

    async fn get_payout(
        &self,
        month: &Month,
        account: &AccountId,
    ) -> FairshareResult<Option<IssuancePayout>> {
        self.inner.get_payout(month, account).await
    }

    async fn payouts_for(&self, month: &Month) -> FairshareResult<Vec<IssuancePayout>> {
        self.inner.payouts_for(month).await
    }

    async fn get_issuance_record(
        &self,
        month: &Month,
    ) -> FairshareResult<Option<MonthlyIssuanceRecord>> {
        self.inner.get_issuance_record(month).await
    }

    async fn insert_issuance_record(&self, record: &MonthlyIssuanceRecord) -> FairshareResult<()> {
        self.inner.insert_issuance_record(record).await
    }

    async fn list_issuance_records(&self) -> FairshareResult<Vec<MonthlyIssuanceRecord>> {
        self.inner.list_issuance_records().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paused_read_waits_for_release() {
        let store = Arc::new(FaultyStore::new());
        let account = Account::new(fairshare_core::NewAccount::member("ada"), Utc::now());
        store
            .insert_account(&account, &Wallet::new(account.id, Utc::now()))
            .await
            .unwrap();

        let pause = store.pause_next_read_of(account.id);
        let reader = {
            let store = store.clone();
            let id = account.id;
            tokio::spawn(async move { store.get_account(&id).await })
        };
        pause.reached.notified().await;
        assert!(!reader.is_finished());

        pause.release.notify_one();
        let read = reader.await.unwrap().unwrap();
        assert_eq!(read.map(|a| a.id), Some(account.id));

        // The pause is one-shot.
        assert!(store.get_account(&account.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_injected_score_failure_is_per_account() {
        let store = FaultyStore::new();
        let now = Utc::now();
        let a = Account::new(fairshare_core::NewAccount::member("a"), now);
        let b = Account::new(fairshare_core::NewAccount::member("b"), now);
        for account in [&a, &b] {
            store
                .insert_account(account, &Wallet::new(account.id, now))
                .await
                .unwrap();
        }
        store.fail_score_writes_for(b.id);

        assert!(store.save_pfi(&a.id, 40, 0, now).await.unwrap().is_some());
        let err = store.save_pfi(&b.id, 40, 0, now).await.unwrap_err();
        assert!(matches!(err, FairshareError::Storage(_)));
    }
}
