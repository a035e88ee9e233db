// crates/fairshare-store/src/memory.rs
//
// In-memory implementation of the `CommunityStore` trait family.
//
// All state lives behind one `RwLock`. Every mutating method performs its
// checks and writes inside a single write section, which gives the same
// all-or-nothing visibility the RocksDB store gets from write batches.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fairshare_core::error::{FairshareError, FairshareResult};
use fairshare_core::traits::{
    AccountStore, GovernanceStore, IssuanceStore, LedgerStore, LedgerWrite, SignalStore,
};
use fairshare_core::{
    Account, AccountId, Attestation, AttestationId, IssuancePayout, IssuancePlan, Micros, Month,
    MonthlyIssuanceRecord, Page, ProfileUpdate, Proposal, ProposalId, ProposalStatus, Rating,
    Transaction, TransactionId, TransactionKind, Vote, Wallet,
};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    /// Account ids in insertion order.
    account_order: Vec<AccountId>,
    wallets: HashMap<AccountId, Wallet>,
    /// Append-only log in commit order.
    transactions: Vec<Transaction>,
    transaction_index: HashMap<TransactionId, usize>,
    attestations: Vec<Attestation>,
    ratings: Vec<Rating>,
    proposals: HashMap<ProposalId, Proposal>,
    proposal_order: Vec<ProposalId>,
    votes: HashMap<ProposalId, Vec<Vote>>,
    plans: HashMap<Month, IssuancePlan>,
    payouts: HashMap<(Month, AccountId), IssuancePayout>,
    records: BTreeMap<Month, MonthlyIssuanceRecord>,
}

/// Volatile store for tests, demos, and `store = "memory"` daemons.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().expect("RwLock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().expect("RwLock poisoned")
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: &Account, wallet: &Wallet) -> FairshareResult<()> {
        let mut state = self.write();
        if state
            .accounts
            .values()
            .any(|existing| existing.username == account.username)
        {
            return Err(FairshareError::DuplicateUsername(account.username.clone()));
        }
        state.accounts.insert(account.id, account.clone());
        state.account_order.push(account.id);
        state.wallets.insert(wallet.account, wallet.clone());
        Ok(())
    }

    async fn get_account(&self, id: &AccountId) -> FairshareResult<Option<Account>> {
        Ok(self.read().accounts.get(id).cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> FairshareResult<Option<Account>> {
        Ok(self
            .read()
            .accounts
            .values()
            .find(|account| account.username == username)
            .cloned())
    }

    async fn list_accounts(&self) -> FairshareResult<Vec<Account>> {
        let state = self.read();
        Ok(state
            .account_order
            .iter()
            .filter_map(|id| state.accounts.get(id).cloned())
            .collect())
    }

    async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
    ) -> FairshareResult<Option<Account>> {
        let mut state = self.write();
        Ok(state.accounts.get_mut(id).map(|account| {
            account.apply_profile(update);
            account.clone()
        }))
    }

    async fn save_pfi(
        &self,
        id: &AccountId,
        pfi: u8,
        attestations_seen: u64,
        computed_at: DateTime<Utc>,
    ) -> FairshareResult<Option<Account>> {
        let mut state = self.write();
        Ok(state.accounts.get_mut(id).map(|account| {
            account.record_pfi(pfi, attestations_seen, computed_at);
            account.clone()
        }))
    }

    async fn save_tfi(
        &self,
        id: &AccountId,
        tfi: u8,
        ratings_seen: u64,
        computed_at: DateTime<Utc>,
    ) -> FairshareResult<Option<Account>> {
        let mut state = self.write();
        Ok(state.accounts.get_mut(id).map(|account| {
            account.record_tfi(tfi, ratings_seen, computed_at);
            account.clone()
        }))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_wallet(&self, account: &AccountId) -> FairshareResult<Option<Wallet>> {
        Ok(self.read().wallets.get(account).cloned())
    }

    async fn list_wallets(&self) -> FairshareResult<Vec<Wallet>> {
        let state = self.read();
        Ok(state
            .account_order
            .iter()
            .filter_map(|id| state.wallets.get(id).cloned())
            .collect())
    }

    async fn commit_ledger(&self, write: LedgerWrite) -> FairshareResult<()> {
        let mut state = self.write();

        // Validate everything before touching anything.
        for wallet in &write.wallets {
            if !state.wallets.contains_key(&wallet.account) {
                return Err(FairshareError::UnknownAccount(wallet.account));
            }
        }
        if let Some(payout) = &write.payout {
            if state.payouts.contains_key(&(payout.month, payout.account)) {
                return Err(FairshareError::Storage(format!(
                    "payout for {} in {} already recorded",
                    payout.account, payout.month
                )));
            }
        }

        for wallet in write.wallets {
            state.wallets.insert(wallet.account, wallet);
        }
        let position = state.transactions.len();
        state
            .transaction_index
            .insert(write.transaction.id, position);
        state.transactions.push(write.transaction);
        if let Some(payout) = write.payout {
            state.payouts.insert((payout.month, payout.account), payout);
        }
        Ok(())
    }

    async fn save_wallet(&self, wallet: &Wallet) -> FairshareResult<()> {
        let mut state = self.write();
        match state.wallets.get_mut(&wallet.account) {
            Some(existing) => {
                *existing = wallet.clone();
                Ok(())
            }
            None => Err(FairshareError::UnknownAccount(wallet.account)),
        }
    }

    async fn get_transaction(&self, id: &TransactionId) -> FairshareResult<Option<Transaction>> {
        let state = self.read();
        Ok(state
            .transaction_index
            .get(id)
            .and_then(|&i| state.transactions.get(i))
            .cloned())
    }

    async fn transactions_for(
        &self,
        account: &AccountId,
        page: Page,
    ) -> FairshareResult<Vec<Transaction>> {
        Ok(self
            .read()
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.involves(account))
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn count_transactions(
        &self,
        kind: Option<TransactionKind>,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> FairshareResult<u64> {
        Ok(self
            .read()
            .transactions
            .iter()
            .filter(|tx| kind.map_or(true, |k| tx.kind == k))
            .filter(|tx| tx.created_at >= since && tx.created_at < until)
            .count() as u64)
    }

    async fn count_account_transactions_since(
        &self,
        account: &AccountId,
        since: DateTime<Utc>,
    ) -> FairshareResult<u64> {
        Ok(self
            .read()
            .transactions
            .iter()
            .filter(|tx| tx.involves(account) && tx.created_at >= since)
            .count() as u64)
    }

    async fn total_transactions(&self) -> FairshareResult<u64> {
        Ok(self.read().transactions.len() as u64)
    }

    async fn circulating_supply(&self) -> FairshareResult<Micros> {
        Ok(self.read().wallets.values().map(|w| w.balance).sum())
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn insert_attestation(&self, attestation: &Attestation) -> FairshareResult<()> {
        self.write().attestations.push(attestation.clone());
        Ok(())
    }

    async fn get_attestation(&self, id: &AttestationId) -> FairshareResult<Option<Attestation>> {
        Ok(self
            .read()
            .attestations
            .iter()
            .find(|a| a.id == *id)
            .cloned())
    }

    async fn mark_attestation_verified(
        &self,
        id: &AttestationId,
    ) -> FairshareResult<Option<Attestation>> {
        let mut state = self.write();
        Ok(state
            .attestations
            .iter_mut()
            .find(|a| a.id == *id)
            .map(|a| {
                a.verified = true;
                a.clone()
            }))
    }

    async fn attestations_for(&self, subject: &AccountId) -> FairshareResult<Vec<Attestation>> {
        Ok(self
            .read()
            .attestations
            .iter()
            .filter(|a| a.subject == *subject)
            .cloned()
            .collect())
    }

    async fn insert_rating(&self, rating: &Rating) -> FairshareResult<()> {
        self.write().ratings.push(rating.clone());
        Ok(())
    }

    async fn ratings_for(&self, merchant: &AccountId) -> FairshareResult<Vec<Rating>> {
        Ok(self
            .read()
            .ratings
            .iter()
            .filter(|r| r.merchant == *merchant)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GovernanceStore for MemoryStore {
    async fn insert_proposal(&self, proposal: &Proposal) -> FairshareResult<()> {
        let mut state = self.write();
        state.proposals.insert(proposal.id, proposal.clone());
        state.proposal_order.push(proposal.id);
        Ok(())
    }

    async fn get_proposal(&self, id: &ProposalId) -> FairshareResult<Option<Proposal>> {
        Ok(self.read().proposals.get(id).cloned())
    }

    async fn list_proposals(
        &self,
        status: Option<ProposalStatus>,
    ) -> FairshareResult<Vec<Proposal>> {
        let state = self.read();
        Ok(state
            .proposal_order
            .iter()
            .filter_map(|id| state.proposals.get(id))
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect())
    }

    async fn save_proposal(&self, proposal: &Proposal) -> FairshareResult<()> {
        let mut state = self.write();
        if !state.proposals.contains_key(&proposal.id) {
            return Err(FairshareError::UnknownProposal(proposal.id));
        }
        state.proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn get_vote(
        &self,
        proposal: &ProposalId,
        voter: &AccountId,
    ) -> FairshareResult<Option<Vote>> {
        Ok(self
            .read()
            .votes
            .get(proposal)
            .and_then(|votes| votes.iter().find(|v| v.voter == *voter))
            .cloned())
    }

    async fn votes_for_proposal(&self, proposal: &ProposalId) -> FairshareResult<Vec<Vote>> {
        Ok(self.read().votes.get(proposal).cloned().unwrap_or_default())
    }

    async fn commit_vote(&self, vote: &Vote, proposal: &Proposal) -> FairshareResult<()> {
        let mut state = self.write();
        if !state.proposals.contains_key(&proposal.id) {
            return Err(FairshareError::UnknownProposal(proposal.id));
        }
        let ballots = state.votes.entry(vote.proposal).or_default();
        if ballots.iter().any(|v| v.voter == vote.voter) {
            return Err(FairshareError::AlreadyVoted {
                voter: vote.voter,
                proposal: vote.proposal,
            });
        }
        ballots.push(vote.clone());
        state.proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }
}

#[async_trait]
impl IssuanceStore for MemoryStore {
    async fn get_issuance_plan(&self, month: &Month) -> FairshareResult<Option<IssuancePlan>> {
        Ok(self.read().plans.get(month).cloned())
    }

    async fn save_issuance_plan(&self, plan: &IssuancePlan) -> FairshareResult<()> {
        self.write().plans.insert(plan.month, plan.clone());
        Ok(())
    }

    async fn get_payout(
        &self,
        month: &Month,
        account: &AccountId,
    ) -> FairshareResult<Option<IssuancePayout>> {
        Ok(self.read().payouts.get(&(*month, *account)).cloned())
    }

    async fn payouts_for(&self, month: &Month) -> FairshareResult<Vec<IssuancePayout>> {
        Ok(self
            .read()
            .payouts
            .values()
            .filter(|p| p.month == *month)
            .cloned()
            .collect())
    }

    async fn get_issuance_record(
        &self,
        month: &Month,
    ) -> FairshareResult<Option<MonthlyIssuanceRecord>> {
        Ok(self.read().records.get(month).cloned())
    }

    async fn insert_issuance_record(&self, record: &MonthlyIssuanceRecord) -> FairshareResult<()> {
        let mut state = self.write();
        if state.records.contains_key(&record.month) {
            return Err(FairshareError::DuplicateIssuanceForMonth(record.month));
        }
        state.records.insert(record.month, record.clone());
        Ok(())
    }

    async fn list_issuance_records(&self) -> FairshareResult<Vec<MonthlyIssuanceRecord>> {
        Ok(self.read().records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairshare_core::NewAccount;

    fn open(username: &str) -> (Account, Wallet) {
        let now = Utc::now();
        let account = Account::new(NewAccount::member(username), now);
        let wallet = Wallet::new(account.id, now);
        (account, wallet)
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        let (a, wa) = open("alice");
        store.insert_account(&a, &wa).await.unwrap();
        let (b, wb) = open("alice");
        let err = store.insert_account(&b, &wb).await.unwrap_err();
        assert_eq!(err, FairshareError::DuplicateUsername("alice".to_string()));
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_with_unknown_wallet_writes_nothing() {
        let store = MemoryStore::new();
        let (a, mut wa) = open("alice");
        store.insert_account(&a, &wa).await.unwrap();

        wa.balance = 500;
        let ghost = Wallet::new(uuid::Uuid::now_v7(), Utc::now());
        let tx = Transaction::transfer(a.id, ghost.account, 500, 0, "", Utc::now());
        let result = store
            .commit_ledger(LedgerWrite {
                wallets: vec![wa, ghost],
                transaction: tx,
                payout: None,
            })
            .await;

        assert!(matches!(result, Err(FairshareError::UnknownAccount(_))));
        assert_eq!(store.get_wallet(&a.id).await.unwrap().unwrap().balance, 0);
        assert_eq!(store.total_transactions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_paginated() {
        let store = MemoryStore::new();
        let (a, wa) = open("alice");
        store.insert_account(&a, &wa).await.unwrap();

        for i in 1..=5u64 {
            let mut wallet = store.get_wallet(&a.id).await.unwrap().unwrap();
            wallet.balance += i;
            let tx = Transaction::single(
                TransactionKind::FairnessReward,
                a.id,
                i,
                format!("reward {}", i),
                Utc::now(),
            );
            store
                .commit_ledger(LedgerWrite {
                    wallets: vec![wallet],
                    transaction: tx,
                    payout: None,
                })
                .await
                .unwrap();
        }

        let first = store.transactions_for(&a.id, Page::new(0, 2)).await.unwrap();
        assert_eq!(first.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![5, 4]);
        let second = store.transactions_for(&a.id, Page::new(2, 2)).await.unwrap();
        assert_eq!(second.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(store.circulating_supply().await.unwrap(), 15);
    }
}
