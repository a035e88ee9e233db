// crates/fairshare-store/src/rocks.rs
//
// RocksDB-backed persistent storage for the Fairshare community currency.
//
// Key format (values are JSON unless noted):
//   - `account:{uuid}`                 -> Account
//   - `username:{name}`                -> account uuid (utf-8)
//   - `wallet:{uuid}`                  -> Wallet
//   - `tx:{uuid}`                      -> Transaction
//   - `acct_tx:{account}:{tx}`         -> empty value (index only)
//   - `att:{uuid}`                     -> Attestation
//   - `att_subject:{subject}:{uuid}`   -> empty value (index only)
//   - `rating:{uuid}`                  -> Rating
//   - `rating_merchant:{merchant}:{uuid}` -> empty value (index only)
//   - `proposal:{uuid}`                -> Proposal
//   - `vote:{proposal}:{voter}`        -> Vote
//   - `plan:{YYYY-MM}`                 -> IssuancePlan
//   - `payout:{YYYY-MM}:{account}`     -> IssuancePayout
//   - `record:{YYYY-MM}`               -> MonthlyIssuanceRecord
//
// Ids are UUID v7, so lexicographic key order is creation order. Multi-key
// mutations are a single `WriteBatch`; read-modify-write sequences are
// serialized by an internal mutex.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use fairshare_core::error::{FairshareError, FairshareResult};
use fairshare_core::traits::{
    AccountStore, GovernanceStore, IssuanceStore, LedgerStore, LedgerWrite, SignalStore,
};
use fairshare_core::{
    Account, AccountId, Attestation, AttestationId, IssuancePayout, IssuancePlan, Micros, Month,
    MonthlyIssuanceRecord, Page, ProfileUpdate, Proposal, ProposalId, ProposalStatus, Rating,
    Transaction, TransactionId, TransactionKind, Vote, Wallet,
};

const WALLET_PREFIX: &[u8] = b"wallet:";

/// RocksDB wrapper implementing the `CommunityStore` trait family.
#[derive(Debug)]
pub struct RocksStore {
    db: DBWithThreadMode<MultiThreaded>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> FairshareResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            FairshareError::Storage(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().expect("write lock poisoned")
    }

    fn get_raw(&self, key: &[u8]) -> FairshareResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| FairshareError::Storage(format!("RocksDB get failed: {}", e)))
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> FairshareResult<Option<T>> {
        match self.get_raw(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> FairshareResult<()> {
        let json = serde_json::to_vec(value)?;
        self.db
            .put(key.as_bytes(), json)
            .map_err(|e| FairshareError::Storage(format!("RocksDB put failed: {}", e)))
    }

    fn write_batch(&self, batch: WriteBatch) -> FairshareResult<()> {
        self.db
            .write(batch)
            .map_err(|e| FairshareError::Storage(format!("RocksDB batch write failed: {}", e)))
    }

    /// Every (key, value) pair whose key starts with `prefix`, in key order.
    fn scan(&self, prefix: &str) -> FairshareResult<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let prefix = prefix.as_bytes();
        let mut entries = Vec::new();
        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item
                .map_err(|e| FairshareError::Storage(format!("RocksDB iteration error: {}", e)))?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key, value));
        }
        Ok(entries)
    }

    fn scan_json<T: DeserializeOwned>(&self, prefix: &str) -> FairshareResult<Vec<T>> {
        self.scan(prefix)?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice(&value).map_err(FairshareError::from))
            .collect()
    }

    /// UUIDs stored as the key suffix of an index prefix.
    fn index_ids(&self, prefix: &str) -> FairshareResult<Vec<Uuid>> {
        Ok(self
            .scan(prefix)?
            .into_iter()
            .filter_map(|(key, _)| {
                let suffix = std::str::from_utf8(&key[prefix.len()..]).unwrap_or("");
                Uuid::parse_str(suffix).ok()
            })
            .collect())
    }
}

fn json<T: Serialize>(value: &T) -> FairshareResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn account_key(id: &AccountId) -> String {
    format!("account:{}", id)
}

fn username_key(username: &str) -> String {
    format!("username:{}", username)
}

fn wallet_key(id: &AccountId) -> String {
    format!("wallet:{}", id)
}

fn tx_key(id: &TransactionId) -> String {
    format!("tx:{}", id)
}

fn account_tx_key(account: &AccountId, tx: &TransactionId) -> String {
    format!("acct_tx:{}:{}", account, tx)
}

fn attestation_key(id: &AttestationId) -> String {
    format!("att:{}", id)
}

fn rating_key(id: &Uuid) -> String {
    format!("rating:{}", id)
}

fn proposal_key(id: &ProposalId) -> String {
    format!("proposal:{}", id)
}

fn vote_key(proposal: &ProposalId, voter: &AccountId) -> String {
    format!("vote:{}:{}", proposal, voter)
}

fn payout_key(month: &Month, account: &AccountId) -> String {
    format!("payout:{}:{}", month, account)
}

#[async_trait]
impl AccountStore for RocksStore {
    async fn insert_account(&self, account: &Account, wallet: &Wallet) -> FairshareResult<()> {
        let _guard = self.exclusive();
        if self.get_raw(username_key(&account.username).as_bytes())?.is_some() {
            return Err(FairshareError::DuplicateUsername(account.username.clone()));
        }

        let mut batch = WriteBatch::default();
        batch.put(account_key(&account.id), json(account)?);
        batch.put(username_key(&account.username), account.id.to_string());
        batch.put(wallet_key(&wallet.account), json(wallet)?);
        self.write_batch(batch)
    }

    async fn get_account(&self, id: &AccountId) -> FairshareResult<Option<Account>> {
        self.get_json(&account_key(id))
    }

    async fn find_account_by_username(&self, username: &str) -> FairshareResult<Option<Account>> {
        let Some(raw) = self.get_raw(username_key(username).as_bytes())? else {
            return Ok(None);
        };
        let id = std::str::from_utf8(&raw)
            .ok()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| {
                FairshareError::Storage(format!("corrupt username index for {}", username))
            })?;
        self.get_json(&account_key(&id))
    }

    async fn list_accounts(&self) -> FairshareResult<Vec<Account>> {
        self.scan_json("account:")
    }

    async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
    ) -> FairshareResult<Option<Account>> {
        let _guard = self.exclusive();
        let Some(mut account) = self.get_json::<Account>(&account_key(id))? else {
            return Ok(None);
        };
        account.apply_profile(update);
        self.put_json(&account_key(id), &account)?;
        Ok(Some(account))
    }

    async fn save_pfi(
        &self,
        id: &AccountId,
        pfi: u8,
        attestations_seen: u64,
        computed_at: DateTime<Utc>,
    ) -> FairshareResult<Option<Account>> {
        let _guard = self.exclusive();
        let Some(mut account) = self.get_json::<Account>(&account_key(id))? else {
            return Ok(None);
        };
        account.record_pfi(pfi, attestations_seen, computed_at);
        self.put_json(&account_key(id), &account)?;
        Ok(Some(account))
    }

    async fn save_tfi(
        &self,
        id: &AccountId,
        tfi: u8,
        ratings_seen: u64,
        computed_at: DateTime<Utc>,
    ) -> FairshareResult<Option<Account>> {
        let _guard = self.exclusive();
        let Some(mut account) = self.get_json::<Account>(&account_key(id))? else {
            return Ok(None);
        };
        if account.record_tfi(tfi, ratings_seen, computed_at) {
            self.put_json(&account_key(id), &account)?;
        }
        Ok(Some(account))
    }
}

#[async_trait]
impl LedgerStore for RocksStore {
    async fn get_wallet(&self, account: &AccountId) -> FairshareResult<Option<Wallet>> {
        self.get_json(&wallet_key(account))
    }

    async fn list_wallets(&self) -> FairshareResult<Vec<Wallet>> {
        self.scan_json("wallet:")
    }

    async fn commit_ledger(&self, write: LedgerWrite) -> FairshareResult<()> {
        let _guard = self.exclusive();

        for wallet in &write.wallets {
            if self.get_raw(wallet_key(&wallet.account).as_bytes())?.is_none() {
                return Err(FairshareError::UnknownAccount(wallet.account));
            }
        }
        if let Some(payout) = &write.payout {
            let key = payout_key(&payout.month, &payout.account);
            if self.get_raw(key.as_bytes())?.is_some() {
                return Err(FairshareError::Storage(format!(
                    "payout for {} in {} already recorded",
                    payout.account, payout.month
                )));
            }
        }

        let tx = &write.transaction;
        let mut batch = WriteBatch::default();
        for wallet in &write.wallets {
            batch.put(wallet_key(&wallet.account), json(wallet)?);
        }
        batch.put(tx_key(&tx.id), json(tx)?);
        batch.put(account_tx_key(&tx.from_account, &tx.id), b"");
        if let Some(to) = &tx.to_account {
            batch.put(account_tx_key(to, &tx.id), b"");
        }
        if let Some(payout) = &write.payout {
            batch.put(payout_key(&payout.month, &payout.account), json(payout)?);
        }
        self.write_batch(batch)
    }

    async fn save_wallet(&self, wallet: &Wallet) -> FairshareResult<()> {
        let _guard = self.exclusive();
        let key = wallet_key(&wallet.account);
        if self.get_raw(key.as_bytes())?.is_none() {
            return Err(FairshareError::UnknownAccount(wallet.account));
        }
        self.put_json(&key, wallet)
    }

    async fn get_transaction(&self, id: &TransactionId) -> FairshareResult<Option<Transaction>> {
        self.get_json(&tx_key(id))
    }

    async fn transactions_for(
        &self,
        account: &AccountId,
        page: Page,
    ) -> FairshareResult<Vec<Transaction>> {
        let ids = self.index_ids(&format!("acct_tx:{}:", account))?;
        let mut history = Vec::new();
        for id in ids.iter().rev().skip(page.offset).take(page.limit) {
            if let Some(tx) = self.get_json(&tx_key(id))? {
                history.push(tx);
            }
        }
        Ok(history)
    }

    async fn count_transactions(
        &self,
        kind: Option<TransactionKind>,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> FairshareResult<u64> {
        let transactions: Vec<Transaction> = self.scan_json("tx:")?;
        Ok(transactions
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
        let mut count = 0;
        for id in self.index_ids(&format!("acct_tx:{}:", account))? {
            if let Some(tx) = self.get_json::<Transaction>(&tx_key(&id))? {
                if tx.created_at >= since {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    async fn total_transactions(&self) -> FairshareResult<u64> {
        Ok(self.scan("tx:")?.len() as u64)
    }

    async fn circulating_supply(&self) -> FairshareResult<Micros> {
        let snapshot = self.db.snapshot();
        let mut total: Micros = 0;
        for item in snapshot.iterator(IteratorMode::From(WALLET_PREFIX, Direction::Forward)) {
            let (key, value) = item
                .map_err(|e| FairshareError::Storage(format!("RocksDB iteration error: {}", e)))?;
            if !key.starts_with(WALLET_PREFIX) {
                break;
            }
            let wallet: Wallet = serde_json::from_slice(&value)?;
            total = total.saturating_add(wallet.balance);
        }
        Ok(total)
    }
}

#[async_trait]
impl SignalStore for RocksStore {
    async fn insert_attestation(&self, attestation: &Attestation) -> FairshareResult<()> {
        let mut batch = WriteBatch::default();
        batch.put(attestation_key(&attestation.id), json(attestation)?);
        batch.put(
            format!("att_subject:{}:{}", attestation.subject, attestation.id),
            b"",
        );
        self.write_batch(batch)
    }

    async fn get_attestation(&self, id: &AttestationId) -> FairshareResult<Option<Attestation>> {
        self.get_json(&attestation_key(id))
    }

    async fn mark_attestation_verified(
        &self,
        id: &AttestationId,
    ) -> FairshareResult<Option<Attestation>> {
        let _guard = self.exclusive();
        let Some(mut attestation) = self.get_json::<Attestation>(&attestation_key(id))? else {
            return Ok(None);
        };
        attestation.verified = true;
        self.put_json(&attestation_key(id), &attestation)?;
        Ok(Some(attestation))
    }

    async fn attestations_for(&self, subject: &AccountId) -> FairshareResult<Vec<Attestation>> {
        let mut attestations = Vec::new();
        for id in self.index_ids(&format!("att_subject:{}:", subject))? {
            if let Some(attestation) = self.get_json(&attestation_key(&id))? {
                attestations.push(attestation);
            }
        }
        Ok(attestations)
    }

    async fn insert_rating(&self, rating: &Rating) -> FairshareResult<()> {
        let mut batch = WriteBatch::default();
        batch.put(rating_key(&rating.id), json(rating)?);
        batch.put(
            format!("rating_merchant:{}:{}", rating.merchant, rating.id),
            b"",
        );
        self.write_batch(batch)
    }

    async fn ratings_for(&self, merchant: &AccountId) -> FairshareResult<Vec<Rating>> {
        let mut ratings = Vec::new();
        for id in self.index_ids(&format!("rating_merchant:{}:", merchant))? {
            if let Some(rating) = self.get_json(&rating_key(&id))? {
                ratings.push(rating);
            }
        }
        Ok(ratings)
    }
}

#[async_trait]
impl GovernanceStore for RocksStore {
    async fn insert_proposal(&self, proposal: &Proposal) -> FairshareResult<()> {
        self.put_json(&proposal_key(&proposal.id), proposal)
    }

    async fn get_proposal(&self, id: &ProposalId) -> FairshareResult<Option<Proposal>> {
        self.get_json(&proposal_key(id))
    }

    async fn list_proposals(
        &self,
        status: Option<ProposalStatus>,
    ) -> FairshareResult<Vec<Proposal>> {
        let proposals: Vec<Proposal> = self.scan_json("proposal:")?;
        Ok(proposals
            .into_iter()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .collect())
    }

    async fn save_proposal(&self, proposal: &Proposal) -> FairshareResult<()> {
        let _guard = self.exclusive();
        if self.get_raw(proposal_key(&proposal.id).as_bytes())?.is_none() {
            return Err(FairshareError::UnknownProposal(proposal.id));
        }
        self.put_json(&proposal_key(&proposal.id), proposal)
    }

    async fn get_vote(
        &self,
        proposal: &ProposalId,
        voter: &AccountId,
    ) -> FairshareResult<Option<Vote>> {
        self.get_json(&vote_key(proposal, voter))
    }

    async fn votes_for_proposal(&self, proposal: &ProposalId) -> FairshareResult<Vec<Vote>> {
        self.scan_json(&format!("vote:{}:", proposal))
    }

    async fn commit_vote(&self, vote: &Vote, proposal: &Proposal) -> FairshareResult<()> {
        let _guard = self.exclusive();
        if self.get_raw(proposal_key(&proposal.id).as_bytes())?.is_none() {
            return Err(FairshareError::UnknownProposal(proposal.id));
        }
        let key = vote_key(&vote.proposal, &vote.voter);
        if self.get_raw(key.as_bytes())?.is_some() {
            return Err(FairshareError::AlreadyVoted {
                voter: vote.voter,
                proposal: vote.proposal,
            });
        }

        let mut batch = WriteBatch::default();
        batch.put(key, json(vote)?);
        batch.put(proposal_key(&proposal.id), json(proposal)?);
        self.write_batch(batch)
    }
}

#[async_trait]
impl IssuanceStore for RocksStore {
    async fn get_issuance_plan(&self, month: &Month) -> FairshareResult<Option<IssuancePlan>> {
        self.get_json(&format!("plan:{}", month))
    }

    async fn save_issuance_plan(&self, plan: &IssuancePlan) -> FairshareResult<()> {
        self.put_json(&format!("plan:{}", plan.month), plan)
    }

    async fn get_payout(
        &self,
        month: &Month,
        account: &AccountId,
    ) -> FairshareResult<Option<IssuancePayout>> {
        self.get_json(&payout_key(month, account))
    }

    async fn payouts_for(&self, month: &Month) -> FairshareResult<Vec<IssuancePayout>> {
        self.scan_json(&format!("payout:{}:", month))
    }

    async fn get_issuance_record(
        &self,
        month: &Month,
    ) -> FairshareResult<Option<MonthlyIssuanceRecord>> {
        self.get_json(&format!("record:{}", month))
    }

    async fn insert_issuance_record(&self, record: &MonthlyIssuanceRecord) -> FairshareResult<()> {
        let _guard = self.exclusive();
        let key = format!("record:{}", record.month);
        if self.get_raw(key.as_bytes())?.is_some() {
            return Err(FairshareError::DuplicateIssuanceForMonth(record.month));
        }
        self.put_json(&key, record)
    }

    async fn list_issuance_records(&self) -> FairshareResult<Vec<MonthlyIssuanceRecord>> {
        self.scan_json("record:")
    }
}
