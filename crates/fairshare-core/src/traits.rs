// crates/fairshare-core/src/traits.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::account::{Account, AccountId, ProfileUpdate, Wallet};
use crate::error::FairshareResult;
use crate::governance::{Proposal, ProposalId, ProposalStatus, Vote};
use crate::issuance::{IssuancePayout, IssuancePlan, Month, MonthlyIssuanceRecord};
use crate::signals::{Attestation, AttestationId, Rating};
use crate::token::Micros;
use crate::transaction::{Page, Transaction, TransactionId, TransactionKind};

/// One atomic ledger commit.
///
/// Every wallet image, the transaction, and the optional issuance payout
/// marker become visible together or not at all.
#[derive(Debug, Clone)]
pub struct LedgerWrite {
    /// Complete new images of every wallet the operation touched.
    pub wallets: Vec<Wallet>,
    pub transaction: Transaction,
    pub payout: Option<IssuancePayout>,
}

/// Account records and their identity/score fields.
///
/// Implemented by fairshare-store (in-memory and RocksDB backends).
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account together with its empty wallet.
    /// Fails with `DuplicateUsername` if the username is taken.
    async fn insert_account(&self, account: &Account, wallet: &Wallet) -> FairshareResult<()>;

    async fn get_account(&self, id: &AccountId) -> FairshareResult<Option<Account>>;

    async fn find_account_by_username(&self, username: &str) -> FairshareResult<Option<Account>>;

    /// All accounts, in creation order.
    async fn list_accounts(&self) -> FairshareResult<Vec<Account>>;

    /// Apply identity-field changes in place. Returns the updated account,
    /// or None if it does not exist.
    async fn update_profile(
        &self,
        id: &AccountId,
        update: &ProfileUpdate,
    ) -> FairshareResult<Option<Account>>;

    /// Overwrite only the PFI, read-modify-write under the store's own
    /// exclusion (see `Account::record_pfi`). Returns the updated account,
    /// or None if it does not exist.
    async fn save_pfi(
        &self,
        id: &AccountId,
        pfi: u8,
        attestations_seen: u64,
        computed_at: DateTime<Utc>,
    ) -> FairshareResult<Option<Account>>;

    /// Overwrite only the TFI, and only while the account is a merchant
    /// (see `Account::record_tfi`). Returns the account as stored, or None
    /// if it does not exist.
    async fn save_tfi(
        &self,
        id: &AccountId,
        tfi: u8,
        ratings_seen: u64,
        computed_at: DateTime<Utc>,
    ) -> FairshareResult<Option<Account>>;
}

/// Wallets and the append-only transaction log.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_wallet(&self, account: &AccountId) -> FairshareResult<Option<Wallet>>;

    async fn list_wallets(&self) -> FairshareResult<Vec<Wallet>>;

    /// Atomically apply a ledger write.
    async fn commit_ledger(&self, write: LedgerWrite) -> FairshareResult<()>;

    /// Overwrite an existing wallet without appending a transaction. Used
    /// for fund reservations, which never change the balance.
    async fn save_wallet(&self, wallet: &Wallet) -> FairshareResult<()>;

    async fn get_transaction(&self, id: &TransactionId) -> FairshareResult<Option<Transaction>>;

    /// Transactions touching an account, newest first.
    async fn transactions_for(
        &self,
        account: &AccountId,
        page: Page,
    ) -> FairshareResult<Vec<Transaction>>;

    /// Count transactions created in `[since, until)`, optionally of one kind.
    async fn count_transactions(
        &self,
        kind: Option<TransactionKind>,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> FairshareResult<u64>;

    /// Count transactions touching one account created at or after `since`.
    async fn count_account_transactions_since(
        &self,
        account: &AccountId,
        since: DateTime<Utc>,
    ) -> FairshareResult<u64>;

    async fn total_transactions(&self) -> FairshareResult<u64>;

    /// Sum of all wallet balances, read from one consistent snapshot.
    async fn circulating_supply(&self) -> FairshareResult<Micros>;
}

/// Append-only attestations and ratings.
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn insert_attestation(&self, attestation: &Attestation) -> FairshareResult<()>;

    async fn get_attestation(&self, id: &AttestationId) -> FairshareResult<Option<Attestation>>;

    /// Flip the verified flag. Returns the updated attestation, or None if
    /// it does not exist.
    async fn mark_attestation_verified(
        &self,
        id: &AttestationId,
    ) -> FairshareResult<Option<Attestation>>;

    /// Every attestation whose subject is the account, verified or not.
    async fn attestations_for(&self, subject: &AccountId) -> FairshareResult<Vec<Attestation>>;

    async fn insert_rating(&self, rating: &Rating) -> FairshareResult<()>;

    async fn ratings_for(&self, merchant: &AccountId) -> FairshareResult<Vec<Rating>>;
}

/// Proposals and votes.
#[async_trait]
pub trait GovernanceStore: Send + Sync {
    async fn insert_proposal(&self, proposal: &Proposal) -> FairshareResult<()>;

    async fn get_proposal(&self, id: &ProposalId) -> FairshareResult<Option<Proposal>>;

    /// Proposals in creation order, optionally filtered by status.
    async fn list_proposals(
        &self,
        status: Option<ProposalStatus>,
    ) -> FairshareResult<Vec<Proposal>>;

    /// Overwrite a proposal (used for status resolution).
    async fn save_proposal(&self, proposal: &Proposal) -> FairshareResult<()>;

    async fn get_vote(
        &self,
        proposal: &ProposalId,
        voter: &AccountId,
    ) -> FairshareResult<Option<Vote>>;

    async fn votes_for_proposal(&self, proposal: &ProposalId) -> FairshareResult<Vec<Vote>>;

    /// Atomically insert the vote and overwrite the proposal with its
    /// updated tallies.
    async fn commit_vote(&self, vote: &Vote, proposal: &Proposal) -> FairshareResult<()>;
}

/// Issuance plans, payout markers, and canonical monthly records.
#[async_trait]
pub trait IssuanceStore: Send + Sync {
    async fn get_issuance_plan(&self, month: &Month) -> FairshareResult<Option<IssuancePlan>>;

    async fn save_issuance_plan(&self, plan: &IssuancePlan) -> FairshareResult<()>;

    async fn get_payout(
        &self,
        month: &Month,
        account: &AccountId,
    ) -> FairshareResult<Option<IssuancePayout>>;

    async fn payouts_for(&self, month: &Month) -> FairshareResult<Vec<IssuancePayout>>;

    async fn get_issuance_record(
        &self,
        month: &Month,
    ) -> FairshareResult<Option<MonthlyIssuanceRecord>>;

    /// Insert the canonical record. Fails with `DuplicateIssuanceForMonth`
    /// if one already exists.
    async fn insert_issuance_record(&self, record: &MonthlyIssuanceRecord) -> FairshareResult<()>;

    /// All canonical records, oldest month first.
    async fn list_issuance_records(&self) -> FairshareResult<Vec<MonthlyIssuanceRecord>>;
}

/// The full persistence surface used by the engines.
pub trait CommunityStore:
    AccountStore + LedgerStore + SignalStore + GovernanceStore + IssuanceStore
{
}

impl<T> CommunityStore for T where
    T: AccountStore + LedgerStore + SignalStore + GovernanceStore + IssuanceStore
{
}
