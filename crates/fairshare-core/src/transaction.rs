// crates/fairshare-core/src/transaction.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountId;
use crate::token::Micros;

pub type TransactionId = Uuid;

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Peer-to-peer movement between two wallets.
    Transfer,
    FairnessReward,
    MerchantIncentive,
    /// Share of the month's reputation-weighted issuance.
    MonthlyIssuance,
    Fee,
    Burn,
}

impl TransactionKind {
    /// Kinds that increase a single wallet's balance.
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            TransactionKind::FairnessReward
                | TransactionKind::MerchantIncentive
                | TransactionKind::MonthlyIssuance
        )
    }

    /// Kinds that decrease a single wallet's balance.
    pub fn is_debit(&self) -> bool {
        matches!(self, TransactionKind::Fee | TransactionKind::Burn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Transfer => "transfer",
            TransactionKind::FairnessReward => "fairness_reward",
            TransactionKind::MerchantIncentive => "merchant_incentive",
            TransactionKind::MonthlyIssuance => "monthly_issuance",
            TransactionKind::Fee => "fee",
            TransactionKind::Burn => "burn",
        }
    }
}

/// Outcome recorded on a ledger entry. Entries never change status after
/// they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier (UUID v7, so ids sort by creation time).
    pub id: TransactionId,
    pub kind: TransactionKind,
    /// Gross amount in micros, always > 0.
    pub amount: Micros,
    /// Fee withheld from the recipient's side, in micros.
    pub fee: Micros,
    /// Sender for transfers; the affected wallet for credits and debits.
    pub from_account: AccountId,
    /// Recipient, present only for transfers.
    pub to_account: Option<AccountId>,
    pub status: TransactionStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A completed transfer entry.
    pub fn transfer(
        from: AccountId,
        to: AccountId,
        amount: Micros,
        fee: Micros,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind: TransactionKind::Transfer,
            amount,
            fee,
            from_account: from,
            to_account: Some(to),
            status: TransactionStatus::Completed,
            description: description.into(),
            created_at: now,
        }
    }

    /// A completed single-wallet entry (credit or debit).
    pub fn single(
        kind: TransactionKind,
        account: AccountId,
        amount: Micros,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            amount,
            fee: 0,
            from_account: account,
            to_account: None,
            status: TransactionStatus::Completed,
            description: description.into(),
            created_at: now,
        }
    }

    /// Whether the entry touches the given account on either side.
    pub fn involves(&self, account: &AccountId) -> bool {
        self.from_account == *account || self.to_account.as_ref() == Some(account)
    }
}

/// Offset pagination for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub const DEFAULT_LIMIT: usize = 20;
    pub const MAX_LIMIT: usize = 200;

    /// Build a page, clamping the limit to `1..=MAX_LIMIT`.
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_involves_both_sides() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let tx = Transaction::transfer(a, b, 10, 0, "rent", Utc::now());
        assert!(tx.involves(&a));
        assert!(tx.involves(&b));
        assert!(!tx.involves(&Uuid::now_v7()));
        assert_eq!(tx.status, TransactionStatus::Completed);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionKind::MonthlyIssuance).unwrap();
        assert_eq!(json, "\"monthly_issuance\"");
        assert_eq!(TransactionKind::MonthlyIssuance.as_str(), "monthly_issuance");
    }

    #[test]
    fn test_page_clamps_limit() {
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(5, 10_000).limit, Page::MAX_LIMIT);
    }
}
