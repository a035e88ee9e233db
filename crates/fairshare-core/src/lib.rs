// crates/fairshare-core/src/lib.rs
//
// fairshare-core: Core types, traits, and shared primitives for the Fairshare
// community currency.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the canonical data model (accounts, wallets, transactions,
// attestations, ratings, proposals, issuance records), the error taxonomy,
// the store trait family, an injectable clock, and per-key async locks.

pub mod account;
pub mod clock;
pub mod error;
pub mod governance;
pub mod issuance;
pub mod locks;
pub mod signals;
pub mod token;
pub mod traits;
pub mod transaction;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use fairshare_core::Account;`

// Account types
pub use account::{
    Account, AccountId, NewAccount, ProfileUpdate, ScoreSnapshot, Wallet, MERCHANT_BASE_TFI,
    SCORE_MAX,
};

// Ledger types
pub use transaction::{Page, Transaction, TransactionId, TransactionKind, TransactionStatus};
pub use token::{Fair, Micros, MICROS_PER_FAIR};

// Social signal types
pub use signals::{Attestation, AttestationId, AttestationKind, Rating, RatingId};

// Governance types
pub use governance::{Proposal, ProposalId, ProposalKind, ProposalStatus, Vote};

// Issuance types
pub use issuance::{IssuancePayout, IssuancePlan, IssuanceShare, Month, MonthlyIssuanceRecord};

// Error type
pub use error::{FairshareError, FairshareResult};

// Traits and primitives
pub use clock::{Clock, ManualClock, SystemClock};
pub use locks::{AccountLocks, KeyGuard, KeyedLocks};
pub use traits::{
    AccountStore, CommunityStore, GovernanceStore, IssuanceStore, LedgerStore, LedgerWrite,
    SignalStore,
};
