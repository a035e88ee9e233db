use thiserror::Error;
use uuid::Uuid;

use crate::issuance::Month;

/// Error taxonomy shared by every Fairshare component.
///
/// All variants are reported synchronously to the caller. None of them are
/// retried by the engines: a failed financial operation is surfaced as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FairshareError {
    /// Spendable balance (balance minus locked) is lower than requested.
    #[error("Insufficient funds in {account}: requested {requested} micros, spendable {available} micros")]
    InsufficientFunds {
        account: Uuid,
        requested: u64,
        available: u64,
    },

    /// Referenced account does not exist.
    #[error("Unknown account: {0}")]
    UnknownAccount(Uuid),

    /// Out-of-range score, non-positive amount, or otherwise malformed input.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// An operation names the same account on both sides.
    #[error("Self reference: {0}")]
    SelfReference(String),

    /// The voter already has a vote recorded on this proposal.
    #[error("Account {voter} already voted on proposal {proposal}")]
    AlreadyVoted { voter: Uuid, proposal: Uuid },

    /// The proposal is terminal or outside its voting window.
    #[error("Proposal {0} is not accepting votes")]
    ProposalNotActive(Uuid),

    /// The proposal cannot be resolved before its end time.
    #[error("Proposal {0} is still open for voting")]
    ProposalStillOpen(Uuid),

    /// Referenced proposal does not exist.
    #[error("Unknown proposal: {0}")]
    UnknownProposal(Uuid),

    /// A canonical issuance record already exists for the month.
    #[error("Issuance for {0} has already been recorded")]
    DuplicateIssuanceForMonth(Month),

    /// The caller lacks the capability required for the operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Usernames are unique across accounts.
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    /// Storage layer error (RocksDB or in-memory backend).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FairshareError {
    fn from(e: serde_json::Error) -> Self {
        FairshareError::Serialization(e.to_string())
    }
}

/// Result alias used across the workspace.
pub type FairshareResult<T> = Result<T, FairshareError>;
