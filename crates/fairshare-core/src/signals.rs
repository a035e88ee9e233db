// crates/fairshare-core/src/signals.rs
//
// Append-only social signals that feed the reputation scores:
// peer attestations (PFI) and customer ratings (TFI).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountId;
use crate::transaction::TransactionId;

pub type AttestationId = Uuid;
pub type RatingId = Uuid;

/// Lowest accepted attestation value or rating dimension.
pub const SIGNAL_MIN: u8 = 1;
/// Highest accepted attestation value or rating dimension.
pub const SIGNAL_MAX: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationKind {
    CommunityService,
    DisputeResolution,
    PeerRating,
}

impl AttestationKind {
    pub const ALL: [AttestationKind; 3] = [
        AttestationKind::CommunityService,
        AttestationKind::DisputeResolution,
        AttestationKind::PeerRating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttestationKind::CommunityService => "community_service",
            AttestationKind::DisputeResolution => "dispute_resolution",
            AttestationKind::PeerRating => "peer_rating",
        }
    }
}

/// A peer endorsement of another account's behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub id: AttestationId,
    /// The account being endorsed.
    pub subject: AccountId,
    /// The account submitting the endorsement. Never equal to `subject`.
    pub attester: AccountId,
    pub kind: AttestationKind,
    /// Strength of the endorsement, 1-10.
    pub value: u8,
    /// Only verified attestations contribute to PFI.
    pub verified: bool,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A customer's review of a merchant across four dimensions, each 1-10.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub customer: AccountId,
    pub merchant: AccountId,
    /// Purchase this rating refers to, if any.
    pub transaction: Option<TransactionId>,
    pub delivery: u8,
    pub quality: u8,
    pub transparency: u8,
    pub environmental: u8,
    pub comments: String,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    /// Dimension scores in canonical order:
    /// delivery, quality, transparency, environmental.
    pub fn dimensions(&self) -> [u8; 4] {
        [
            self.delivery,
            self.quality,
            self.transparency,
            self.environmental,
        ]
    }
}
