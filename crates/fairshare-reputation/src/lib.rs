// crates/fairshare-reputation/src/lib.rs
//
// fairshare-reputation: Personal Fairness Index (PFI), Trade Fairness Index
// (TFI), attestation and rating intake, and community statistics.
//
// Scores are pure functions of the append-only attestation and rating logs
// plus an account's service hours. The engine recomputes them on demand and
// stores only the latest value with a snapshot of the inputs it saw.

pub mod engine;
pub mod pfi;
pub mod stats;
pub mod tfi;

pub use engine::{FairnessConfig, FairnessEngine, RatingScores, ScoreOutcome, ScoreSweepReport};
pub use pfi::{AttestationCounts, ComponentScore, PfiBreakdown, PfiWeights};
pub use stats::{
    average_pfi, council_order, rank_council, CommunityStats, PfiBucket, PfiBuckets, TfiBucket,
    TfiBuckets,
};
pub use tfi::{DimensionAverages, TfiBreakdown};
