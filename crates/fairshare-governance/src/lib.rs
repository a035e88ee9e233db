// crates/fairshare-governance/src/lib.rs
//
// fairshare-governance: community proposals and weighted voting.
//
// A vote's weight blends the voter's share of circulating FAIR with their
// Personal Fairness Index, frozen at the moment the vote is cast.

pub mod engine;
pub mod voting;

pub use engine::{GovernanceConfig, GovernanceEngine, NewProposal, ResolutionReport};
pub use voting::{voting_power, VotingWeights};
