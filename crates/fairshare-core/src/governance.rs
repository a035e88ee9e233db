// crates/fairshare-core/src/governance.rs
//
// Governance records: proposals and the votes cast on them.
//
// Proposal lifecycle:
//   Active --(end_time passed, votes_for > votes_against)--> Passed
//   Active --(end_time passed, otherwise)-----------------> Rejected
//   Active --(end_time passed, no votes)------------------> Expired
// Terminal states never accept votes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::AccountId;

pub type ProposalId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    General,
    MonetaryPolicy,
    FeeRate,
    Membership,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Active,
    Passed,
    Rejected,
    Expired,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: AccountId,
    pub title: String,
    pub description: String,
    pub kind: ProposalKind,
    pub status: ProposalStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Summed voting power of votes in favor.
    pub votes_for: f64,
    /// Summed voting power of votes against.
    pub votes_against: f64,
    pub total_voting_power: f64,
    pub voter_count: u64,
    /// When the proposal left the Active state.
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Proposal {
    /// Whether `now` lies inside the inclusive voting window.
    pub fn window_contains(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    /// Whether the proposal currently accepts votes.
    pub fn accepts_votes(&self, now: DateTime<Utc>) -> bool {
        self.status == ProposalStatus::Active && self.window_contains(now)
    }

    /// Add a vote's frozen power to the running tallies.
    pub fn record(&mut self, vote: &Vote) {
        if vote.in_favor {
            self.votes_for += vote.voting_power;
        } else {
            self.votes_against += vote.voting_power;
        }
        self.total_voting_power += vote.voting_power;
        self.voter_count += 1;
    }

    /// The terminal status this proposal resolves to once its window closes.
    pub fn outcome(&self) -> ProposalStatus {
        if self.voter_count == 0 {
            ProposalStatus::Expired
        } else if self.votes_for > self.votes_against {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Rejected
        }
    }
}

/// A single ballot. Voting power is computed and frozen when cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: AccountId,
    pub proposal: ProposalId,
    pub in_favor: bool,
    pub voting_power: f64,
    pub cast_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn proposal() -> Proposal {
        let now = Utc::now();
        Proposal {
            id: Uuid::now_v7(),
            proposer: Uuid::now_v7(),
            title: "Plant trees".to_string(),
            description: String::new(),
            kind: ProposalKind::General,
            status: ProposalStatus::Active,
            start_time: now,
            end_time: now + Duration::days(7),
            votes_for: 0.0,
            votes_against: 0.0,
            total_voting_power: 0.0,
            voter_count: 0,
            resolved_at: None,
        }
    }

    fn vote(p: &Proposal, in_favor: bool, power: f64) -> Vote {
        Vote {
            voter: Uuid::now_v7(),
            proposal: p.id,
            in_favor,
            voting_power: power,
            cast_at: p.start_time,
        }
    }

    #[test]
    fn test_outcome_without_votes_is_expired() {
        assert_eq!(proposal().outcome(), ProposalStatus::Expired);
    }

    #[test]
    fn test_outcome_tie_is_rejected() {
        let mut p = proposal();
        let yes = vote(&p, true, 0.3);
        let no = vote(&p, false, 0.3);
        p.record(&yes);
        p.record(&no);
        assert_eq!(p.voter_count, 2);
        assert_eq!(p.outcome(), ProposalStatus::Rejected);
    }

    #[test]
    fn test_outcome_majority_passes() {
        let mut p = proposal();
        let yes = vote(&p, true, 0.5);
        let no = vote(&p, false, 0.2);
        p.record(&yes);
        p.record(&no);
        assert_eq!(p.outcome(), ProposalStatus::Passed);
        assert!((p.total_voting_power - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_window_is_inclusive() {
        let p = proposal();
        assert!(p.accepts_votes(p.start_time));
        assert!(p.accepts_votes(p.end_time));
        assert!(!p.accepts_votes(p.end_time + Duration::seconds(1)));
    }
}
