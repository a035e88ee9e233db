// crates/fairshare-governance/src/engine.rs
//
// Proposal lifecycle and vote tallying.
//
// Votes on one proposal are serialized on a per-proposal lock: the
// one-vote-per-account check, the tally update, and the commit all happen
// under the same guard, and the vote and updated proposal are written as one
// atomic unit.

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use fairshare_core::error::{FairshareError, FairshareResult};
use fairshare_core::{
    AccountId, AccountStore, Clock, CommunityStore, GovernanceStore, KeyedLocks, Proposal,
    ProposalId, ProposalKind, ProposalStatus, Vote,
};
use fairshare_economics::Ledger;

use crate::voting::{voting_power, VotingWeights};

#[derive(Debug, Clone)]
pub struct GovernanceConfig {
    pub weights: VotingWeights,
    pub min_voting_period: Duration,
    pub max_voting_period: Duration,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            weights: VotingWeights::default(),
            min_voting_period: Duration::days(1),
            max_voting_period: Duration::days(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProposal {
    pub title: String,
    pub description: String,
    pub kind: ProposalKind,
    pub voting_period: Duration,
}

/// Summary of one `resolve_due` sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub passed: u64,
    pub rejected: u64,
    pub expired: u64,
    pub failed: Vec<(ProposalId, String)>,
}

pub struct GovernanceEngine {
    store: Arc<dyn CommunityStore>,
    clock: Arc<dyn Clock>,
    ledger: Arc<Ledger>,
    config: GovernanceConfig,
    proposal_locks: KeyedLocks<ProposalId>,
}

impl GovernanceEngine {
    pub fn new(
        store: Arc<dyn CommunityStore>,
        clock: Arc<dyn Clock>,
        ledger: Arc<Ledger>,
        config: GovernanceConfig,
    ) -> Self {
        Self {
            store,
            clock,
            ledger,
            config,
            proposal_locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    async fn require_proposal(&self, id: &ProposalId) -> FairshareResult<Proposal> {
        self.store
            .get_proposal(id)
            .await?
            .ok_or(FairshareError::UnknownProposal(*id))
    }

    /// Open a proposal for voting, starting now.
    pub async fn create_proposal(
        &self,
        proposer: &AccountId,
        request: NewProposal,
    ) -> FairshareResult<Proposal> {
        if request.title.trim().is_empty() {
            return Err(FairshareError::InvalidValue(
                "proposal title must not be empty".to_string(),
            ));
        }
        if request.voting_period < self.config.min_voting_period
            || request.voting_period > self.config.max_voting_period
        {
            return Err(FairshareError::InvalidValue(format!(
                "voting period of {}s is outside [{}s, {}s]",
                request.voting_period.num_seconds(),
                self.config.min_voting_period.num_seconds(),
                self.config.max_voting_period.num_seconds()
            )));
        }
        if self.store.get_account(proposer).await?.is_none() {
            return Err(FairshareError::UnknownAccount(*proposer));
        }

        let now = self.clock.now();
        let proposal = Proposal {
            id: Uuid::now_v7(),
            proposer: *proposer,
            title: request.title,
            description: request.description,
            kind: request.kind,
            status: ProposalStatus::Active,
            start_time: now,
            end_time: now + request.voting_period,
            votes_for: 0.0,
            votes_against: 0.0,
            total_voting_power: 0.0,
            voter_count: 0,
            resolved_at: None,
        };
        self.store.insert_proposal(&proposal).await?;
        tracing::info!(
            "Proposal {} \"{}\" open until {}",
            proposal.id,
            proposal.title,
            proposal.end_time
        );
        Ok(proposal)
    }

    /// Cast a vote with power frozen from the voter's current balance and PFI.
    pub async fn vote(
        &self,
        voter: &AccountId,
        proposal_id: &ProposalId,
        in_favor: bool,
    ) -> FairshareResult<Vote> {
        let _guard = self.proposal_locks.lock(proposal_id).await;
        let mut proposal = self.require_proposal(proposal_id).await?;
        let now = self.clock.now();
        if !proposal.accepts_votes(now) {
            return Err(FairshareError::ProposalNotActive(*proposal_id));
        }
        let account = self
            .store
            .get_account(voter)
            .await?
            .ok_or(FairshareError::UnknownAccount(*voter))?;
        if self.store.get_vote(proposal_id, voter).await?.is_some() {
            return Err(FairshareError::AlreadyVoted {
                voter: *voter,
                proposal: *proposal_id,
            });
        }

        let wallet = self.ledger.balance(voter).await?;
        let supply = self.ledger.circulating_supply().await?;
        let power = voting_power(
            wallet.balance.micros,
            supply,
            account.pfi,
            &self.config.weights,
        );

        let vote = Vote {
            voter: *voter,
            proposal: *proposal_id,
            in_favor,
            voting_power: power,
            cast_at: now,
        };
        proposal.record(&vote);
        self.store.commit_vote(&vote, &proposal).await?;

        tracing::debug!(
            "Vote on {} by {}: {} with power {:.4}",
            proposal_id,
            voter,
            if in_favor { "for" } else { "against" },
            power
        );
        Ok(vote)
    }

    /// Close a proposal whose window has ended.
    pub async fn resolve(&self, proposal_id: &ProposalId) -> FairshareResult<Proposal> {
        let _guard = self.proposal_locks.lock(proposal_id).await;
        let mut proposal = self.require_proposal(proposal_id).await?;
        if proposal.status.is_terminal() {
            return Err(FairshareError::ProposalNotActive(*proposal_id));
        }
        let now = self.clock.now();
        if now <= proposal.end_time {
            return Err(FairshareError::ProposalStillOpen(*proposal_id));
        }

        proposal.status = proposal.outcome();
        proposal.resolved_at = Some(now);
        self.store.save_proposal(&proposal).await?;
        tracing::info!(
            "Proposal {} resolved {:?} (for {:.4}, against {:.4}, {} voters)",
            proposal.id,
            proposal.status,
            proposal.votes_for,
            proposal.votes_against,
            proposal.voter_count
        );
        Ok(proposal)
    }

    /// Resolve every active proposal whose window has ended.
    pub async fn resolve_due(&self) -> FairshareResult<ResolutionReport> {
        let now = self.clock.now();
        let due: Vec<Proposal> = self
            .store
            .list_proposals(Some(ProposalStatus::Active))
            .await?
            .into_iter()
            .filter(|p| p.end_time < now)
            .collect();

        let mut report = ResolutionReport::default();
        for proposal in due {
            match self.resolve(&proposal.id).await {
                Ok(resolved) => match resolved.status {
                    ProposalStatus::Passed => report.passed += 1,
                    ProposalStatus::Rejected => report.rejected += 1,
                    ProposalStatus::Expired => report.expired += 1,
                    ProposalStatus::Active => {}
                },
                Err(e) => {
                    tracing::warn!("Failed to resolve proposal {}: {}", proposal.id, e);
                    report.failed.push((proposal.id, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Proposals still accepting votes.
    pub async fn active_proposals(&self) -> FairshareResult<Vec<Proposal>> {
        let now = self.clock.now();
        Ok(self
            .store
            .list_proposals(Some(ProposalStatus::Active))
            .await?
            .into_iter()
            .filter(|p| p.window_contains(now))
            .collect())
    }

    pub async fn proposal(&self, id: &ProposalId) -> FairshareResult<Proposal> {
        self.require_proposal(id).await
    }

    pub async fn votes(&self, proposal_id: &ProposalId) -> FairshareResult<Vec<Vote>> {
        self.require_proposal(proposal_id).await?;
        self.store.votes_for_proposal(proposal_id).await
    }
}
