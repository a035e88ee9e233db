// crates/fairshare-reputation/src/pfi.rs
//
// Personal Fairness Index (PFI) computation.
//
// PFI blends three components into a 0-100 score:
//   1. Attestation score (weight 0.5): weighted mean of verified attestation
//      values, scaled from the 1-10 range to 0-100. Dispute resolution counts
//      1.5x, community service 1.0x, peer ratings 0.75x.
//   2. Service score (weight 0.3): community service hours, capped at 100.
//   3. Participation baseline (weight 0.2): a constant 100, so every scored
//      member starts at 20.

use serde::{Deserialize, Serialize};

use fairshare_core::{Account, AccountId, Attestation, AttestationKind, SCORE_MAX};

/// Tunable PFI constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PfiWeights {
    pub attestation: f64,
    pub service: f64,
    pub baseline: f64,
    /// Score the baseline component always contributes before weighting.
    pub baseline_score: f64,
    /// Service hours at which the service component saturates.
    pub service_hours_cap: f64,
    pub dispute_resolution: f64,
    pub community_service: f64,
    pub peer_rating: f64,
}

impl PfiWeights {
    /// Relative weight of one attestation of the given kind.
    pub fn kind_weight(&self, kind: AttestationKind) -> f64 {
        match kind {
            AttestationKind::DisputeResolution => self.dispute_resolution,
            AttestationKind::CommunityService => self.community_service,
            AttestationKind::PeerRating => self.peer_rating,
        }
    }
}

impl Default for PfiWeights {
    fn default() -> Self {
        Self {
            attestation: 0.5,
            service: 0.3,
            baseline: 0.2,
            baseline_score: 100.0,
            service_hours_cap: 100.0,
            dispute_resolution: 1.5,
            community_service: 1.0,
            peer_rating: 0.75,
        }
    }
}

/// One weighted component of a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    /// Component value on the 0-100 scale.
    pub score: f64,
    pub weight: f64,
    /// `score * weight`.
    pub contribution: f64,
}

impl ComponentScore {
    fn new(score: f64, weight: f64) -> Self {
        Self {
            score,
            weight,
            contribution: score * weight,
        }
    }
}

/// Verified attestation counts per kind, plus pending ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationCounts {
    pub community_service: u64,
    pub dispute_resolution: u64,
    pub peer_rating: u64,
    /// Attestations still awaiting verification; they do not count toward PFI.
    pub unverified: u64,
}

/// Full explanation of one account's PFI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PfiBreakdown {
    pub account: AccountId,
    pub attestation: ComponentScore,
    pub service: ComponentScore,
    pub baseline: ComponentScore,
    pub attestation_counts: AttestationCounts,
    /// Transactions touching the account in the recent activity window.
    pub recent_transactions: u64,
    /// Sum of contributions before rounding.
    pub raw_score: f64,
    pub score: u8,
    /// True for admins, whose stored score is never recomputed.
    pub exempt: bool,
}

/// Weighted mean of verified attestation values, scaled to 0-100.
///
/// Returns 0.0 when there are no verified attestations.
pub fn attestation_score(attestations: &[Attestation], weights: &PfiWeights) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for attestation in attestations.iter().filter(|a| a.verified) {
        let w = weights.kind_weight(attestation.kind);
        weighted_sum += w * attestation.value as f64;
        weight_total += w;
    }
    if weight_total <= 0.0 {
        return 0.0;
    }
    weighted_sum / weight_total / 10.0 * 100.0
}

/// Service hours mapped onto 0-100, saturating at the configured cap.
pub fn service_score(hours: f64, weights: &PfiWeights) -> f64 {
    if !hours.is_finite() || hours <= 0.0 || weights.service_hours_cap <= 0.0 {
        return 0.0;
    }
    hours.min(weights.service_hours_cap) / weights.service_hours_cap * 100.0
}

/// Round a raw score onto the 0-100 integer scale.
pub fn clamp_score(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, SCORE_MAX as f64) as u8
}

fn count_attestations(attestations: &[Attestation]) -> AttestationCounts {
    let mut counts = AttestationCounts::default();
    for attestation in attestations {
        if !attestation.verified {
            counts.unverified += 1;
            continue;
        }
        match attestation.kind {
            AttestationKind::CommunityService => counts.community_service += 1,
            AttestationKind::DisputeResolution => counts.dispute_resolution += 1,
            AttestationKind::PeerRating => counts.peer_rating += 1,
        }
    }
    counts
}

/// Compute the PFI breakdown for an account from its attestation log.
///
/// For admins the computed components are still reported, but `score`
/// carries the stored value and `exempt` is set.
pub fn compute_pfi_breakdown(
    account: &Account,
    attestations: &[Attestation],
    recent_transactions: u64,
    weights: &PfiWeights,
) -> PfiBreakdown {
    let attestation = ComponentScore::new(attestation_score(attestations, weights), weights.attestation);
    let service = ComponentScore::new(
        service_score(account.community_service_hours, weights),
        weights.service,
    );
    let baseline = ComponentScore::new(weights.baseline_score, weights.baseline);

    let raw_score = attestation.contribution + service.contribution + baseline.contribution;
    let exempt = !account.is_scored();
    let score = if exempt { account.pfi } else { clamp_score(raw_score) };

    PfiBreakdown {
        account: account.id,
        attestation,
        service,
        baseline,
        attestation_counts: count_attestations(attestations),
        recent_transactions,
        raw_score,
        score,
        exempt,
    }
}
