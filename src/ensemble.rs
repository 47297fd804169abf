// src/ensemble.rs
//
// Policy ensemble for query-by-committee uncertainty.
//
// Members are perturbed copies of the main policy. On refresh each member
// blends 90% toward itself and 10% toward the current main policy, with a
// small re-injected noise term. The blend lets the committee track policy
// improvement; the noise keeps it from collapsing onto the main policy,
// which would make variance/disagreement uninformative.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::math;
use crate::policy::{argmax, Policy};

/// Per-coordinate jitter used when seeding members from the main policy.
const INIT_NOISE: f64 = 0.05;
/// Fraction of itself each member keeps on refresh.
const REFRESH_KEEP: f64 = 0.9;
/// Noise re-injected on every refresh to preserve diversity.
const REFRESH_NOISE: f64 = 0.01;

/// A bounded committee of perturbed policy copies.
///
/// Invariant: `self.members.len()` equals the size requested at
/// initialization; `diversity` is recomputed whenever membership changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEnsemble {
    members: Vec<Policy>,
    diversity: f64,
    consensus_threshold: f64,
}

impl PolicyEnsemble {
    /// Create `size` members by perturbing the main policy with small
    /// uniform noise.
    pub fn initialize(
        policy: &Policy,
        size: usize,
        consensus_threshold: f64,
        rng: &mut ChaCha8Rng,
    ) -> EngineResult<Self> {
        if size < 2 {
            return Err(EngineError::computation(
                "ensemble initialization",
                format!("ensemble size must be at least 2, got {}", size),
            ));
        }

        let members: Vec<Policy> = (0..size).map(|_| policy.perturbed(INIT_NOISE, rng)).collect();
        let diversity = mean_pairwise_distance(&members);

        Ok(Self {
            members,
            diversity,
            consensus_threshold,
        })
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[Policy] {
        &self.members
    }

    /// Mean pairwise Euclidean distance across members.
    pub fn diversity(&self) -> f64 {
        self.diversity
    }

    /// Blend every member toward the current main policy and re-inject
    /// noise, then recompute diversity.
    pub fn refresh(&mut self, policy: &Policy, rng: &mut ChaCha8Rng) {
        for member in &mut self.members {
            member.blend_toward(policy, REFRESH_KEEP);
            member.add_noise(REFRESH_NOISE, rng);
        }
        self.diversity = mean_pairwise_distance(&self.members);
    }

    /// Per-member score vectors for a state (committee forward pass).
    pub fn member_scores(&self, state: &[f64]) -> EngineResult<Vec<Vec<f64>>> {
        self.members
            .iter()
            .map(|m| m.action_scores(state))
            .collect()
    }

    /// Vote counts per action: each member votes its argmax.
    ///
    /// The vote vector is sized by the first member's action count; all
    /// members share the main policy's shape so counts line up.
    pub fn vote_counts(&self, state: &[f64]) -> EngineResult<Vec<usize>> {
        let scores = self.member_scores(state)?;
        let n_actions = scores.first().map(|s| s.len()).unwrap_or(0);
        let mut votes = vec![0usize; n_actions];
        for member_scores in &scores {
            let vote = argmax(member_scores);
            if vote < votes.len() {
                votes[vote] += 1;
            }
        }
        Ok(votes)
    }

    /// Whether the committee's vote agreement on this state clears the
    /// consensus threshold.
    pub fn consensus(&self, state: &[f64]) -> EngineResult<bool> {
        let votes = self.vote_counts(state)?;
        let max_votes = votes.iter().copied().max().unwrap_or(0);
        let agreement = max_votes as f64 / self.members.len() as f64;
        Ok(agreement >= self.consensus_threshold)
    }
}

fn mean_pairwise_distance(members: &[Policy]) -> f64 {
    if members.len() < 2 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut count = 0u64;
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            sum += math::euclidean_distance(members[i].weights(), members[j].weights());
            count += 1;
        }
    }
    sum / count as f64
}
