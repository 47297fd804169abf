// src/uncertainty.rs
//
// Per-state uncertainty estimation.
//
// Four interchangeable strategies:
// - entropy:      softmax entropy of the main policy's scores (always available)
// - variance:     max elementwise score variance across ensemble members
// - disagreement: QBC vote ratio, 1 - max_votes / ensemble_size
// - vote entropy: entropy of the committee vote distribution
//
// The ensemble-backed strategies fail fast when no ensemble was
// initialized; they never silently fall back to entropy. Caching by
// canonical state key lives in the engine, which owns invalidation on
// every policy update.

use serde::{Deserialize, Serialize};

use crate::config::UncertaintyMethod;
use crate::ensemble::PolicyEnsemble;
use crate::error::{EngineError, EngineResult};
use crate::math;
use crate::policy::{argmax, Policy};

/// Uncertainty estimate for one state under the policy version it was
/// computed against. Evicted from the cache the moment that state is
/// queried and the policy changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyEstimate {
    /// The state this estimate was computed for.
    pub state: Vec<f64>,
    /// Recommended / reported action for this state.
    pub action: usize,
    /// Mean score statistic (method-dependent, see each estimator).
    pub mean: f64,
    /// Variance statistic (method-dependent).
    pub variance: f64,
    /// Uncertainty score. Entropy in bits for the entropy-family methods,
    /// the disagreement/variance score for the QBC methods.
    pub entropy: f64,
    /// Confidence in [0, 1]; higher means the policy is surer.
    pub confidence: f64,
}

/// Estimate uncertainty for a state with the configured method.
///
/// `ensemble` must be `Some` for the variance / disagreement / vote-entropy
/// methods.
pub fn estimate(
    method: UncertaintyMethod,
    policy: &Policy,
    ensemble: Option<&PolicyEnsemble>,
    state: &[f64],
) -> EngineResult<UncertaintyEstimate> {
    match method {
        UncertaintyMethod::Entropy => entropy_estimate(policy, state),
        UncertaintyMethod::Variance => {
            let ens = require_ensemble(method, ensemble)?;
            variance_estimate(ens, state)
        }
        UncertaintyMethod::Disagreement => {
            let ens = require_ensemble(method, ensemble)?;
            disagreement_estimate(policy, ens, state)
        }
        UncertaintyMethod::VoteEntropy => {
            let ens = require_ensemble(method, ensemble)?;
            vote_entropy_estimate(policy, ens, state)
        }
    }
}

fn require_ensemble<'a>(
    method: UncertaintyMethod,
    ensemble: Option<&'a PolicyEnsemble>,
) -> EngineResult<&'a PolicyEnsemble> {
    ensemble.ok_or(EngineError::EnsembleRequired { method })
}

/// Entropy method: softmax the main policy's scores, entropy in bits,
/// confidence = 1 - entropy / log2(n_actions).
fn entropy_estimate(policy: &Policy, state: &[f64]) -> EngineResult<UncertaintyEstimate> {
    let scores = policy.action_scores(state)?;
    let probs = math::softmax(&scores);
    let entropy = math::entropy_bits(&probs);

    let max_entropy = (probs.len() as f64).log2();
    let confidence = if max_entropy > 0.0 {
        (1.0 - entropy / max_entropy).clamp(0.0, 1.0)
    } else {
        1.0
    };

    Ok(UncertaintyEstimate {
        state: state.to_vec(),
        action: argmax(&scores),
        mean: math::mean(&scores),
        variance: math::variance_population(&scores),
        entropy,
        confidence,
    })
}

/// Variance method: elementwise mean and population variance of the
/// committee's score vectors; reports the action with maximum variance and
/// confidence = 1 / (1 + variance).
fn variance_estimate(
    ensemble: &PolicyEnsemble,
    state: &[f64],
) -> EngineResult<UncertaintyEstimate> {
    let member_scores = ensemble.member_scores(state)?;
    let n_actions = member_scores
        .first()
        .map(|s| s.len())
        .unwrap_or_default();

    let mut means = Vec::with_capacity(n_actions);
    let mut variances = Vec::with_capacity(n_actions);
    for a in 0..n_actions {
        let column: Vec<f64> = member_scores.iter().map(|s| s[a]).collect();
        means.push(math::mean(&column));
        variances.push(math::variance_population(&column));
    }

    let action = argmax(&variances);
    let variance = variances.get(action).copied().unwrap_or(0.0);

    Ok(UncertaintyEstimate {
        state: state.to_vec(),
        action,
        mean: means.get(action).copied().unwrap_or(0.0),
        variance,
        entropy: variance,
        confidence: 1.0 / (1.0 + variance),
    })
}

/// QBC disagreement: each member votes its argmax; disagreement is
/// 1 - max_votes / ensemble_size. Reports the main policy's argmax action
/// with the disagreement score as the uncertainty.
fn disagreement_estimate(
    policy: &Policy,
    ensemble: &PolicyEnsemble,
    state: &[f64],
) -> EngineResult<UncertaintyEstimate> {
    let votes = ensemble.vote_counts(state)?;
    let max_votes = votes.iter().copied().max().unwrap_or(0);
    let disagreement = 1.0 - max_votes as f64 / ensemble.size() as f64;

    let scores = policy.action_scores(state)?;

    Ok(UncertaintyEstimate {
        state: state.to_vec(),
        action: argmax(&scores),
        mean: math::mean(&scores),
        variance: disagreement,
        entropy: disagreement,
        confidence: (1.0 - disagreement).clamp(0.0, 1.0),
    })
}

/// QBC vote entropy: entropy of the vote distribution across actions — a
/// finer-grained committee signal than the plain disagreement ratio.
fn vote_entropy_estimate(
    policy: &Policy,
    ensemble: &PolicyEnsemble,
    state: &[f64],
) -> EngineResult<UncertaintyEstimate> {
    let votes = ensemble.vote_counts(state)?;
    let total = votes.iter().sum::<usize>() as f64;
    let probs: Vec<f64> = votes.iter().map(|&v| v as f64 / total).collect();
    let entropy = math::entropy_bits(&probs);

    let max_entropy = (probs.len() as f64).log2();
    let confidence = if max_entropy > 0.0 {
        (1.0 - entropy / max_entropy).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let scores = policy.action_scores(state)?;

    Ok(UncertaintyEstimate {
        state: state.to_vec(),
        action: argmax(&scores),
        mean: math::mean(&scores),
        variance: math::variance_population(&probs),
        entropy,
        confidence,
    })
}
