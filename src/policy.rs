// src/policy.rs
//
// Flat parametric policy: a single weight vector mapped to per-action
// scores through a fixed, cyclically-indexed linear + tanh transform.
//
// The action count is max(2, policy_len / state_len) and the slice of
// weights feeding action `a` wraps modulo policy_len. This lets one flat
// vector serve states of varying dimension without reallocation; it is a
// compact fixed scheme, not a learned embedding. The online update uses
// the same index-wrapping convention so gradients and scores stay
// consistent.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::ActionSelection;
use crate::error::{EngineError, EngineResult};
use crate::math;

/// Parametric policy vector. Exclusively owned by the engine; mutated in
/// place only by `apply_update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    weights: Vec<f64>,
}

impl Policy {
    pub fn new(weights: Vec<f64>) -> EngineResult<Self> {
        if weights.is_empty() {
            return Err(EngineError::invalid_config(
                "initial_policy",
                "policy vector must be non-empty",
            ));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(EngineError::invalid_config(
                "initial_policy",
                "policy vector contains non-finite weights",
            ));
        }
        Ok(Self { weights })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Read-only copy for external persistence. Mutating the returned
    /// vector does not affect the engine's policy.
    pub fn snapshot(&self) -> Vec<f64> {
        self.weights.clone()
    }

    /// Number of actions scored for a state of the given dimension.
    pub fn num_actions(&self, state_len: usize) -> usize {
        if state_len == 0 {
            return 2;
        }
        (self.weights.len() / state_len).max(2)
    }

    /// Forward pass: per-action scores for a state vector.
    ///
    /// score[a] = tanh( sum_j weights[(a * state_len + j) % policy_len] * state[j] )
    pub fn action_scores(&self, state: &[f64]) -> EngineResult<Vec<f64>> {
        if state.is_empty() {
            return Err(EngineError::computation(
                "forward pass",
                "state vector must be non-empty",
            ));
        }

        let n_actions = self.num_actions(state.len());
        let plen = self.weights.len();
        let mut scores = Vec::with_capacity(n_actions);

        for a in 0..n_actions {
            let mut acc = 0.0;
            for (j, &x) in state.iter().enumerate() {
                let w = self.weights[(a * state.len() + j) % plen];
                acc += w * x;
            }
            scores.push(acc.tanh());
        }

        Ok(scores)
    }

    /// Pick an action from forward-pass scores under the given rule.
    ///
    /// Greedy is deterministic; epsilon-greedy and softmax draw from the
    /// supplied RNG so runs stay reproducible under a fixed seed.
    pub fn select_action(
        &self,
        scores: &[f64],
        selection: ActionSelection,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        match selection {
            ActionSelection::Greedy => argmax(scores),
            ActionSelection::EpsilonGreedy { epsilon } => {
                if rng.gen::<f64>() < epsilon {
                    rng.gen_range(0..scores.len().max(1))
                } else {
                    argmax(scores)
                }
            }
            ActionSelection::Softmax => {
                let probs = math::softmax(scores);
                let draw: f64 = rng.gen();
                let mut cum = 0.0;
                for (i, &p) in probs.iter().enumerate() {
                    cum += p;
                    if draw < cum {
                        return i;
                    }
                }
                probs.len().saturating_sub(1)
            }
        }
    }

    /// One stochastic-gradient-style correction from a labeled query.
    ///
    /// err = reward - Q[action]; weights[i] += lr * err * state[i % state_len].
    /// Returns the error term (zero error => unchanged policy).
    pub fn apply_update(
        &mut self,
        state: &[f64],
        action: usize,
        reward: f64,
        learning_rate: f64,
    ) -> EngineResult<f64> {
        let scores = self.action_scores(state)?;
        if action >= scores.len() {
            return Err(EngineError::computation(
                "policy update",
                format!(
                    "action index {} out of range for {} actions",
                    action,
                    scores.len()
                ),
            ));
        }

        let error = reward - scores[action];
        for i in 0..self.weights.len() {
            self.weights[i] += learning_rate * error * state[i % state.len()];
        }
        Ok(error)
    }

    /// Perturbed copy: each weight jittered uniformly in ±magnitude.
    /// Used to seed and re-diversify the ensemble.
    pub fn perturbed(&self, magnitude: f64, rng: &mut ChaCha8Rng) -> Policy {
        let weights = self
            .weights
            .iter()
            .map(|&w| w + rng.gen_range(-magnitude..=magnitude))
            .collect();
        Policy { weights }
    }

    /// Blend this policy toward another: self = keep * self + (1 - keep) * other.
    /// Vectors of differing length blend over the shorter prefix.
    pub fn blend_toward(&mut self, other: &Policy, keep: f64) {
        let n = self.weights.len().min(other.weights.len());
        for i in 0..n {
            self.weights[i] = keep * self.weights[i] + (1.0 - keep) * other.weights[i];
        }
    }

    /// Add uniform noise in ±magnitude to every weight.
    pub fn add_noise(&mut self, magnitude: f64, rng: &mut ChaCha8Rng) {
        for w in &mut self.weights {
            *w += rng.gen_range(-magnitude..=magnitude);
        }
    }
}

/// Index of the maximum score; first index wins ties. Empty input maps to 0.
pub fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, &s) in scores.iter().enumerate() {
        if s > best_score {
            best = i;
            best_score = s;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_num_actions_floor_and_minimum() {
        let policy = Policy::new(vec![0.1; 10]).unwrap();
        assert_eq!(policy.num_actions(3), 3); // floor(10/3)
        assert_eq!(policy.num_actions(2), 5);
        assert_eq!(policy.num_actions(10), 2); // never below 2
        assert_eq!(policy.num_actions(50), 2);
    }

    #[test]
    fn test_forward_pass_modulo_indexing() {
        // policy_len = 4, state_len = 2 => 2 actions.
        // action 0 uses weights[0..2], action 1 uses weights[2..4].
        let policy = Policy::new(vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let scores = policy.action_scores(&[0.5, 0.25]).unwrap();
        assert_eq!(scores.len(), 2);
        assert!((scores[0] - 0.5f64.tanh()).abs() < 1e-12);
        assert!((scores[1] - 0.25f64.tanh()).abs() < 1e-12);
    }

    #[test]
    fn test_forward_pass_wraps_past_policy_end() {
        // policy_len = 3, state_len = 1 => 3 actions; indices 0,1,2 then wrap.
        let policy = Policy::new(vec![0.1, 0.2, 0.3]).unwrap();
        let scores = policy.action_scores(&[1.0]).unwrap();
        assert_eq!(scores.len(), 3);
        assert!((scores[0] - 0.1f64.tanh()).abs() < 1e-12);
        assert!((scores[2] - 0.3f64.tanh()).abs() < 1e-12);
    }

    #[test]
    fn test_scores_bounded_by_tanh() {
        let policy = Policy::new(vec![100.0; 8]).unwrap();
        let scores = policy.action_scores(&[5.0, 5.0]).unwrap();
        assert!(scores.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_empty_state_rejected() {
        let policy = Policy::new(vec![0.1; 4]).unwrap();
        assert!(policy.action_scores(&[]).is_err());
    }

    #[test]
    fn test_empty_policy_rejected() {
        assert!(Policy::new(vec![]).is_err());
    }

    #[test]
    fn test_zero_error_update_is_noop() {
        let mut policy = Policy::new(vec![0.3, -0.2, 0.5, 0.1]).unwrap();
        let state = [1.0, -0.5];
        let scores = policy.action_scores(&state).unwrap();
        let before = policy.snapshot();

        // Reward exactly equal to the current Q-value => zero gradient step.
        let err = policy.apply_update(&state, 0, scores[0], 0.01).unwrap();
        assert!(err.abs() < 1e-12);
        assert_eq!(policy.snapshot(), before);
    }

    #[test]
    fn test_update_moves_score_toward_reward() {
        let mut policy = Policy::new(vec![0.1; 6]).unwrap();
        let state = [0.8, 0.4, 0.2];
        let before = policy.action_scores(&state).unwrap()[0];

        policy.apply_update(&state, 0, 1.0, 0.05).unwrap();
        let after = policy.action_scores(&state).unwrap()[0];
        assert!(after > before, "score should move toward reward 1.0");
    }

    #[test]
    fn test_update_out_of_range_action() {
        let mut policy = Policy::new(vec![0.1; 4]).unwrap();
        assert!(policy.apply_update(&[1.0, 1.0], 9, 0.5, 0.01).is_err());
    }

    #[test]
    fn test_greedy_selection_is_argmax() {
        let policy = Policy::new(vec![0.1; 4]).unwrap();
        let mut r = rng();
        let action = policy.select_action(&[0.1, 0.9, 0.3], ActionSelection::Greedy, &mut r);
        assert_eq!(action, 1);
    }

    #[test]
    fn test_epsilon_zero_equals_greedy() {
        let policy = Policy::new(vec![0.1; 4]).unwrap();
        let mut r = rng();
        for _ in 0..50 {
            let a = policy.select_action(
                &[0.2, 0.1, 0.8],
                ActionSelection::EpsilonGreedy { epsilon: 0.0 },
                &mut r,
            );
            assert_eq!(a, 2);
        }
    }

    #[test]
    fn test_softmax_degenerate_single_action() {
        let policy = Policy::new(vec![0.1; 4]).unwrap();
        let mut r = rng();
        for _ in 0..50 {
            let a = policy.select_action(&[0.42], ActionSelection::Softmax, &mut r);
            assert_eq!(a, 0, "single-action state must always select action 0");
        }
    }

    #[test]
    fn test_perturbed_stays_within_magnitude() {
        let policy = Policy::new(vec![0.0; 16]).unwrap();
        let mut r = rng();
        let jittered = policy.perturbed(0.05, &mut r);
        for w in jittered.weights() {
            assert!(w.abs() <= 0.05 + 1e-12);
        }
    }

    #[test]
    fn test_blend_toward() {
        let mut a = Policy::new(vec![1.0, 1.0]).unwrap();
        let b = Policy::new(vec![0.0, 0.0]).unwrap();
        a.blend_toward(&b, 0.9);
        assert!((a.weights()[0] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_is_defensive_copy() {
        let policy = Policy::new(vec![0.5, 0.5]).unwrap();
        let mut snap = policy.snapshot();
        snap[0] = 999.0;
        assert!((policy.weights()[0] - 0.5).abs() < 1e-12);
    }
}
