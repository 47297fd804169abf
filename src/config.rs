// src/config.rs
//
// Central configuration for the active learning engine.
//
// Strategy selection (uncertainty method, query strategy, action selection)
// is resolved to tagged enums at construction time, so an illegal
// method/ensemble combination surfaces once, up front, rather than as a
// string comparison deep inside the exploration loop.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// How per-state uncertainty is estimated.
///
/// `Entropy` needs only the main policy. The other three are
/// query-by-committee style and require `initialize_ensemble` to have been
/// called; they detect epistemic uncertainty (model disagreement) that the
/// single-policy entropy proxy cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UncertaintyMethod {
    /// Softmax entropy of the main policy's action scores.
    Entropy,
    /// Max elementwise score variance across ensemble members.
    Variance,
    /// Vote disagreement ratio: 1 - max_votes / ensemble_size.
    Disagreement,
    /// Entropy of the committee vote distribution over actions.
    VoteEntropy,
}

impl UncertaintyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UncertaintyMethod::Entropy => "entropy",
            UncertaintyMethod::Variance => "variance",
            UncertaintyMethod::Disagreement => "disagreement",
            UncertaintyMethod::VoteEntropy => "vote_entropy",
        }
    }

    /// Parse a method name (case-insensitive). Returns None if unrecognized.
    pub fn parse(s: &str) -> Option<UncertaintyMethod> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entropy" => Some(UncertaintyMethod::Entropy),
            "variance" => Some(UncertaintyMethod::Variance),
            "disagreement" | "qbc" => Some(UncertaintyMethod::Disagreement),
            "vote_entropy" | "vote-entropy" | "qbc_vote_entropy" => {
                Some(UncertaintyMethod::VoteEntropy)
            }
            _ => None,
        }
    }

    /// Whether this method needs an initialized ensemble.
    pub fn requires_ensemble(&self) -> bool {
        !matches!(self, UncertaintyMethod::Entropy)
    }
}

/// Named acquisition strategy family.
///
/// All variants currently share the single blended acquisition score in
/// `acquisition::select_query_batch`; the enum is the extension point for
/// genuinely distinct scoring rules (UCB, Thompson, EI) rather than a
/// promise that each name maps to different code today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStrategy {
    Uncertainty,
    Diversity,
    ExpectedImprovement,
    Thompson,
    Ucb,
}

impl QueryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStrategy::Uncertainty => "uncertainty",
            QueryStrategy::Diversity => "diversity",
            QueryStrategy::ExpectedImprovement => "expected_improvement",
            QueryStrategy::Thompson => "thompson",
            QueryStrategy::Ucb => "ucb",
        }
    }

    pub fn parse(s: &str) -> Option<QueryStrategy> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uncertainty" => Some(QueryStrategy::Uncertainty),
            "diversity" => Some(QueryStrategy::Diversity),
            "expected_improvement" | "expected-improvement" | "ei" => {
                Some(QueryStrategy::ExpectedImprovement)
            }
            "thompson" => Some(QueryStrategy::Thompson),
            "ucb" => Some(QueryStrategy::Ucb),
            _ => None,
        }
    }
}

/// How an action is picked from forward-pass scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActionSelection {
    /// Argmax of scores.
    Greedy,
    /// Uniform-random action with probability epsilon, else greedy.
    EpsilonGreedy { epsilon: f64 },
    /// Sample from the softmax-normalized score distribution.
    Softmax,
}

impl Default for ActionSelection {
    fn default() -> Self {
        ActionSelection::EpsilonGreedy { epsilon: 0.1 }
    }
}

/// Engine configuration. All knobs validated by `EngineConfig::validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Uncertainty estimation strategy.
    pub uncertainty_method: UncertaintyMethod,
    /// Named acquisition strategy family (see `QueryStrategy`).
    pub query_strategy: QueryStrategy,
    /// Action selection rule used when proposing an action to the oracle.
    pub action_selection: ActionSelection,
    /// Total number of oracle queries allowed per exploration run.
    pub labeling_budget: usize,
    /// Maximum queries selected per batch.
    pub batch_size: usize,
    /// Blend weight for batch diversity in the acquisition score, in [0, 1].
    pub diversity_weight: f64,
    /// Step size for the online gradient-style policy update.
    pub learning_rate: f64,
    /// Refresh the ensemble every this many total queries.
    pub ensemble_refresh_interval: usize,
    /// Vote-agreement ratio above which the committee is considered in
    /// consensus on a state.
    pub consensus_threshold: f64,
    /// RNG seed. Same seed + same inputs => identical run.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            uncertainty_method: UncertaintyMethod::Entropy,
            query_strategy: QueryStrategy::Uncertainty,
            action_selection: ActionSelection::default(),
            labeling_budget: 50,
            batch_size: 5,
            diversity_weight: 0.3,
            learning_rate: 0.01,
            ensemble_refresh_interval: 10,
            consensus_threshold: 0.8,
            seed: 0,
        }
    }
}

impl EngineConfig {
    pub fn with_uncertainty_method(mut self, method: UncertaintyMethod) -> Self {
        self.uncertainty_method = method;
        self
    }

    pub fn with_labeling_budget(mut self, budget: usize) -> Self {
        self.labeling_budget = budget;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_diversity_weight(mut self, weight: f64) -> Self {
        self.diversity_weight = weight;
        self
    }

    pub fn with_action_selection(mut self, selection: ActionSelection) -> Self {
        self.action_selection = selection;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate all knobs. Called by the engine constructor.
    pub fn validate(&self) -> EngineResult<()> {
        if self.labeling_budget == 0 {
            return Err(EngineError::invalid_config(
                "labeling_budget",
                "must be at least 1",
            ));
        }
        if self.batch_size == 0 {
            return Err(EngineError::invalid_config(
                "batch_size",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.diversity_weight) {
            return Err(EngineError::invalid_config(
                "diversity_weight",
                format!("{} is outside [0, 1]", self.diversity_weight),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(EngineError::invalid_config(
                "learning_rate",
                "must be finite and positive",
            ));
        }
        if self.ensemble_refresh_interval == 0 {
            return Err(EngineError::invalid_config(
                "ensemble_refresh_interval",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.consensus_threshold) {
            return Err(EngineError::invalid_config(
                "consensus_threshold",
                format!("{} is outside [0, 1]", self.consensus_threshold),
            ));
        }
        if let ActionSelection::EpsilonGreedy { epsilon } = self.action_selection {
            if !(0.0..=1.0).contains(&epsilon) {
                return Err(EngineError::invalid_config(
                    "action_selection.epsilon",
                    format!("{} is outside [0, 1]", epsilon),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let cfg = EngineConfig::default().with_labeling_budget(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_diversity_weight_bounds() {
        let cfg = EngineConfig::default().with_diversity_weight(1.5);
        assert!(cfg.validate().is_err());
        let cfg = EngineConfig::default().with_diversity_weight(1.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_uncertainty_method_parse_roundtrip() {
        for m in [
            UncertaintyMethod::Entropy,
            UncertaintyMethod::Variance,
            UncertaintyMethod::Disagreement,
            UncertaintyMethod::VoteEntropy,
        ] {
            assert_eq!(UncertaintyMethod::parse(m.as_str()), Some(m));
        }
        assert_eq!(
            UncertaintyMethod::parse("qbc"),
            Some(UncertaintyMethod::Disagreement)
        );
        assert_eq!(UncertaintyMethod::parse("bogus"), None);
    }

    #[test]
    fn test_query_strategy_parse() {
        assert_eq!(
            QueryStrategy::parse("ei"),
            Some(QueryStrategy::ExpectedImprovement)
        );
        assert_eq!(QueryStrategy::parse("UCB"), Some(QueryStrategy::Ucb));
        assert_eq!(QueryStrategy::parse("nope"), None);
    }

    #[test]
    fn test_ensemble_requirement_flags() {
        assert!(!UncertaintyMethod::Entropy.requires_ensemble());
        assert!(UncertaintyMethod::Variance.requires_ensemble());
        assert!(UncertaintyMethod::Disagreement.requires_ensemble());
        assert!(UncertaintyMethod::VoteEntropy.requires_ensemble());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let cfg = EngineConfig::default()
            .with_uncertainty_method(UncertaintyMethod::VoteEntropy)
            .with_seed(42);
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.uncertainty_method, UncertaintyMethod::VoteEntropy);
        assert_eq!(parsed.seed, 42);
    }
}
