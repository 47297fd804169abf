// src/engine.rs
//
// ActiveRlEngine: the budgeted exploration orchestrator.
//
// Loop shape per run: select batch -> for each selection: pre-update
// uncertainty -> oracle label -> online policy update -> cache eviction ->
// post-update uncertainty -> record; refresh the ensemble (if initialized)
// every N total queries. Terminates when the labeling budget is exhausted
// or no unqueried candidates remain.
//
// Each engine instance exclusively owns its policy, ensemble, uncertainty
// cache, and history; it is not designed for concurrent access. Oracle
// calls are awaited strictly sequentially because each update depends on
// the policy state produced by the previous one.

use std::collections::{HashMap, HashSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::acquisition::{self, QuerySelection};
use crate::config::EngineConfig;
use crate::ensemble::PolicyEnsemble;
use crate::error::{EngineError, EngineResult};
use crate::gain::InformationGain;
use crate::math;
use crate::metrics::{ExplorationRecord, SampleEfficiency};
use crate::oracle::LabelOracle;
use crate::policy::Policy;
use crate::uncertainty::{self, UncertaintyEstimate};

/// Engine lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Constructed, not yet exploring.
    Idle,
    /// A budgeted run is in progress.
    Exploring,
    /// The last run terminated.
    Done,
}

/// Why an exploration run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The labeling budget was spent.
    BudgetExhausted,
    /// No unqueried candidates remained before the budget ran out.
    CandidatesExhausted,
}

/// Caller-constructed description of one exploration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreTask {
    pub task_id: u64,
    pub name: String,
    /// Optional per-task cap below the configured labeling budget.
    pub max_queries: Option<usize>,
}

impl Default for ExploreTask {
    fn default() -> Self {
        Self {
            task_id: 0,
            name: "exploration".to_string(),
            max_queries: None,
        }
    }
}

impl ExploreTask {
    pub fn with_task_id(mut self, task_id: u64) -> Self {
        self.task_id = task_id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_max_queries(mut self, max_queries: usize) -> Self {
        self.max_queries = Some(max_queries);
        self
    }
}

/// Aggregated result of one exploration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreOutcome {
    pub task_id: u64,
    pub termination_reason: TerminationReason,
    /// Snapshot of the policy after the run.
    pub final_policy: Vec<f64>,
    /// 0.5 * coverage + 0.5 * mean expected uncertainty reduction.
    pub exploration_score: f64,
    /// Queries made during this run.
    pub queries_made: usize,
    /// (sum pre-entropy - sum post-entropy) / sum pre-entropy for this run.
    pub uncertainty_reduction: f64,
    pub sample_efficiency: SampleEfficiency,
    /// Per-field mean over the full gain history.
    pub mean_information_gain: InformationGain,
}

impl ExploreOutcome {
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        // serde_json preserves struct field order, so this is stable.
        serde_json::to_vec(self)
    }
}

/// Active learning reinforcement engine.
pub struct ActiveRlEngine {
    cfg: EngineConfig,
    policy: Policy,
    ensemble: Option<PolicyEnsemble>,
    /// Uncertainty cache keyed by canonical state key. An entry is evicted
    /// the moment its state is queried and the policy changes.
    cache: HashMap<String, UncertaintyEstimate>,
    /// Canonical keys of every state ever queried (duplicate-avoidance).
    queried: HashSet<String>,
    history: Vec<ExplorationRecord>,
    gains: Vec<InformationGain>,
    rng: ChaCha8Rng,
    phase: Phase,
    /// Engine-lifetime query count; drives the ensemble refresh cadence.
    total_queries: usize,
}

impl ActiveRlEngine {
    pub fn new(initial_policy: Vec<f64>, cfg: EngineConfig) -> EngineResult<Self> {
        cfg.validate()?;
        let policy = Policy::new(initial_policy)?;
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed);

        Ok(Self {
            cfg,
            policy,
            ensemble: None,
            cache: HashMap::new(),
            queried: HashSet::new(),
            history: Vec::new(),
            gains: Vec::new(),
            rng,
            phase: Phase::Idle,
            total_queries: 0,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Read-only policy snapshot. Mutating the returned vector does not
    /// affect the engine.
    pub fn policy(&self) -> Vec<f64> {
        self.policy.snapshot()
    }

    /// Append-only history of every (state, action, reward) query outcome.
    pub fn exploration_history(&self) -> &[ExplorationRecord] {
        &self.history
    }

    pub fn gain_history(&self) -> &[InformationGain] {
        &self.gains
    }

    pub fn queried_count(&self) -> usize {
        self.queried.len()
    }

    /// Current ensemble diversity, if an ensemble was initialized.
    pub fn ensemble_diversity(&self) -> Option<f64> {
        self.ensemble.as_ref().map(|e| e.diversity())
    }

    /// Create the policy ensemble. Required before using the variance,
    /// disagreement, or vote-entropy uncertainty methods.
    pub fn initialize_ensemble(&mut self, size: usize) -> EngineResult<()> {
        let ensemble = PolicyEnsemble::initialize(
            &self.policy,
            size,
            self.cfg.consensus_threshold,
            &mut self.rng,
        )?;
        self.ensemble = Some(ensemble);
        Ok(())
    }

    /// Estimate uncertainty for a state, cached by canonical state key.
    ///
    /// A second call with no intervening policy update for that state
    /// returns the identical cached value.
    pub fn estimate_uncertainty(&mut self, state: &[f64]) -> EngineResult<UncertaintyEstimate> {
        let key = math::canonical_state_key(state);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let estimate = uncertainty::estimate(
            self.cfg.uncertainty_method,
            &self.policy,
            self.ensemble.as_ref(),
            state,
        )?;
        self.cache.insert(key, estimate.clone());
        Ok(estimate)
    }

    /// Select the next query batch without executing it.
    ///
    /// Exposed for callers that want to inspect or veto selections; the
    /// exploration loop uses the same path internally.
    pub fn select_query_batch(
        &mut self,
        candidates: &[Vec<f64>],
        batch_size: usize,
    ) -> EngineResult<Vec<QuerySelection>> {
        let diversity_weight = self.cfg.diversity_weight;
        // Split borrows: the closure needs &mut for the cache while the
        // queried set is read by the selector.
        let queried = std::mem::take(&mut self.queried);
        let result = acquisition::select_query_batch(
            candidates,
            batch_size,
            diversity_weight,
            &queried,
            |state| {
                let estimate = self.estimate_uncertainty(state)?;
                let n_actions = self.policy.num_actions(state.len());
                let gain = InformationGain::prospective(&estimate, n_actions);
                Ok((estimate, gain))
            },
        );
        self.queried = queried;
        result
    }

    /// Run one budgeted exploration pass.
    ///
    /// Pulls candidate states from the caller, selects batches, labels
    /// each selection through the oracle, updates the policy online, and
    /// accumulates metrics. Any oracle or computation error aborts the
    /// remainder of the run; the policy keeps its last successful update.
    pub async fn explore<O: LabelOracle>(
        &mut self,
        task: &ExploreTask,
        candidates: &[Vec<f64>],
        oracle: &mut O,
    ) -> EngineResult<ExploreOutcome> {
        self.phase = Phase::Exploring;

        let budget = match task.max_queries {
            Some(cap) => self.cfg.labeling_budget.min(cap),
            None => self.cfg.labeling_budget,
        };

        let mut queries_made = 0usize;
        let mut pre_entropy_sum = 0.0;
        let mut post_entropy_sum = 0.0;
        let mut termination_reason = TerminationReason::BudgetExhausted;

        while queries_made < budget {
            let batch_size = self.cfg.batch_size.min(budget - queries_made);
            let batch = match self.select_query_batch(candidates, batch_size) {
                Ok(batch) => batch,
                Err(err) => {
                    self.phase = Phase::Done;
                    return Err(err);
                }
            };

            if batch.is_empty() {
                termination_reason = TerminationReason::CandidatesExhausted;
                break;
            }

            for selection in batch {
                match self.execute_query(&selection, oracle).await {
                    Ok((pre, post)) => {
                        pre_entropy_sum += pre;
                        post_entropy_sum += post;
                        queries_made += 1;
                    }
                    Err(err) => {
                        self.phase = Phase::Done;
                        return Err(err);
                    }
                }
            }
        }

        self.phase = Phase::Done;

        let sample_efficiency = SampleEfficiency::from_history(&self.history);
        let mean_information_gain = InformationGain::mean_of(&self.gains);

        let uncertainty_reduction = if pre_entropy_sum > 0.0 {
            (pre_entropy_sum - post_entropy_sum) / pre_entropy_sum
        } else {
            0.0
        };

        let exploration_score = 0.5 * sample_efficiency.coverage
            + 0.5 * mean_information_gain.expected_reduction;

        Ok(ExploreOutcome {
            task_id: task.task_id,
            termination_reason,
            final_policy: self.policy.snapshot(),
            exploration_score,
            queries_made,
            uncertainty_reduction,
            sample_efficiency,
            mean_information_gain,
        })
    }

    /// Label one selection, apply the update, and record the outcome.
    ///
    /// Returns (pre, post) entropy for the run-level reduction accounting.
    async fn execute_query<O: LabelOracle>(
        &mut self,
        selection: &QuerySelection,
        oracle: &mut O,
    ) -> EngineResult<(f64, f64)> {
        let state = &selection.state;

        // Pre-update estimate. Normally a cache hit from batch selection;
        // recomputed if an earlier update in this batch evicted it.
        let pre = self.estimate_uncertainty(state)?;

        let scores = self.policy.action_scores(state)?;
        let action = self
            .policy
            .select_action(&scores, self.cfg.action_selection, &mut self.rng);

        let reward = oracle
            .label(state, action)
            .await
            .map_err(|source| EngineError::Oracle { source })?;

        self.policy
            .apply_update(state, action, reward, self.cfg.learning_rate)?;

        // The cached estimate is only valid for the policy version it was
        // computed under; evict before re-estimating.
        let key = math::canonical_state_key(state);
        self.cache.remove(&key);

        let post = self.estimate_uncertainty(state)?;

        self.gains.push(InformationGain::realized(&pre, &post));
        self.history.push(ExplorationRecord {
            state: state.clone(),
            action,
            reward,
        });
        self.queried.insert(key);
        self.total_queries += 1;

        if self.total_queries % self.cfg.ensemble_refresh_interval == 0 {
            let ensemble = self.ensemble.take();
            if let Some(mut ens) = ensemble {
                ens.refresh(&self.policy, &mut self.rng);
                self.ensemble = Some(ens);
            }
        }

        Ok((pre.entropy, post.entropy))
    }
}
