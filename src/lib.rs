//! Erotema core library.
//!
//! An active learning reinforcement engine: it manages a flat parametric
//! policy, estimates decision uncertainty over states, and selects which
//! states are worth querying next under a fixed labeling budget, so each
//! oracle call buys as much learning progress as possible.
//!
//! # Architecture
//!
//! The crate follows a clean separation between pure numeric components
//! and the orchestration loop:
//!
//! - **Policy** (`policy`): flat weight vector with a fixed
//!   cyclically-indexed tanh forward pass, action selection rules, and the
//!   online gradient-style update.
//!
//! - **Ensemble** (`ensemble`): perturbed policy committee backing the
//!   query-by-committee uncertainty methods; refreshed toward the main
//!   policy with re-injected noise so it never collapses.
//!
//! - **Uncertainty** (`uncertainty`): entropy, ensemble variance, vote
//!   disagreement, and vote-entropy estimators behind one configuration
//!   switch.
//!
//! - **Acquisition** (`acquisition`): blended uncertainty / diversity /
//!   information-gain scoring with greedy sequential batch selection and a
//!   no-repeat guarantee.
//!
//! - **Engine** (`engine`): the budgeted exploration orchestrator. Owns
//!   the policy, ensemble, uncertainty cache, and history; awaits the
//!   caller-supplied oracle strictly sequentially.
//!
//! - **Metrics** (`metrics`, `gain`): sample-efficiency and
//!   information-gain accounting derived lazily from the run history.
//!
//! The only external collaborator is the label oracle (`oracle`):
//! persistence, transport, and any surrounding application are explicitly
//! out of scope.

pub mod acquisition;
pub mod config;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod gain;
pub mod math;
pub mod metrics;
pub mod oracle;
pub mod policy;
pub mod uncertainty;

// --- Re-exports for ergonomic external use ---------------------------------

pub use acquisition::QuerySelection;
pub use config::{ActionSelection, EngineConfig, QueryStrategy, UncertaintyMethod};
pub use engine::{ActiveRlEngine, ExploreOutcome, ExploreTask, Phase, TerminationReason};
pub use ensemble::PolicyEnsemble;
pub use error::{EngineError, EngineResult, OracleFailure};
pub use gain::InformationGain;
pub use metrics::{ExplorationRecord, OnlineStats, SampleEfficiency};
pub use oracle::{BoxFuture, FnOracle, LabelOracle, OracleResult, RewardFn};
pub use policy::Policy;
pub use uncertainty::UncertaintyEstimate;
