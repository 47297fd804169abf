// src/error.rs
//
// Error taxonomy for the active learning engine.
//
// Three families:
// - configuration errors (ensemble-dependent method without an ensemble,
//   out-of-range knobs) — fail fast, never silently fall back
// - computation errors — wrapped with the name of the failing operation so
//   callers see one coherent message per failing call
// - oracle errors — the caller-supplied labeler failed; its error is carried
//   unmodified as the source and aborts the remainder of the run

use crate::config::UncertaintyMethod;

pub type EngineResult<T> = Result<T, EngineError>;

/// Boxed error type for caller-supplied oracle failures.
pub type OracleFailure = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug)]
pub enum EngineError {
    /// An ensemble-dependent uncertainty method was requested but
    /// `initialize_ensemble` was never called.
    EnsembleRequired { method: UncertaintyMethod },
    /// A configuration knob was out of range at construction time.
    InvalidConfig { field: String, message: String },
    /// A numeric operation failed; `operation` names the failing public call.
    Computation { operation: String, message: String },
    /// The caller-supplied label oracle failed. Propagated unmodified.
    Oracle { source: OracleFailure },
}

impl EngineError {
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn computation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Computation {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::EnsembleRequired { method } => {
                write!(
                    f,
                    "uncertainty method '{}' requires an initialized ensemble; \
                     call initialize_ensemble first",
                    method.as_str()
                )
            }
            EngineError::InvalidConfig { field, message } => {
                write!(f, "invalid config '{}': {}", field, message)
            }
            EngineError::Computation { operation, message } => {
                write!(f, "{} failed: {}", operation, message)
            }
            EngineError::Oracle { source } => {
                write!(f, "{}", source)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Oracle { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}
