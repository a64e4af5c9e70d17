use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Diagnostic view of a constraint's life-state, carried by
/// [`EngineError::NoActiveConstraints`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSnapshot {
    pub name: String,
    pub group_id: u64,
    pub active: bool,
    pub succeeded: bool,
    pub failed: bool,
}

/// Main error type for the parameter-search engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No active constraints remain; the evaluation stream is over. Carries
    /// the terminal life-state of every constraint for diagnostics.
    #[error("no active constraints remain")]
    NoActiveConstraints { states: Vec<ConstraintSnapshot> },

    /// The user task body reported a failure.
    #[error("task execution failed: {0}")]
    TaskFailed(String),

    /// Every concurrent execution of an iteration failed.
    #[error("all {0} concurrent executions failed")]
    AllExecutionsFailed(usize),

    /// `pull` was called before any completed `push`.
    #[error("no output available: push an input first")]
    OutputNotReady,

    #[error("invalid concurrency {requested}: must be in 1..={maximum}")]
    InvalidConcurrency { requested: usize, maximum: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
