//! Error types shared by every stage of a run.

use thiserror::Error;

/// Errors raised while weighting, simulating or clustering.
///
/// Every variant is fatal to the run that produced it; nothing in the
/// pipeline downgrades an error into a partial result.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum IacError {
    /// A weight policy cannot keep every incoming-weight sum at or below one.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// Invalid trial count, worker count, cluster count, threshold or layer set.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A parallel worker returned an error or panicked.
    #[error("worker {worker} failed: {reason}")]
    WorkerFailure {
        worker: usize,
        reason: String,
        #[source]
        cause: Option<Box<IacError>>,
    },

    /// Input too small or malformed for the requested operation.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A matrix handed to clustering contains NaN or infinity.
    #[error("non-finite value at ({row}, {col})")]
    NonFinite { row: usize, col: usize },

    /// Edge endpoints out of range, duplicate edges or bad weights.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
}

impl IacError {
    pub fn worker(worker: usize, cause: IacError) -> Self {
        IacError::WorkerFailure {
            worker,
            reason: cause.to_string(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn worker_panic(worker: usize, message: impl Into<String>) -> Self {
        IacError::WorkerFailure {
            worker,
            reason: format!("panicked: {}", message.into()),
            cause: None,
        }
    }

    /// The innermost error, looking through worker wrappers.
    pub fn root_cause(&self) -> &IacError {
        match self {
            IacError::WorkerFailure { cause: Some(inner), .. } => inner.root_cause(),
            other => other,
        }
    }

    pub fn is_policy_violation(&self) -> bool {
        matches!(self.root_cause(), IacError::PolicyViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, IacError>;
