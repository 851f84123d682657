//! Structured errors surfaced to the caller of [`crate::solve`] (spec.md §7).

use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum SolverError {
    /// Malformed graph, unknown building kind, dangling edge endpoints,
    /// non-positive dimensions, `expansionStep <= 0`. Rejected synchronously
    /// before any streaming begins.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A `check()` exceeded `timeoutMsPerAttempt`.
    #[error("attempt {iteration} ({width}x{height}) timed out")]
    SolverTimeout { iteration: u32, width: usize, height: usize },

    /// The solver returned unknown for a reason other than a timeout.
    #[error("attempt {iteration} ({width}x{height}) returned unknown: {reason}")]
    SolverUnknown { iteration: u32, width: usize, height: usize, reason: String },

    /// `maxIterations` exhausted without a sat result.
    #[error("unsatisfiable after exhausting max iterations (last bounds {last_width}x{last_height})")]
    Unsatisfiable { last_width: usize, last_height: usize },

    /// The session was cancelled externally.
    #[error("cancelled")]
    Cancelled,

    /// An encoder/extractor invariant was violated. This is always a bug.
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl SolverError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        SolverError::InvalidInput { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SolverError::InternalError { message: message.into() }
    }
}

impl From<anyhow::Error> for SolverError {
    fn from(err: anyhow::Error) -> Self {
        SolverError::InternalError { message: format!("{err:#}") }
    }
}
