//! Engine-level error types.

use thiserror::Error;

use crate::validate::ValidationError;

/// Errors produced by the workflow engine.
///
/// These never escape `Engine::run` as a `Result::Err` — the run loop
/// converts them into a failed `RunResult` so callers always receive a
/// structured outcome. The type exists so internal stages and log messages
/// agree on the taxonomy.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Structural defect caught before any step ran.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The definition is not in `active` status.
    #[error("workflow is not active (status: {0})")]
    NotActive(String),

    /// No executor is registered for a step's kind. Fatal for the run.
    #[error("no executor registered for step kind '{kind}' (step '{step_id}')")]
    UnknownStepKind { step_id: String, kind: String },

    /// A step failed with a non-retryable error.
    #[error("step '{step_id}' failed: {message}")]
    StepFatal { step_id: String, message: String },

    /// A step's retryable error was exhausted.
    #[error("step '{step_id}' exceeded retry limit: {message}")]
    RetryExhausted { step_id: String, message: String },
}
