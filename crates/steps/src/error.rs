//! Step-level error type.

use thiserror::Error;

/// Errors returned by a step executor's `execute` method.
///
/// The engine routes each variant through its failure policy:
/// - `Retryable` — re-attempted with exponential back-off.
/// - `Fatal`     — the run is aborted immediately.
/// - `Transport` — webhook/network failure; continue-by-default, but the
///   policy can be flipped to abort.
/// - `AgentNotFound` — a data error (never retried); policy decides whether
///   the run aborts.
#[derive(Debug, Error, Clone)]
pub enum StepError {
    /// Transient failure; worth another attempt.
    #[error("retryable step error: {0}")]
    Retryable(String),

    /// Permanent failure; no retry should be attempted.
    #[error("fatal step error: {0}")]
    Fatal(String),

    /// Outbound call failed (connect error, timeout, or error status).
    #[error("transport error: {0}")]
    Transport(String),

    /// The referenced agent does not exist in the directory.
    #[error("agent not found: {0}")]
    AgentNotFound(String),
}
