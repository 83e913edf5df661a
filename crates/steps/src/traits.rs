//! The `StepExecutor` trait — the contract every step kind must fulfil.

use async_trait::async_trait;
use serde_json::Value;

use crate::StepError;

/// Read-only view of the run handed to an executor for one step.
///
/// `data` is a snapshot of the accumulated context at the moment the step
/// is dispatched; executors never mutate the context directly — they return
/// a [`StepOutput`] and the engine merges it under the step's namespace.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// ID of the workflow definition being run.
    pub workflow_id: uuid::Uuid,
    /// ID of this run.
    pub execution_id: uuid::Uuid,
    /// ID of the step being executed.
    pub step_id: String,
    /// Snapshot of the accumulated context data.
    pub data: Value,
    /// The step's declared successor ids (branch targets).
    pub connections: Vec<String>,
}

impl StepContext {
    /// Look up a value in the context snapshot by dotted path
    /// (e.g. `"step_fetch.statusCode"`).
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut current = &self.data;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

/// Control decision made by a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Successor {
    /// Jump to this step id.
    Goto(String),
    /// Ignore connections and continue in declared order.
    FallThrough,
}

/// What a step produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// The step's result object; stored under `step_<id>` in the context.
    pub value: Value,
    /// Successor chosen by the step. `None` leaves the decision to the
    /// engine (first connection, else declared order).
    pub next: Option<Successor>,
}

impl StepOutput {
    /// Output with no control redirection.
    pub fn value(value: Value) -> Self {
        Self { value, next: None }
    }

    /// Output that jumps to a chosen step.
    pub fn branch(value: Value, next: impl Into<String>) -> Self {
        Self {
            value,
            next: Some(Successor::Goto(next.into())),
        }
    }

    /// Output that explicitly continues in declared order.
    pub fn fall_through(value: Value) -> Self {
        Self {
            value,
            next: Some(Successor::FallThrough),
        }
    }
}

/// The core step trait.
///
/// Executors must be cheap to share (`Arc<dyn StepExecutor>`); any state
/// they hold (HTTP clients, directories) is shared across runs, so it must
/// be immutable or internally synchronized.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Execute one step given its `config` and the current run context.
    async fn execute(&self, config: &Value, ctx: &StepContext) -> Result<StepOutput, StepError>;
}
