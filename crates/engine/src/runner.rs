//! The execution engine.
//!
//! `Engine::run` drives one workflow execution:
//! 1. Validates the definition structurally and checks it is active.
//! 2. Seeds a fresh `ExecutionContext` from caller input.
//! 3. Walks the steps from the first one, dispatching each to its executor
//!    via the registry, retrying retryable failures with exponential
//!    back-off, appending one log entry per attempt.
//! 4. Applies the per-error failure policy (abort vs continue), merges
//!    step output under the step's namespace, and picks the next cursor:
//!    executor-chosen branch, else the step's first connection, else the
//!    next step in declared order. A step reached via a jump and lacking
//!    its own connection is terminal ("last step wins").
//!
//! The engine never returns an `Err`: every run produces a structured
//! [`RunResult`], including partial context and log on failure. Cancellation
//! is checked at step boundaries only, never mid-step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use steps::{ExecutorRegistry, StepContext, StepError, StepExecutor, StepOutput, Successor};

use crate::context::{ExecutionContext, LogEntry, RunResult, RunStatus, StepStatus};
use crate::error::EngineError;
use crate::models::{Step, WorkflowDefinition, WorkflowStatus};
use crate::sink::{RunEvent, RunSink, TracingSink};
use crate::validate::validate;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What to do with a run when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Stop the run; status becomes `Failed`.
    Abort,
    /// Record the failure in the step's namespace and keep going.
    Continue,
}

/// Tuning knobs for the engine.
#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Maximum number of times a retryable step failure will be retried.
    pub max_retries: u32,
    /// Base delay for exponential back-off between retries.
    pub retry_base_delay: Duration,
    /// Run fate on webhook/network transport failures.
    pub on_transport_error: FailureAction,
    /// Run fate when an agent step references a missing agent.
    pub on_agent_not_found: FailureAction,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            on_transport_error: FailureAction::Continue,
            on_agent_not_found: FailureAction::Abort,
        }
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cloneable cancellation flag for one run.
///
/// The engine reads it between steps; cancelling mid-step lets the current
/// step finish and aborts before the next one dispatches.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation at the next step boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless orchestrator for workflow executions.
///
/// One engine serves any number of concurrent runs; each run owns its
/// context, so no cross-run state exists beyond the shared (immutable)
/// registry and policy.
pub struct Engine {
    registry: ExecutorRegistry,
    policy: RunPolicy,
    sink: Arc<dyn RunSink>,
}

impl Engine {
    /// Engine with the default policy and the tracing sink.
    pub fn new(registry: ExecutorRegistry) -> Self {
        Self {
            registry,
            policy: RunPolicy::default(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn RunSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run the workflow to completion. Convenience wrapper for callers that
    /// never cancel.
    pub async fn run(&self, definition: &WorkflowDefinition, input: Value) -> RunResult {
        self.execute(Uuid::new_v4(), definition, input, CancelHandle::new())
            .await
    }

    /// Run the workflow, checking `cancel` at every step boundary.
    pub async fn run_cancellable(
        &self,
        definition: &WorkflowDefinition,
        input: Value,
        cancel: CancelHandle,
    ) -> RunResult {
        self.execute(Uuid::new_v4(), definition, input, cancel).await
    }

    /// Run the workflow under a caller-assigned execution id, so hosts can
    /// persist and track the run before it starts.
    #[instrument(skip(self, input, cancel), fields(workflow_id = %definition.id, %execution_id))]
    pub async fn execute(
        &self,
        execution_id: Uuid,
        definition: &WorkflowDefinition,
        input: Value,
        cancel: CancelHandle,
    ) -> RunResult {
        let run_started = Utc::now();
        let mut log: Vec<LogEntry> = Vec::new();

        // Fail fast before any step runs: structure first, then status.
        if let Err(validation) = validate(definition) {
            let cause = EngineError::Validation(validation);
            error!(%cause, "definition rejected");
            return self
                .finish(
                    definition.id,
                    execution_id,
                    run_started,
                    RunStatus::Failed,
                    Value::Object(Default::default()),
                    log,
                    Some(cause.to_string()),
                )
                .await;
        }
        if definition.status != WorkflowStatus::Active {
            let cause = EngineError::NotActive(definition.status.to_string());
            warn!(%cause, "refusing to run");
            return self
                .finish(
                    definition.id,
                    execution_id,
                    run_started,
                    RunStatus::Failed,
                    Value::Object(Default::default()),
                    log,
                    Some(cause.to_string()),
                )
                .await;
        }

        let mut context = ExecutionContext::seeded(input);
        context.cursor = Some(definition.steps[0].id.clone());

        // Declared order is execution order until a step jumps via an
        // explicit connection or branch. A jumped-to step with no outgoing
        // connection is terminal ("last step wins"); falling back to
        // declared order there would leak control into a sibling branch.
        let mut arrived_by_jump = false;

        info!(%execution_id, steps = definition.steps.len(), "run started");

        while let Some(step_id) = context.cursor.take() {
            // Step boundary: the only place cancellation is honoured.
            if cancel.is_cancelled() {
                info!(%execution_id, last_step = ?log.last().map(|e| e.step_id.clone()), "run cancelled");
                return self
                    .finish(
                        definition.id,
                        execution_id,
                        run_started,
                        RunStatus::Aborted,
                        context.snapshot(),
                        log,
                        Some("cancelled by caller".to_string()),
                    )
                    .await;
            }

            // Cursors only ever come from validated connections or declared
            // order, but a lookup miss must still fail cleanly.
            let Some(step) = definition.step(&step_id) else {
                let cause = EngineError::StepFatal {
                    step_id: step_id.clone(),
                    message: "cursor references a step missing from the definition".into(),
                };
                error!(%cause, "run failed");
                return self
                    .finish(
                        definition.id,
                        execution_id,
                        run_started,
                        RunStatus::Failed,
                        context.snapshot(),
                        log,
                        Some(cause.to_string()),
                    )
                    .await;
            };

            let Some(executor) = self.registry.resolve(&step.kind) else {
                let cause = EngineError::UnknownStepKind {
                    step_id: step.id.clone(),
                    kind: step.kind.clone(),
                };
                let now = Utc::now();
                log.push(LogEntry {
                    step_id: step.id.clone(),
                    kind: step.kind.clone(),
                    attempt: 1,
                    started_at: now,
                    finished_at: now,
                    outcome: StepStatus::Failed,
                    error: Some(cause.to_string()),
                });
                error!(%cause, "run failed");
                return self
                    .finish(
                        definition.id,
                        execution_id,
                        run_started,
                        RunStatus::Failed,
                        context.snapshot(),
                        log,
                        Some(cause.to_string()),
                    )
                    .await;
            };

            let attempt_result = self
                .execute_with_retry(execution_id, definition, step, executor, &context, &mut log)
                .await;

            match attempt_result {
                Ok(output) => {
                    let decision = output.next.clone();
                    context.record_step_output(&step.id, output.value);
                    context.cursor = match decision {
                        Some(Successor::Goto(target)) => {
                            arrived_by_jump = true;
                            Some(target)
                        }
                        Some(Successor::FallThrough) => {
                            arrived_by_jump = false;
                            declared_next(definition, step)
                        }
                        None => match step.connections.first() {
                            Some(target) => {
                                arrived_by_jump = true;
                                Some(target.clone())
                            }
                            None if arrived_by_jump => None,
                            None => declared_next(definition, step),
                        },
                    };
                }
                Err(step_error) => {
                    let action = self.failure_action(&step_error);
                    match action {
                        FailureAction::Continue => {
                            // Record the failure under the step's namespace
                            // and keep walking the declared order.
                            let record = match &step_error {
                                StepFailure::Error(StepError::Transport(msg)) => {
                                    json!({ "webhookError": msg })
                                }
                                other => json!({ "error": other.to_string() }),
                            };
                            warn!(step_id = %step.id, error = %step_error, "step failed, continuing per policy");
                            context.record_step_output(&step.id, record);
                            context.cursor = match step.connections.first() {
                                Some(target) => {
                                    arrived_by_jump = true;
                                    Some(target.clone())
                                }
                                None if arrived_by_jump => None,
                                None => declared_next(definition, step),
                            };
                        }
                        FailureAction::Abort => {
                            let cause = fatal_cause(&step.id, step_error);
                            error!(%cause, "run failed");
                            return self
                                .finish(
                                    definition.id,
                                    execution_id,
                                    run_started,
                                    RunStatus::Failed,
                                    context.snapshot(),
                                    log,
                                    Some(cause.to_string()),
                                )
                                .await;
                        }
                    }
                }
            }
        }

        info!(%execution_id, "run completed");
        self.finish(
            definition.id,
            execution_id,
            run_started,
            RunStatus::Completed,
            context.snapshot(),
            log,
            None,
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Internal: execute a single step with retry logic.
    //
    // Appends one log entry per attempt. Only `StepError::Retryable` is
    // retried; exhaustion surfaces as the last retryable error.
    // -----------------------------------------------------------------------
    #[allow(clippy::too_many_arguments)]
    async fn execute_with_retry(
        &self,
        execution_id: Uuid,
        definition: &WorkflowDefinition,
        step: &Step,
        executor: Arc<dyn StepExecutor>,
        context: &ExecutionContext,
        log: &mut Vec<LogEntry>,
    ) -> Result<StepOutput, StepFailure> {
        let mut attempt = 1u32;

        loop {
            let started_at = Utc::now();
            let ctx = StepContext {
                workflow_id: definition.id,
                execution_id,
                step_id: step.id.clone(),
                data: context.snapshot(),
                connections: step.connections.clone(),
            };

            let result = executor.execute(&step.config, &ctx).await;
            let finished_at = Utc::now();

            match result {
                Ok(output) => {
                    log.push(LogEntry {
                        step_id: step.id.clone(),
                        kind: step.kind.clone(),
                        attempt,
                        started_at,
                        finished_at,
                        outcome: StepStatus::Succeeded,
                        error: None,
                    });
                    return Ok(output);
                }
                Err(step_error) => {
                    log.push(LogEntry {
                        step_id: step.id.clone(),
                        kind: step.kind.clone(),
                        attempt,
                        started_at,
                        finished_at,
                        outcome: StepStatus::Failed,
                        error: Some(step_error.to_string()),
                    });

                    match step_error {
                        StepError::Retryable(msg) => {
                            if attempt > self.policy.max_retries {
                                return Err(StepFailure::Exhausted(msg));
                            }
                            let delay = self.policy.retry_base_delay
                                * 2u32.pow(attempt.saturating_sub(1));
                            warn!(
                                step_id = %step.id,
                                attempt,
                                max_retries = self.policy.max_retries,
                                ?delay,
                                error = %msg,
                                "retryable step error, backing off"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        other => return Err(StepFailure::Error(other)),
                    }
                }
            }
        }
    }

    fn failure_action(&self, failure: &StepFailure) -> FailureAction {
        match failure {
            StepFailure::Error(StepError::Transport(_)) => self.policy.on_transport_error,
            StepFailure::Error(StepError::AgentNotFound(_)) => self.policy.on_agent_not_found,
            _ => FailureAction::Abort,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        definition_id: Uuid,
        execution_id: Uuid,
        run_started: chrono::DateTime<Utc>,
        status: RunStatus,
        context: Value,
        log: Vec<LogEntry>,
        error: Option<String>,
    ) -> RunResult {
        let steps_executed = {
            let mut ids: Vec<&str> = log.iter().map(|e| e.step_id.as_str()).collect();
            ids.dedup();
            ids.len()
        };
        self.sink
            .record(RunEvent {
                definition_id,
                execution_id,
                status,
                steps_executed,
                duration_ms: (Utc::now() - run_started).num_milliseconds(),
            })
            .await;

        RunResult {
            execution_id,
            status,
            context,
            log,
            error,
        }
    }
}

/// What a step ultimately failed with, after retries.
#[derive(Debug)]
enum StepFailure {
    /// A non-retryable step error.
    Error(StepError),
    /// Retries ran out; carries the last retryable message.
    Exhausted(String),
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(e) => write!(f, "{e}"),
            Self::Exhausted(msg) => write!(f, "retry limit exceeded: {msg}"),
        }
    }
}

fn fatal_cause(step_id: &str, failure: StepFailure) -> EngineError {
    match failure {
        StepFailure::Exhausted(message) => EngineError::RetryExhausted {
            step_id: step_id.to_owned(),
            message,
        },
        StepFailure::Error(e) => EngineError::StepFatal {
            step_id: step_id.to_owned(),
            message: e.to_string(),
        },
    }
}

/// The next step in declared order, or `None` for the last step.
fn declared_next(definition: &WorkflowDefinition, step: &Step) -> Option<String> {
    let index = definition.step_index(&step.id)?;
    definition.steps.get(index + 1).map(|s| s.id.clone())
}
