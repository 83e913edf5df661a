//! Engine-level tests for the run loop.
//!
//! These use `MockExecutor` (and a couple of purpose-built doubles) so no
//! network, database, or real step side effects are involved.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use steps::mock::MockExecutor;
use steps::{ExecutorRegistry, StepContext, StepError, StepExecutor, StepOutput};

use crate::context::{RunStatus, StepStatus};
use crate::models::{Step, WorkflowDefinition, WorkflowStatus};
use crate::runner::{CancelHandle, Engine, FailureAction, RunPolicy};
use crate::sink::{RunEvent, RunSink};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn step(id: &str, kind: &str) -> Step {
    Step {
        id: id.to_string(),
        kind: kind.to_string(),
        config: Value::Null,
        connections: vec![],
    }
}

/// ids[0] → ids[1] → … in declared order, all of kind "mock".
fn linear_definition(ids: &[&str]) -> WorkflowDefinition {
    WorkflowDefinition::new("test-linear", ids.iter().map(|id| step(id, "mock")).collect())
}

fn mock_registry(executor: MockExecutor) -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    registry.register("mock", Arc::new(executor));
    registry
}

/// Sink that collects every event it receives.
#[derive(Default)]
struct CollectingSink {
    events: std::sync::Mutex<Vec<RunEvent>>,
}

#[async_trait]
impl RunSink for CollectingSink {
    async fn record(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Executor that requests cancellation of its own run, then succeeds.
struct Tripwire {
    handle: CancelHandle,
}

#[async_trait]
impl StepExecutor for Tripwire {
    async fn execute(&self, _config: &Value, _ctx: &StepContext) -> Result<StepOutput, StepError> {
        self.handle.cancel();
        Ok(StepOutput::value(json!({ "cancelRequested": true })))
    }
}

/// Executor that reports which caller input it observed.
struct Echo;

#[async_trait]
impl StepExecutor for Echo {
    async fn execute(&self, _config: &Value, ctx: &StepContext) -> Result<StepOutput, StepError> {
        // Yield so concurrent runs interleave.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let who = ctx
            .lookup("who")
            .cloned()
            .unwrap_or(Value::Null);
        Ok(StepOutput::value(json!({ "saw": who })))
    }
}

// ---------------------------------------------------------------------------
// Happy path & log shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn all_steps_succeed_log_has_one_entry_per_step() {
    let definition = linear_definition(&["a", "b", "c"]);
    let engine = Engine::new(mock_registry(MockExecutor::returning("ok", json!({ "ok": true }))));

    let result = engine.run(&definition, json!({ "seed": 1 })).await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.log.len(), 3);
    assert!(result.log.iter().all(|e| e.outcome == StepStatus::Succeeded));
    assert_eq!(
        result.log.iter().map(|e| e.step_id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );

    // Outputs are namespaced; the caller seed is untouched.
    assert_eq!(result.context["seed"], 1);
    assert_eq!(result.context["step_a"]["ok"], true);
    assert_eq!(result.context["step_c"]["ok"], true);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn non_active_definition_fails_with_empty_log() {
    for status in [WorkflowStatus::Draft, WorkflowStatus::Inactive] {
        let mut definition = linear_definition(&["a"]);
        definition.status = status;
        let engine =
            Engine::new(mock_registry(MockExecutor::returning("ok", json!({}))));

        let result = engine.run(&definition, json!({})).await;

        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.log.is_empty());
        assert!(result.error.as_deref().unwrap().contains("not active"));
    }
}

#[tokio::test]
async fn structurally_invalid_definition_fails_before_any_step() {
    let definition = WorkflowDefinition::new("empty", vec![]);
    let mock = MockExecutor::returning("ok", json!({}));
    let calls = mock.calls.clone();
    let engine = Engine::new(mock_registry(mock));

    let result = engine.run(&definition, json!({})).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.log.is_empty());
    assert_eq!(calls.lock().unwrap().len(), 0);
}

#[tokio::test]
async fn same_input_twice_gives_the_same_outcome_sequence() {
    let definition = linear_definition(&["a", "b", "c", "d"]);
    let engine = Engine::new(mock_registry(MockExecutor::returning("ok", json!({ "ok": true }))));

    let first = engine.run(&definition, json!({ "x": 1 })).await;
    let second = engine.run(&definition, json!({ "x": 1 })).await;

    assert_eq!(first.log.len(), second.log.len());
    let outcomes = |r: &crate::context::RunResult| {
        r.log
            .iter()
            .map(|e| (e.step_id.clone(), e.outcome))
            .collect::<Vec<_>>()
    };
    assert_eq!(outcomes(&first), outcomes(&second));
    assert_ne!(first.execution_id, second.execution_id);
}

// ---------------------------------------------------------------------------
// Branching & control flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn condition_true_branch_is_followed() {
    // check → (yes | no); yes and no are both terminal.
    let mut check = step("check", "condition");
    check.config = json!({ "field": "x", "operator": "greater_than", "value": 5 });
    check.connections = vec!["yes".into(), "no".into()];

    // Distinct kinds so each branch target is observable.
    let definition = WorkflowDefinition::new(
        "branching",
        vec![check, step("yes", "mock-yes"), step("no", "mock-no")],
    );

    let yes = Arc::new(MockExecutor::returning("yes", json!({ "branch": "true" })));
    let no = Arc::new(MockExecutor::returning("no", json!({ "branch": "false" })));
    let mut registry = ExecutorRegistry::with_builtins(
        Arc::new(steps::InMemoryAgentDirectory::default()),
        std::time::Duration::from_secs(1),
    );
    registry.register("mock-yes", yes.clone());
    registry.register("mock-no", no.clone());

    let engine = Engine::new(registry);
    let result = engine.run(&definition, json!({ "x": 10 })).await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.context["step_check"]["conditionMet"], true);
    assert_eq!(yes.call_count(), 1);
    assert_eq!(no.call_count(), 0);
    // "yes" is terminal: it has no connections and sits mid-list, but the
    // branch jumped past "no", so the run ends after two log entries.
    assert_eq!(result.log.len(), 2);
}

#[tokio::test]
async fn explicit_connection_overrides_declared_order() {
    // a jumps straight to c; b never runs.
    let mut a = step("a", "mock");
    a.connections = vec!["c".into()];
    let definition = WorkflowDefinition::new("jump", vec![a, step("b", "mock"), step("c", "mock")]);

    let mock = MockExecutor::returning("ok", json!({}));
    let engine = Engine::new(mock_registry(mock));

    let result = engine.run(&definition, json!({})).await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(
        result.log.iter().map(|e| e.step_id.as_str()).collect::<Vec<_>>(),
        vec!["a", "c"]
    );
}

#[tokio::test]
async fn executor_chosen_branch_wins_over_connections() {
    let mut a = step("a", "brancher");
    a.connections = vec!["b".into()];
    let definition =
        WorkflowDefinition::new("redirect", vec![a, step("b", "mock"), step("c", "mock")]);

    let mut registry = mock_registry(MockExecutor::returning("ok", json!({})));
    registry.register(
        "brancher",
        Arc::new(MockExecutor::branching("brancher", json!({}), "c")),
    );

    let engine = Engine::new(registry);
    let result = engine.run(&definition, json!({})).await;

    assert_eq!(
        result.log.iter().map(|e| e.step_id.as_str()).collect::<Vec<_>>(),
        vec!["a", "c"]
    );
}

// ---------------------------------------------------------------------------
// Failure policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fatal_step_error_stops_the_run_with_partial_log() {
    let definition = WorkflowDefinition::new(
        "failing",
        vec![
            step("ok", "mock"),
            step("boom", "explosive"),
            step("never", "unreached"),
        ],
    );
    let ok = Arc::new(MockExecutor::returning("ok", json!({ "fine": true })));
    let never = Arc::new(MockExecutor::returning("never", json!({})));

    let mut registry = ExecutorRegistry::new();
    registry.register("mock", ok.clone());
    registry.register(
        "explosive",
        Arc::new(MockExecutor::failing_fatal("boom", "config is nonsense")),
    );
    registry.register("unreached", never.clone());

    let engine = Engine::new(registry);
    let result = engine.run(&definition, json!({})).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.log.len(), 2);
    assert_eq!(result.log[1].outcome, StepStatus::Failed);
    assert!(result.error.as_deref().unwrap().contains("boom"));
    assert_eq!(never.call_count(), 0);
    // Partial context survives: the first step's output is still there.
    assert_eq!(result.context["step_ok"]["fine"], true);
}

#[tokio::test]
async fn transport_failure_continues_by_default_and_records_webhook_error() {
    let mut definition = linear_definition(&["notify", "after"]);
    definition.steps[0].kind = "webhook".into();

    let mut registry = mock_registry(MockExecutor::returning("ok", json!({})));
    registry.register(
        "webhook",
        Arc::new(MockExecutor::failing_transport("hook", "connection refused")),
    );

    let engine = Engine::new(registry);
    let result = engine.run(&definition, json!({})).await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.log.len(), 2);
    assert_eq!(result.log[0].outcome, StepStatus::Failed);
    assert!(result.log[0].error.as_deref().unwrap().contains("connection refused"));
    assert_eq!(result.log[1].outcome, StepStatus::Succeeded);
    assert!(result.context["step_notify"]["webhookError"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn transport_failure_aborts_when_policy_says_so() {
    let mut definition = linear_definition(&["notify", "after"]);
    definition.steps[0].kind = "webhook".into();

    let mut registry = mock_registry(MockExecutor::returning("ok", json!({})));
    registry.register(
        "webhook",
        Arc::new(MockExecutor::failing_transport("hook", "timed out")),
    );

    let engine = Engine::new(registry).with_policy(RunPolicy {
        on_transport_error: FailureAction::Abort,
        ..RunPolicy::default()
    });
    let result = engine.run(&definition, json!({})).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.log.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn retryable_failures_append_one_log_entry_per_attempt() {
    let definition = linear_definition(&["flaky"]);
    let engine = Engine::new(mock_registry(MockExecutor::flaky(
        "flaky",
        2,
        json!({ "ok": true }),
    )));

    let result = engine.run(&definition, json!({})).await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.log.len(), 3);
    assert_eq!(
        result.log.iter().map(|e| e.attempt).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(result.log[0].outcome, StepStatus::Failed);
    assert_eq!(result.log[1].outcome, StepStatus::Failed);
    assert_eq!(result.log[2].outcome, StepStatus::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn retry_exhaustion_fails_the_run() {
    let definition = linear_definition(&["flaky", "never"]);
    let engine = Engine::new(mock_registry(MockExecutor::failing_retryable(
        "flaky",
        "still down",
    )))
    .with_policy(RunPolicy {
        max_retries: 2,
        ..RunPolicy::default()
    });

    let result = engine.run(&definition, json!({})).await;

    assert_eq!(result.status, RunStatus::Failed);
    // Initial attempt + two retries, all on the first step.
    assert_eq!(result.log.len(), 3);
    assert!(result.log.iter().all(|e| e.step_id == "flaky"));
    assert!(result.error.as_deref().unwrap().contains("retry limit"));
}

#[tokio::test]
async fn unknown_step_kind_fails_the_run() {
    let mut definition = linear_definition(&["a", "mystery"]);
    definition.steps[1].kind = "teleport".into();

    let engine = Engine::new(mock_registry(MockExecutor::returning("ok", json!({}))));
    let result = engine.run(&definition, json!({})).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.log.len(), 2);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("no executor registered for step kind 'teleport'"));
}

#[tokio::test]
async fn missing_agent_aborts_by_default() {
    let mut definition = linear_definition(&["ask"]);
    definition.steps[0].kind = "agent".into();
    definition.steps[0].config = json!({ "agent_id": "ghost" });

    let registry = ExecutorRegistry::with_builtins(
        Arc::new(steps::InMemoryAgentDirectory::default()),
        std::time::Duration::from_secs(1),
    );
    let engine = Engine::new(registry);
    let result = engine.run(&definition, json!({})).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.error.as_deref().unwrap().contains("ghost"));
}

// ---------------------------------------------------------------------------
// Cancellation & concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelling_after_step_two_of_five_aborts_with_two_log_entries() {
    let mut definition = linear_definition(&["s1", "s2", "s3", "s4", "s5"]);
    definition.steps[1].kind = "tripwire".into();

    let handle = CancelHandle::new();
    let mut registry = mock_registry(MockExecutor::returning("ok", json!({})));
    registry.register(
        "tripwire",
        Arc::new(Tripwire {
            handle: handle.clone(),
        }),
    );

    let engine = Engine::new(registry);
    let result = engine.run_cancellable(&definition, json!({}), handle).await;

    assert_eq!(result.status, RunStatus::Aborted);
    assert_eq!(result.log.len(), 2);
    assert_eq!(result.log[1].step_id, "s2");
    // The step that set the flag still completed; its output is retained.
    assert_eq!(result.context["step_s2"]["cancelRequested"], true);
}

#[tokio::test]
async fn concurrent_runs_never_observe_each_others_context() {
    let mut definition = linear_definition(&["observe"]);
    definition.steps[0].kind = "echo".into();

    let mut registry = ExecutorRegistry::new();
    registry.register("echo", Arc::new(Echo));
    let engine = Arc::new(Engine::new(registry));

    let (left, right) = tokio::join!(
        engine.run(&definition, json!({ "who": "left" })),
        engine.run(&definition, json!({ "who": "right" })),
    );

    assert_eq!(left.status, RunStatus::Completed);
    assert_eq!(right.status, RunStatus::Completed);
    assert_eq!(left.context["step_observe"]["saw"], "left");
    assert_eq!(right.context["step_observe"]["saw"], "right");
    assert!(left.context.get("step_observe").is_some());
    assert!(left.context["who"] == "left" && right.context["who"] == "right");
}

// ---------------------------------------------------------------------------
// Run sink
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_event_per_finished_run_reaches_the_sink() {
    let definition = linear_definition(&["a", "b"]);
    let sink = Arc::new(CollectingSink::default());
    let engine = Engine::new(mock_registry(MockExecutor::returning("ok", json!({}))))
        .with_sink(sink.clone());

    let result = engine.run(&definition, json!({})).await;

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].definition_id, definition.id);
    assert_eq!(events[0].execution_id, result.execution_id);
    assert_eq!(events[0].status, RunStatus::Completed);
    assert_eq!(events[0].steps_executed, 2);
}
