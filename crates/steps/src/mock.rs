//! `MockExecutor` — a test double for `StepExecutor`.
//!
//! Used by unit tests in this crate and by the engine's run-loop tests
//! wherever a real executor is unavailable or irrelevant.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::{StepContext, StepError, StepExecutor, StepOutput};

/// Behaviour injected into `MockExecutor` at construction time.
pub enum MockBehaviour {
    /// Succeed with a specific JSON value.
    ReturnValue(Value),
    /// Succeed and redirect control to the given step id.
    Branch { value: Value, next: String },
    /// Fail with a `Retryable` error.
    FailRetryable(String),
    /// Fail with a `Fatal` error.
    FailFatal(String),
    /// Fail with a `Transport` error.
    FailTransport(String),
    /// Fail retryably for the first `failures` calls, then succeed.
    SucceedAfter { failures: usize, value: Value },
}

/// A mock executor that records every call and returns a programmed result.
pub struct MockExecutor {
    /// Label used in test assertions.
    pub name: String,
    /// What the executor does when `execute` is called.
    pub behaviour: MockBehaviour,
    /// Every context snapshot seen, in call order.
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl MockExecutor {
    fn with(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::with(name, MockBehaviour::ReturnValue(value))
    }

    /// A mock that succeeds and redirects control to `next`.
    pub fn branching(name: impl Into<String>, value: Value, next: impl Into<String>) -> Self {
        Self::with(
            name,
            MockBehaviour::Branch {
                value,
                next: next.into(),
            },
        )
    }

    /// A mock that always fails with a `Fatal` error.
    pub fn failing_fatal(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with(name, MockBehaviour::FailFatal(msg.into()))
    }

    /// A mock that always fails with a `Retryable` error.
    pub fn failing_retryable(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with(name, MockBehaviour::FailRetryable(msg.into()))
    }

    /// A mock that always fails with a `Transport` error.
    pub fn failing_transport(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with(name, MockBehaviour::FailTransport(msg.into()))
    }

    /// A mock that fails retryably `failures` times, then succeeds.
    pub fn flaky(name: impl Into<String>, failures: usize, value: Value) -> Self {
        Self::with(name, MockBehaviour::SucceedAfter { failures, value })
    }

    /// Number of times this executor has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl StepExecutor for MockExecutor {
    async fn execute(&self, _config: &Value, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(ctx.data.clone());
            calls.len()
        };

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => Ok(StepOutput::value(v.clone())),
            MockBehaviour::Branch { value, next } => {
                Ok(StepOutput::branch(value.clone(), next.clone()))
            }
            MockBehaviour::FailRetryable(msg) => Err(StepError::Retryable(msg.clone())),
            MockBehaviour::FailFatal(msg) => Err(StepError::Fatal(msg.clone())),
            MockBehaviour::FailTransport(msg) => Err(StepError::Transport(msg.clone())),
            MockBehaviour::SucceedAfter { failures, value } => {
                if call_index <= *failures {
                    Err(StepError::Retryable(format!(
                        "{} transient failure {call_index}",
                        self.name
                    )))
                } else {
                    Ok(StepOutput::value(value.clone()))
                }
            }
        }
    }
}
