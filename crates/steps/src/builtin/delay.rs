//! `delay` step — cooperative suspension for a configured duration.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::{StepContext, StepError, StepExecutor, StepOutput};

/// Executor for `kind = "delay"`.
///
/// Sleeps via the async timer so concurrent runs are never starved; a
/// missing, zero, or non-numeric `duration` is treated as zero.
pub struct DelayExecutor;

#[async_trait]
impl StepExecutor for DelayExecutor {
    async fn execute(&self, config: &Value, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let millis = config
            .get("duration")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        if millis > 0 {
            debug!(step_id = %ctx.step_id, millis, "delay step sleeping");
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }

        Ok(StepOutput::value(json!({ "delayedMs": millis })))
    }
}
