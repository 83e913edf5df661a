//! `email` step — records a structured "would send" side effect.
//!
//! Delivery belongs to an external dispatch service; locally this step
//! always succeeds and its output carries everything the dispatcher needs.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{StepContext, StepError, StepExecutor, StepOutput};

#[derive(Deserialize)]
struct EmailConfig {
    #[serde(default)]
    to: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

/// Executor for `kind = "email"`.
pub struct EmailExecutor;

#[async_trait]
impl StepExecutor for EmailExecutor {
    async fn execute(&self, config: &Value, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let config: EmailConfig = serde_json::from_value(config.clone()).unwrap_or(EmailConfig {
            to: String::new(),
            subject: String::new(),
            body: String::new(),
        });

        info!(
            step_id = %ctx.step_id,
            to = %config.to,
            subject = %config.subject,
            "email step queued for external dispatch"
        );

        Ok(StepOutput::value(json!({
            "to": config.to,
            "subject": config.subject,
            "body": config.body,
            "dispatched": false,
        })))
    }
}
