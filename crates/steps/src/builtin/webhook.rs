//! `webhook` step — posts the current context to an external URL.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::{StepContext, StepError, StepExecutor, StepOutput};

#[derive(Deserialize)]
struct WebhookConfig {
    url: String,
}

/// Executor for `kind = "webhook"`.
///
/// Sends the context snapshot as a JSON POST body. Every call is bounded
/// by the client timeout; connect failures, timeouts, and non-2xx statuses
/// all surface as [`StepError::Transport`], which the engine's policy maps
/// to continue-with-error by default.
pub struct WebhookExecutor {
    client: reqwest::Client,
}

impl WebhookExecutor {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl StepExecutor for WebhookExecutor {
    async fn execute(&self, config: &Value, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let config: WebhookConfig = serde_json::from_value(config.clone())
            .map_err(|e| StepError::Fatal(format!("invalid webhook config: {e}")))?;

        debug!(step_id = %ctx.step_id, url = %config.url, "webhook step dispatching");

        let response = self
            .client
            .post(&config.url)
            .json(&ctx.data)
            .send()
            .await
            .map_err(|e| StepError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StepError::Transport(format!(
                "webhook returned status {status}"
            )));
        }

        let body = response.json::<Value>().await.unwrap_or(Value::Null);

        Ok(StepOutput::value(json!({
            "url": config.url,
            "statusCode": status.as_u16(),
            "response": body,
        })))
    }
}
