//! `agent` step — resolves an agent descriptor and synthesizes its result.
//!
//! Actual model invocation belongs to an external collaborator; this
//! executor owns the lookup and the shape of the result object.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{StepContext, StepError, StepExecutor, StepOutput};

/// Descriptor of a configured agent, as stored by the authoring surface.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,
    pub name: String,
    pub model: String,
    pub system_prompt: String,
}

/// Lookup capability for agent descriptors.
///
/// Injected at registry construction so tests and hosts can supply their
/// own directory (database-backed, remote, or in-memory).
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn lookup(&self, agent_id: &str) -> Option<AgentDescriptor>;
}

/// Directory backed by a plain map; the default for tests and the CLI.
#[derive(Default)]
pub struct InMemoryAgentDirectory {
    agents: HashMap<String, AgentDescriptor>,
}

impl InMemoryAgentDirectory {
    pub fn new(agents: impl IntoIterator<Item = AgentDescriptor>) -> Self {
        Self {
            agents: agents.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }
}

#[async_trait]
impl AgentDirectory for InMemoryAgentDirectory {
    async fn lookup(&self, agent_id: &str) -> Option<AgentDescriptor> {
        self.agents.get(agent_id).cloned()
    }
}

#[derive(Deserialize)]
struct AgentConfig {
    #[serde(alias = "agentId")]
    agent_id: String,
}

/// Executor for `kind = "agent"`.
pub struct AgentExecutor {
    directory: Arc<dyn AgentDirectory>,
}

impl AgentExecutor {
    pub fn new(directory: Arc<dyn AgentDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl StepExecutor for AgentExecutor {
    async fn execute(&self, config: &Value, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let config: AgentConfig = serde_json::from_value(config.clone())
            .map_err(|e| StepError::Fatal(format!("invalid agent config: {e}")))?;

        let agent = self
            .directory
            .lookup(&config.agent_id)
            .await
            .ok_or_else(|| StepError::AgentNotFound(config.agent_id.clone()))?;

        debug!(step_id = %ctx.step_id, agent = %agent.name, "agent step resolved");

        Ok(StepOutput::value(json!({
            "agentId": agent.id,
            "agentName": agent.name,
            "model": agent.model,
            "response": format!("Agent '{}' processed step '{}'", agent.name, ctx.step_id),
        })))
    }
}
