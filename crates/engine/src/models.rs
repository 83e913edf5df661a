//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like in
//! memory. They serialise to/from the JSONB `definition` column of the
//! `workflows` table and are read-only to the engine during execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// WorkflowStatus
// ---------------------------------------------------------------------------

/// Authoring lifecycle of a definition. Only `Active` may be run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Inactive,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown workflow status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A single unit of work in a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier within this workflow (referenced by connections).
    pub id: String,
    /// Maps to a registered `StepExecutor` implementation.
    /// Built-ins: `agent`, `condition`, `delay`, `webhook`, `email`.
    pub kind: String,
    /// Kind-specific configuration passed to the executor verbatim.
    #[serde(default)]
    pub config: Value,
    /// Explicit successor step ids. Empty means "next in declared order";
    /// condition steps read the first two as true/false branch targets.
    #[serde(default)]
    pub connections: Vec<String>,
}

// ---------------------------------------------------------------------------
// WorkflowDefinition
// ---------------------------------------------------------------------------

/// A complete workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: Uuid,
    pub name: String,
    pub status: WorkflowStatus,
    /// Declared order is execution order unless a step redirects control.
    pub steps: Vec<Step>,
    /// Trigger configuration. Owned by an external scheduler; the engine
    /// never interprets it.
    #[serde(default)]
    pub triggers: Value,
    pub created_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Convenience constructor; the definition starts out `Active` so it
    /// can be run immediately in tests and the CLI.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: WorkflowStatus::Active,
            steps,
            triggers: Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Find a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Index of a step in declared order.
    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }
}
