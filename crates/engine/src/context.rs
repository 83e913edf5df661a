//! Per-run state: the accumulating execution context, the append-only log,
//! and the structured result handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// Mutable accumulator of intermediate results for one run.
///
/// Exclusively owned by its run — a fresh context is built per execution,
/// seeded only with caller input, so concurrent runs of the same definition
/// can never observe each other's data.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Accumulated data. Caller input sits at the top level; each step's
    /// output lives under its namespaced `step_<id>` key.
    pub data: Map<String, Value>,
    /// ID of the step about to run; `None` once the run is finished.
    pub cursor: Option<String>,
}

impl ExecutionContext {
    /// Build a context seeded from caller input.
    ///
    /// Object input merges at the top level (so conditions can reference
    /// its keys directly); anything else lands under `"input"`.
    pub fn seeded(input: Value) -> Self {
        let data = match input {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("input".to_string(), other);
                map
            }
        };
        Self { data, cursor: None }
    }

    /// Record a step's output under its namespace. Keys outside
    /// `step_<id>` are never touched.
    pub fn record_step_output(&mut self, step_id: &str, output: Value) {
        self.data.insert(Self::namespace(step_id), output);
    }

    /// The namespaced context key for a step.
    pub fn namespace(step_id: &str) -> String {
        format!("step_{step_id}")
    }

    /// Snapshot of the accumulated data as a JSON object.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

// ---------------------------------------------------------------------------
// Execution log
// ---------------------------------------------------------------------------

/// Outcome of a single step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
}

/// One entry per step attempt, including retries — each retry appends a
/// separate entry with an incremented `attempt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub step_id: String,
    pub kind: String,
    /// 1-based attempt counter.
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// RunResult
// ---------------------------------------------------------------------------

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Aborted,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "aborted" => Ok(Self::Aborted),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

/// What the engine hands back for every run — always structured, never a
/// bare fault. `status` is the single source of truth for callers; detailed
/// causes live in the log, and partial context/log survive failures so a
/// caller can diagnose or resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub execution_id: Uuid,
    pub status: RunStatus,
    /// Final accumulated context data.
    pub context: Value,
    /// Full execution log, up to the point the run ended.
    pub log: Vec<LogEntry>,
    /// Headline cause when the run did not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
