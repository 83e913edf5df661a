//! Executor registry — maps a step's `kind` string to its handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::builtin::agent::{AgentExecutor, AgentDirectory};
use crate::builtin::condition::ConditionExecutor;
use crate::builtin::delay::DelayExecutor;
use crate::builtin::email::EmailExecutor;
use crate::builtin::webhook::WebhookExecutor;
use crate::StepExecutor;

/// Maps `kind` strings to shared [`StepExecutor`] implementations.
///
/// Registration is last-write-wins: re-registering a kind replaces the
/// previous handler, which is how tests substitute doubles for built-ins.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn StepExecutor>>,
}

impl ExecutorRegistry {
    /// An empty registry. Unknown kinds fail the run, so callers normally
    /// start from [`ExecutorRegistry::with_builtins`] instead.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the five built-in step kinds.
    ///
    /// `webhook_timeout` bounds every outbound webhook call (30s is the
    /// recommended default).
    pub fn with_builtins(agents: Arc<dyn AgentDirectory>, webhook_timeout: Duration) -> Self {
        let mut registry = Self::new();
        registry.register("agent", Arc::new(AgentExecutor::new(agents)));
        registry.register("condition", Arc::new(ConditionExecutor));
        registry.register("delay", Arc::new(DelayExecutor));
        registry.register("webhook", Arc::new(WebhookExecutor::new(webhook_timeout)));
        registry.register("email", Arc::new(EmailExecutor));
        registry
    }

    /// Associate `kind` with a handler, replacing any existing one.
    pub fn register(&mut self, kind: impl Into<String>, executor: Arc<dyn StepExecutor>) {
        self.executors.insert(kind.into(), executor);
    }

    /// Resolve the handler for `kind`, or `None` if nothing is registered.
    pub fn resolve(&self, kind: &str) -> Option<Arc<dyn StepExecutor>> {
        self.executors.get(kind).cloned()
    }

    /// The registered kinds, for diagnostics.
    pub fn kinds(&self) -> Vec<&str> {
        self.executors.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use serde_json::json;

    #[test]
    fn resolve_unknown_kind_returns_none() {
        let registry = ExecutorRegistry::new();
        assert!(registry.resolve("agent").is_none());
    }

    #[test]
    fn register_is_last_write_wins() {
        let mut registry = ExecutorRegistry::new();
        let first = Arc::new(MockExecutor::returning("first", json!({ "v": 1 })));
        let second = Arc::new(MockExecutor::returning("second", json!({ "v": 2 })));

        registry.register("custom", first.clone());
        registry.register("custom", second.clone());

        // The replacement is the live handler; resolving doesn't touch it.
        assert!(registry.resolve("custom").is_some());
        assert_eq!(first.call_count(), 0);
        assert_eq!(second.call_count(), 0);
    }

    #[test]
    fn builtins_cover_the_five_kinds() {
        let agents = Arc::new(crate::InMemoryAgentDirectory::default());
        let registry = ExecutorRegistry::with_builtins(agents, Duration::from_secs(30));
        for kind in ["agent", "condition", "delay", "webhook", "email"] {
            assert!(registry.resolve(kind).is_some(), "missing builtin '{kind}'");
        }
    }
}
