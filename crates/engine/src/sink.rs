//! Run-event sink — the analytics collaborator contract.
//!
//! The engine emits exactly one event per finished run. Hosts inject their
//! own sink (database, message bus); the default just logs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::context::RunStatus;

/// Summary of one finished run.
#[derive(Debug, Clone)]
pub struct RunEvent {
    pub definition_id: Uuid,
    pub execution_id: Uuid,
    pub status: RunStatus,
    pub steps_executed: usize,
    pub duration_ms: i64,
}

/// Append-only sink for run events.
#[async_trait]
pub trait RunSink: Send + Sync {
    async fn record(&self, event: RunEvent);
}

/// Default sink: emits the event as a structured tracing record.
#[derive(Default)]
pub struct TracingSink;

#[async_trait]
impl RunSink for TracingSink {
    async fn record(&self, event: RunEvent) {
        tracing::info!(
            definition_id = %event.definition_id,
            execution_id = %event.execution_id,
            status = %event.status,
            steps_executed = event.steps_executed,
            duration_ms = event.duration_ms,
            "run finished"
        );
    }
}
