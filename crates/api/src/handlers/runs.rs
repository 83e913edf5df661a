//! Run submission, polling, and cancellation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;
use uuid::Uuid;

use db::repository::{runs as run_repo, workflows as wf_repo};
use engine::{CancelHandle, WorkflowDefinition};

use crate::{ApiError, AppState};

#[derive(Deserialize)]
pub struct ExecuteWorkflowDto {
    #[serde(default)]
    pub input: Value,
}

/// Start a run. Returns 202 with the execution id; the run proceeds on a
/// spawned task and is observed via `GET /api/v1/runs/{id}`.
pub async fn execute(
    Path(workflow_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ExecuteWorkflowDto>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let row = wf_repo::get_workflow(&state.pool, workflow_id).await?;
    let definition: WorkflowDefinition = serde_json::from_value(row.definition)
        .map_err(|e| ApiError::CorruptDefinition(e.to_string()))?;

    let execution_id = Uuid::new_v4();
    run_repo::create_run(&state.pool, execution_id, workflow_id, payload.input.clone()).await?;

    let cancel = CancelHandle::new();
    state.tracker.insert(execution_id, cancel.clone());

    let engine = state.engine.clone();
    let pool = state.pool.clone();
    let tracker = state.tracker.clone();
    let input = payload.input;

    tokio::spawn(async move {
        let result = engine.execute(execution_id, &definition, input, cancel).await;

        let log = serde_json::to_value(&result.log).unwrap_or(Value::Null);
        if let Err(e) = run_repo::finish_run(
            &pool,
            execution_id,
            &result.status.to_string(),
            result.context,
            log,
            result.error.as_deref(),
        )
        .await
        {
            error!(%execution_id, error = %e, "failed to persist run result");
        }
        tracker.remove(execution_id);
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "execution_id": execution_id, "status": "running" })),
    ))
}

pub async fn get_one(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<db::models::RunRow>, ApiError> {
    Ok(Json(run_repo::get_run(&state.pool, id).await?))
}

/// Request cancellation at the run's next step boundary.
pub async fn cancel(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if state.tracker.cancel(id) {
        return Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "execution_id": id, "status": "cancelling" })),
        ));
    }

    // Not in flight here: either already finished (report its state) or
    // unknown.
    let row = run_repo::get_run(&state.pool, id).await?;
    Ok((
        StatusCode::CONFLICT,
        Json(json!({ "execution_id": id, "status": row.status })),
    ))
}
