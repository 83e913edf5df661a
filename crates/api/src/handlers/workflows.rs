//! Workflow definition CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use db::repository::workflows as wf_repo;
use engine::{validate, WorkflowDefinition, WorkflowStatus};

use crate::{ApiError, AppState};

#[derive(Deserialize)]
pub struct CreateWorkflowDto {
    pub definition: serde_json::Value,
}

#[derive(Deserialize)]
pub struct SetStatusDto {
    pub status: WorkflowStatus,
}

pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<Vec<db::models::WorkflowRow>>, ApiError> {
    Ok(Json(wf_repo::list_workflows(&state.pool).await?))
}

pub async fn get_one(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<db::models::WorkflowRow>, ApiError> {
    Ok(Json(wf_repo::get_workflow(&state.pool, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkflowDto>,
) -> Result<(StatusCode, Json<db::models::WorkflowRow>), ApiError> {
    // Reject structurally broken definitions at the door; the engine would
    // refuse them anyway, but authoring surfaces want the error up front.
    let definition: WorkflowDefinition = serde_json::from_value(payload.definition.clone())
        .map_err(|e| ApiError::InvalidDefinition(e.to_string()))?;
    validate(&definition).map_err(|e| ApiError::InvalidDefinition(e.to_string()))?;

    let row = wf_repo::create_workflow(
        &state.pool,
        definition.id,
        &definition.name,
        &definition.status.to_string(),
        payload.definition,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn set_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<SetStatusDto>,
) -> Result<StatusCode, ApiError> {
    wf_repo::update_workflow_status(&state.pool, id, &payload.status.to_string()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    wf_repo::delete_workflow(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
