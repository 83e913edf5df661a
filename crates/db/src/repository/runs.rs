//! Run record operations.
//!
//! A run row is created in `running` status when the execution task is
//! spawned, and finalised exactly once with the engine's structured result.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::RunRow, DbError};

/// Create a new run record in `running` status.
pub async fn create_run(
    pool: &PgPool,
    id: Uuid,
    workflow_id: Uuid,
    input: serde_json::Value,
) -> Result<RunRow, DbError> {
    let row = sqlx::query_as::<_, RunRow>(
        r#"
        INSERT INTO workflow_runs (id, workflow_id, status, input, started_at)
        VALUES ($1, $2, 'running', $3, $4)
        RETURNING id, workflow_id, status, input, context, log, error, started_at, finished_at
        "#,
    )
    .bind(id)
    .bind(workflow_id)
    .bind(input)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Finalise a run with its terminal status, context snapshot, and log.
pub async fn finish_run(
    pool: &PgPool,
    id: Uuid,
    status: &str,
    context: serde_json::Value,
    log: serde_json::Value,
    error: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE workflow_runs
        SET status = $1, context = $2, log = $3, error = $4, finished_at = $5
        WHERE id = $6
        "#,
    )
    .bind(status)
    .bind(context)
    .bind(log)
    .bind(error)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Fetch a single run by its primary key.
pub async fn get_run(pool: &PgPool, id: Uuid) -> Result<RunRow, DbError> {
    let row = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, workflow_id, status, input, context, log, error, started_at, finished_at
        FROM workflow_runs WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Runs for one workflow, newest first.
pub async fn list_runs(pool: &PgPool, workflow_id: Uuid) -> Result<Vec<RunRow>, DbError> {
    let rows = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, workflow_id, status, input, context, log, error, started_at, finished_at
        FROM workflow_runs WHERE workflow_id = $1
        ORDER BY started_at DESC
        "#,
    )
    .bind(workflow_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
