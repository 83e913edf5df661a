//! `api` crate — HTTP REST surface over the engine and the db layer.
//!
//! Routes:
//!   POST   /api/v1/workflows
//!   GET    /api/v1/workflows
//!   GET    /api/v1/workflows/{id}
//!   DELETE /api/v1/workflows/{id}
//!   PUT    /api/v1/workflows/{id}/status
//!   POST   /api/v1/workflows/{id}/execute
//!   GET    /api/v1/runs/{id}
//!   POST   /api/v1/runs/{id}/cancel

pub mod error;
pub mod handlers;
pub mod tracker;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use engine::Engine;

pub use error::ApiError;
pub use tracker::RunTracker;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: db::DbPool,
    pub engine: Arc<Engine>,
    pub tracker: RunTracker,
}

impl AppState {
    pub fn new(pool: db::DbPool, engine: Arc<Engine>) -> Self {
        Self {
            pool,
            engine,
            tracker: RunTracker::new(),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/workflows",
            get(handlers::workflows::list).post(handlers::workflows::create),
        )
        .route(
            "/api/v1/workflows/:id",
            get(handlers::workflows::get_one).delete(handlers::workflows::delete),
        )
        .route(
            "/api/v1/workflows/:id/status",
            put(handlers::workflows::set_status),
        )
        .route(
            "/api/v1/workflows/:id/execute",
            post(handlers::runs::execute),
        )
        .route("/api/v1/runs/:id", get(handlers::runs::get_one))
        .route("/api/v1/runs/:id/cancel", post(handlers::runs::cancel))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("API listening on {bind}");
    axum::serve(listener, router(state)).await
}
