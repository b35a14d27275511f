//! HTTP API

pub mod index;
pub mod response;

use adn_ingest::IndexPipeline;
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: IndexPipeline,
    /// Where uploads are spooled while being indexed
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(pipeline: IndexPipeline, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            upload_dir: upload_dir.into(),
        }
    }
}

/// Build the application router with all routes and middleware
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/index", post(index::index_file))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::tracing_layer())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "sink": state.pipeline.sink_name(),
        "index": state.pipeline.config().collection,
    }))
}
