use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use dorsal::Allocator;
use serde::Serialize;

use crate::{error::ApiError, store::AnyStore};

/// Shared state: one allocator for every partition.
pub struct AppState {
    allocator: Allocator<AnyStore>,
}

impl AppState {
    pub const fn new(allocator: Allocator<AnyStore>) -> Self {
        Self { allocator }
    }
}

#[derive(Debug, Serialize)]
pub struct Allocated {
    pub partition_key: String,
    pub value: u64,
}

#[derive(Debug, Serialize)]
pub struct Current {
    pub partition_key: String,
    pub last_issued: u64,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/sequences/{partition_key}", get(current))
        .route("/sequences/{partition_key}/next", post(allocate))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn allocate(
    State(state): State<Arc<AppState>>,
    Path(partition_key): Path<String>,
) -> Result<Json<Allocated>, ApiError> {
    let value = state.allocator.allocate(&partition_key).await?;
    tracing::debug!(%partition_key, value, "allocated");
    Ok(Json(Allocated {
        partition_key,
        value,
    }))
}

async fn current(
    State(state): State<Arc<AppState>>,
    Path(partition_key): Path<String>,
) -> Result<Json<Current>, ApiError> {
    let last_issued = state.allocator.current(&partition_key).await?;
    Ok(Json(Current {
        partition_key,
        last_issued,
    }))
}
