//! Health check handler.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let storage: BTreeMap<String, bool> = state
        .storage
        .health_check_all()
        .await
        .into_iter()
        .map(|(area, healthy)| (area.to_string(), healthy))
        .collect();
    let status = if storage.values().all(|healthy| *healthy) {
        "ok"
    } else {
        "degraded"
    };

    Json(ApiResponse::ok(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage,
    }))
}
