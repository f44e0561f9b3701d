//! Route definitions for the Stitch HTTP API.
//!
//! Routes are organized by domain. The router receives `AppState` and passes
//! it to all handlers via Axum's `State` extractor.

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = usize::try_from(state.config.server.max_body_bytes).unwrap_or(usize::MAX);
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .merge(upload_routes())
        .merge(folder_routes())
        .merge(download_routes())
        .merge(health_routes())
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Chunk upload, resume verification and merge
fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(handlers::upload::upload_chunk))
        .route("/verify", post(handlers::upload::verify))
        .route("/merge", post(handlers::upload::merge))
}

/// Folder upload and read-back
fn folder_routes() -> Router<AppState> {
    Router::new()
        .route("/folder-upload", post(handlers::folder::upload_folder))
        .route(
            "/folder-upload/{folder_name}/structure",
            get(handlers::folder::folder_structure),
        )
        .route(
            "/folder-upload/{folder_name}/exists",
            get(handlers::folder::folder_exists),
        )
}

/// Stored file listing and download
fn download_routes() -> Router<AppState> {
    Router::new()
        .route("/download/list", get(handlers::download::list_files))
        .route("/download/{filename}", get(handlers::download::download_file))
}

/// Liveness
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
