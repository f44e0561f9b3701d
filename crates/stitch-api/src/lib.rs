//! # stitch-api
//!
//! HTTP API layer for Stitch built on Axum.
//!
//! Exposes the chunk upload, verify, merge, folder upload and download
//! endpoints, together with CORS and request logging middleware, the
//! response envelope and the error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
