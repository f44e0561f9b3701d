//! Chunked upload and download services.

pub mod download;
pub mod upload;
