//! HTTP request handlers.

pub mod download;
pub mod folder;
pub mod health;
pub mod upload;
