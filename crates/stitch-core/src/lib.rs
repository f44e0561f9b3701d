//! # stitch-core
//!
//! Core crate for Stitch. Contains the storage provider trait,
//! configuration schemas, domain types for chunked uploads, folder trees
//! and byte ranges, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Stitch crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
