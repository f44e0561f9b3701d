//! # stitch-service
//!
//! Use-case services for Stitch. Each service takes its storage providers
//! and limits as constructor arguments; the HTTP layer only adapts
//! requests and responses.

pub mod file;
pub mod folder;

pub use file::download::{DownloadOutcome, DownloadResult, DownloadService, StoredFileInfo};
pub use file::upload::{UploadService, VerifyResult};
pub use folder::upload::{FolderFile, FolderListing, FolderUploadResult, FolderUploadService, UploadedEntry};
