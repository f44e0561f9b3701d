//! Request DTOs.

use serde::Deserialize;

use stitch_core::result::AppResult;
use stitch_core::types::FileIdentity;

/// Body of `POST /verify`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Content hash of the whole file.
    pub file_hash: String,
    /// Client file name.
    pub file_name: String,
}

impl VerifyRequest {
    /// Validated identity of the file.
    pub fn identity(&self) -> AppResult<FileIdentity> {
        FileIdentity::new(&self.file_hash, &self.file_name)
    }
}

/// Body of `POST /merge`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub file_hash: String,
    pub file_name: String,
    /// Size the client used when splitting the file.
    pub chunk_size: u64,
    /// Total size of the original file, when the client knows it.
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl MergeRequest {
    /// Validated identity of the file.
    pub fn identity(&self) -> AppResult<FileIdentity> {
        FileIdentity::new(&self.file_hash, &self.file_name)
    }
}
