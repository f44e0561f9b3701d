//! Response DTOs.

use serde::{Deserialize, Serialize};

use stitch_storage::chunked::MergeOutcome;

/// Envelope code of a successful response.
pub const SUCCESS_CODE: i32 = 0;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Always `0`.
    pub code: i32,
    /// Human-readable message.
    pub msg: String,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response with the default message.
    pub fn ok(data: T) -> Self {
        Self::with_msg("success", data)
    }

    /// Creates a successful response with a custom message.
    pub fn with_msg(msg: impl Into<String>, data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            msg: msg.into(),
            data,
        }
    }
}

/// Echo of an accepted chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadChunkResponse {
    pub file_hash: String,
    pub chunk_hash: String,
    pub file_name: String,
    /// Bytes stored for this chunk.
    pub size: u64,
}

/// Result of a merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    /// Stored artifact name (`<hash><ext>`).
    pub file_name: String,
    /// Artifact size in bytes.
    pub size: u64,
    /// Number of chunks assembled (0 when the artifact already existed).
    pub chunks: usize,
    pub already_existed: bool,
}

impl From<MergeOutcome> for MergeResponse {
    fn from(outcome: MergeOutcome) -> Self {
        Self {
            file_name: outcome.artifact,
            size: outcome.size_bytes,
            chunks: outcome.chunks,
            already_existed: outcome.already_existed,
        }
    }
}

/// Payload answered for a download of a file that does not exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingFileResponse {
    /// Always `false`.
    pub exists: bool,
    pub requested_file: String,
    /// Files that can be downloaded instead.
    pub available: Vec<String>,
}

/// Answer of the folder existence check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderExistsResponse {
    pub folder_name: String,
    pub exists: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` when every storage area answers, `"degraded"` otherwise.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Health per storage area.
    pub storage: std::collections::BTreeMap<String, bool>,
}
