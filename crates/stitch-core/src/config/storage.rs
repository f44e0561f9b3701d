//! Storage area configuration.

use serde::{Deserialize, Serialize};

/// Filesystem roots and limits for chunked and folder uploads.
///
/// Staging and artifact roots default to the same directory: staging areas
/// are `chunkCache_<hash>` subdirectories, artifacts are regular files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all runtime data.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Root under which per-file staging areas are created.
    #[serde(default = "default_target_root")]
    pub staging_root: String,
    /// Root holding assembled artifacts (`<hash><ext>`).
    #[serde(default = "default_target_root")]
    pub artifact_root: String,
    /// Root mirroring client folder trees.
    #[serde(default = "default_upload_root")]
    pub upload_root: String,
    /// Scratch directory receiving folder-upload bodies before they are
    /// moved into place.
    #[serde(default = "default_spool_root")]
    pub spool_root: String,
    /// Largest accepted single chunk payload in bytes (default 64 MB).
    #[serde(default = "default_max_chunk")]
    pub max_chunk_bytes: u64,
    /// Number of chunk writes a single merge may have in flight.
    #[serde(default = "default_merge_concurrency")]
    pub merge_concurrency: usize,
    /// Maximum number of files in one folder upload.
    #[serde(default = "default_max_folder_files")]
    pub max_folder_files: usize,
    /// Age after which an untouched staging area counts as abandoned.
    #[serde(default = "default_staging_ttl")]
    pub staging_ttl_hours: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            staging_root: default_target_root(),
            artifact_root: default_target_root(),
            upload_root: default_upload_root(),
            spool_root: default_spool_root(),
            max_chunk_bytes: default_max_chunk(),
            merge_concurrency: default_merge_concurrency(),
            max_folder_files: default_max_folder_files(),
            staging_ttl_hours: default_staging_ttl(),
        }
    }
}

impl StorageConfig {
    /// Default layout placed under a custom data root.
    pub fn rooted_at(data_root: impl Into<String>) -> Self {
        let root = data_root.into();
        let root = root.trim_end_matches('/').to_string();
        Self {
            staging_root: format!("{root}/target"),
            artifact_root: format!("{root}/target"),
            upload_root: format!("{root}/uploads"),
            spool_root: format!("{root}/temp/spool"),
            data_root: root,
            ..Self::default()
        }
    }
}

fn default_data_root() -> String {
    "./data".to_string()
}

fn default_target_root() -> String {
    "./data/target".to_string()
}

fn default_upload_root() -> String {
    "./data/uploads".to_string()
}

fn default_spool_root() -> String {
    "./data/temp/spool".to_string()
}

fn default_max_chunk() -> u64 {
    67_108_864 // 64 MB
}

fn default_merge_concurrency() -> usize {
    8
}

fn default_max_folder_files() -> usize {
    100
}

fn default_staging_ttl() -> u64 {
    24
}
