//! Logical file identity for chunked uploads.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

/// Prefix of a per-file staging directory.
pub const STAGING_DIR_PREFIX: &str = "chunkCache_";

/// Identity of a file being uploaded in chunks.
///
/// `file_hash` is a client-computed content fingerprint used as the
/// deduplication key. `file_name` only contributes its extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileIdentity {
    /// Client-computed content hash.
    pub file_hash: String,
    /// Original client file name.
    pub file_name: String,
}

impl FileIdentity {
    /// Build a validated identity.
    pub fn new(file_hash: impl Into<String>, file_name: impl Into<String>) -> AppResult<Self> {
        let file_hash = file_hash.into();
        let file_name = file_name.into();
        validate_segment("fileHash", &file_hash)?;
        Ok(Self {
            file_hash,
            file_name,
        })
    }

    /// Extension of the file name including the leading dot, or an empty
    /// string when the basename has none.
    pub fn extension(&self) -> &str {
        let base = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file_name.as_str());
        match base.rfind('.') {
            Some(pos) => &base[pos..],
            None => "",
        }
    }

    /// Name of the assembled artifact: `<hash><ext>`.
    pub fn artifact_name(&self) -> String {
        format!("{}{}", self.file_hash, self.extension())
    }

    /// Name of the staging directory: `chunkCache_<hash>`.
    pub fn staging_dir_name(&self) -> String {
        staging_dir_name(&self.file_hash)
    }
}

/// Staging directory name for a file hash.
pub fn staging_dir_name(file_hash: &str) -> String {
    format!("{STAGING_DIR_PREFIX}{file_hash}")
}

/// Validate a client-supplied value that ends up as one path segment.
///
/// Rejects empty values, separators, NUL bytes and names starting with a
/// dot (which covers `.` and `..`).
pub fn validate_segment(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    if value.contains(['/', '\\', '\0']) {
        return Err(AppError::validation(format!(
            "{field} must not contain path separators"
        )));
    }
    if value.starts_with('.') {
        return Err(AppError::validation(format!(
            "{field} must not start with '.'"
        )));
    }
    Ok(())
}
