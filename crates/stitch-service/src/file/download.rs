//! File download service: serves artifacts with byte-range support.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tracing::debug;

use stitch_core::error::{AppError, ErrorKind};
use stitch_core::result::AppResult;
use stitch_core::traits::storage::{ByteStream, StorageProvider};
use stitch_core::types::{ByteRange, format_file_size, validate_segment};
use stitch_storage::manager::{StorageArea, StorageManager};

/// Listing entry for a stored file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileInfo {
    /// File name inside the artifact root.
    pub filename: String,
    /// Human readable size.
    pub size: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Creation time (modification time where unavailable).
    pub created_at: Option<DateTime<Utc>>,
}

/// An open download.
pub struct DownloadResult {
    /// Decoded file name.
    pub filename: String,
    /// Full size of the file.
    pub total_size: u64,
    /// Range being served, if the request asked for a satisfiable one.
    pub range: Option<ByteRange>,
    /// File content (only the range when `range` is set).
    pub stream: ByteStream,
}

impl std::fmt::Debug for DownloadResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadResult")
            .field("filename", &self.filename)
            .field("total_size", &self.total_size)
            .field("range", &self.range)
            .finish()
    }
}

impl DownloadResult {
    /// Number of bytes the stream will yield.
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.total_size, |r| r.len())
    }
}

/// Result of a download request.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The file exists and is being served.
    Found(DownloadResult),
    /// The file does not exist; carries what is available instead.
    Missing {
        /// Decoded name that was requested.
        requested_file: String,
        /// Names of the files that do exist.
        available: Vec<String>,
    },
}

/// Serves assembled artifacts.
#[derive(Clone)]
pub struct DownloadService {
    /// Provider rooted at the artifact root.
    artifacts: Arc<dyn StorageProvider>,
}

impl std::fmt::Debug for DownloadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadService").finish()
    }
}

impl DownloadService {
    /// Creates a new download service over the artifact area.
    pub fn new(storage: &StorageManager) -> AppResult<Self> {
        Ok(Self {
            artifacts: storage.get(StorageArea::Artifacts)?,
        })
    }

    /// Decode a requested file name and make sure it names a single entry
    /// of the artifact root.
    pub fn resolve(filename: &str) -> AppResult<String> {
        let decoded = percent_decode_str(filename)
            .decode_utf8()
            .map_err(|_| AppError::validation("filename is not valid UTF-8"))?
            .into_owned();
        validate_segment("filename", &decoded)?;
        Ok(decoded)
    }

    /// Open `filename` for download, honoring an optional `Range` header.
    pub async fn open(&self, filename: &str, range_header: Option<&str>) -> AppResult<DownloadOutcome> {
        let name = Self::resolve(filename)?;

        let meta = match self.artifacts.metadata(&name).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return self.missing(name).await,
            Err(e) if e.is(ErrorKind::NotFound) => return self.missing(name).await,
            Err(e) => return Err(e),
        };

        let total_size = meta.size_bytes;
        let range = range_header.and_then(|h| ByteRange::parse(h, total_size));
        let stream = match range {
            Some(r) => self.artifacts.read_range(&name, r.start, r.len()).await?,
            None => self.artifacts.read(&name).await?,
        };

        debug!(filename = %name, total_size, range = ?range, "Serving download");
        Ok(DownloadOutcome::Found(DownloadResult {
            filename: name,
            total_size,
            range,
            stream,
        }))
    }

    /// Regular files in the artifact root, sorted by name.
    pub async fn list(&self) -> AppResult<Vec<StoredFileInfo>> {
        let mut files: Vec<StoredFileInfo> = self
            .artifacts
            .list("")
            .await?
            .into_iter()
            .filter(|e| e.is_file() && !e.is_hidden())
            .map(|e| StoredFileInfo {
                size: format_file_size(e.size_bytes),
                size_bytes: e.size_bytes,
                created_at: e.created_at,
                filename: e.name,
            })
            .collect();
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    async fn missing(&self, requested_file: String) -> AppResult<DownloadOutcome> {
        let available = self.list().await?.into_iter().map(|f| f.filename).collect();
        Ok(DownloadOutcome::Missing {
            requested_file,
            available,
        })
    }
}
