//! Storage provider trait for the filesystem areas Stitch writes to.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// Metadata about a stored object.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageObjectMeta {
    /// Final path component.
    pub name: String,
    /// Path within the storage provider.
    pub path: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// MIME type guessed from the extension (files only).
    pub mime_type: Option<String>,
    /// Last modified timestamp.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
    /// Creation timestamp (falls back to `last_modified` where the platform
    /// does not record birth time).
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Whether this is a directory.
    pub is_directory: bool,
    /// Whether this is a symbolic link. Links are never followed.
    pub is_symlink: bool,
}

impl StorageObjectMeta {
    /// Whether this is a plain regular file.
    pub fn is_file(&self) -> bool {
        !self.is_directory && !self.is_symlink
    }

    /// Whether the name starts with a dot.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// A byte stream type used for reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for file storage backends.
///
/// All paths are relative to the provider root and may not escape it.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Read a file and return its byte stream.
    async fn read(&self, path: &str) -> AppResult<ByteStream>;

    /// Stream `len` bytes of a file starting at `offset`.
    async fn read_range(&self, path: &str, offset: u64, len: u64) -> AppResult<ByteStream>;

    /// Read a file into memory as a complete byte vector.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Write bytes to a file, replacing it atomically.
    async fn write(&self, path: &str, data: Bytes) -> AppResult<()>;

    /// Create (or truncate) a file and size it to `len` bytes.
    async fn allocate(&self, path: &str, len: u64) -> AppResult<()>;

    /// Write a byte stream into an existing file starting at `offset`.
    /// Returns the number of bytes written.
    async fn write_stream_at(&self, path: &str, offset: u64, stream: ByteStream)
    -> AppResult<u64>;

    /// Flush a file's contents to stable storage.
    async fn sync(&self, path: &str) -> AppResult<()>;

    /// Delete a file at the given path.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Delete a directory and all its contents recursively.
    async fn delete_dir(&self, path: &str) -> AppResult<()>;

    /// Move (rename) a file from one path to another within this provider,
    /// replacing the destination.
    async fn rename(&self, from: &str, to: &str) -> AppResult<()>;

    /// Move a file from outside the provider into it. Falls back to copy
    /// and delete when a rename is not possible.
    async fn import(&self, source: &Path, to: &str) -> AppResult<()>;

    /// Check whether a file or directory exists at the given path.
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Get metadata about a file or directory without following links.
    async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta>;

    /// List the contents of a directory without following links.
    async fn list(&self, path: &str) -> AppResult<Vec<StorageObjectMeta>>;

    /// Create a directory (and any missing parents).
    async fn create_dir(&self, path: &str) -> AppResult<()>;
}
