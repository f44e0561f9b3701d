//! Chunk store: durable staging of uploaded chunks.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use stitch_core::error::AppError;
use stitch_core::result::AppResult;
use stitch_core::traits::storage::{ByteStream, StorageProvider};
use stitch_core::types::{ChunkName, StagedChunk, parse_chunk_index, staging_dir_name};

/// Writes and lists chunks under `<stagingRoot>/chunkCache_<hash>/`.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    /// Provider rooted at the staging root.
    provider: Arc<dyn StorageProvider>,
    /// Largest accepted chunk payload.
    max_chunk_bytes: u64,
}

impl ChunkStore {
    /// Create a new chunk store.
    pub fn new(provider: Arc<dyn StorageProvider>, max_chunk_bytes: u64) -> Self {
        Self {
            provider,
            max_chunk_bytes,
        }
    }

    /// Persist one chunk. Re-uploading the same chunk replaces it.
    ///
    /// Returns the number of bytes stored.
    pub async fn put(&self, file_hash: &str, chunk: &ChunkName, payload: Bytes) -> AppResult<u64> {
        let size = payload.len() as u64;
        if size > self.max_chunk_bytes {
            return Err(AppError::validation(format!(
                "Chunk of {size} bytes exceeds the {} byte limit",
                self.max_chunk_bytes
            )));
        }
        if chunk.index().checked_mul(self.max_chunk_bytes).is_none() {
            return Err(AppError::validation(format!(
                "Chunk index {} is out of range",
                chunk.index()
            )));
        }

        let path = Self::chunk_path(file_hash, chunk.as_str());
        self.provider.write(&path, payload).await?;

        debug!(file_hash, chunk = %chunk, bytes = size, "Stored chunk");
        Ok(size)
    }

    /// Names of the chunks staged for `file_hash`, sorted. Empty when the
    /// staging area does not exist.
    pub async fn list(&self, file_hash: &str) -> AppResult<Vec<String>> {
        let entries = self.provider.list(&staging_dir_name(file_hash)).await?;
        let mut names: Vec<String> = entries
            .into_iter()
            .filter(|e| e.is_file() && !e.is_hidden())
            .map(|e| e.name)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Staged chunks with their parsed index and size.
    pub async fn staged(&self, file_hash: &str) -> AppResult<Vec<StagedChunk>> {
        let entries = self.provider.list(&staging_dir_name(file_hash)).await?;
        entries
            .into_iter()
            .filter(|e| e.is_file() && !e.is_hidden())
            .map(|e| {
                Ok(StagedChunk {
                    index: parse_chunk_index(&e.name)?,
                    size: e.size_bytes,
                    name: e.name,
                })
            })
            .collect()
    }

    /// Stream a staged chunk.
    pub async fn read(&self, file_hash: &str, chunk_name: &str) -> AppResult<ByteStream> {
        self.provider
            .read(&Self::chunk_path(file_hash, chunk_name))
            .await
    }

    /// Remove the staging area. Failures are logged, never returned.
    pub async fn remove_all(&self, file_hash: &str) {
        if let Err(e) = self.provider.delete_dir(&staging_dir_name(file_hash)).await {
            warn!(file_hash, error = %e, "Failed to remove staging area");
        }
    }

    /// Relative path of a chunk inside the staging root.
    pub fn chunk_path(file_hash: &str, chunk_name: &str) -> String {
        format!("{}/{chunk_name}", staging_dir_name(file_hash))
    }
}
