//! Chunk assembler: merges staged chunks into the final artifact.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use stitch_core::error::{AppError, ErrorKind};
use stitch_core::result::AppResult;
use stitch_core::traits::storage::StorageProvider;
use stitch_core::types::{FileIdentity, StagedChunk};

use super::upload::ChunkStore;
use crate::lock::IdentityLocks;

/// Missing indices named in an incomplete-upload error.
const MISSING_PREVIEW: usize = 8;

/// Result of a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// Artifact name (`<hash><ext>`) inside the artifact root.
    pub artifact: String,
    /// Size of the artifact in bytes.
    pub size_bytes: u64,
    /// Number of chunks assembled (0 when the artifact already existed).
    pub chunks: usize,
    /// Whether the artifact was already present before this call.
    pub already_existed: bool,
}

/// Assembles staged chunks into `<artifactRoot>/<hash><ext>`.
///
/// Chunks are written concurrently at their offsets into a hidden,
/// pre-sized temporary file which is renamed into place only once every
/// write has succeeded.
#[derive(Debug, Clone)]
pub struct ChunkAssembler {
    /// Source of staged chunks.
    chunks: ChunkStore,
    /// Provider rooted at the artifact root.
    artifacts: Arc<dyn StorageProvider>,
    /// Per-identity locks shared with the upload path.
    locks: IdentityLocks,
    /// Maximum chunk writes in flight per merge.
    concurrency: usize,
}

impl ChunkAssembler {
    /// Create a new chunk assembler.
    pub fn new(
        chunks: ChunkStore,
        artifacts: Arc<dyn StorageProvider>,
        locks: IdentityLocks,
        concurrency: usize,
    ) -> Self {
        Self {
            chunks,
            artifacts,
            locks,
            concurrency: concurrency.max(1),
        }
    }

    /// Merge all staged chunks of `identity`.
    ///
    /// Every chunk but the last must be exactly `chunk_size` bytes. When
    /// `expected_size` is given the chunk count and total size are checked
    /// against it as well.
    pub async fn merge(
        &self,
        identity: &FileIdentity,
        chunk_size: u64,
        expected_size: Option<u64>,
    ) -> AppResult<MergeOutcome> {
        if chunk_size == 0 {
            return Err(AppError::validation("chunkSize must be greater than zero"));
        }

        let file_hash = identity.file_hash.as_str();
        let artifact = identity.artifact_name();
        let _guard = self.locks.exclusive(file_hash).await;

        if artifact_present(self.artifacts.as_ref(), &artifact).await? {
            self.chunks.remove_all(file_hash).await;
            let meta = self.artifacts.metadata(&artifact).await?;
            info!(file_hash, artifact = %artifact, "Artifact already present, merge skipped");
            return Ok(MergeOutcome {
                artifact,
                size_bytes: meta.size_bytes,
                chunks: 0,
                already_existed: true,
            });
        }

        let staged = self.chunks.staged(file_hash).await?;
        let (ordered, total) = plan_merge(staged, chunk_size, expected_size)?;

        info!(
            file_hash,
            artifact = %artifact,
            chunks = ordered.len(),
            bytes = total,
            "Assembling chunks"
        );

        let temp = format!(".{artifact}.{}.merge", Uuid::new_v4().simple());
        if let Err(e) = self.assemble(file_hash, &ordered, chunk_size, total, &temp).await {
            self.discard(&temp).await;
            return Err(e);
        }
        if let Err(e) = self.artifacts.rename(&temp, &artifact).await {
            self.discard(&temp).await;
            return Err(e);
        }

        self.chunks.remove_all(file_hash).await;

        info!(file_hash, artifact = %artifact, bytes = total, "Assembly complete");
        Ok(MergeOutcome {
            artifact,
            size_bytes: total,
            chunks: ordered.len(),
            already_existed: false,
        })
    }

    async fn assemble(
        &self,
        file_hash: &str,
        ordered: &[StagedChunk],
        chunk_size: u64,
        total: u64,
        temp: &str,
    ) -> AppResult<()> {
        self.artifacts.allocate(temp, total).await?;

        let sem = Semaphore::new(self.concurrency);
        let tasks = ordered.iter().map(|chunk| {
            let sem = &sem;
            async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|_| AppError::internal("Merge semaphore closed"))?;
                let stream = self.chunks.read(file_hash, &chunk.name).await?;
                let written = self
                    .artifacts
                    .write_stream_at(temp, chunk.index * chunk_size, stream)
                    .await?;
                if written != chunk.size {
                    return Err(AppError::new(
                        ErrorKind::Storage,
                        format!(
                            "Chunk {} changed during merge ({written} of {} bytes)",
                            chunk.name, chunk.size
                        ),
                    ));
                }
                Ok::<u64, AppError>(written)
            }
        });
        try_join_all(tasks).await?;

        self.artifacts.sync(temp).await
    }

    async fn discard(&self, temp: &str) {
        if let Err(e) = self.artifacts.delete(temp).await {
            warn!(temp, error = %e, "Failed to remove temporary merge file");
        }
    }
}

/// Whether `artifact` exists as a regular file. Directories and links with
/// the same name do not count.
pub async fn artifact_present(artifacts: &dyn StorageProvider, artifact: &str) -> AppResult<bool> {
    if !artifacts.exists(artifact).await? {
        return Ok(false);
    }
    Ok(artifacts.metadata(artifact).await?.is_file())
}

/// Order staged chunks and compute the artifact size, rejecting any set
/// that would not reproduce the original file.
pub fn plan_merge(
    mut staged: Vec<StagedChunk>,
    chunk_size: u64,
    expected_size: Option<u64>,
) -> AppResult<(Vec<StagedChunk>, u64)> {
    if staged.is_empty() {
        return Err(AppError::incomplete_upload("No chunks have been uploaded"));
    }

    staged.sort_by_key(|c| c.index);
    if let Some(dup) = staged.windows(2).find(|w| w[0].index == w[1].index) {
        return Err(AppError::validation(format!(
            "Duplicate chunk index {} ({} and {})",
            dup[0].index, dup[0].name, dup[1].name
        )));
    }

    let highest = staged.last().map(|c| c.index).unwrap_or(0);
    let expected_count = match expected_size {
        Some(size) => size.div_ceil(chunk_size).max(1),
        None => highest
            .checked_add(1)
            .ok_or_else(|| AppError::validation(format!("Chunk index {highest} is out of range")))?,
    };
    if highest >= expected_count {
        return Err(AppError::validation(format!(
            "Chunk index {highest} is beyond the expected {expected_count} chunks"
        )));
    }

    // Indices are unique and below `expected_count`, so this cannot underflow.
    let missing_count = expected_count - staged.len() as u64;
    if missing_count > 0 {
        let first: Vec<u64> = (0..expected_count)
            .filter(|i| staged.binary_search_by_key(i, |c| c.index).is_err())
            .take(MISSING_PREVIEW)
            .collect();
        let more = if missing_count > first.len() as u64 { ", ..." } else { "" };
        return Err(AppError::incomplete_upload(format!(
            "Missing {missing_count} chunks: {first:?}{more}"
        )));
    }

    let (last, body) = staged
        .split_last()
        .ok_or_else(|| AppError::incomplete_upload("No chunks have been uploaded"))?;
    if let Some(bad) = body.iter().find(|c| c.size != chunk_size) {
        return Err(AppError::validation(format!(
            "Chunk {} is {} bytes, expected {chunk_size}",
            bad.name, bad.size
        )));
    }
    if last.size > chunk_size {
        return Err(AppError::validation(format!(
            "Last chunk {} is {} bytes, larger than chunkSize {chunk_size}",
            last.name, last.size
        )));
    }

    let total = chunk_size
        .checked_mul(body.len() as u64)
        .and_then(|n| n.checked_add(last.size))
        .ok_or_else(|| AppError::validation("Assembled size overflows"))?;
    if let Some(size) = expected_size
        && size != total
    {
        return Err(AppError::validation(format!(
            "Assembled size {total} does not match declared fileSize {size}"
        )));
    }

    Ok((staged, total))
}
