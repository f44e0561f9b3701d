//! Chunked upload service: chunk upload, resume verification and merge.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use stitch_core::config::StorageConfig;
use stitch_core::result::AppResult;
use stitch_core::traits::storage::StorageProvider;
use stitch_core::types::{ChunkName, FileIdentity};
use stitch_storage::chunked::{ChunkAssembler, ChunkStore, MergeOutcome, artifact_present};
use stitch_storage::lock::IdentityLocks;
use stitch_storage::manager::{StorageArea, StorageManager};

/// Answer to a verify call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResult {
    /// Whether the client still has to send chunks.
    pub should_upload: bool,
    /// Chunks already staged; the client sends only the rest.
    pub uploaded_list: Vec<String>,
}

/// Handles the chunk upload, verify and merge flow.
#[derive(Clone)]
pub struct UploadService {
    /// Staged chunk storage.
    chunks: ChunkStore,
    /// Merge engine.
    assembler: ChunkAssembler,
    /// Provider rooted at the artifact root.
    artifacts: Arc<dyn StorageProvider>,
    /// Per-identity locks shared with the assembler.
    locks: IdentityLocks,
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService").finish()
    }
}

impl UploadService {
    /// Creates a new upload service over the staging and artifact areas.
    pub fn new(storage: &StorageManager, config: &StorageConfig) -> AppResult<Self> {
        let locks = IdentityLocks::new();
        let artifacts = storage.get(StorageArea::Artifacts)?;
        let chunks = ChunkStore::new(storage.get(StorageArea::Staging)?, config.max_chunk_bytes);
        let assembler = ChunkAssembler::new(
            chunks.clone(),
            Arc::clone(&artifacts),
            locks.clone(),
            config.merge_concurrency,
        );
        Ok(Self {
            chunks,
            assembler,
            artifacts,
            locks,
        })
    }

    /// Stores one chunk of `identity`.
    pub async fn upload_chunk(
        &self,
        identity: &FileIdentity,
        chunk: &ChunkName,
        payload: Bytes,
    ) -> AppResult<u64> {
        let _guard = self.locks.shared(&identity.file_hash).await;
        self.chunks.put(&identity.file_hash, chunk, payload).await
    }

    /// Reports whether the file still needs uploading and which chunks are
    /// already staged.
    pub async fn verify(&self, identity: &FileIdentity) -> AppResult<VerifyResult> {
        let _guard = self.locks.shared(&identity.file_hash).await;

        match artifact_present(self.artifacts.as_ref(), &identity.artifact_name()).await {
            Ok(true) => {
                return Ok(VerifyResult {
                    should_upload: false,
                    uploaded_list: Vec::new(),
                });
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    file_hash = %identity.file_hash,
                    error = %e,
                    "Failed to check for an existing artifact, assuming none"
                );
                return Ok(VerifyResult {
                    should_upload: true,
                    uploaded_list: Vec::new(),
                });
            }
        }

        let uploaded_list = match self.chunks.list(&identity.file_hash).await {
            Ok(list) => list,
            Err(e) => {
                warn!(
                    file_hash = %identity.file_hash,
                    error = %e,
                    "Failed to list staged chunks, assuming none"
                );
                Vec::new()
            }
        };

        Ok(VerifyResult {
            should_upload: true,
            uploaded_list,
        })
    }

    /// Assembles the staged chunks of `identity` into its artifact.
    pub async fn merge(
        &self,
        identity: &FileIdentity,
        chunk_size: u64,
        expected_size: Option<u64>,
    ) -> AppResult<MergeOutcome> {
        let outcome = self
            .assembler
            .merge(identity, chunk_size, expected_size)
            .await?;
        info!(
            file_hash = %identity.file_hash,
            file_name = %identity.file_name,
            artifact = %outcome.artifact,
            already_existed = outcome.already_existed,
            "Merge finished"
        );
        Ok(outcome)
    }
}
