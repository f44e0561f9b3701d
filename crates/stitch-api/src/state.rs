//! Shared application state passed to all handlers via Axum's `State`.

use std::sync::Arc;

use stitch_core::config::AppConfig;
use stitch_core::result::AppResult;
use stitch_service::{DownloadService, FolderUploadService, UploadService};
use stitch_storage::StorageManager;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Mounted storage areas.
    pub storage: Arc<StorageManager>,
    /// Chunk upload, verify and merge.
    pub upload_service: Arc<UploadService>,
    /// Folder upload and read-back.
    pub folder_service: Arc<FolderUploadService>,
    /// Artifact download and listing.
    pub download_service: Arc<DownloadService>,
}

impl AppState {
    /// Mount the storage areas described by `config` and build every service.
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let storage = StorageManager::from_config(&config.storage).await?;
        tokio::fs::create_dir_all(&config.storage.spool_root).await?;

        let upload_service = UploadService::new(&storage, &config.storage)?;
        let folder_service = FolderUploadService::new(&storage, &config.storage)?;
        let download_service = DownloadService::new(&storage)?;

        Ok(Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
            upload_service: Arc::new(upload_service),
            folder_service: Arc::new(folder_service),
            download_service: Arc::new(download_service),
        })
    }
}
