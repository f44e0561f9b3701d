//! List stored files.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use stitch_core::config::AppConfig;
use stitch_core::error::AppError;
use stitch_service::{DownloadService, StoredFileInfo};
use stitch_storage::StorageManager;

/// File display row
#[derive(Debug, Serialize, Tabled)]
struct FileRow {
    /// File name
    filename: String,
    /// Human-readable size
    size: String,
    /// Size in bytes
    bytes: u64,
    /// Creation time
    created: String,
}

impl From<StoredFileInfo> for FileRow {
    fn from(info: StoredFileInfo) -> Self {
        Self {
            filename: info.filename,
            size: info.size,
            bytes: info.size_bytes,
            created: info
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Execute the files command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let storage = StorageManager::from_config(&config.storage).await?;
    let files = DownloadService::new(&storage)?.list().await?;

    let rows: Vec<FileRow> = files.into_iter().map(FileRow::from).collect();
    output::print_list(&rows, format);
    Ok(())
}
