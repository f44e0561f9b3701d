//! Staging sweep for abandoned uploads.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use stitch_core::result::AppResult;
use stitch_core::traits::storage::StorageProvider;
use stitch_core::types::STAGING_DIR_PREFIX;

/// Outcome of a sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Number of staging areas inspected.
    pub scanned: usize,
    /// Staging directories that were removed.
    pub removed: Vec<String>,
}

/// Removes `chunkCache_*` directories that have not been touched for a
/// while. Uploads that were never merged otherwise stay forever.
#[derive(Debug, Clone)]
pub struct StagingSweeper {
    /// Provider rooted at the staging root.
    provider: Arc<dyn StorageProvider>,
}

impl StagingSweeper {
    /// Create a new sweeper.
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// Delete staging areas last modified more than `older_than` ago.
    pub async fn sweep(&self, older_than: Duration) -> AppResult<SweepReport> {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| chrono::Utc::now().checked_sub_signed(age))
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);

        let mut report = SweepReport::default();
        for entry in self.provider.list("").await? {
            if !entry.is_directory || !entry.name.starts_with(STAGING_DIR_PREFIX) {
                continue;
            }
            report.scanned += 1;

            let stale = entry.last_modified.is_some_and(|t| t <= cutoff);
            if !stale {
                continue;
            }
            match self.provider.delete_dir(&entry.path).await {
                Ok(()) => {
                    tracing::info!(dir = %entry.name, "Removed abandoned staging area");
                    report.removed.push(entry.name);
                }
                Err(e) => {
                    tracing::warn!(dir = %entry.name, error = %e, "Failed to remove staging area");
                }
            }
        }

        Ok(report)
    }
}
