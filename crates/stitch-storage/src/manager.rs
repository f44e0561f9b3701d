//! Storage manager: routes operations to the provider for a storage area.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stitch_core::config::StorageConfig;
use stitch_core::error::AppError;
use stitch_core::result::AppResult;
use stitch_core::traits::storage::StorageProvider;

use crate::providers::LocalStorageProvider;

/// The filesystem areas Stitch writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    /// Per-file chunk staging directories.
    Staging,
    /// Assembled artifacts.
    Artifacts,
    /// Reconstructed folder uploads.
    Uploads,
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staging => write!(f, "staging"),
            Self::Artifacts => write!(f, "artifacts"),
            Self::Uploads => write!(f, "uploads"),
        }
    }
}

#[derive(Debug, Clone)]
struct Mounted {
    root: PathBuf,
    provider: Arc<dyn StorageProvider>,
}

/// Holds the provider mounted for each storage area.
#[derive(Debug, Clone, Default)]
pub struct StorageManager {
    areas: HashMap<StorageArea, Mounted>,
}

impl StorageManager {
    /// Create a new empty storage manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount local providers for every area from configuration, creating
    /// the root directories.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let mut manager = Self::new();
        for (area, root) in [
            (StorageArea::Staging, &config.staging_root),
            (StorageArea::Artifacts, &config.artifact_root),
            (StorageArea::Uploads, &config.upload_root),
        ] {
            let provider = LocalStorageProvider::new(root).await?;
            manager.register(area, PathBuf::from(root), Arc::new(provider));
        }
        tracing::debug!(
            staging = %config.staging_root,
            artifacts = %config.artifact_root,
            uploads = %config.upload_root,
            "Storage areas mounted"
        );
        Ok(manager)
    }

    /// Mount a provider for an area, replacing any previous one.
    pub fn register(&mut self, area: StorageArea, root: PathBuf, provider: Arc<dyn StorageProvider>) {
        self.areas.insert(area, Mounted { root, provider });
    }

    /// Get the provider for an area.
    pub fn get(&self, area: StorageArea) -> AppResult<Arc<dyn StorageProvider>> {
        self.areas
            .get(&area)
            .map(|m| Arc::clone(&m.provider))
            .ok_or_else(|| AppError::configuration(format!("No storage mounted for {area}")))
    }

    /// Root directory of an area.
    pub fn root(&self, area: StorageArea) -> AppResult<&Path> {
        self.areas
            .get(&area)
            .map(|m| m.root.as_path())
            .ok_or_else(|| AppError::configuration(format!("No storage mounted for {area}")))
    }

    /// Check health of all mounted providers.
    pub async fn health_check_all(&self) -> HashMap<StorageArea, bool> {
        let mut results = HashMap::new();
        for (area, mounted) in &self.areas {
            let healthy = mounted.provider.health_check().await.unwrap_or(false);
            results.insert(*area, healthy);
        }
        results
    }
}
