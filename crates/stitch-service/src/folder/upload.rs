//! Folder upload service: persists a batch of files under their relative
//! paths and reports the resulting tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, join_all};
use serde::Serialize;
use tracing::{info, warn};

use stitch_core::config::StorageConfig;
use stitch_core::error::AppError;
use stitch_core::result::AppResult;
use stitch_core::traits::storage::StorageProvider;
use stitch_core::types::{Children, validate_segment};
use stitch_storage::manager::{StorageArea, StorageManager};

use super::tree::{TreeBuilder, TreeEntry, plan_layout, resolve_destination};

/// Recursion limit for on-disk folder listings.
const MAX_LISTING_DEPTH: usize = 64;

/// One received file, already spooled to local disk.
#[derive(Debug, Clone)]
pub struct FolderFile {
    /// Client file name.
    pub original_name: String,
    /// Client relative path, if one was sent for this file.
    pub relative_path: Option<String>,
    /// Where the body was spooled.
    pub spooled: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Declared content type.
    pub content_type: Option<String>,
}

/// A file persisted by a folder upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedEntry {
    /// Client file name.
    pub original_name: String,
    /// Stored file name.
    pub file_name: String,
    /// Path relative to the upload root.
    pub relative_path: String,
    /// Absolute location on the server.
    pub server_path: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
    /// Parent directory of `relative_path` (`.` at the root).
    pub directory: String,
}

/// Result of a folder upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderUploadResult {
    pub folder_name: String,
    pub files: Vec<UploadedEntry>,
    /// Top-level nodes keyed by name, starting with the folder itself.
    pub structure: Children,
    pub total_files: usize,
}

/// Kind of an on-disk listing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Folder,
    File,
}

/// On-disk view of an uploaded folder.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderListing {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ListingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FolderListing>>,
}

/// Handles folder uploads and read-back.
#[derive(Clone)]
pub struct FolderUploadService {
    /// Provider rooted at the upload root.
    uploads: Arc<dyn StorageProvider>,
    /// Upload root on disk, for reporting server paths.
    upload_root: PathBuf,
    /// Maximum files per request.
    max_files: usize,
}

impl std::fmt::Debug for FolderUploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderUploadService")
            .field("upload_root", &self.upload_root)
            .finish()
    }
}

impl FolderUploadService {
    /// Creates a new folder upload service over the upload area.
    pub fn new(storage: &StorageManager, config: &StorageConfig) -> AppResult<Self> {
        Ok(Self {
            uploads: storage.get(StorageArea::Uploads)?,
            upload_root: storage.root(StorageArea::Uploads)?.to_path_buf(),
            max_files: config.max_folder_files,
        })
    }

    /// Persist `files` and build the tree of what was stored.
    ///
    /// Every destination is computed and validated before anything is
    /// moved; a single bad path rejects the whole batch. Paths that would
    /// turn a file into a directory or the reverse are renamed up front so
    /// both survive. Files that fail to persist afterwards are skipped.
    pub async fn upload(&self, folder_name: &str, files: Vec<FolderFile>) -> AppResult<FolderUploadResult> {
        let folder_name = folder_name.trim();
        validate_segment("folderName", folder_name)?;
        if files.is_empty() {
            return Err(AppError::validation("No files uploaded"));
        }
        if files.len() > self.max_files {
            return Err(AppError::validation(format!(
                "At most {} files can be uploaded at once",
                self.max_files
            )));
        }

        let requested = files
            .iter()
            .map(|file| {
                resolve_destination(
                    folder_name,
                    &file.original_name,
                    file.relative_path.as_deref(),
                )
            })
            .collect::<AppResult<Vec<_>>>()?;
        let destinations = plan_layout(self.uploads.as_ref(), &requested).await?;
        let planned: Vec<(FolderFile, String)> = files.into_iter().zip(destinations).collect();

        let results = join_all(
            planned
                .iter()
                .map(|(file, dest)| self.uploads.import(&file.spooled, dest)),
        )
        .await;

        let mut uploaded = Vec::with_capacity(planned.len());
        for ((file, dest), result) in planned.into_iter().zip(results) {
            match result {
                Ok(()) => uploaded.push(self.entry(file, dest)),
                Err(e) => warn!(
                    file = %file.original_name,
                    dest = %dest,
                    error = %e,
                    "Skipping folder entry that could not be stored"
                ),
            }
        }

        if uploaded.is_empty() {
            return Err(AppError::storage("None of the uploaded files could be stored"));
        }

        let tree_entries: Vec<TreeEntry> = uploaded
            .iter()
            .map(|u| TreeEntry {
                relative_path: u.relative_path.clone(),
                size: u.size,
                mime_type: u.mime_type.clone(),
            })
            .collect();
        let structure = TreeBuilder::new(folder_name)
            .build(&tree_entries)
            .into_children()
            .unwrap_or_default();

        info!(folder = folder_name, files = uploaded.len(), "Folder upload stored");
        Ok(FolderUploadResult {
            folder_name: folder_name.to_string(),
            total_files: uploaded.len(),
            files: uploaded,
            structure,
        })
    }

    /// Read back the stored tree of `folder_name`. Links are reported as
    /// files and never followed.
    pub async fn structure(&self, folder_name: &str) -> AppResult<FolderListing> {
        validate_segment("folderName", folder_name)?;
        let meta = self
            .uploads
            .metadata(folder_name)
            .await
            .map_err(|e| match e.kind {
                stitch_core::error::ErrorKind::NotFound => {
                    AppError::not_found(format!("Folder '{folder_name}' does not exist"))
                }
                _ => e,
            })?;
        if !meta.is_directory {
            return Err(AppError::not_found(format!(
                "Folder '{folder_name}' does not exist"
            )));
        }

        self.walk(folder_name.to_string(), folder_name.to_string(), 0)
            .await
    }

    /// Whether `folder_name` exists under the upload root.
    pub async fn exists(&self, folder_name: &str) -> AppResult<bool> {
        validate_segment("folderName", folder_name)?;
        self.uploads.exists(folder_name).await
    }

    fn walk(&self, name: String, path: String, depth: usize) -> BoxFuture<'_, AppResult<FolderListing>> {
        async move {
            let mut children = Vec::new();
            if depth >= MAX_LISTING_DEPTH {
                warn!(path = %path, "Folder listing depth limit reached");
            } else {
                for entry in self.uploads.list(&path).await? {
                    if entry.is_directory {
                        children.push(self.walk(entry.name, entry.path, depth + 1).await?);
                    } else {
                        children.push(FolderListing {
                            name: entry.name,
                            path: entry.path,
                            kind: ListingKind::File,
                            size: Some(entry.size_bytes),
                            last_modified: entry.last_modified,
                            children: None,
                        });
                    }
                }
            }
            Ok(FolderListing {
                name,
                path,
                kind: ListingKind::Folder,
                size: None,
                last_modified: None,
                children: Some(children),
            })
        }
        .boxed()
    }

    fn entry(&self, file: FolderFile, dest: String) -> UploadedEntry {
        let (directory, file_name) = match dest.rsplit_once('/') {
            Some((dir, name)) => (dir.to_string(), name.to_string()),
            None => (".".to_string(), dest.clone()),
        };
        let mime_type = file
            .content_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(Path::new(&file_name))
                    .first_or_octet_stream()
                    .to_string()
            });

        UploadedEntry {
            original_name: file.original_name,
            file_name,
            server_path: self.upload_root.join(&dest).display().to_string(),
            relative_path: dest,
            size: file.size,
            mime_type,
            directory,
        }
    }
}
