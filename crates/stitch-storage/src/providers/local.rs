//! Local filesystem storage provider.

use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use uuid::Uuid;

use stitch_core::error::{AppError, ErrorKind};
use stitch_core::result::AppResult;
use stitch_core::traits::storage::{ByteStream, StorageObjectMeta, StorageProvider};

/// Local filesystem storage provider.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Root directory for all stored files.
    root: PathBuf,
}

impl LocalStorageProvider {
    /// Create a new local storage provider rooted at the given path.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Root directory of this provider.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path to an absolute path within the root.
    ///
    /// Parent (`..`) and absolute components are rejected.
    pub fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(AppError::validation(format!(
                        "Path escapes storage root: {path}"
                    )));
                }
            }
        }
        Ok(self.root.join(relative))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let full_path = self.resolve(path)?;
        let file = fs::File::open(&full_path)
            .await
            .map_err(|e| io_error(e, "open file", path))?;

        let stream = ReaderStream::new(file);
        Ok(Box::pin(stream))
    }

    async fn read_range(&self, path: &str, offset: u64, len: u64) -> AppResult<ByteStream> {
        let full_path = self.resolve(path)?;
        let mut file = fs::File::open(&full_path)
            .await
            .map_err(|e| io_error(e, "open file", path))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| io_error(e, "seek file", path))?;

        let stream = ReaderStream::new(file.take(len));
        Ok(Box::pin(stream))
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(path)?;
        let data = fs::read(&full_path)
            .await
            .map_err(|e| io_error(e, "read file", path))?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, path: &str, data: Bytes) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;

        let temp_path = temp_sibling(&full_path);
        if let Err(e) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(io_error(e, "write file", path));
        }
        if let Err(e) = fs::rename(&temp_path, &full_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(io_error(e, "publish file", path));
        }

        debug!(path, bytes = data.len(), "Wrote file");
        Ok(())
    }

    async fn allocate(&self, path: &str, len: u64) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;

        let file = fs::File::create(&full_path)
            .await
            .map_err(|e| io_error(e, "create file", path))?;
        file.set_len(len)
            .await
            .map_err(|e| io_error(e, "size file", path))?;

        debug!(path, bytes = len, "Allocated file");
        Ok(())
    }

    async fn write_stream_at(
        &self,
        path: &str,
        offset: u64,
        mut stream: ByteStream,
    ) -> AppResult<u64> {
        let full_path = self.resolve(path)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .open(&full_path)
            .await
            .map_err(|e| io_error(e, "open file for writing", path))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| io_error(e, "seek file", path))?;

        let mut total_bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to write chunk", e)
            })?;
        }

        file.flush()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush file", e))?;

        debug!(path, offset, bytes = total_bytes, "Wrote stream at offset");
        Ok(total_bytes)
    }

    async fn sync(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        let file = fs::OpenOptions::new()
            .write(true)
            .open(&full_path)
            .await
            .map_err(|e| io_error(e, "open file for sync", path))?;
        file.sync_all()
            .await
            .map_err(|e| io_error(e, "sync file", path))
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e, "delete file", path)),
        }
    }

    async fn delete_dir(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        match fs::remove_dir_all(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e, "delete directory", path)),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;
        self.ensure_parent(&to_path).await?;

        fs::rename(&from_path, &to_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to rename {from} -> {to}"),
                e,
            )
        })?;
        Ok(())
    }

    async fn import(&self, source: &Path, to: &str) -> AppResult<()> {
        let to_path = self.resolve(to)?;
        if source == to_path {
            return Ok(());
        }
        self.ensure_parent(&to_path).await?;

        if let Err(rename_err) = fs::rename(source, &to_path).await {
            debug!(
                source = %source.display(),
                to,
                error = %rename_err,
                "Rename failed, falling back to copy"
            );
            fs::copy(source, &to_path)
                .await
                .map_err(|e| io_error(e, "copy file into", to))?;
            if let Err(e) = fs::remove_file(source).await {
                warn!(source = %source.display(), error = %e, "Failed to remove imported source");
            }
        }

        debug!(source = %source.display(), to, "Imported file");
        Ok(())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let full_path = self.resolve(path)?;
        fs::try_exists(&full_path)
            .await
            .map_err(|e| io_error(e, "stat path", path))
    }

    async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta> {
        let full_path = self.resolve(path)?;
        let meta = fs::symlink_metadata(&full_path)
            .await
            .map_err(|e| io_error(e, "get metadata", path))?;

        let name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(object_meta(name, path.to_string(), &meta))
    }

    async fn list(&self, path: &str) -> AppResult<Vec<StorageObjectMeta>> {
        let full_path = self.resolve(path)?;

        let mut dir = match fs::read_dir(&full_path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e, "list directory", path)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read directory entry", e)
        })? {
            let entry_meta = fs::symlink_metadata(entry.path()).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to get entry metadata", e)
            })?;

            let name = entry.file_name().to_string_lossy().to_string();
            let trimmed = path.trim_matches('/');
            let entry_path = if trimmed.is_empty() {
                name.clone()
            } else {
                format!("{trimmed}/{name}")
            };

            entries.push(object_meta(name, entry_path, &entry_meta));
        }

        entries.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then(a.name.cmp(&b.name))
        });

        Ok(entries)
    }

    async fn create_dir(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        fs::create_dir_all(&full_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create directory: {path}"),
                e,
            )
        })?;
        Ok(())
    }
}

/// Map an I/O error, turning `NotFound` into [`ErrorKind::NotFound`].
fn io_error(err: std::io::Error, action: &str, path: &str) -> AppError {
    if err.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Path not found: {path}"))
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to {action}: {path}"), err)
    }
}

/// Hidden temporary path next to `path`, used for atomic publication.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
}

fn object_meta(name: String, path: String, meta: &std::fs::Metadata) -> StorageObjectMeta {
    let last_modified = meta
        .modified()
        .ok()
        .map(chrono::DateTime::<chrono::Utc>::from);
    let created_at = meta
        .created()
        .ok()
        .map(chrono::DateTime::<chrono::Utc>::from)
        .or(last_modified);
    let is_symlink = meta.file_type().is_symlink();

    StorageObjectMeta {
        mime_type: if meta.is_file() {
            mime_guess::from_path(&name).first().map(|m| m.to_string())
        } else {
            None
        },
        name,
        path,
        size_bytes: meta.len(),
        last_modified,
        created_at,
        is_directory: meta.is_dir(),
        is_symlink,
    }
}
