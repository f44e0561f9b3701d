//! Folder upload and read-back handlers.

use std::collections::BTreeMap;
use std::path::Path as FsPath;

use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, State};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use stitch_core::error::{AppError, ErrorKind};
use stitch_core::result::AppResult;
use stitch_service::{FolderFile, FolderListing, FolderUploadResult};

use crate::dto::response::{ApiResponse, FolderExistsResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// A file part written to the spool, before its relative path is known.
struct SpooledPart {
    index: usize,
    file: FolderFile,
}

/// POST /folder-upload: store a batch of files under their relative paths
pub async fn upload_folder(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<FolderUploadResult>>, ApiError> {
    // Dropping the spool removes whatever was not moved into place.
    let spool = tempfile::Builder::new()
        .prefix("folder-")
        .tempdir_in(&state.config.storage.spool_root)
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to create upload spool", e))?;

    let mut folder_name: Option<String> = None;
    let mut paths: Vec<String> = Vec::new();
    let mut indexed_paths: BTreeMap<usize, String> = BTreeMap::new();
    let mut parts: Vec<SpooledPart> = Vec::new();
    let mut next_index = 0usize;
    let max_files = state.config.storage.max_folder_files;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "folderName" => folder_name = Some(field.text().await?),
            "paths" | "paths[]" => push_paths(&mut paths, &field.text().await?),
            "files" | "files[]" => {
                let index = slot_index(next_index, max_files)?;
                next_index = index + 1;
                parts.push(spool_part(field, index, spool.path()).await?);
            }
            other => {
                if let Some(index) = bracket_index(other, "files") {
                    let index = slot_index(index, max_files)?;
                    next_index = next_index.max(index + 1);
                    parts.push(spool_part(field, index, spool.path()).await?);
                } else if let Some(index) = bracket_index(other, "paths") {
                    let index = slot_index(index, max_files)?;
                    indexed_paths.insert(index, field.text().await?);
                }
            }
        }
    }

    for (index, path) in indexed_paths {
        if index >= paths.len() {
            paths.resize(index + 1, String::new());
        }
        paths[index] = path;
    }

    let folder_name = folder_name.ok_or_else(|| AppError::validation("folderName is required"))?;
    let files: Vec<FolderFile> = parts
        .into_iter()
        .map(|mut part| {
            part.file.relative_path = paths
                .get(part.index)
                .filter(|p| !p.trim().is_empty())
                .cloned();
            part.file
        })
        .collect();

    debug!(folder = %folder_name, files = files.len(), "Folder upload received");
    let result = state.folder_service.upload(&folder_name, files).await?;
    drop(spool);

    Ok(Json(ApiResponse::with_msg("Folder uploaded", result)))
}

/// GET /folder-upload/{folderName}/structure: stored tree of a folder
pub async fn folder_structure(
    State(state): State<AppState>,
    Path(folder_name): Path<String>,
) -> Result<Json<ApiResponse<FolderListing>>, ApiError> {
    let listing = state.folder_service.structure(&folder_name).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

/// GET /folder-upload/{folderName}/exists
pub async fn folder_exists(
    State(state): State<AppState>,
    Path(folder_name): Path<String>,
) -> Result<Json<ApiResponse<FolderExistsResponse>>, ApiError> {
    let exists = state.folder_service.exists(&folder_name).await?;
    Ok(Json(ApiResponse::ok(FolderExistsResponse {
        folder_name,
        exists,
    })))
}

/// `paths` arrives either as one JSON array or as repeated plain fields.
fn push_paths(paths: &mut Vec<String>, raw: &str) {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => paths.extend(list),
        Err(_) => paths.push(raw.to_string()),
    }
}

/// Accept a file or path position only below the per-request file limit.
fn slot_index(index: usize, max_files: usize) -> AppResult<usize> {
    if index >= max_files {
        return Err(AppError::validation(format!(
            "Field index {index} exceeds the limit of {max_files} files"
        )));
    }
    Ok(index)
}

/// Index of a `<prefix>[<n>]` field name.
fn bracket_index(name: &str, prefix: &str) -> Option<usize> {
    name.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')?
        .parse()
        .ok()
}

async fn spool_part(mut field: Field<'_>, index: usize, spool: &FsPath) -> AppResult<SpooledPart> {
    let original_name = field
        .file_name()
        .map(String::from)
        .ok_or_else(|| AppError::validation(format!("File part {index} has no file name")))?;
    let content_type = field.content_type().map(String::from);

    let spooled = spool.join(Uuid::new_v4().to_string());
    let mut out = tokio::fs::File::create(&spooled).await?;
    let mut size = 0u64;
    while let Some(bytes) = field
        .chunk()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {}", e.body_text())))?
    {
        out.write_all(&bytes).await?;
        size += bytes.len() as u64;
    }
    out.flush().await?;

    Ok(SpooledPart {
        index,
        file: FolderFile {
            original_name,
            relative_path: None,
            spooled,
            size,
            content_type,
        },
    })
}
