//! Chunk upload, verify and merge handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use bytes::Bytes;

use stitch_core::error::AppError;
use stitch_core::types::{ChunkName, FileIdentity};
use stitch_service::VerifyResult;

use crate::dto::request::{MergeRequest, VerifyRequest};
use crate::dto::response::{ApiResponse, MergeResponse, UploadChunkResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /upload: store one chunk
pub async fn upload_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadChunkResponse>>, ApiError> {
    let mut file_hash: Option<String> = None;
    let mut chunk_hash: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut payload: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "fileHash" => file_hash = Some(field.text().await?),
            "chunkHash" => chunk_hash = Some(field.text().await?),
            "fileName" => file_name = Some(field.text().await?),
            "chunkFile" => payload = Some(field.bytes().await?),
            _ => {}
        }
    }

    let file_hash = file_hash.ok_or_else(|| AppError::validation("fileHash is required"))?;
    let chunk_hash = chunk_hash.ok_or_else(|| AppError::validation("chunkHash is required"))?;
    let file_name = file_name.ok_or_else(|| AppError::validation("fileName is required"))?;
    let payload = payload.ok_or_else(|| AppError::validation("chunkFile is required"))?;

    let identity = FileIdentity::new(file_hash, file_name)?;
    let chunk = ChunkName::parse(&chunk_hash)?;
    let size = state
        .upload_service
        .upload_chunk(&identity, &chunk, payload)
        .await?;

    Ok(Json(ApiResponse::with_msg(
        "Chunk uploaded",
        UploadChunkResponse {
            file_hash: identity.file_hash,
            chunk_hash: chunk.to_string(),
            file_name: identity.file_name,
            size,
        },
    )))
}

/// POST /verify: report whether the file still needs uploading
pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<VerifyResult>>, ApiError> {
    let Json(req) = payload?;
    let identity = req.identity()?;
    let result = state.upload_service.verify(&identity).await?;
    let msg = if result.should_upload {
        "Upload required"
    } else {
        "File already exists"
    };
    Ok(Json(ApiResponse::with_msg(msg, result)))
}

/// POST /merge: assemble staged chunks into the stored file
pub async fn merge(
    State(state): State<AppState>,
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<MergeResponse>>, ApiError> {
    let Json(req) = payload?;
    let identity = req.identity()?;
    let outcome = state
        .upload_service
        .merge(&identity, req.chunk_size, req.file_size)
        .await?;
    Ok(Json(ApiResponse::with_msg("Merge complete", outcome.into())))
}
