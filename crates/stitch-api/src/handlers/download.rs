//! Artifact download and listing handlers.

use axum::Json;
use axum::body::Body;
use axum::extract::{RawPathParams, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use stitch_core::error::AppError;
use stitch_service::{DownloadOutcome, DownloadResult, StoredFileInfo};

use crate::dto::response::{ApiResponse, MissingFileResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Characters left unescaped in an RFC 5987 `filename*` value.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// GET /download/list: stored files
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<StoredFileInfo>>>, ApiError> {
    let files = state.download_service.list().await?;
    Ok(Json(ApiResponse::ok(files)))
}

/// GET /download/{filename}: whole file or a single byte range
pub async fn download_file(
    State(state): State<AppState>,
    params: RawPathParams,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    // Raw so the name is percent-decoded exactly once, by the service.
    let filename = params
        .iter()
        .find(|(key, _)| *key == "filename")
        .map(|(_, value)| value.to_string())
        .ok_or_else(|| AppError::validation("filename is required"))?;
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    match state.download_service.open(&filename, range).await? {
        DownloadOutcome::Found(result) => Ok(file_response(result)?),
        DownloadOutcome::Missing {
            requested_file,
            available,
        } => Ok(Json(ApiResponse::with_msg(
            "File not found",
            MissingFileResponse {
                exists: false,
                requested_file,
                available,
            },
        ))
        .into_response()),
    }
}

fn file_response(result: DownloadResult) -> Result<Response, AppError> {
    let content_length = result.content_length();
    let builder = Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, content_length);

    let builder = match result.range {
        Some(range) => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, range.content_range()),
        None => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_DISPOSITION, content_disposition(&result.filename)?),
    };

    builder
        .body(Body::from_stream(result.stream))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))
}

/// `attachment` disposition with an ASCII fallback and the exact UTF-8 name.
fn content_disposition(filename: &str) -> Result<HeaderValue, AppError> {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(filename, ATTR_CHAR);
    HeaderValue::from_str(&format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"
    ))
    .map_err(|e| AppError::internal(format!("Invalid Content-Disposition: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        let value = content_disposition("report.pdf").unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf"
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition("résumé v2.txt").unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "attachment; filename=\"r_sum_ v2.txt\"; filename*=UTF-8''r%C3%A9sum%C3%A9%20v2.txt"
        );
    }

    #[test]
    fn test_content_disposition_quotes_are_replaced() {
        let value = content_disposition("a\"b.txt").unwrap();
        assert!(value.to_str().unwrap().starts_with("attachment; filename=\"a_b.txt\""));
    }
}
