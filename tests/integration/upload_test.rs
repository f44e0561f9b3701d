//! Integration tests for chunk upload, verify and merge.

mod helpers;

use http::StatusCode;
use serde_json::json;

use helpers::{TestApp, payload};

const CHUNK: usize = 1024;

async fn upload_all(app: &TestApp, hash: &str, name: &str, data: &[u8], order: &[usize]) {
    for &i in order {
        let start = i * CHUNK;
        let end = (start + CHUNK).min(data.len());
        let response = app
            .upload_chunk(hash, &format!("{hash}-{i}"), name, &data[start..end])
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    }
}

#[tokio::test]
async fn test_full_flow_out_of_order() {
    let app = TestApp::new().await;
    let data = payload(5 * CHUNK + 300);

    let response = app
        .request("POST", "/verify", Some(json!({"fileHash": "abc", "fileName": "movie.mp4"})))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["code"], 0);
    assert_eq!(response.body["data"]["shouldUpload"], true);
    assert_eq!(response.body["data"]["uploadedList"], json!([]));

    upload_all(&app, "abc", "movie.mp4", &data, &[5, 2, 0, 4, 1, 3]).await;

    let response = app
        .request(
            "POST",
            "/merge",
            Some(json!({
                "fileHash": "abc",
                "fileName": "movie.mp4",
                "chunkSize": CHUNK,
                "fileSize": data.len(),
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["data"]["fileName"], "abc.mp4");
    assert_eq!(response.body["data"]["chunks"], 6);
    assert_eq!(response.body["data"]["alreadyExisted"], false);

    let stored = std::fs::read(app.artifacts().join("abc.mp4")).unwrap();
    assert_eq!(stored, data);
    assert!(!app.artifacts().join("chunkCache_abc").exists());

    let response = app
        .request("POST", "/verify", Some(json!({"fileHash": "abc", "fileName": "movie.mp4"})))
        .await;
    assert_eq!(response.body["data"]["shouldUpload"], false);
    assert_eq!(response.body["data"]["uploadedList"], json!([]));
}

#[tokio::test]
async fn test_resume_lists_staged_chunks() {
    let app = TestApp::new().await;
    let data = payload(4 * CHUNK);
    upload_all(&app, "res", "a.bin", &data, &[0, 2]).await;

    let response = app
        .request("POST", "/verify", Some(json!({"fileHash": "res", "fileName": "a.bin"})))
        .await;
    assert_eq!(response.body["data"]["shouldUpload"], true);
    assert_eq!(response.body["data"]["uploadedList"], json!(["res-0", "res-2"]));
}

#[tokio::test]
async fn test_merge_with_gap_is_incomplete() {
    let app = TestApp::new().await;
    let data = payload(3 * CHUNK);
    upload_all(&app, "gap", "a.bin", &data, &[0, 2]).await;

    let response = app
        .request(
            "POST",
            "/merge",
            Some(json!({"fileHash": "gap", "fileName": "a.bin", "chunkSize": CHUNK})),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["code"], -1);
    assert_eq!(response.body["error"], "INCOMPLETE_UPLOAD");
    assert!(!app.artifacts().join("gap.bin").exists());

    // The staged chunks survive so the client can fill the gap.
    assert!(app.artifacts().join("chunkCache_gap/gap-0").exists());
}

#[tokio::test]
async fn test_unaddressable_chunk_index_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .upload_chunk("hx", &format!("hx-{}", u64::MAX), "a.bin", b"data")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION");
    assert!(!app.artifacts().join("chunkCache_hx").exists());
}

#[tokio::test]
async fn test_sparse_index_reports_a_bounded_gap() {
    let app = TestApp::new().await;
    let response = app.upload_chunk("sp", "sp-30000000", "a.bin", b"abcd").await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

    let response = app
        .request(
            "POST",
            "/merge",
            Some(json!({"fileHash": "sp", "fileName": "a.bin", "chunkSize": 4})),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "INCOMPLETE_UPLOAD");
    let msg = response.body["msg"].as_str().unwrap();
    assert!(msg.starts_with("Missing 30000000 chunks"), "{msg}");
    assert!(msg.len() < 200);
}

#[tokio::test]
async fn test_staging_directory_is_not_mistaken_for_an_artifact() {
    let app = TestApp::new().await;
    let response = app.upload_chunk("abc", "abc-0", "a.bin", b"data").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(app.artifacts().join("chunkCache_abc").is_dir());

    let identity = json!({"fileHash": "chunkCache_abc", "fileName": "noext"});
    let response = app.request("POST", "/verify", Some(identity)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["shouldUpload"], true);

    let response = app
        .request(
            "POST",
            "/merge",
            Some(json!({"fileHash": "chunkCache_abc", "fileName": "noext", "chunkSize": 4})),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_merge_without_chunks_is_incomplete() {
    let app = TestApp::new().await;
    let response = app
        .request(
            "POST",
            "/merge",
            Some(json!({"fileHash": "none", "fileName": "a.bin", "chunkSize": CHUNK})),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_second_merge_is_idempotent() {
    let app = TestApp::new().await;
    let data = payload(2 * CHUNK);
    upload_all(&app, "twice", "a.txt", &data, &[0, 1]).await;

    let body = json!({"fileHash": "twice", "fileName": "a.txt", "chunkSize": CHUNK});
    let first = app.request("POST", "/merge", Some(body.clone())).await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app.request("POST", "/merge", Some(body)).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["data"]["alreadyExisted"], true);
    assert_eq!(std::fs::read(app.artifacts().join("twice.txt")).unwrap(), data);
}

#[tokio::test]
async fn test_upload_rejects_traversal_hash() {
    let app = TestApp::new().await;
    let response = app.upload_chunk("../evil", "x-0", "a.txt", b"data").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION");
    assert!(!app.root().join("evil").exists());
}

#[tokio::test]
async fn test_upload_rejects_chunk_without_index() {
    let app = TestApp::new().await;
    let response = app.upload_chunk("h", "no-index-here", "a.txt", b"data").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_requires_all_fields() {
    let app = TestApp::new().await;
    let form = helpers::MultipartForm::new()
        .text("fileHash", "h")
        .text("fileName", "a.txt");
    let response = app.multipart("/upload", form).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], -1);
}

#[tokio::test]
async fn test_oversized_chunk_is_rejected() {
    let app = TestApp::with_config(|c| c.storage.max_chunk_bytes = 16).await;
    let response = app.upload_chunk("big", "big-0", "a.bin", &[0u8; 17]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_uses_envelope() {
    let app = TestApp::new().await;
    let response = app.request("POST", "/merge", Some(json!({"fileHash": "x"}))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], -1);
    assert_eq!(response.body["error"], "VALIDATION");
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}
