//! Integration tests for range downloads and listing.

mod helpers;

use http::StatusCode;
use serde_json::json;

use helpers::{TestApp, payload};

fn store(app: &TestApp, name: &str, data: &[u8]) {
    std::fs::write(app.artifacts().join(name), data).unwrap();
}

#[tokio::test]
async fn test_range_request_returns_partial_content() {
    let app = TestApp::new().await;
    let data = payload(1000);
    store(&app, "file.bin", &data);

    let response = app
        .get_raw("/download/file.bin", &[("Range", "bytes=0-99")])
        .await;
    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.header("content-range"), Some("bytes 0-99/1000"));
    assert_eq!(response.header("content-length"), Some("100"));
    assert_eq!(response.header("accept-ranges"), Some("bytes"));
    assert_eq!(response.body, &data[..100]);
}

#[tokio::test]
async fn test_open_ended_and_clamped_ranges() {
    let app = TestApp::new().await;
    let data = payload(1000);
    store(&app, "file.bin", &data);

    let response = app
        .get_raw("/download/file.bin", &[("Range", "bytes=900-")])
        .await;
    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.header("content-range"), Some("bytes 900-999/1000"));
    assert_eq!(response.body, &data[900..]);

    let response = app
        .get_raw("/download/file.bin", &[("Range", "bytes=990-5000")])
        .await;
    assert_eq!(response.header("content-range"), Some("bytes 990-999/1000"));
    assert_eq!(response.body.len(), 10);
}

#[tokio::test]
async fn test_full_download() {
    let app = TestApp::new().await;
    let data = payload(1000);
    store(&app, "file.bin", &data);

    let response = app.get_raw("/download/file.bin", &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-length"), Some("1000"));
    assert_eq!(response.header("accept-ranges"), Some("bytes"));
    assert_eq!(response.header("content-type"), Some("application/octet-stream"));
    assert!(
        response
            .header("content-disposition")
            .unwrap()
            .starts_with("attachment; filename=\"file.bin\"")
    );
    assert_eq!(response.body, data);
}

#[tokio::test]
async fn test_unsatisfiable_or_malformed_range_serves_whole_file() {
    let app = TestApp::new().await;
    store(&app, "file.bin", &payload(1000));

    for range in ["bytes=2000-", "bytes=50-10", "items=0-1", "bytes=0-1,5-9", "bytes=-100"] {
        let response = app.get_raw("/download/file.bin", &[("Range", range)]).await;
        assert_eq!(response.status, StatusCode::OK, "range {range}");
        assert_eq!(response.body.len(), 1000, "range {range}");
    }
}

#[tokio::test]
async fn test_percent_encoded_name() {
    let app = TestApp::new().await;
    store(&app, "my report.txt", b"report");

    let response = app.get_raw("/download/my%20report.txt", &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"report");
    assert!(
        response
            .header("content-disposition")
            .unwrap()
            .ends_with("filename*=UTF-8''my%20report.txt")
    );
}

#[tokio::test]
async fn test_missing_file_answers_with_listing() {
    let app = TestApp::new().await;
    store(&app, "b.bin", b"b");
    store(&app, "a.bin", b"a");

    let response = app.request("GET", "/download/ghost.bin", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["code"], 0);
    assert_eq!(
        response.body["data"],
        json!({"exists": false, "requestedFile": "ghost.bin", "available": ["a.bin", "b.bin"]})
    );
}

#[tokio::test]
async fn test_traversal_is_rejected() {
    let app = TestApp::new().await;
    std::fs::write(app.root().join("secret.txt"), b"secret").unwrap();

    let response = app.get_raw("/download/..%2Fsecret.txt", &[]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_ne!(response.body, b"secret");
}

#[tokio::test]
async fn test_list_excludes_directories_and_staging() {
    let app = TestApp::new().await;
    store(&app, "big.bin", &payload(2048));
    std::fs::create_dir_all(app.artifacts().join("chunkCache_pending")).unwrap();

    let response = app.request("GET", "/download/list", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let files = response.body["data"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["filename"], "big.bin");
    assert_eq!(files[0]["size"], "2 KB");
    assert_eq!(files[0]["sizeBytes"], 2048);
}

#[tokio::test]
async fn test_merged_file_is_downloadable() {
    let app = TestApp::new().await;
    let data = payload(3000);
    for (i, part) in data.chunks(1024).enumerate() {
        let response = app.upload_chunk("dl", &format!("dl-{i}"), "clip.mov", part).await;
        assert_eq!(response.status, StatusCode::OK);
    }
    let response = app
        .request(
            "POST",
            "/merge",
            Some(json!({"fileHash": "dl", "fileName": "clip.mov", "chunkSize": 1024, "fileSize": 3000})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .get_raw("/download/dl.mov", &[("Range", "bytes=1000-2047")])
        .await;
    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.body, &data[1000..2048]);
}
