//! Integration tests for folder upload and read-back.

mod helpers;

use http::StatusCode;
use serde_json::json;

use helpers::{MultipartForm, TestApp};

#[tokio::test]
async fn test_folder_upload_mirrors_tree() {
    let app = TestApp::new().await;
    let form = MultipartForm::new()
        .text("folderName", "docs")
        .text("paths", r#"["docs/readme.txt","docs/sub/data.json"]"#)
        .file("files", "readme.txt", "text/plain", b"hello")
        .file("files", "data.json", "application/json", b"{}");

    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

    let data = &response.body["data"];
    assert_eq!(data["folderName"], "docs");
    assert_eq!(data["totalFiles"], 2);
    assert_eq!(data["files"][1]["relativePath"], "docs/sub/data.json");
    assert_eq!(data["files"][1]["directory"], "docs/sub");
    assert_eq!(data["files"][1]["mimeType"], "application/json");

    let docs = &data["structure"]["docs"];
    assert_eq!(docs["type"], "directory");
    assert_eq!(docs["children"]["readme.txt"]["size"], 5);
    assert_eq!(docs["children"]["sub"]["children"]["data.json"]["path"], "docs/sub/data.json");

    assert_eq!(
        std::fs::read(app.uploads().join("docs/sub/data.json")).unwrap(),
        b"{}"
    );
    assert_eq!(std::fs::read(app.uploads().join("docs/readme.txt")).unwrap(), b"hello");
}

#[tokio::test]
async fn test_indexed_fields_and_repeated_paths() {
    let app = TestApp::new().await;
    let form = MultipartForm::new()
        .file("files[1]", "b.txt", "text/plain", b"bb")
        .file("files[0]", "a.txt", "text/plain", b"a")
        .text("paths", "proj/a.txt")
        .text("paths", "proj/x/b.txt")
        .text("folderName", "proj");

    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(std::fs::read(app.uploads().join("proj/a.txt")).unwrap(), b"a");
    assert_eq!(std::fs::read(app.uploads().join("proj/x/b.txt")).unwrap(), b"bb");
}

#[tokio::test]
async fn test_out_of_range_field_index_is_rejected() {
    let app = TestApp::new().await;
    for field in ["paths[18446744073709551615]", "paths[1000000000000]"] {
        let form = MultipartForm::new()
            .text("folderName", "big")
            .text(field, "big/a.txt")
            .file("files", "a.txt", "text/plain", b"a");
        let response = app.multipart("/folder-upload", form).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{field}");
        assert_eq!(response.body["error"], "VALIDATION");
    }

    let form = MultipartForm::new()
        .text("folderName", "big")
        .file("files[18446744073709551615]", "a.txt", "text/plain", b"a");
    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(!app.uploads().join("big").exists());
}

#[tokio::test]
async fn test_file_and_directory_with_same_path_both_survive() {
    let app = TestApp::new().await;
    let form = MultipartForm::new()
        .text("folderName", "p")
        .text("paths", r#"["p/a/b","p/a/b/c.txt"]"#)
        .file("files", "b", "text/plain", b"plain")
        .file("files", "c.txt", "text/plain", b"nested");

    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

    let data = &response.body["data"];
    assert_eq!(data["totalFiles"], 2);
    assert_eq!(data["files"][1]["relativePath"], "p/a/b_dir/c.txt");

    let a = &data["structure"]["p"]["children"]["a"]["children"];
    assert_eq!(a["b"]["type"], "file");
    assert_eq!(a["b_dir"]["type"], "directory");
    assert_eq!(a["b_dir"]["children"]["c.txt"]["path"], "p/a/b_dir/c.txt");

    assert_eq!(std::fs::read(app.uploads().join("p/a/b")).unwrap(), b"plain");
    assert_eq!(
        std::fs::read(app.uploads().join("p/a/b_dir/c.txt")).unwrap(),
        b"nested"
    );
}

#[tokio::test]
async fn test_directory_clashing_with_stored_file_is_renamed() {
    let app = TestApp::new().await;
    let form = MultipartForm::new()
        .text("folderName", "s")
        .text("paths", r#"["s/x"]"#)
        .file("files", "x", "text/plain", b"first");
    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::OK);

    let form = MultipartForm::new()
        .text("folderName", "s")
        .text("paths", r#"["s/x/y.txt"]"#)
        .file("files", "y.txt", "text/plain", b"second");
    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["data"]["files"][0]["relativePath"], "s/x_dir/y.txt");

    assert_eq!(std::fs::read(app.uploads().join("s/x")).unwrap(), b"first");
    assert_eq!(std::fs::read(app.uploads().join("s/x_dir/y.txt")).unwrap(), b"second");
}

#[tokio::test]
async fn test_file_without_path_lands_in_folder() {
    let app = TestApp::new().await;
    let form = MultipartForm::new()
        .text("folderName", "loose")
        .file("files", "note.txt", "text/plain", b"n");

    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["data"]["files"][0]["relativePath"], "loose/note.txt");
    assert!(app.uploads().join("loose/note.txt").exists());
}

#[tokio::test]
async fn test_traversal_rejects_whole_batch() {
    let app = TestApp::new().await;
    let form = MultipartForm::new()
        .text("folderName", "docs")
        .text("paths", r#"["docs/ok.txt","../../etc/passwd"]"#)
        .file("files", "ok.txt", "text/plain", b"ok")
        .file("files", "passwd", "text/plain", b"root");

    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION");
    assert!(!app.uploads().join("docs/ok.txt").exists());
    assert!(!app.root().join("etc").exists());

    // Nothing is left behind in the spool.
    let spool = std::fs::read_dir(&app.config.storage.spool_root).unwrap().count();
    assert_eq!(spool, 0);
}

#[tokio::test]
async fn test_missing_folder_name_or_files() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().file("files", "a.txt", "text/plain", b"a");
    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let form = MultipartForm::new().text("folderName", "empty");
    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_too_many_files() {
    let app = TestApp::with_config(|c| c.storage.max_folder_files = 1).await;
    let form = MultipartForm::new()
        .text("folderName", "many")
        .file("files", "a.txt", "text/plain", b"a")
        .file("files", "b.txt", "text/plain", b"b");
    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reupload_replaces_existing_file() {
    let app = TestApp::new().await;
    for body in [b"first".as_slice(), b"second".as_slice()] {
        let form = MultipartForm::new()
            .text("folderName", "r")
            .text("paths", r#"["r/f.txt"]"#)
            .file("files", "f.txt", "text/plain", body);
        let response = app.multipart("/folder-upload", form).await;
        assert_eq!(response.status, StatusCode::OK);
    }
    assert_eq!(std::fs::read(app.uploads().join("r/f.txt")).unwrap(), b"second");
}

#[tokio::test]
async fn test_structure_and_exists() {
    let app = TestApp::new().await;
    let form = MultipartForm::new()
        .text("folderName", "site")
        .text("paths", r#"["site/index.html","site/css/app.css"]"#)
        .file("files", "index.html", "text/html", b"<html>")
        .file("files", "app.css", "text/css", b"body{}");
    let response = app.multipart("/folder-upload", form).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.request("GET", "/folder-upload/site/exists", None).await;
    assert_eq!(response.body["data"], json!({"folderName": "site", "exists": true}));

    let response = app.request("GET", "/folder-upload/nope/exists", None).await;
    assert_eq!(response.body["data"]["exists"], false);

    let response = app.request("GET", "/folder-upload/site/structure", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let root = &response.body["data"];
    assert_eq!(root["type"], "folder");
    assert_eq!(root["name"], "site");
    // Directories are listed first.
    assert_eq!(root["children"][0]["name"], "css");
    assert_eq!(root["children"][0]["children"][0]["path"], "site/css/app.css");
    assert_eq!(root["children"][1]["name"], "index.html");
    assert_eq!(root["children"][1]["size"], 6);

    let response = app.request("GET", "/folder-upload/nope/structure", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
