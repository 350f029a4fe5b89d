//! Functional tests for the artifact store

#[path = "../common/mod.rs"]
mod common;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, HOST},
        Request, StatusCode,
    },
    Router,
};
use common::{body_bytes, body_json, multipart_request, Part};
use flux_imaging::config::FileServerConfig;
use flux_imaging::file_server::{create_router, storage::FileStorage, FileServerState};
use std::fs::File;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "s3cret";

fn config(dir: &TempDir) -> FileServerConfig {
    FileServerConfig {
        storage_dir: dir.path().to_string_lossy().into_owned(),
        bearer_token: Some(TOKEN.to_string()),
        ..Default::default()
    }
}

fn app(config: &FileServerConfig) -> Router {
    let state = Arc::new(FileServerState::from_config(config).unwrap());
    create_router(state, config)
}

fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut request = Request::builder().uri(uri).header(HOST, "files.example");
    if let Some(value) = authorization {
        request = request.header(AUTHORIZATION, value);
    }
    request.body(Body::empty()).unwrap()
}

fn write_with_mtime(dir: &TempDir, id: &str, data: &[u8], age: Duration) {
    let path = dir.path().join(id);
    std::fs::write(&path, data).unwrap();
    let file = File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

#[tokio::test]
async fn test_upload_then_fetch() {
    let dir = TempDir::new().unwrap();
    let app = app(&config(&dir));

    let response = app
        .clone()
        .oneshot(multipart_request("/upload", &[Part::File("file", "photo.PNG", b"pngdata")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let url = body_json(response).await["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/i/"));
    assert!(url.ends_with(".png"));

    let response = app.oneshot(get(&url, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
    assert_eq!(body_bytes(response).await, b"pngdata");
}

#[tokio::test]
async fn test_upload_with_unknown_extension_is_stored_as_bin() {
    let dir = TempDir::new().unwrap();
    let response = app(&config(&dir))
        .oneshot(multipart_request("/upload", &[Part::File("file", "run.sh", b"echo")]))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["url"].as_str().unwrap().ends_with(".bin"));
}

#[tokio::test]
async fn test_empty_upload_is_rejected() {
    let dir = TempDir::new().unwrap();
    let response = app(&config(&dir))
        .oneshot(multipart_request("/upload", &[Part::File("file", "a.png", b"")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_and_traversing_ids_are_not_found() {
    let dir = TempDir::new().unwrap();
    let app = app(&config(&dir));

    let response = app.clone().oneshot(get("/i/missing.png", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/i/..%2Fsecret", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_latest_requires_bearer_token() {
    let dir = TempDir::new().unwrap();
    write_with_mtime(&dir, "a.png", b"a", Duration::from_secs(10));
    let app = app(&config(&dir));

    let response = app.clone().oneshot(get("/latest", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(get("/latest", Some("Bearer wrong"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_latest_returns_newest_file_in_fixed_offset() {
    let dir = TempDir::new().unwrap();
    write_with_mtime(&dir, "older.png", b"old", Duration::from_secs(120));
    write_with_mtime(&dir, "newer.png", b"new", Duration::from_secs(5));
    let app = app(&config(&dir));
    let bearer = format!("Bearer {}", TOKEN);

    let response = app.clone().oneshot(get("/latest", Some(&bearer))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["url"], "https://files.example/i/newer.png");
    let updated_at = body["updated_at"].as_str().unwrap();
    assert!(updated_at.ends_with("+09:00"), "{}", updated_at);
    assert!(chrono::DateTime::parse_from_rfc3339(updated_at).is_ok());

    let response = app.oneshot(get("/latest/raw", Some(&bearer))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"new");
}

#[tokio::test]
async fn test_latest_uses_public_base_url() {
    let dir = TempDir::new().unwrap();
    write_with_mtime(&dir, "only.webp", b"w", Duration::from_secs(1));
    let config = FileServerConfig {
        public_base_url: Some("https://cdn.example/".to_string()),
        utc_offset_hours: 0,
        ..config(&dir)
    };

    let response = app(&config)
        .oneshot(get("/latest", Some(&format!("Bearer {}", TOKEN))))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["url"], "https://cdn.example/i/only.webp");
    assert!(body["updated_at"].as_str().unwrap().ends_with("+00:00"));
}

#[tokio::test]
async fn test_latest_on_empty_store_is_not_found() {
    let dir = TempDir::new().unwrap();
    let response = app(&config(&dir))
        .oneshot(get("/latest", Some(&format!("Bearer {}", TOKEN))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cleanup_removes_only_expired_files() {
    let dir = TempDir::new().unwrap();
    write_with_mtime(&dir, "stale.png", b"s", Duration::from_secs(3600));
    write_with_mtime(&dir, "fresh.png", b"f", Duration::from_secs(1));
    let storage = FileStorage::new(dir.path());

    let deleted = storage.cleanup(Duration::from_secs(600)).await.unwrap();

    assert_eq!(deleted, 1);
    let remaining: Vec<String> = storage.list().await.unwrap().into_iter().map(|f| f.id).collect();
    assert_eq!(remaining, vec!["fresh.png".to_string()]);
}
