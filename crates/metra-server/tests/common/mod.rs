#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use metra_server::app;
use metra_server::state::AppState;
use metra_storage::{MemStorage, SqliteBackend, Storage};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

#[derive(Default)]
pub struct ContextOptions {
    pub sign_key: Option<String>,
    pub with_backend: bool,
    pub dump_on_update: bool,
}

pub fn build_test_context() -> TestContext {
    build_test_context_with(ContextOptions::default())
}

pub fn build_test_context_with(options: ContextOptions) -> TestContext {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemStorage::new());
    let backend = if options.with_backend {
        Some(Arc::new(
            SqliteBackend::open(&temp_dir.path().join("audit.db")).unwrap(),
        ))
    } else {
        None
    };

    let state = AppState {
        store: store as Arc<dyn Storage>,
        backend,
        sign_key: options.sign_key.map(Arc::new),
        snapshot_path: Arc::new(temp_dir.path().join("metrics-db.json")),
        dump_on_update: options.dump_on_update,
    };
    let app = app::build_app(state.clone());

    TestContext {
        temp_dir,
        state,
        app,
    }
}

pub async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

pub async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

pub async fn post_text(app: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "text/plain")
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

pub async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

pub fn body_str(body: &[u8]) -> String {
    String::from_utf8(body.to_vec()).unwrap()
}

pub fn body_json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}
