//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use bedrock_api::state::AppState;
use bedrock_core::clock::Clock;
use bedrock_identity::infrastructure::in_memory::InMemoryUserRepository;
use bedrock_storage::application::settings::StorageSettings;
use bedrock_storage::infrastructure::image_processor::RasterImageProcessor;
use bedrock_storage::infrastructure::in_memory::{InMemoryFileRepository, InMemoryStorageProvider};
use bedrock_storage::infrastructure::local::LocalStorageProvider;
use bedrock_storage::infrastructure::validator::ImageFileValidator;
use bedrock_test_support::FixedClock;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgba, RgbaImage};
use tower::ServiceExt;

pub const PUBLIC_BASE_URL: &str = "http://cdn.test/files";
const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

/// Router plus handles on the in-memory adapters behind it.
pub struct TestApp {
    pub router: Router,
    pub users: Arc<InMemoryUserRepository>,
    pub files: Arc<InMemoryFileRepository>,
    pub storage: Arc<InMemoryStorageProvider>,
}

/// Every test runs in January 2026 under the `test` environment.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::at_month(2026, 1))
}

fn settings() -> StorageSettings {
    StorageSettings {
        environment: "test".to_owned(),
        ..StorageSettings::default()
    }
}

/// Build the full app router over in-memory adapters. Uses the same route
/// structure as `main.rs`.
pub fn build_test_app() -> TestApp {
    let users = Arc::new(InMemoryUserRepository::new());
    let files = Arc::new(InMemoryFileRepository::new());
    let storage = Arc::new(InMemoryStorageProvider::new(PUBLIC_BASE_URL));
    let state = AppState::new(
        fixed_clock(),
        users.clone(),
        files.clone(),
        storage.clone(),
        Arc::new(ImageFileValidator::new()),
        Arc::new(RasterImageProcessor::new()),
        settings(),
    );

    TestApp {
        router: bedrock_api::build_router(state, MAX_UPLOAD_BYTES),
        users,
        files,
        storage,
    }
}

/// Build the app with blobs on local disk under `root`, served at `/files`.
pub async fn build_local_disk_app(root: &std::path::Path) -> (Router, Arc<InMemoryFileRepository>) {
    let clock = fixed_clock();
    let files = Arc::new(InMemoryFileRepository::new());
    let blobs = Arc::new(
        LocalStorageProvider::new(root, "http://localhost:3000/files", "test-secret", clock.clone())
            .await
            .unwrap(),
    );
    let state = AppState::new(
        clock,
        Arc::new(InMemoryUserRepository::new()),
        files.clone(),
        blobs.clone(),
        Arc::new(ImageFileValidator::new()),
        Arc::new(RasterImageProcessor::new()),
        settings(),
    )
    .with_local_blobs(blobs);

    (bedrock_api::build_router(state, MAX_UPLOAD_BYTES), files)
}

/// An encoded PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([10, 120, 200, 255]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Send a request and return the status, content type and raw body.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: Vec<u8>,
) -> (StatusCode, Option<String>, Bytes) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let request = builder.body(Body::from(body)).unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .map(|value| value.to_str().unwrap().to_owned());
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    (status, content_type, body_bytes)
}

fn parse(body: &Bytes) -> serde_json::Value {
    if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(body).unwrap()
    }
}

/// Send a request with a JSON body and return the response.
pub async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let (status, _, bytes) = send(
        app,
        method,
        uri,
        Some("application/json"),
        serde_json::to_vec(body).unwrap(),
    )
    .await;
    (status, parse(&bytes))
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send_json(app, Method::POST, uri, body).await
}

/// Send a raw upload and return the response.
pub async fn post_bytes(app: Router, uri: &str, body: Vec<u8>) -> (StatusCode, serde_json::Value) {
    let (status, _, bytes) = send(
        app,
        Method::POST,
        uri,
        Some("application/octet-stream"),
        body,
    )
    .await;
    (status, parse(&bytes))
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, bytes) = send(app, Method::GET, uri, None, Vec::new()).await;
    (status, parse(&bytes))
}

/// Send a DELETE request and return the response.
pub async fn delete(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, bytes) = send(app, Method::DELETE, uri, None, Vec::new()).await;
    (status, parse(&bytes))
}
