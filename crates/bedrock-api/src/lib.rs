//! Bedrock — HTTP API.
//!
//! Thin axum layer over the Identity and Storage use cases. Routes
//! translate requests into commands and queries; they hold no logic of
//! their own.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;

use crate::state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/users", routes::users::router())
        .nest("/api/v1/files", routes::files::router())
        .nest("/files", routes::blobs::router())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
