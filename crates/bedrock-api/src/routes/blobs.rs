//! Serves blobs from the local disk store.
//!
//! Public URLs are served as-is. Requests carrying `expires` and
//! `signature` must pass verification.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bedrock_storage::error::{ProviderError, StorageError};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Signature parameters of a signed URL.
#[derive(Debug, Deserialize)]
pub struct SignatureQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

/// GET /files/{*path}
async fn serve_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<SignatureQuery>,
) -> Result<Response, ApiError> {
    let Some(blobs) = &state.local_blobs else {
        return Err(StorageError::FileNotFound(path).into());
    };

    match (query.expires, query.signature.as_deref()) {
        (None, None) => {}
        (Some(expires), Some(signature)) if blobs.verify_signature(&path, expires, signature) => {}
        _ => return Err(ApiError::Forbidden("invalid or expired signature".into())),
    }

    let bytes = match blobs.read(&path).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) | Err(ProviderError::Backend(_)) => {
            return Err(StorageError::FileNotFound(path).into());
        }
        Err(err) => return Err(StorageError::from(err).into()),
    };

    let content_type = state
        .files
        .find_by_path(&path)
        .await?
        .map_or_else(
            || FALLBACK_CONTENT_TYPE.to_owned(),
            |file| file.metadata().mime_type().to_owned(),
        );

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// Returns the router for local blob downloads.
pub fn router() -> Router<AppState> {
    Router::new().route("/{*path}", get(serve_blob))
}
