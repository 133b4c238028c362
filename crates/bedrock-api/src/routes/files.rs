//! Routes for the Storage bounded context.
//!
//! Owner-addressed routes live at `/{entity_type}/{entity_id}/{field}`;
//! id-addressed routes live under the static `/id/` prefix.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bedrock_storage::application::command_handlers::{
    handle_delete_file, handle_delete_file_by_entity,
};
use bedrock_storage::application::ports::{
    FitMode, OutputFormat, TransformOptions, ValidationOptions, DEFAULT_QUALITY,
};
use bedrock_storage::application::query_handlers::{FileUrlView, FileView, get_file_url};
use bedrock_storage::application::upload::handle_upload_file;
use bedrock_storage::domain::commands::{
    DEFAULT_SIGNED_URL_MINUTES, DeleteFile, DeleteFileByEntity, FileLocator, GetFileUrl,
    UploadFile,
};
use bedrock_storage::domain::value_objects::FileOwner;
use bedrock_storage::error::StorageError;
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Query string for the raw-body upload route.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
    /// Replace the owner's current file. On unless the caller opts out.
    #[serde(default = "default_replace")]
    pub replace: bool,
    pub max_size_bytes: Option<u64>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Option<FitMode>,
    pub format: Option<OutputFormat>,
    pub quality: Option<u8>,
}

fn default_replace() -> bool {
    true
}

impl UploadQuery {
    /// Constraints to enforce, or `None` when the caller gave none.
    fn validation(&self) -> Option<ValidationOptions> {
        let options = ValidationOptions {
            allowed_mime_types: None,
            max_size_bytes: self.max_size_bytes,
            min_width: self.min_width,
            max_width: self.max_width,
            min_height: self.min_height,
            max_height: self.max_height,
        };
        (options != ValidationOptions::default()).then_some(options)
    }

    fn transform(&self) -> Option<TransformOptions> {
        if self.width.is_none() && self.height.is_none() {
            return None;
        }
        Some(TransformOptions {
            width: self.width,
            height: self.height,
            fit: self.fit.unwrap_or_default(),
            quality: self.quality.unwrap_or(DEFAULT_QUALITY),
            format: self.format.unwrap_or_default(),
        })
    }
}

/// Query string for the URL routes.
#[derive(Debug, Default, Deserialize)]
pub struct UrlQuery {
    #[serde(default)]
    pub signed: bool,
    pub expires_in_minutes: Option<u32>,
}

impl UrlQuery {
    fn into_query(self, locator: FileLocator) -> GetFileUrl {
        GetFileUrl {
            locator,
            signed: self.signed,
            expires_in_minutes: self
                .expires_in_minutes
                .unwrap_or(DEFAULT_SIGNED_URL_MINUTES),
        }
    }
}

/// POST /api/v1/files/{entity_type}/{entity_id}/{field}
async fn upload_file(
    State(state): State<AppState>,
    Path((entity_type, entity_id, field)): Path<(String, String, String)>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<FileView>), ApiError> {
    let command = UploadFile {
        correlation_id: Uuid::new_v4(),
        owner: FileOwner::new(entity_type, entity_id, field),
        filename: query.filename.clone(),
        bytes: body,
        environment: state.settings.environment.clone(),
        validation: query.validation(),
        transform: query.transform(),
        replace_existing: query.replace,
    };
    let (file, events) = handle_upload_file(
        &command,
        state.settings.replace_strategy,
        state.clock.as_ref(),
        state.ingestion_ports(),
    )
    .await?;

    state.storage_events.enqueue(events);
    state.storage_events.dispatch_for(file.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(FileView::new(&file, state.storage.as_ref())),
    ))
}

/// DELETE /api/v1/files/{entity_type}/{entity_id}/{field}
async fn delete_owner_file(
    State(state): State<AppState>,
    Path((entity_type, entity_id, field)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let command = DeleteFileByEntity {
        correlation_id: Uuid::new_v4(),
        owner: FileOwner::new(entity_type, entity_id, field),
    };
    handle_delete_file_by_entity(
        &command,
        state.clock.as_ref(),
        state.files.as_ref(),
        state.storage.as_ref(),
        &state.storage_events,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/files/{entity_type}/{entity_id}/{field}/url
async fn owner_file_url(
    State(state): State<AppState>,
    Path((entity_type, entity_id, field)): Path<(String, String, String)>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<FileUrlView>, ApiError> {
    let owner = FileOwner::new(entity_type, entity_id, field);
    let view = get_file_url(
        &query.into_query(FileLocator::Owner(owner)),
        state.files.as_ref(),
        state.storage.as_ref(),
    )
    .await?;
    Ok(Json(view))
}

/// GET /api/v1/files/id/{id}
async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<FileView>, ApiError> {
    let file = state
        .files
        .find_by_id(file_id)
        .await?
        .ok_or_else(|| StorageError::FileNotFound(file_id.to_string()))?;
    Ok(Json(FileView::new(&file, state.storage.as_ref())))
}

/// GET /api/v1/files/id/{id}/url
async fn file_url(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<FileUrlView>, ApiError> {
    let view = get_file_url(
        &query.into_query(FileLocator::Id(file_id)),
        state.files.as_ref(),
        state.storage.as_ref(),
    )
    .await?;
    Ok(Json(view))
}

/// DELETE /api/v1/files/id/{id}
async fn delete_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = DeleteFile {
        correlation_id: Uuid::new_v4(),
        file_id,
    };
    handle_delete_file(&command, state.files.as_ref(), state.storage.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for the storage context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{entity_type}/{entity_id}/{field}",
            post(upload_file).delete(delete_owner_file),
        )
        .route("/{entity_type}/{entity_id}/{field}/url", get(owner_file_url))
        .route("/id/{id}", get(get_file).delete(delete_file))
        .route("/id/{id}/url", get(file_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(width: Option<u32>, height: Option<u32>) -> UploadQuery {
        UploadQuery {
            filename: "a.png".into(),
            replace: false,
            max_size_bytes: Some(1024),
            min_width: None,
            max_width: None,
            min_height: Some(10),
            max_height: None,
            width,
            height,
            fit: None,
            format: None,
            quality: None,
        }
    }

    #[test]
    fn test_upload_query_without_size_skips_transform() {
        let query = query(None, None);

        let validation = query.validation().unwrap();

        assert!(query.transform().is_none());
        assert_eq!(validation.max_size_bytes, Some(1024));
        assert_eq!(validation.min_height, Some(10));
    }

    #[test]
    fn test_upload_query_without_constraints_skips_validation() {
        let mut query = query(None, None);
        query.max_size_bytes = None;
        query.min_height = None;

        assert!(query.validation().is_none());
    }

    #[test]
    fn test_upload_query_replaces_by_default() {
        let query: UploadQuery = serde_json::from_value(serde_json::json!({
            "filename": "a.png"
        }))
        .unwrap();

        assert!(query.replace);
        assert!(query.validation().is_none());
    }

    #[test]
    fn test_upload_query_transform_uses_defaults() {
        let transform = query(Some(64), None).transform().unwrap();

        assert_eq!(transform.width, Some(64));
        assert_eq!(transform.fit, FitMode::Cover);
        assert_eq!(transform.format, OutputFormat::Jpeg);
        assert_eq!(transform.quality, DEFAULT_QUALITY);
    }

    #[test]
    fn test_url_query_defaults_expiry() {
        let query = UrlQuery::default().into_query(FileLocator::Id(Uuid::nil()));

        assert!(!query.signed);
        assert_eq!(query.expires_in_minutes, DEFAULT_SIGNED_URL_MINUTES);
    }
}
