//! Bedrock — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bedrock_core::error::DomainError;
use bedrock_storage::error::StorageError;
use serde::Serialize;
use thiserror::Error;

/// Startup errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration or storage adapter setup failed.
    #[error("startup error: {0}")]
    Startup(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around use-case errors that implements `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    Storage(StorageError),
    /// A signed URL failed verification.
    Forbidden(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Domain(inner) => Self::Domain(inner),
            other => Self::Storage(other),
        }
    }
}

fn domain_status(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        DomainError::AggregateNotFound(_) => (StatusCode::NOT_FOUND, "aggregate_not_found"),
        DomainError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::Infrastructure(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
        }
    }
}

fn storage_status(err: &StorageError) -> (StatusCode, &'static str) {
    match err {
        StorageError::FileNotFound(_) => (StatusCode::NOT_FOUND, "file_not_found"),
        StorageError::InvalidFileType { .. } => {
            (StatusCode::UNSUPPORTED_MEDIA_TYPE, "invalid_file_type")
        }
        StorageError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "file_too_large"),
        StorageError::InvalidImageDimensions(_) => {
            (StatusCode::BAD_REQUEST, "invalid_image_dimensions")
        }
        StorageError::StorageUpload(_) => (StatusCode::BAD_GATEWAY, "storage_upload_failed"),
        StorageError::Infrastructure(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
        }
        StorageError::Domain(inner) => domain_status(inner),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ((status, error_code), message) = match &self {
            Self::Domain(err) => (domain_status(err), err.to_string()),
            Self::Storage(err) => (storage_status(err), err.to_string()),
            Self::Forbidden(reason) => ((StatusCode::FORBIDDEN, "forbidden"), reason.clone()),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "request failed");
        }

        let body = ErrorBody {
            error: error_code,
            message,
        };

        (status, Json(body)).into_response()
    }
}
