//! Error types for the Storage context.

use bedrock_core::error::DomainError;
use thiserror::Error;

/// Failure reported by a storage, validator or image-processor adapter.
///
/// Use cases never return it as is; it is translated into a
/// [`StorageError`] at the use-case boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Filesystem or network I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Decoding or encoding an image failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The backend rejected the request.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors returned by storage use cases.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No file matches the given id or owner triple.
    #[error("File '{0}' not found")]
    FileNotFound(String),

    /// The content type could not be detected or is not allowed.
    #[error("{}", invalid_type_message(.detected.as_deref(), .allowed))]
    InvalidFileType {
        /// Content-detected MIME type, `None` when unrecognized.
        detected: Option<String>,
        /// Allow-list the type was checked against.
        allowed: Vec<String>,
    },

    /// The payload exceeds the configured size limit.
    #[error("{}", too_large_message(.actual_bytes, .max_bytes))]
    FileTooLarge {
        /// Payload size.
        actual_bytes: u64,
        /// Configured limit.
        max_bytes: u64,
    },

    /// Image width or height is outside the configured bounds.
    #[error("{0}")]
    InvalidImageDimensions(String),

    /// The blob store rejected the upload. No metadata was written.
    #[error("Failed to upload file: {0}")]
    StorageUpload(String),

    /// An adapter failed outside the upload step.
    #[error("storage infrastructure error: {0}")]
    Infrastructure(String),

    /// A domain rule or repository call failed.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<ProviderError> for StorageError {
    fn from(err: ProviderError) -> Self {
        Self::Infrastructure(err.to_string())
    }
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Domain(inner) => inner,
            other => DomainError::Infrastructure(other.to_string()),
        }
    }
}

fn invalid_type_message(detected: Option<&str>, allowed: &[String]) -> String {
    match detected {
        Some(mime) if allowed.is_empty() => format!("File type '{mime}' is not allowed"),
        Some(mime) => format!(
            "File type '{mime}' is not allowed. Allowed: {}",
            allowed.join(", ")
        ),
        None => "Invalid or unrecognized file type".to_owned(),
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn too_large_message(actual_bytes: &u64, max_bytes: &u64) -> String {
    format!(
        "File size ({:.2}MB) exceeds maximum allowed size ({:.2}MB)",
        megabytes(*actual_bytes),
        megabytes(*max_bytes)
    )
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}
