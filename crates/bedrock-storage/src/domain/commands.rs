//! Commands and queries for the Storage context.

use bytes::Bytes;
use uuid::Uuid;

use super::value_objects::FileOwner;
use crate::application::ports::{TransformOptions, ValidationOptions};

/// Default lifetime of a signed URL.
pub const DEFAULT_SIGNED_URL_MINUTES: u32 = 60;

/// Command to ingest one file for an owner triple.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Owner triple of the new file.
    pub owner: FileOwner,
    /// Original filename, used as the last path segment.
    pub filename: String,
    /// Raw upload.
    pub bytes: Bytes,
    /// Environment path segment.
    pub environment: String,
    /// Constraints to enforce before anything else; `None` skips validation.
    pub validation: Option<ValidationOptions>,
    /// Image transform; only the transformed bytes are stored.
    pub transform: Option<TransformOptions>,
    /// Whether the owner's current file is removed.
    pub replace_existing: bool,
}

/// Command to delete a file by identifier.
#[derive(Debug, Clone)]
pub struct DeleteFile {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The file identifier.
    pub file_id: Uuid,
}

/// Command to delete the current file of an owner triple.
#[derive(Debug, Clone)]
pub struct DeleteFileByEntity {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Owner triple.
    pub owner: FileOwner,
}

/// How a file is looked up.
#[derive(Debug, Clone)]
pub enum FileLocator {
    /// By file identifier.
    Id(Uuid),
    /// By owner triple.
    Owner(FileOwner),
}

impl std::fmt::Display for FileLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Owner(owner) => write!(f, "{owner}"),
        }
    }
}

/// Query for a URL of a stored file.
#[derive(Debug, Clone)]
pub struct GetFileUrl {
    /// Which file.
    pub locator: FileLocator,
    /// Signed (expiring) URL instead of the public one.
    pub signed: bool,
    /// Signed URL lifetime.
    pub expires_in_minutes: u32,
}

impl GetFileUrl {
    /// A public URL query.
    #[must_use]
    pub fn public(locator: FileLocator) -> Self {
        Self {
            locator,
            signed: false,
            expires_in_minutes: DEFAULT_SIGNED_URL_MINUTES,
        }
    }
}
