//! Query handlers for the Storage context.

use serde::Serialize;
use uuid::Uuid;

use crate::application::ports::StorageProvider;
use crate::domain::aggregates::File;
use crate::domain::commands::{FileLocator, GetFileUrl};
use crate::domain::repository::FileRepository;
use crate::error::StorageError;

/// A resolved URL plus the facts a client needs to render the file.
#[derive(Debug, Serialize)]
pub struct FileUrlView {
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

/// Read-only view of a file record.
#[derive(Debug, Serialize)]
pub struct FileView {
    pub file_id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub field: String,
    pub filename: String,
    pub path: String,
    pub url: String,
    pub mime_type: String,
    pub size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl FileView {
    /// Builds a view, resolving the public URL through `storage`.
    #[must_use]
    pub fn new(file: &File, storage: &dyn StorageProvider) -> Self {
        let path = file.path().to_string();
        Self {
            file_id: file.id,
            entity_type: file.entity_type().to_owned(),
            entity_id: file.entity_id().to_owned(),
            field: file.field().to_owned(),
            filename: file.filename().to_owned(),
            url: storage.public_url(&path),
            path,
            mime_type: file.metadata().mime_type().to_owned(),
            size: file.metadata().size(),
            width: file.metadata().width(),
            height: file.metadata().height(),
        }
    }
}

/// Resolves a public or signed URL for a file.
///
/// # Errors
///
/// Returns `StorageError::FileNotFound` if nothing matches the locator.
pub async fn get_file_url(
    query: &GetFileUrl,
    files: &dyn FileRepository,
    storage: &dyn StorageProvider,
) -> Result<FileUrlView, StorageError> {
    let file = match &query.locator {
        FileLocator::Id(file_id) => files.find_by_id(*file_id).await?,
        FileLocator::Owner(owner) => {
            files
                .find_by_entity_and_field(&owner.entity_type, &owner.entity_id, &owner.field)
                .await?
        }
    }
    .ok_or_else(|| StorageError::FileNotFound(query.locator.to_string()))?;

    let path = file.path().to_string();
    let url = if query.signed {
        storage.signed_url(&path, query.expires_in_minutes).await?
    } else {
        storage.public_url(&path)
    };

    Ok(FileUrlView {
        url,
        filename: file.filename().to_owned(),
        mime_type: file.metadata().mime_type().to_owned(),
        size: file.metadata().size(),
    })
}
