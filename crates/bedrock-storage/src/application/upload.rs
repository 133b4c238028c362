//! File ingestion pipeline.
//!
//! Validates, optionally transforms, uploads and records one file. The blob
//! store and the metadata store share no transaction; the order of calls
//! below is what keeps them consistent:
//!
//! 1. validate (only when constraints are given)
//! 2. detect the MIME type from content (always)
//! 3. transform images or read their dimensions
//! 4. build the time-partitioned path; a path held by any file other than
//!    the one being replaced is a conflict and nothing is written
//! 5. remove the owner's current file (`DeleteThenUpload` only)
//! 6. upload; on failure nothing is recorded
//! 7. record the new file
//!
//! Under `UploadThenSwap`, step 5 runs after step 7 instead.
//!
//! The "one current file per owner" rule is a read-then-write check. Two
//! concurrent uploads for the same owner can both pass it.

use std::collections::BTreeMap;

use bedrock_core::aggregate::AggregateRoot;
use bedrock_core::clock::Clock;
use bedrock_core::error::DomainError;
use bytes::Bytes;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::ports::{
    FileValidator, ImageProcessor, StorageProvider, UploadOptions, ValidationOptions,
    ValidationOutcome,
};
use crate::application::settings::ReplaceStrategy;
use crate::domain::aggregates::File;
use crate::domain::commands::UploadFile;
use crate::domain::events::StorageEvent;
use crate::domain::repository::FileRepository;
use crate::domain::value_objects::{FileMetadata, FilePath, is_image_mime};
use crate::error::StorageError;

/// The adapters the pipeline talks to.
#[derive(Clone, Copy)]
pub struct IngestionPorts<'a> {
    pub files: &'a dyn FileRepository,
    pub storage: &'a dyn StorageProvider,
    pub validator: &'a dyn FileValidator,
    pub images: &'a dyn ImageProcessor,
}

/// Bytes and metadata that will actually be stored.
struct Prepared {
    bytes: Bytes,
    mime_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// Handles the `UploadFile` command.
///
/// Returns the recorded file and its `FileUploaded` event; the caller
/// decides whether to dispatch it.
///
/// # Errors
///
/// * `InvalidFileType`, `FileTooLarge`, `InvalidImageDimensions` when the
///   supplied constraints reject the content. Nothing is written.
/// * `InvalidFileType` with no detected type when the content is not
///   recognized, even without constraints.
/// * `StorageUpload` when the blob store rejects the upload. No record is
///   written; under `DeleteThenUpload` the previous file is already gone.
/// * `Domain(AlreadyExists)` when another file already occupies the target
///   path (for example the same filename uploaded without replace). Nothing
///   is written.
/// * `Infrastructure` / `Domain` for adapter or repository faults.
#[instrument(
    skip_all,
    fields(
        correlation_id = %command.correlation_id,
        entity_type = %command.owner.entity_type,
        entity_id = %command.owner.entity_id,
        field = %command.owner.field,
        size = command.bytes.len(),
    )
)]
pub async fn handle_upload_file(
    command: &UploadFile,
    strategy: ReplaceStrategy,
    clock: &dyn Clock,
    ports: IngestionPorts<'_>,
) -> Result<(File, Vec<StorageEvent>), StorageError> {
    if let Some(options) = &command.validation {
        let outcome = ports.validator.validate(&command.bytes, options).await?;
        reject_invalid(outcome, &command.bytes, options)?;
    }

    let detected = ports
        .validator
        .detect_mime_type(&command.bytes)
        .await?
        .ok_or(StorageError::InvalidFileType {
            detected: None,
            allowed: Vec::new(),
        })?;

    let prepared = prepare(command, detected, ports).await?;

    let owner = &command.owner;
    let existing = ports
        .files
        .find_by_entity_and_field(&owner.entity_type, &owner.entity_id, &owner.field)
        .await?
        .filter(|_| command.replace_existing);

    let path = FilePath::build(owner, &command.filename, &command.environment, clock)?;
    let path_string = path.to_string();

    // Only the file being replaced may already sit at the target path.
    if let Some(occupant) = ports.files.find_by_path(&path_string).await? {
        if existing.as_ref().is_none_or(|old| old.id != occupant.id) {
            return Err(DomainError::AlreadyExists(format!(
                "a file already exists at {path_string}"
            ))
            .into());
        }
    }

    if let (ReplaceStrategy::DeleteThenUpload, Some(old)) = (strategy, &existing) {
        debug!(file_id = %old.id, path = %old.path(), "removing current file before upload");
        ports.storage.delete(&old.path().to_string()).await?;
        ports.files.delete(old.id).await?;
    }

    let upload = ports
        .storage
        .upload(
            prepared.bytes.clone(),
            UploadOptions {
                path: path_string.clone(),
                mime_type: prepared.mime_type.clone(),
                metadata: blob_metadata(command),
            },
        )
        .await
        .map_err(|err| StorageError::StorageUpload(err.to_string()))?;
    debug!(path = %upload.path, size = upload.size, "blob uploaded");

    let metadata = FileMetadata::new(
        prepared.mime_type,
        prepared.bytes.len() as u64,
        prepared.width,
        prepared.height,
    );
    let mut file = File::create(
        Uuid::new_v4(),
        owner.clone(),
        command.filename.clone(),
        path,
        metadata,
        command.correlation_id,
        clock,
    );

    match (strategy, existing) {
        (ReplaceStrategy::UploadThenSwap, Some(old)) => {
            swap(&file, &old, ports).await?;
        }
        _ => ports.files.create(&file).await?,
    }

    info!(file_id = %file.id, path = %path_string, "file uploaded");
    let events = file.take_uncommitted_events();
    Ok((file, events))
}

fn reject_invalid(
    outcome: ValidationOutcome,
    bytes: &[u8],
    options: &ValidationOptions,
) -> Result<(), StorageError> {
    match outcome {
        ValidationOutcome::Valid { .. } => Ok(()),
        ValidationOutcome::UnrecognizedType => Err(StorageError::InvalidFileType {
            detected: None,
            allowed: options.effective_allowed_mime_types(),
        }),
        ValidationOutcome::TypeNotAllowed { detected, allowed } => {
            Err(StorageError::InvalidFileType {
                detected: Some(detected),
                allowed,
            })
        }
        ValidationOutcome::TooLarge { max_bytes, .. } => Err(StorageError::FileTooLarge {
            actual_bytes: bytes.len() as u64,
            max_bytes,
        }),
        ValidationOutcome::InvalidDimensions(reason) => {
            Err(StorageError::InvalidImageDimensions(reason))
        }
    }
}

async fn prepare(
    command: &UploadFile,
    detected: String,
    ports: IngestionPorts<'_>,
) -> Result<Prepared, StorageError> {
    if !is_image_mime(&detected) {
        return Ok(Prepared {
            bytes: command.bytes.clone(),
            mime_type: detected,
            width: None,
            height: None,
        });
    }

    if let Some(transform) = &command.transform {
        let processed = ports.images.resize(command.bytes.clone(), transform).await?;
        debug!(
            width = processed.width,
            height = processed.height,
            mime_type = %processed.mime_type,
            "image transformed"
        );
        return Ok(Prepared {
            bytes: processed.bytes,
            mime_type: processed.mime_type,
            width: Some(processed.width),
            height: Some(processed.height),
        });
    }

    let dimensions = ports.validator.dimensions(&command.bytes).await?;
    Ok(Prepared {
        bytes: command.bytes.clone(),
        mime_type: detected,
        width: dimensions.map(|d| d.width),
        height: dimensions.map(|d| d.height),
    })
}

// The new blob is already stored. When it landed on the old path the old
// record must go first, since paths are unique in the metadata store.
async fn swap(new: &File, old: &File, ports: IngestionPorts<'_>) -> Result<(), StorageError> {
    let same_path = new.path() == old.path();
    if same_path {
        ports.files.delete(old.id).await?;
        ports.files.create(new).await?;
        return Ok(());
    }

    ports.files.create(new).await?;
    if let Err(err) = ports.files.delete(old.id).await {
        warn!(file_id = %old.id, error = %err, "failed to remove replaced file record");
    }
    if let Err(err) = ports.storage.delete(&old.path().to_string()).await {
        warn!(path = %old.path(), error = %err, "failed to remove replaced blob");
    }
    Ok(())
}

fn blob_metadata(command: &UploadFile) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("entity_type".to_owned(), command.owner.entity_type.clone()),
        ("entity_id".to_owned(), command.owner.entity_id.clone()),
        ("field".to_owned(), command.owner.field.clone()),
        ("original_filename".to_owned(), command.filename.clone()),
    ])
}
