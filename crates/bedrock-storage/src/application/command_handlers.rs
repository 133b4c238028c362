//! Delete use cases for the Storage context.
//!
//! Both remove the blob first and the record second, so a failed blob delete
//! leaves the record in place and the operation can be retried.

use bedrock_core::clock::Clock;
use bedrock_core::dispatcher::EventDispatcher;
use tracing::{info, instrument};

use crate::application::ports::StorageProvider;
use crate::domain::aggregates::File;
use crate::domain::commands::{DeleteFile, DeleteFileByEntity};
use crate::domain::events::StorageEvent;
use crate::domain::repository::FileRepository;
use crate::error::StorageError;

/// Handles the `DeleteFile` command.
///
/// # Errors
///
/// Returns `StorageError::FileNotFound` without touching the blob store if
/// the file does not exist, or any adapter error.
#[instrument(
    skip_all,
    fields(correlation_id = %command.correlation_id, file_id = %command.file_id)
)]
pub async fn handle_delete_file(
    command: &DeleteFile,
    files: &dyn FileRepository,
    storage: &dyn StorageProvider,
) -> Result<File, StorageError> {
    let file = files
        .find_by_id(command.file_id)
        .await?
        .ok_or_else(|| StorageError::FileNotFound(command.file_id.to_string()))?;

    storage.delete(&file.path().to_string()).await?;
    files.delete(file.id).await?;

    info!(path = %file.path(), "file deleted");
    Ok(file)
}

/// Handles the `DeleteFileByEntity` command.
///
/// The file's `FileDeleted` event is dispatched before anything is removed.
///
/// # Errors
///
/// Returns `StorageError::FileNotFound` if the owner has no file, the first
/// handler error raised during dispatch, or any adapter error.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, owner = %command.owner))]
pub async fn handle_delete_file_by_entity(
    command: &DeleteFileByEntity,
    clock: &dyn Clock,
    files: &dyn FileRepository,
    storage: &dyn StorageProvider,
    dispatcher: &EventDispatcher<StorageEvent>,
) -> Result<File, StorageError> {
    let owner = &command.owner;
    let mut file = files
        .find_by_entity_and_field(&owner.entity_type, &owner.entity_id, &owner.field)
        .await?
        .ok_or_else(|| StorageError::FileNotFound(owner.to_string()))?;

    file.mark_deleted(command.correlation_id, clock);
    dispatcher.mark_pending(&mut file);
    dispatcher.dispatch_for(file.id).await?;

    storage.delete(&file.path().to_string()).await?;
    files.delete(file.id).await?;

    info!(file_id = %file.id, path = %file.path(), "file deleted");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bedrock_core::dispatcher::EventDispatcher;
    use bedrock_test_support::{FixedClock, RecordingHandler};
    use uuid::Uuid;

    use super::{handle_delete_file, handle_delete_file_by_entity};
    use crate::application::test_doubles::{
        Call, CallLog, RecordingFileRepository, RecordingStorageProvider,
    };
    use crate::domain::aggregates::File;
    use crate::domain::commands::{DeleteFile, DeleteFileByEntity};
    use crate::domain::events::{StorageEvent, StorageTopic};
    use crate::domain::value_objects::{FileMetadata, FileOwner, FilePath};
    use crate::error::StorageError;

    fn stored(clock: &FixedClock, field: &str) -> File {
        let owner = FileOwner::new("post", "42", field);
        let path = FilePath::build(&owner, "cover.jpg", "test", clock).unwrap();
        File::restore(
            Uuid::new_v4(),
            owner,
            "cover.jpg".to_owned(),
            path,
            FileMetadata::new("image/jpeg", 100, Some(10), Some(10)),
            clock.0,
            clock.0,
        )
    }

    #[tokio::test]
    async fn test_delete_file_not_found_never_calls_storage() {
        // Arrange
        let log = CallLog::default();
        let files = RecordingFileRepository::new(&log);
        let storage = RecordingStorageProvider::new(&log);
        let file_id = Uuid::new_v4();
        let command = DeleteFile {
            correlation_id: Uuid::new_v4(),
            file_id,
        };

        // Act
        let result = handle_delete_file(&command, &files, &storage).await;

        // Assert
        match result {
            Err(StorageError::FileNotFound(id)) => assert_eq!(id, file_id.to_string()),
            other => panic!("expected FileNotFound, got {other:?}"),
        }
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_file_removes_blob_then_record() {
        // Arrange
        let clock = FixedClock::at_month(2026, 5);
        let file = stored(&clock, "cover");
        let log = CallLog::default();
        let files = RecordingFileRepository::with_files(&log, vec![file.clone()]);
        let storage = RecordingStorageProvider::new(&log);
        let command = DeleteFile {
            correlation_id: Uuid::new_v4(),
            file_id: file.id,
        };

        // Act
        let deleted = handle_delete_file(&command, &files, &storage).await.unwrap();

        // Assert
        assert_eq!(deleted.id, file.id);
        assert_eq!(
            log.calls(),
            vec![
                Call::DeleteBlob(file.path().to_string()),
                Call::DeleteRecord(file.id),
            ]
        );
        assert!(files.inner.is_empty());
    }

    #[tokio::test]
    async fn test_delete_file_keeps_record_when_blob_delete_fails() {
        let clock = FixedClock::at_month(2026, 5);
        let file = stored(&clock, "cover");
        let log = CallLog::default();
        let files = RecordingFileRepository::with_files(&log, vec![file.clone()]);
        let storage =
            RecordingStorageProvider::new(&log).failing_delete_of(&file.path().to_string());
        let command = DeleteFile {
            correlation_id: Uuid::new_v4(),
            file_id: file.id,
        };

        let result = handle_delete_file(&command, &files, &storage).await;

        assert!(matches!(result, Err(StorageError::Infrastructure(_))));
        assert_eq!(files.inner.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_file_by_entity_dispatches_file_deleted_before_removal() {
        // Arrange
        let clock = FixedClock::at_month(2026, 5);
        let file = stored(&clock, "cover");
        let log = CallLog::default();
        let files = RecordingFileRepository::with_files(&log, vec![file.clone()]);
        let storage = RecordingStorageProvider::new(&log);
        let dispatcher = EventDispatcher::<StorageEvent>::new();
        let recorder = RecordingHandler::new("audit");
        dispatcher.register(StorageTopic::FileDeleted, Arc::new(recorder.clone()));
        let command = DeleteFileByEntity {
            correlation_id: Uuid::new_v4(),
            owner: FileOwner::new("post", "42", "cover"),
        };

        // Act
        let deleted = handle_delete_file_by_entity(&command, &clock, &files, &storage, &dispatcher)
            .await
            .unwrap();

        // Assert
        assert_eq!(deleted.id, file.id);
        assert_eq!(
            recorder.deliveries(),
            vec![("audit", "storage.file_deleted", file.id)]
        );
        assert_eq!(
            log.calls(),
            vec![
                Call::DeleteBlob(file.path().to_string()),
                Call::DeleteRecord(file.id),
            ]
        );
        assert!(!dispatcher.is_pending(file.id));
    }

    #[tokio::test]
    async fn test_delete_file_by_entity_reports_owner_when_missing() {
        let log = CallLog::default();
        let files = RecordingFileRepository::new(&log);
        let storage = RecordingStorageProvider::new(&log);
        let dispatcher = EventDispatcher::<StorageEvent>::new();
        let command = DeleteFileByEntity {
            correlation_id: Uuid::new_v4(),
            owner: FileOwner::new("post", "42", "cover"),
        };

        let result = handle_delete_file_by_entity(
            &command,
            &FixedClock::at_month(2026, 5),
            &files,
            &storage,
            &dispatcher,
        )
        .await;

        match result {
            Err(StorageError::FileNotFound(what)) => assert_eq!(what, "post/42/cover"),
            other => panic!("expected FileNotFound, got {other:?}"),
        }
        assert!(log.calls().is_empty());
    }
}
