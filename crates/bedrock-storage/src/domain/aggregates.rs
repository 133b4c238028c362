//! Aggregate roots for the Storage context.

use bedrock_core::aggregate::AggregateRoot;
use bedrock_core::clock::Clock;
use bedrock_core::event::EventMetadata;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::events::{FileDeleted, FileUploaded, StorageEvent, StorageEventKind};
use super::value_objects::{FileMetadata, FileOwner, FilePath};

/// A stored binary asset plus its metadata.
///
/// Files are never partially updated: new content means a new `File` with a
/// new path.
#[derive(Debug, Clone)]
pub struct File {
    /// Aggregate identifier.
    pub id: Uuid,
    owner: FileOwner,
    filename: String,
    path: FilePath,
    metadata: FileMetadata,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    uncommitted_events: Vec<StorageEvent>,
}

impl File {
    /// Records a freshly uploaded file, producing a `FileUploaded` event.
    #[must_use]
    pub fn create(
        id: Uuid,
        owner: FileOwner,
        filename: String,
        path: FilePath,
        metadata: FileMetadata,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Self {
        let now = clock.now();
        let mut file = Self {
            id,
            owner,
            filename,
            path,
            metadata,
            created_at: now,
            updated_at: now,
            uncommitted_events: Vec::new(),
        };
        let uploaded = FileUploaded {
            file_id: id,
            entity_type: file.owner.entity_type.clone(),
            entity_id: file.owner.entity_id.clone(),
            field: file.owner.field.clone(),
            path: file.path.to_string(),
            mime_type: file.metadata.mime_type().to_owned(),
            size: file.metadata.size(),
        };
        file.record(StorageEventKind::FileUploaded(uploaded), correlation_id, clock);
        file
    }

    /// Rebuilds a file from persisted state without recording events.
    #[must_use]
    pub fn restore(
        id: Uuid,
        owner: FileOwner,
        filename: String,
        path: FilePath,
        metadata: FileMetadata,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            filename,
            path,
            metadata,
            created_at,
            updated_at,
            uncommitted_events: Vec::new(),
        }
    }

    /// Marks the file for removal, producing a `FileDeleted` event.
    pub fn mark_deleted(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        let deleted = FileDeleted {
            file_id: self.id,
            entity_type: self.owner.entity_type.clone(),
            entity_id: self.owner.entity_id.clone(),
            field: self.owner.field.clone(),
            path: self.path.to_string(),
        };
        self.record(StorageEventKind::FileDeleted(deleted), correlation_id, clock);
    }

    #[must_use]
    pub fn owner(&self) -> &FileOwner {
        &self.owner
    }

    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.owner.entity_type
    }

    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.owner.entity_id
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.owner.field
    }

    /// Original filename supplied by the uploader.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn path(&self) -> &FilePath {
        &self.path
    }

    #[must_use]
    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn record(&mut self, kind: StorageEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let metadata = EventMetadata::new(
            StorageEvent::type_name(&kind),
            self.id,
            correlation_id,
            clock,
        );
        self.uncommitted_events
            .push(StorageEvent { metadata, kind });
    }
}

impl AggregateRoot for File {
    type Event = StorageEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted_events)
    }
}
