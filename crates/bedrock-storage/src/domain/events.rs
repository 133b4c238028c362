//! Domain events for the Storage context.

use bedrock_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted when a file has been uploaded and recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUploaded {
    /// The file identifier.
    pub file_id: Uuid,
    /// Owning entity kind.
    pub entity_type: String,
    /// Owning entity identifier.
    pub entity_id: String,
    /// Slot on the owning entity.
    pub field: String,
    /// Serialized blob path.
    pub path: String,
    /// Stored MIME type.
    pub mime_type: String,
    /// Stored size in bytes.
    pub size: u64,
}

impl FileUploaded {
    /// Whether this upload replaced a user's avatar.
    #[must_use]
    pub fn is_user_avatar(&self) -> bool {
        self.entity_type == "user" && self.field == "avatar"
    }
}

/// Emitted when a file is about to be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDeleted {
    /// The file identifier.
    pub file_id: Uuid,
    /// Owning entity kind.
    pub entity_type: String,
    /// Owning entity identifier.
    pub entity_id: String,
    /// Slot on the owning entity.
    pub field: String,
    /// Serialized blob path.
    pub path: String,
}

/// Event payload variants for the Storage context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageEventKind {
    /// A file has been uploaded.
    FileUploaded(FileUploaded),
    /// A file has been deleted.
    FileDeleted(FileDeleted),
}

/// Routing topics for storage events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageTopic {
    /// See [`FileUploaded`].
    FileUploaded,
    /// See [`FileDeleted`].
    FileDeleted,
}

/// Domain event envelope for the Storage context.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: StorageEventKind,
}

impl StorageEvent {
    /// Returns the event type name for a payload.
    #[must_use]
    pub fn type_name(kind: &StorageEventKind) -> &'static str {
        match kind {
            StorageEventKind::FileUploaded(_) => "storage.file_uploaded",
            StorageEventKind::FileDeleted(_) => "storage.file_deleted",
        }
    }
}

impl DomainEvent for StorageEvent {
    type Topic = StorageTopic;

    fn topic(&self) -> StorageTopic {
        match &self.kind {
            StorageEventKind::FileUploaded(_) => StorageTopic::FileUploaded,
            StorageEventKind::FileDeleted(_) => StorageTopic::FileDeleted,
        }
    }

    fn event_type(&self) -> &'static str {
        Self::type_name(&self.kind)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
