//! File metadata repository port.

use async_trait::async_trait;
use bedrock_core::error::DomainError;
use uuid::Uuid;

use super::aggregates::File;

/// Persistence contract for file metadata records.
///
/// Implementations must reject a second record with the same path. They do
/// not enforce one record per owner triple; the ingestion pipeline checks
/// that itself.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Finds a file by identifier.
    async fn find_by_id(&self, file_id: Uuid) -> Result<Option<File>, DomainError>;

    /// Finds a file by its serialized path.
    async fn find_by_path(&self, path: &str) -> Result<Option<File>, DomainError>;

    /// Lists every file of an entity across all fields, newest first.
    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<File>, DomainError>;

    /// Finds the current file of an owner triple. When several exist the
    /// newest one wins.
    async fn find_by_entity_and_field(
        &self,
        entity_type: &str,
        entity_id: &str,
        field: &str,
    ) -> Result<Option<File>, DomainError>;

    /// Inserts a new record.
    ///
    /// Returns `DomainError::AlreadyExists` if the path is taken.
    async fn create(&self, file: &File) -> Result<(), DomainError>;

    /// Overwrites an existing record.
    ///
    /// Returns `DomainError::AggregateNotFound` if the file does not exist.
    async fn update(&self, file: &File) -> Result<(), DomainError>;

    /// Removes a record, returning it if it existed.
    async fn delete(&self, file_id: Uuid) -> Result<Option<File>, DomainError>;

    /// Removes every record of an entity, returning how many were removed.
    async fn delete_by_entity(&self, entity_type: &str, entity_id: &str)
    -> Result<u64, DomainError>;
}
