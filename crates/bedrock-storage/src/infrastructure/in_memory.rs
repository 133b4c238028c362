//! In-memory adapters, used for local development and tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bedrock_core::aggregate::AggregateRoot;
use bedrock_core::error::DomainError;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::application::ports::{StorageProvider, UploadOptions, UploadResult};
use crate::domain::aggregates::File;
use crate::domain::repository::FileRepository;
use crate::error::ProviderError;

/// Process-local file metadata store. Enforces unique paths like the
/// database schema does.
#[derive(Debug, Default)]
pub struct InMemoryFileRepository {
    files: Mutex<Vec<File>>,
}

impl InMemoryFileRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with `files`.
    #[must_use]
    pub fn with_files(files: Vec<File>) -> Self {
        Self {
            files: Mutex::new(files.iter().map(detached).collect()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of every stored record, in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<File> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<File>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Stored copies never carry undispatched events.
fn detached(file: &File) -> File {
    let mut copy = file.clone();
    copy.take_uncommitted_events();
    copy
}

fn owned_by(file: &File, entity_type: &str, entity_id: &str) -> bool {
    file.entity_type() == entity_type && file.entity_id() == entity_id
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn find_by_id(&self, file_id: Uuid) -> Result<Option<File>, DomainError> {
        Ok(self.lock().iter().find(|f| f.id == file_id).cloned())
    }

    async fn find_by_path(&self, path: &str) -> Result<Option<File>, DomainError> {
        Ok(self
            .lock()
            .iter()
            .find(|f| f.path().to_string() == path)
            .cloned())
    }

    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<File>, DomainError> {
        // Later inserts win ties on created_at.
        let mut files: Vec<File> = self
            .lock()
            .iter()
            .rev()
            .filter(|f| owned_by(f, entity_type, entity_id))
            .cloned()
            .collect();
        files.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(files)
    }

    async fn find_by_entity_and_field(
        &self,
        entity_type: &str,
        entity_id: &str,
        field: &str,
    ) -> Result<Option<File>, DomainError> {
        let files = self.find_by_entity(entity_type, entity_id).await?;
        Ok(files.into_iter().find(|f| f.field() == field))
    }

    async fn create(&self, file: &File) -> Result<(), DomainError> {
        let mut files = self.lock();
        if files.iter().any(|f| f.id == file.id) {
            return Err(DomainError::AlreadyExists(format!("file {}", file.id)));
        }
        if files.iter().any(|f| f.path() == file.path()) {
            return Err(DomainError::AlreadyExists(format!(
                "file path {}",
                file.path()
            )));
        }
        files.push(detached(file));
        Ok(())
    }

    async fn update(&self, file: &File) -> Result<(), DomainError> {
        let mut files = self.lock();
        let slot = files
            .iter_mut()
            .find(|f| f.id == file.id)
            .ok_or(DomainError::AggregateNotFound(file.id))?;
        *slot = detached(file);
        Ok(())
    }

    async fn delete(&self, file_id: Uuid) -> Result<Option<File>, DomainError> {
        let mut files = self.lock();
        let index = files.iter().position(|f| f.id == file_id);
        Ok(index.map(|i| files.remove(i)))
    }

    async fn delete_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<u64, DomainError> {
        let mut files = self.lock();
        let before = files.len();
        files.retain(|f| !owned_by(f, entity_type, entity_id));
        Ok((before - files.len()) as u64)
    }
}

/// A blob held by [`InMemoryStorageProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Bytes,
    pub mime_type: String,
}

/// Process-local blob store.
#[derive(Debug)]
pub struct InMemoryStorageProvider {
    public_base_url: String,
    blobs: Mutex<BTreeMap<String, StoredBlob>>,
}

impl Default for InMemoryStorageProvider {
    fn default() -> Self {
        Self::new("memory://files")
    }
}

impl InMemoryStorageProvider {
    /// Creates an empty store whose public URLs start with `public_base_url`.
    #[must_use]
    pub fn new(public_base_url: &str) -> Self {
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
            blobs: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the blob stored at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<StoredBlob> {
        self.lock().get(path).cloned()
    }

    /// Every stored path, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredBlob>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StorageProvider for InMemoryStorageProvider {
    async fn upload(
        &self,
        bytes: Bytes,
        options: UploadOptions,
    ) -> Result<UploadResult, ProviderError> {
        let size = bytes.len() as u64;
        debug!(path = %options.path, size, "storing blob in memory");
        self.lock().insert(
            options.path.clone(),
            StoredBlob {
                bytes,
                mime_type: options.mime_type,
            },
        );
        Ok(UploadResult {
            public_url: self.public_url(&options.path),
            path: options.path,
            size,
        })
    }

    async fn delete(&self, path: &str) -> Result<(), ProviderError> {
        self.lock().remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, ProviderError> {
        Ok(self.lock().contains_key(path))
    }

    async fn signed_url(&self, path: &str, ttl_minutes: u32) -> Result<String, ProviderError> {
        Ok(format!("{}?expires_in={ttl_minutes}m", self.public_url(path)))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{path}", self.public_base_url)
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), ProviderError> {
        let mut blobs = self.lock();
        let blob = blobs
            .get(source)
            .cloned()
            .ok_or_else(|| ProviderError::Backend(format!("no blob at {source}")))?;
        blobs.insert(destination.to_owned(), blob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedrock_test_support::FixedClock;
    use chrono::Duration;

    use crate::domain::value_objects::{FileMetadata, FileOwner, FilePath};

    fn file(field: &str, filename: &str, clock: &FixedClock) -> File {
        let owner = FileOwner::new("user", "u1", field);
        let path = FilePath::build(&owner, filename, "test", clock).unwrap();
        File::create(
            Uuid::new_v4(),
            owner,
            filename.to_owned(),
            path,
            FileMetadata::new("image/png", 10, None, None),
            Uuid::new_v4(),
            clock,
        )
    }

    #[tokio::test]
    async fn test_file_repository_rejects_duplicate_path() {
        // Arrange
        let clock = FixedClock::at_month(2026, 1);
        let repo = InMemoryFileRepository::new();
        repo.create(&file("avatar", "a.png", &clock)).await.unwrap();

        // Act
        let result = repo.create(&file("avatar", "a.png", &clock)).await;

        // Assert
        assert!(matches!(result, Err(DomainError::AlreadyExists(_))));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_file_repository_returns_newest_file_for_triple() {
        // Arrange
        let early = FixedClock::at_month(2026, 1);
        let later = FixedClock(early.0 + Duration::days(3));
        let repo = InMemoryFileRepository::new();
        let old = file("avatar", "old.png", &early);
        let new = file("avatar", "new.png", &later);
        repo.create(&new).await.unwrap();
        repo.create(&old).await.unwrap();

        // Act
        let current = repo
            .find_by_entity_and_field("user", "u1", "avatar")
            .await
            .unwrap()
            .unwrap();

        // Assert
        assert_eq!(current.id, new.id);
        let all = repo.find_by_entity("user", "u1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, new.id);
    }

    #[tokio::test]
    async fn test_file_repository_delete_by_entity_counts_removed_rows() {
        let clock = FixedClock::at_month(2026, 1);
        let repo = InMemoryFileRepository::with_files(vec![
            file("avatar", "a.png", &clock),
            file("banner", "b.png", &clock),
        ]);

        let removed = repo.delete_by_entity("user", "u1").await.unwrap();

        assert_eq!(removed, 2);
        assert!(repo.is_empty());
        assert_eq!(repo.delete_by_entity("user", "u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_storage_provider_round_trip() {
        // Arrange
        let storage = InMemoryStorageProvider::new("https://cdn.example.com/");

        // Act
        let result = storage
            .upload(
                Bytes::from_static(b"abc"),
                UploadOptions {
                    path: "test/2026/01/user/u1/a.png".into(),
                    mime_type: "image/png".into(),
                    metadata: BTreeMap::new(),
                },
            )
            .await
            .unwrap();
        storage
            .copy("test/2026/01/user/u1/a.png", "test/2026/01/user/u1/b.png")
            .await
            .unwrap();
        storage.delete("test/2026/01/user/u1/a.png").await.unwrap();

        // Assert
        assert_eq!(result.size, 3);
        assert_eq!(
            result.public_url,
            "https://cdn.example.com/test/2026/01/user/u1/a.png"
        );
        assert!(!storage.exists("test/2026/01/user/u1/a.png").await.unwrap());
        assert_eq!(storage.paths(), vec!["test/2026/01/user/u1/b.png".to_owned()]);
        assert!(storage.delete("missing").await.is_ok());
    }
}
