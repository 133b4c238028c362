//! Port doubles for storage use-case tests.
//!
//! The recording adapters wrap the in-memory ones and append every mutating
//! call to one shared [`CallLog`], so tests can assert ordering across the
//! blob store and the metadata store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bedrock_core::error::DomainError;
use bytes::Bytes;
use uuid::Uuid;

use crate::application::ports::{
    FileValidator, ImageDimensions, ImageInfo, ImageProcessor, OutputFormat, ProcessedImage,
    StorageProvider, TransformOptions, UploadOptions, UploadResult,
};
use crate::domain::aggregates::File;
use crate::domain::repository::FileRepository;
use crate::error::ProviderError;
use crate::infrastructure::in_memory::{InMemoryFileRepository, InMemoryStorageProvider};

/// A mutating port call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    UploadBlob(String),
    DeleteBlob(String),
    CreateRecord(String),
    DeleteRecord(Uuid),
    DeleteRecordsOf(String, String),
}

/// Ordered log shared between recording doubles.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }
}

/// Blob store double with failure injection.
pub struct RecordingStorageProvider {
    pub inner: InMemoryStorageProvider,
    log: CallLog,
    fail_uploads: bool,
    fail_deletes: HashSet<String>,
}

impl RecordingStorageProvider {
    pub fn new(log: &CallLog) -> Self {
        Self {
            inner: InMemoryStorageProvider::default(),
            log: log.clone(),
            fail_uploads: false,
            fail_deletes: HashSet::new(),
        }
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn failing_delete_of(mut self, path: &str) -> Self {
        self.fail_deletes.insert(path.to_owned());
        self
    }
}

#[async_trait]
impl StorageProvider for RecordingStorageProvider {
    async fn upload(
        &self,
        bytes: Bytes,
        options: UploadOptions,
    ) -> Result<UploadResult, ProviderError> {
        self.log.push(Call::UploadBlob(options.path.clone()));
        if self.fail_uploads {
            return Err(ProviderError::Backend("bucket unavailable".into()));
        }
        self.inner.upload(bytes, options).await
    }

    async fn delete(&self, path: &str) -> Result<(), ProviderError> {
        self.log.push(Call::DeleteBlob(path.to_owned()));
        if self.fail_deletes.contains(path) {
            return Err(ProviderError::Backend(format!("cannot delete {path}")));
        }
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &str) -> Result<bool, ProviderError> {
        self.inner.exists(path).await
    }

    async fn signed_url(&self, path: &str, ttl_minutes: u32) -> Result<String, ProviderError> {
        self.inner.signed_url(path, ttl_minutes).await
    }

    fn public_url(&self, path: &str) -> String {
        self.inner.public_url(path)
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), ProviderError> {
        self.inner.copy(source, destination).await
    }
}

/// Metadata store double.
pub struct RecordingFileRepository {
    pub inner: InMemoryFileRepository,
    log: CallLog,
    fail_creates: bool,
}

impl RecordingFileRepository {
    pub fn new(log: &CallLog) -> Self {
        Self::with_files(log, Vec::new())
    }

    pub fn with_files(log: &CallLog, files: Vec<File>) -> Self {
        Self {
            inner: InMemoryFileRepository::with_files(files),
            log: log.clone(),
            fail_creates: false,
        }
    }

    pub fn failing_creates(mut self) -> Self {
        self.fail_creates = true;
        self
    }
}

#[async_trait]
impl FileRepository for RecordingFileRepository {
    async fn find_by_id(&self, file_id: Uuid) -> Result<Option<File>, DomainError> {
        self.inner.find_by_id(file_id).await
    }

    async fn find_by_path(&self, path: &str) -> Result<Option<File>, DomainError> {
        self.inner.find_by_path(path).await
    }

    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<File>, DomainError> {
        self.inner.find_by_entity(entity_type, entity_id).await
    }

    async fn find_by_entity_and_field(
        &self,
        entity_type: &str,
        entity_id: &str,
        field: &str,
    ) -> Result<Option<File>, DomainError> {
        self.inner
            .find_by_entity_and_field(entity_type, entity_id, field)
            .await
    }

    async fn create(&self, file: &File) -> Result<(), DomainError> {
        self.log.push(Call::CreateRecord(file.path().to_string()));
        if self.fail_creates {
            return Err(DomainError::Infrastructure("database unavailable".into()));
        }
        self.inner.create(file).await
    }

    async fn update(&self, file: &File) -> Result<(), DomainError> {
        self.inner.update(file).await
    }

    async fn delete(&self, file_id: Uuid) -> Result<Option<File>, DomainError> {
        self.log.push(Call::DeleteRecord(file_id));
        self.inner.delete(file_id).await
    }

    async fn delete_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<u64, DomainError> {
        self.log.push(Call::DeleteRecordsOf(
            entity_type.to_owned(),
            entity_id.to_owned(),
        ));
        self.inner.delete_by_entity(entity_type, entity_id).await
    }
}

/// Validator returning canned answers.
#[derive(Debug, Clone, Default)]
pub struct StubFileValidator {
    mime_type: Option<String>,
    dimensions: Option<ImageDimensions>,
}

impl StubFileValidator {
    pub fn unrecognized() -> Self {
        Self::default()
    }

    pub fn detecting(mime_type: &str) -> Self {
        Self {
            mime_type: Some(mime_type.to_owned()),
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some(ImageDimensions { width, height });
        self
    }
}

#[async_trait]
impl FileValidator for StubFileValidator {
    async fn detect_mime_type(&self, _bytes: &[u8]) -> Result<Option<String>, ProviderError> {
        Ok(self.mime_type.clone())
    }

    async fn dimensions(&self, _bytes: &[u8]) -> Result<Option<ImageDimensions>, ProviderError> {
        Ok(self.dimensions)
    }
}

/// Image processor returning one canned image and counting calls.
#[derive(Debug)]
pub struct StubImageProcessor {
    output: ProcessedImage,
    calls: AtomicUsize,
}

impl StubImageProcessor {
    pub const OUTPUT: &'static [u8] = b"transformed-image";

    pub fn producing(width: u32, height: u32, format: OutputFormat) -> Self {
        Self {
            output: ProcessedImage {
                bytes: Bytes::from_static(Self::OUTPUT),
                width,
                height,
                size: Self::OUTPUT.len() as u64,
                mime_type: format.mime_type().to_owned(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn produce(&self) -> ProcessedImage {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone()
    }
}

#[async_trait]
impl ImageProcessor for StubImageProcessor {
    async fn resize(
        &self,
        _bytes: Bytes,
        _options: &TransformOptions,
    ) -> Result<ProcessedImage, ProviderError> {
        Ok(self.produce())
    }

    async fn convert(
        &self,
        _bytes: Bytes,
        _format: OutputFormat,
        _quality: Option<u8>,
    ) -> Result<ProcessedImage, ProviderError> {
        Ok(self.produce())
    }

    async fn optimize(
        &self,
        _bytes: Bytes,
        _quality: Option<u8>,
    ) -> Result<ProcessedImage, ProviderError> {
        Ok(self.produce())
    }

    async fn metadata(&self, _bytes: Bytes) -> Result<Option<ImageInfo>, ProviderError> {
        Ok(Some(ImageInfo {
            width: self.output.width,
            height: self.output.height,
            format: "stub".to_owned(),
            size: self.output.size,
        }))
    }
}
