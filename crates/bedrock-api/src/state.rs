//! Shared application state.

use std::sync::Arc;

use bedrock_core::clock::Clock;
use bedrock_core::dispatcher::EventDispatcher;
use bedrock_identity::application::ports::PasswordHasher;
use bedrock_identity::domain::events::IdentityEvent;
use bedrock_identity::domain::repository::UserRepository;
use bedrock_identity::infrastructure::password::Argon2PasswordHasher;
use bedrock_storage::application::ports::{FileValidator, ImageProcessor, StorageProvider};
use bedrock_storage::application::settings::StorageSettings;
use bedrock_storage::application::subscribers::OnUserDeleted;
use bedrock_storage::application::upload::IngestionPorts;
use bedrock_storage::domain::events::StorageEvent;
use bedrock_storage::domain::repository::FileRepository;
use bedrock_storage::infrastructure::local::LocalStorageProvider;

/// Application state shared across all request handlers.
///
/// Each bounded context gets its own dispatcher. The storage context's
/// user cleanup is subscribed to the identity dispatcher on construction.
#[derive(Clone)]
pub struct AppState {
    pub clock: Arc<dyn Clock>,
    pub users: Arc<dyn UserRepository>,
    pub passwords: Arc<dyn PasswordHasher>,
    pub files: Arc<dyn FileRepository>,
    pub storage: Arc<dyn StorageProvider>,
    pub validator: Arc<dyn FileValidator>,
    pub images: Arc<dyn ImageProcessor>,
    pub settings: Arc<StorageSettings>,
    pub identity_events: Arc<EventDispatcher<IdentityEvent>>,
    pub storage_events: Arc<EventDispatcher<StorageEvent>>,
    /// Set when blobs live on local disk and are served by this process.
    pub local_blobs: Option<Arc<LocalStorageProvider>>,
}

impl AppState {
    /// Create new application state and wire cross-context subscribers.
    /// Passwords are hashed with Argon2id.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        users: Arc<dyn UserRepository>,
        files: Arc<dyn FileRepository>,
        storage: Arc<dyn StorageProvider>,
        validator: Arc<dyn FileValidator>,
        images: Arc<dyn ImageProcessor>,
        settings: StorageSettings,
    ) -> Self {
        let identity_events = Arc::new(EventDispatcher::new());
        OnUserDeleted::subscribe(
            &identity_events,
            Arc::clone(&files),
            Arc::clone(&storage),
            settings.cascade,
        );

        Self {
            clock,
            users,
            passwords: Arc::new(Argon2PasswordHasher::new()),
            files,
            storage,
            validator,
            images,
            settings: Arc::new(settings),
            identity_events,
            storage_events: Arc::new(EventDispatcher::new()),
            local_blobs: None,
        }
    }

    /// Serves blobs of `provider` under `/files`.
    #[must_use]
    pub fn with_local_blobs(mut self, provider: Arc<LocalStorageProvider>) -> Self {
        self.local_blobs = Some(provider);
        self
    }

    /// Borrowed adapters for the ingestion pipeline.
    #[must_use]
    pub fn ingestion_ports(&self) -> IngestionPorts<'_> {
        IngestionPorts {
            files: self.files.as_ref(),
            storage: self.storage.as_ref(),
            validator: self.validator.as_ref(),
            images: self.images.as_ref(),
        }
    }
}
