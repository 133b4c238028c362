//! Storage-side reactions to events from other contexts.

use std::sync::Arc;

use async_trait::async_trait;
use bedrock_core::dispatcher::{EventDispatcher, EventHandler};
use bedrock_core::error::DomainError;
use bedrock_identity::domain::events::{IdentityEvent, IdentityEventKind, IdentityTopic};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::ports::StorageProvider;
use crate::application::settings::CascadePolicy;
use crate::domain::repository::FileRepository;
use crate::error::StorageError;

/// Entity type under which user-owned files are recorded.
pub const USER_ENTITY_TYPE: &str = "user";

/// Removes every file a user owns when the user is deleted.
///
/// Blob deletes are attempted one by one; with the default policy a failure
/// is logged and the loop continues, so orphaned blobs are possible but the
/// metadata is always cleaned up.
pub struct OnUserDeleted {
    files: Arc<dyn FileRepository>,
    storage: Arc<dyn StorageProvider>,
    policy: CascadePolicy,
}

impl OnUserDeleted {
    #[must_use]
    pub fn new(
        files: Arc<dyn FileRepository>,
        storage: Arc<dyn StorageProvider>,
        policy: CascadePolicy,
    ) -> Self {
        Self {
            files,
            storage,
            policy,
        }
    }

    /// Builds the subscriber and registers it for `UserDeleted`.
    pub fn subscribe(
        dispatcher: &EventDispatcher<IdentityEvent>,
        files: Arc<dyn FileRepository>,
        storage: Arc<dyn StorageProvider>,
        policy: CascadePolicy,
    ) {
        dispatcher.register(
            IdentityTopic::UserDeleted,
            Arc::new(Self::new(files, storage, policy)),
        );
    }

    /// Deletes the blobs and then the records of every file owned by
    /// `user_id`, returning the number of records removed.
    ///
    /// # Errors
    ///
    /// Returns the first blob-delete failure when the policy does not
    /// continue past failures (records are then left untouched), or any
    /// repository error.
    #[instrument(
        skip(self),
        fields(continue_on_item_failure = self.policy.continue_on_item_failure)
    )]
    pub async fn delete_user_files(&self, user_id: Uuid) -> Result<u64, StorageError> {
        let entity_id = user_id.to_string();
        let files = self
            .files
            .find_by_entity(USER_ENTITY_TYPE, &entity_id)
            .await?;

        for file in &files {
            let path = file.path().to_string();
            if let Err(err) = self.storage.delete(&path).await {
                if !self.policy.continue_on_item_failure {
                    return Err(err.into());
                }
                warn!(%path, error = %err, "failed to delete blob, continuing");
            }
        }

        let removed = self
            .files
            .delete_by_entity(USER_ENTITY_TYPE, &entity_id)
            .await?;
        info!(found = files.len(), removed, "user files deleted");
        Ok(removed)
    }
}

#[async_trait]
impl EventHandler<IdentityEvent> for OnUserDeleted {
    fn name(&self) -> &'static str {
        "storage.on_user_deleted"
    }

    async fn handle(&self, event: &IdentityEvent) -> Result<(), DomainError> {
        let IdentityEventKind::UserDeleted(payload) = &event.kind else {
            return Ok(());
        };
        self.delete_user_files(payload.user_id).await?;
        Ok(())
    }
}
