//! Domain events for the Identity context.

use bedrock_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted when a user account is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    /// The user identifier.
    pub user_id: Uuid,
    /// The normalized username.
    pub username: String,
    /// The user's email address.
    pub email: String,
}

/// Emitted when a user account is about to be removed. Carries only the
/// identity of the deleted user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeleted {
    /// The user identifier.
    pub user_id: Uuid,
}

/// Event payload variants for the Identity context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityEventKind {
    /// A user has been created.
    UserCreated(UserCreated),
    /// A user has been deleted.
    UserDeleted(UserDeleted),
}

/// Routing topics for identity events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityTopic {
    /// See [`UserCreated`].
    UserCreated,
    /// See [`UserDeleted`].
    UserDeleted,
}

/// Domain event envelope for the Identity context.
#[derive(Debug, Clone)]
pub struct IdentityEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: IdentityEventKind,
}

impl IdentityEvent {
    /// Returns the event type name for a payload.
    #[must_use]
    pub fn type_name(kind: &IdentityEventKind) -> &'static str {
        match kind {
            IdentityEventKind::UserCreated(_) => "identity.user_created",
            IdentityEventKind::UserDeleted(_) => "identity.user_deleted",
        }
    }
}

impl DomainEvent for IdentityEvent {
    type Topic = IdentityTopic;

    fn topic(&self) -> IdentityTopic {
        match &self.kind {
            IdentityEventKind::UserCreated(_) => IdentityTopic::UserCreated,
            IdentityEventKind::UserDeleted(_) => IdentityTopic::UserDeleted,
        }
    }

    fn event_type(&self) -> &'static str {
        Self::type_name(&self.kind)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
