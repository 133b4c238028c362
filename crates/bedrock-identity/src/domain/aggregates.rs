//! Aggregate roots for the Identity context.

use bedrock_core::aggregate::AggregateRoot;
use bedrock_core::clock::Clock;
use bedrock_core::event::EventMetadata;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::events::{IdentityEvent, IdentityEventKind, UserCreated, UserDeleted};
use super::value_objects::{Role, Username};

/// The aggregate root for a user account.
#[derive(Debug, Clone)]
pub struct User {
    /// Aggregate identifier.
    pub id: Uuid,
    username: Username,
    email: String,
    password_hash: Option<String>,
    roles: Vec<Role>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Uncommitted events pending dispatch.
    uncommitted_events: Vec<IdentityEvent>,
}

impl User {
    /// Registers a new user, producing a `UserCreated` event.
    #[must_use]
    pub fn register(
        id: Uuid,
        username: Username,
        email: String,
        password_hash: Option<String>,
        roles: Vec<Role>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Self {
        let now = clock.now();
        let mut user = Self {
            id,
            username,
            email,
            password_hash,
            roles,
            created_at: now,
            updated_at: now,
            uncommitted_events: Vec::new(),
        };
        user.record(
            IdentityEventKind::UserCreated(UserCreated {
                user_id: id,
                username: user.username.to_string(),
                email: user.email.clone(),
            }),
            correlation_id,
            clock,
        );
        user
    }

    /// Rebuilds a user from persisted state without recording events.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        username: Username,
        email: String,
        password_hash: Option<String>,
        roles: Vec<Role>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            email,
            password_hash,
            roles,
            created_at,
            updated_at,
            uncommitted_events: Vec::new(),
        }
    }

    /// Marks the user for deletion, producing a `UserDeleted` event.
    pub fn delete(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        self.record(
            IdentityEventKind::UserDeleted(UserDeleted { user_id: self.id }),
            correlation_id,
            clock,
        );
    }

    /// Replaces the username.
    pub fn rename(&mut self, username: Username, clock: &dyn Clock) {
        self.username = username;
        self.updated_at = clock.now();
    }

    /// Replaces the email address.
    pub fn change_email(&mut self, email: String, clock: &dyn Clock) {
        self.email = email;
        self.updated_at = clock.now();
    }

    /// Replaces the stored password hash.
    pub fn change_password_hash(&mut self, password_hash: String, clock: &dyn Clock) {
        self.password_hash = Some(password_hash);
        self.updated_at = clock.now();
    }

    /// Replaces the role set.
    pub fn assign_roles(&mut self, roles: Vec<Role>, clock: &dyn Clock) {
        self.roles = roles;
        self.updated_at = clock.now();
    }

    /// The normalized username.
    #[must_use]
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// The email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The opaque password hash, if the account has one.
    #[must_use]
    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    /// Assigned roles.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn record(&mut self, kind: IdentityEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let metadata = EventMetadata::new(
            IdentityEvent::type_name(&kind),
            self.id,
            correlation_id,
            clock,
        );
        self.uncommitted_events
            .push(IdentityEvent { metadata, kind });
    }
}

impl AggregateRoot for User {
    type Event = IdentityEvent;

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

#[cfg(test)]
mod tests {
    use super::*;
    use bedrock_core::event::DomainEvent;
    use bedrock_test_support::FixedClock;
    use chrono::TimeZone;

    use crate::domain::events::IdentityTopic;

    fn registered(clock: &FixedClock) -> User {
        User::register(
            Uuid::new_v4(),
            Username::parse("testuser").unwrap(),
            "test@example.com".to_owned(),
            Some("hashed_password".to_owned()),
            vec![Role::User],
            Uuid::new_v4(),
            clock,
        )
    }

    #[test]
    fn test_register_produces_user_created_event() {
        // Arrange
        let fixed_now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let clock = FixedClock(fixed_now);

        // Act
        let user = registered(&clock);

        // Assert
        let events = user.uncommitted_events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.event_type(), "identity.user_created");
        assert_eq!(event.topic(), IdentityTopic::UserCreated);
        assert_eq!(event.metadata().aggregate_id, user.id);
        assert_eq!(event.metadata().occurred_at, fixed_now);
        assert_eq!(user.created_at(), fixed_now);
    }

    #[test]
    fn test_delete_produces_user_deleted_event_carrying_only_the_id() {
        // Arrange
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
        let mut user = registered(&clock);
        user.take_uncommitted_events();
        let correlation_id = Uuid::new_v4();

        // Act
        user.delete(correlation_id, &clock);

        // Assert
        let events = user.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic(), IdentityTopic::UserDeleted);
        assert_eq!(events[0].metadata().correlation_id, correlation_id);
        match &events[0].kind {
            IdentityEventKind::UserDeleted(payload) => assert_eq!(payload.user_id, user.id),
            other => panic!("expected UserDeleted, got {other:?}"),
        }
    }

    #[test]
    fn test_restore_records_no_events() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let user = User::restore(
            Uuid::new_v4(),
            Username::parse("restored").unwrap(),
            "r@example.com".to_owned(),
            None,
            vec![Role::Admin],
            now,
            now,
        );
        assert!(user.uncommitted_events().is_empty());
        assert_eq!(user.roles(), &[Role::Admin]);
    }
}
