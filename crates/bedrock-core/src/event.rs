//! Domain event abstractions.

use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::clock::Clock;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Type name, used in logs.
    pub event_type: String,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Builds metadata for a freshly recorded event.
    #[must_use]
    pub fn new(
        event_type: &str,
        aggregate_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_owned(),
            aggregate_id,
            correlation_id,
            occurred_at: clock.now(),
        }
    }
}

/// Trait that all domain events implement.
///
/// Events are routed by [`DomainEvent::Topic`], a closed fieldless enum
/// declared by each bounded context, so a handler can only subscribe to a
/// topic that actually exists.
pub trait DomainEvent: Send + Sync + Debug + 'static {
    /// Discriminant used for dispatch routing.
    type Topic: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Returns the routing topic of this event.
    fn topic(&self) -> Self::Topic;

    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;

    /// Returns the identity of the aggregate that recorded this event.
    fn aggregate_id(&self) -> Uuid {
        self.metadata().aggregate_id
    }
}
