//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregate roots that accumulate domain events until they are
/// handed to an [`EventDispatcher`](crate::dispatcher::EventDispatcher).
///
/// Aggregates only record events. They never reach a dispatcher themselves;
/// the application layer decides when recorded events are delivered.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns events recorded since the last hand-off.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Drains the recorded events, leaving the aggregate with none.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event>;
}
