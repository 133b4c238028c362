//! In-process domain event dispatcher.
//!
//! One [`EventDispatcher`] exists per bounded-context event type. It is
//! constructed once at startup and passed to every use case and subscriber
//! that needs it. Delivery is pull-based: nothing is sent until a use case
//! calls [`EventDispatcher::dispatch_for`] for the aggregate it just mutated.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::error::DomainError;
use crate::event::DomainEvent;

/// A subscriber to one or more event topics.
#[async_trait]
pub trait EventHandler<E: DomainEvent>: Send + Sync {
    /// Handler name, used in logs.
    fn name(&self) -> &'static str;

    /// Handles a single event.
    ///
    /// # Errors
    ///
    /// Any error aborts the surrounding `dispatch_for` call and is returned
    /// to its caller unchanged.
    async fn handle(&self, event: &E) -> Result<(), DomainError>;
}

type HandlerList<E> = Vec<Arc<dyn EventHandler<E>>>;

/// Registry of handlers keyed by topic plus the set of aggregates holding
/// undelivered events.
pub struct EventDispatcher<E: DomainEvent> {
    handlers: RwLock<HashMap<E::Topic, HandlerList<E>>>,
    // Insertion-ordered; one entry per aggregate.
    pending: Mutex<Vec<(Uuid, Vec<E>)>>,
}

impl<E: DomainEvent> EventDispatcher<E> {
    /// Creates a dispatcher with no handlers and nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Appends `handler` to the list for `topic`. Registering the same
    /// handler twice yields two invocations per event.
    pub fn register(&self, topic: E::Topic, handler: Arc<dyn EventHandler<E>>) {
        debug!(?topic, handler = handler.name(), "registering event handler");
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic)
            .or_default()
            .push(handler);
    }

    /// Moves the aggregate's recorded events into the pending set.
    pub fn mark_pending<A>(&self, aggregate: &mut A)
    where
        A: AggregateRoot<Event = E>,
    {
        let aggregate_id = aggregate.aggregate_id();
        let events = aggregate.take_uncommitted_events();
        self.push_pending(aggregate_id, events);
    }

    /// Adds events obtained from a use case's return value to the pending
    /// set, grouped by the aggregate that recorded each one.
    pub fn enqueue(&self, events: impl IntoIterator<Item = E>) {
        for event in events {
            let aggregate_id = event.aggregate_id();
            self.push_pending(aggregate_id, vec![event]);
        }
    }

    /// Delivers every pending event of `aggregate_id`, in recorded order, to
    /// every handler registered for its topic. Each handler is awaited
    /// before the next one starts.
    ///
    /// The aggregate leaves the pending set before the first delivery, so
    /// events are delivered at most once even when a handler fails.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; remaining deliveries for this call
    /// are skipped.
    pub async fn dispatch_for(&self, aggregate_id: Uuid) -> Result<(), DomainError> {
        let Some(events) = self.take_pending(aggregate_id) else {
            debug!(%aggregate_id, "no pending events for aggregate");
            return Ok(());
        };

        for event in &events {
            let handlers = self.handlers_for(event.topic());
            if handlers.is_empty() {
                debug!(
                    %aggregate_id,
                    event_type = event.event_type(),
                    "no handler registered, dropping event"
                );
                continue;
            }

            for handler in handlers {
                debug!(
                    %aggregate_id,
                    event_type = event.event_type(),
                    handler = handler.name(),
                    "delivering event"
                );
                if let Err(err) = handler.handle(event).await {
                    warn!(
                        %aggregate_id,
                        event_type = event.event_type(),
                        handler = handler.name(),
                        error = %err,
                        "event handler failed"
                    );
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// Clears all handler registrations and pending events.
    pub fn reset(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns whether `aggregate_id` holds undelivered events.
    #[must_use]
    pub fn is_pending(&self, aggregate_id: Uuid) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(id, _)| *id == aggregate_id)
    }

    /// Number of aggregates currently pending.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of handlers registered for `topic`.
    #[must_use]
    pub fn handler_count(&self, topic: E::Topic) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .map_or(0, Vec::len)
    }

    fn push_pending(&self, aggregate_id: Uuid, events: Vec<E>) {
        if events.is_empty() {
            return;
        }
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.iter_mut().find(|(id, _)| *id == aggregate_id) {
            Some((_, recorded)) => recorded.extend(events),
            None => pending.push((aggregate_id, events)),
        }
    }

    fn take_pending(&self, aggregate_id: Uuid) -> Option<Vec<E>> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let index = pending.iter().position(|(id, _)| *id == aggregate_id)?;
        Some(pending.remove(index).1)
    }

    fn handlers_for(&self, topic: E::Topic) -> HandlerList<E> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .cloned()
            .unwrap_or_default()
    }
}

impl<E: DomainEvent> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DomainEvent> fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("pending", &self.pending_len())
            .finish_non_exhaustive()
    }
}
