//! Test event handlers — `EventHandler` implementations that record or fail.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bedrock_core::dispatcher::EventHandler;
use bedrock_core::error::DomainError;
use bedrock_core::event::DomainEvent;
use uuid::Uuid;

/// A handler that records every event it receives as
/// `(handler name, event type, aggregate id)`.
///
/// Several handlers can share one log to assert relative ordering.
#[derive(Debug, Clone)]
pub struct RecordingHandler {
    name: &'static str,
    log: Arc<Mutex<Vec<(&'static str, &'static str, Uuid)>>>,
}

impl RecordingHandler {
    /// Creates a handler with its own empty log.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            log: Arc::default(),
        }
    }

    /// Creates a handler that appends to the same log as `other`.
    #[must_use]
    pub fn sharing_log(name: &'static str, other: &Self) -> Self {
        Self {
            name,
            log: Arc::clone(&other.log),
        }
    }

    /// Returns a snapshot of all recorded deliveries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn deliveries(&self) -> Vec<(&'static str, &'static str, Uuid)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl<E: DomainEvent> EventHandler<E> for RecordingHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(&self, event: &E) -> Result<(), DomainError> {
        self.log
            .lock()
            .unwrap()
            .push((self.name, event.event_type(), event.aggregate_id()));
        Ok(())
    }
}

/// A handler that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingHandler;

#[async_trait]
impl<E: DomainEvent> EventHandler<E> for FailingHandler {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn handle(&self, _event: &E) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("handler unavailable".into()))
    }
}
