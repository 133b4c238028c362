//! In-memory `UserRepository`, used for local development and tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use bedrock_core::aggregate::AggregateRoot;
use bedrock_core::error::DomainError;
use uuid::Uuid;

use crate::domain::aggregates::User;
use crate::domain::repository::UserRepository;

/// Process-local user store. Users keep insertion order.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with `users`.
    #[must_use]
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users.iter().map(detached).collect()),
        }
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<User>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn find(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.lock().iter().find(|u| predicate(u)).cloned()
    }
}

// Stored copies never carry undispatched events.
fn detached(user: &User) -> User {
    let mut copy = user.clone();
    copy.take_uncommitted_events();
    copy
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list(&self, page: u32, limit: u32) -> Result<Vec<User>, DomainError> {
        let skip = page.saturating_sub(1).saturating_mul(limit) as usize;
        Ok(self
            .lock()
            .iter()
            .rev()
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.find(|u| u.id == user_id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        Ok(self.find(|u| u.username().as_str() == username))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self.find(|u| u.email() == email))
    }

    async fn create(&self, user: &User) -> Result<(), DomainError> {
        let mut users = self.lock();
        if users.iter().any(|u| u.id == user.id) {
            return Err(DomainError::AlreadyExists(format!("user {}", user.id)));
        }
        users.push(detached(user));
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), DomainError> {
        let mut users = self.lock();
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(DomainError::AggregateNotFound(user.id))?;
        *slot = detached(user);
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, DomainError> {
        let mut users = self.lock();
        let before = users.len();
        users.retain(|u| u.id != user_id);
        Ok(users.len() < before)
    }
}
