//! User repository port.

use async_trait::async_trait;
use bedrock_core::error::DomainError;
use uuid::Uuid;

use super::aggregates::User;

/// Persistence contract for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Lists users, newest first. `page` starts at 1.
    async fn list(&self, page: u32, limit: u32) -> Result<Vec<User>, DomainError>;

    /// Finds a user by identifier.
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, DomainError>;

    /// Finds a user by normalized username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Finds a user by email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Inserts a new user.
    async fn create(&self, user: &User) -> Result<(), DomainError>;

    /// Overwrites an existing user.
    ///
    /// Returns `DomainError::AggregateNotFound` if the user does not exist.
    async fn update(&self, user: &User) -> Result<(), DomainError>;

    /// Removes a user, returning whether a row was deleted.
    async fn delete(&self, user_id: Uuid) -> Result<bool, DomainError>;
}
