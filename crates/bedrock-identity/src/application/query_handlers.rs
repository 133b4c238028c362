//! Query handlers for the Identity context.
//!
//! Queries read users from the repository and return serializable views
//! that never expose the password hash.

use bedrock_core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_objects::Role;

/// Largest page size `list_users` will honour.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Read-only view of a user account.
#[derive(Debug, Serialize)]
pub struct UserView {
    /// The user identifier.
    pub user_id: Uuid,
    /// Normalized username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Assigned roles.
    pub roles: Vec<Role>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username().to_string(),
            email: user.email().to_owned(),
            roles: user.roles().to_vec(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

/// Retrieves a user by ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no user has the ID.
pub async fn get_user_by_id(
    user_id: Uuid,
    repo: &dyn UserRepository,
) -> Result<UserView, DomainError> {
    let user = repo
        .find_by_id(user_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(user_id))?;
    Ok(UserView::from(&user))
}

/// Lists users newest first. `page` starts at 1; `limit` is clamped to
/// `1..=MAX_PAGE_SIZE`.
///
/// # Errors
///
/// Returns any repository error.
pub async fn list_users(
    page: u32,
    limit: u32,
    repo: &dyn UserRepository,
) -> Result<Vec<UserView>, DomainError> {
    let users = repo
        .list(page.max(1), limit.clamp(1, MAX_PAGE_SIZE))
        .await?;
    Ok(users.iter().map(UserView::from).collect())
}
