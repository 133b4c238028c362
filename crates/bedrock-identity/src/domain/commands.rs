//! Commands for the Identity context.

use uuid::Uuid;

use super::value_objects::Role;

/// Command to create a user account.
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Requested username, slugified before use.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Plaintext password, if the account uses password login. Hashed
    /// before it is stored.
    pub password: Option<String>,
    /// Whether the account is granted the admin role.
    pub admin: bool,
}

/// Command to modify an existing user. `None` fields are left unchanged.
#[derive(Debug, Clone)]
pub struct UpdateUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user identifier.
    pub user_id: Uuid,
    /// New username.
    pub username: Option<String>,
    /// New email address.
    pub email: Option<String>,
    /// New plaintext password.
    pub password: Option<String>,
    /// New role set.
    pub roles: Option<Vec<Role>>,
}

/// Command to delete a user and cascade into dependent contexts.
#[derive(Debug, Clone)]
pub struct DeleteUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user identifier.
    pub user_id: Uuid,
}

/// Command to find or create the account for an identity verified
/// elsewhere (for example an external sign-in provider).
#[derive(Debug, Clone)]
pub struct ProvisionUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Display name reported by the identity source.
    pub display_name: String,
    /// Verified email address.
    pub email: String,
}
