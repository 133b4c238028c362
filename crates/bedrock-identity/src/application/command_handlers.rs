//! Command handlers for the Identity context.
//!
//! Handlers orchestrate domain logic: load the aggregate, execute the
//! command, persist, and hand recorded events to the caller or dispatcher.

use bedrock_core::aggregate::AggregateRoot;
use bedrock_core::clock::Clock;
use bedrock_core::dispatcher::EventDispatcher;
use bedrock_core::error::DomainError;
use bedrock_core::rng::DeterministicRng;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::application::ports::PasswordHasher;
use crate::domain::aggregates::User;
use crate::domain::commands::{CreateUser, DeleteUser, ProvisionUser, UpdateUser};
use crate::domain::events::IdentityEvent;
use crate::domain::repository::UserRepository;
use crate::domain::value_objects::{Role, Username};

fn validate_email(email: &str) -> Result<(), DomainError> {
    let trimmed = email.trim();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(DomainError::Validation(
            "email must be a valid address".into(),
        ));
    }
    Ok(())
}

async fn hash_password(
    hasher: &dyn PasswordHasher,
    password: Option<&str>,
) -> Result<Option<String>, DomainError> {
    match password {
        None => Ok(None),
        Some("") => Err(DomainError::Validation(
            "password must not be empty".into(),
        )),
        Some(password) => hasher.hash(password).await.map(Some),
    }
}

/// Handles the `CreateUser` command.
///
/// Returns the created user together with the events it recorded; the
/// caller decides whether and when to dispatch them.
///
/// # Errors
///
/// Returns `DomainError::AlreadyExists` if the email or username is taken,
/// `DomainError::Validation` for malformed input, and any repository error.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id))]
pub async fn handle_create_user(
    command: &CreateUser,
    clock: &dyn Clock,
    hasher: &dyn PasswordHasher,
    repo: &dyn UserRepository,
) -> Result<(User, Vec<IdentityEvent>), DomainError> {
    validate_email(&command.email)?;
    let email = command.email.trim();
    let username = Username::parse(&command.username)?;

    let email_taken = repo.find_by_email(email).await?.is_some();
    let username_taken = repo.find_by_username(username.as_str()).await?.is_some();
    if email_taken || username_taken {
        return Err(DomainError::AlreadyExists("user already exists".into()));
    }

    let roles = if command.admin {
        vec![Role::Admin, Role::User]
    } else {
        vec![Role::User]
    };

    let password_hash = hash_password(hasher, command.password.as_deref()).await?;

    let mut user = User::register(
        Uuid::new_v4(),
        username,
        email.to_owned(),
        password_hash,
        roles,
        command.correlation_id,
        clock,
    );

    repo.create(&user).await?;
    info!(user_id = %user.id, "user created");

    let events = user.take_uncommitted_events();
    Ok((user, events))
}

/// Handles the `ProvisionUser` command.
///
/// Returns the account registered under the email if there is one (with no
/// events). Otherwise registers a password-less user; when the slugified
/// display name is taken, a random suffix is appended.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a malformed email or a display
/// name that cannot form a username, and any repository error.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id))]
pub async fn handle_provision_user(
    command: &ProvisionUser,
    clock: &dyn Clock,
    rng: &mut dyn DeterministicRng,
    repo: &dyn UserRepository,
) -> Result<(User, Vec<IdentityEvent>), DomainError> {
    validate_email(&command.email)?;
    let email = command.email.trim();

    if let Some(user) = repo.find_by_email(email).await? {
        debug!(user_id = %user.id, "user already provisioned");
        return Ok((user, Vec::new()));
    }

    let mut username = Username::parse(&command.display_name)?;
    if repo.find_by_username(username.as_str()).await?.is_some() {
        username = Username::generate_unique_from(username.as_str(), rng)?;
    }

    let mut user = User::register(
        Uuid::new_v4(),
        username,
        email.to_owned(),
        None,
        vec![Role::User],
        command.correlation_id,
        clock,
    );

    repo.create(&user).await?;
    info!(user_id = %user.id, username = %user.username(), "user provisioned");

    let events = user.take_uncommitted_events();
    Ok((user, events))
}

/// Handles the `UpdateUser` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the user does not exist and
/// `DomainError::AlreadyExists` if the new email or username belongs to
/// another user.
#[instrument(
    skip_all,
    fields(correlation_id = %command.correlation_id, user_id = %command.user_id)
)]
pub async fn handle_update_user(
    command: &UpdateUser,
    clock: &dyn Clock,
    hasher: &dyn PasswordHasher,
    repo: &dyn UserRepository,
) -> Result<User, DomainError> {
    let mut user = repo
        .find_by_id(command.user_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.user_id))?;

    if let Some(raw) = &command.username {
        let username = Username::parse(raw)?;
        if let Some(other) = repo.find_by_username(username.as_str()).await? {
            if other.id != user.id {
                return Err(DomainError::AlreadyExists("username already taken".into()));
            }
        }
        user.rename(username, clock);
    }

    if let Some(email) = &command.email {
        validate_email(email)?;
        let email = email.trim();
        if let Some(other) = repo.find_by_email(email).await? {
            if other.id != user.id {
                return Err(DomainError::AlreadyExists("email already taken".into()));
            }
        }
        user.change_email(email.to_owned(), clock);
    }

    if let Some(hash) = hash_password(hasher, command.password.as_deref()).await? {
        user.change_password_hash(hash, clock);
    }

    if let Some(roles) = &command.roles {
        if roles.is_empty() {
            return Err(DomainError::Validation("a user needs at least one role".into()));
        }
        user.assign_roles(roles.clone(), clock);
    }

    repo.update(&user).await?;
    info!("user updated");
    Ok(user)
}

/// Handles the `DeleteUser` command.
///
/// The user's `UserDeleted` event is delivered through `dispatcher` and
/// every handler has finished before the user record is removed, so
/// dependent data is cleaned up first.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the user does not exist, the
/// first handler error raised during dispatch (the record is then kept),
/// or any repository error.
#[instrument(
    skip_all,
    fields(correlation_id = %command.correlation_id, user_id = %command.user_id)
)]
pub async fn handle_delete_user(
    command: &DeleteUser,
    clock: &dyn Clock,
    repo: &dyn UserRepository,
    dispatcher: &EventDispatcher<IdentityEvent>,
) -> Result<User, DomainError> {
    let mut user = repo
        .find_by_id(command.user_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.user_id))?;

    user.delete(command.correlation_id, clock);
    dispatcher.mark_pending(&mut user);
    dispatcher.dispatch_for(user.id).await?;

    repo.delete(user.id).await?;
    info!("user deleted");
    Ok(user)
}
