//! `PostgreSQL` implementation of the `UserRepository` trait.

use async_trait::async_trait;
use bedrock_core::error::DomainError;
use bedrock_identity::domain::aggregates::User;
use bedrock_identity::domain::repository::UserRepository;
use bedrock_identity::domain::value_objects::{Role, Username};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::{corrupt_row, db_error};

const COLUMNS: &str = "id, username, email, password_hash, roles, created_at, updated_at";

/// PostgreSQL-backed user repository.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Creates a new `PgUserRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE {column} = $1");
        sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to find user", e))?
            .map(|row| user_from_row(&row))
            .transpose()
    }
}

fn user_from_row(row: &PgRow) -> Result<User, DomainError> {
    let get = |e: sqlx::Error| db_error("failed to read user row", e);
    let username: String = row.try_get("username").map_err(get)?;
    let roles: Vec<String> = row.try_get("roles").map_err(get)?;
    Ok(User::restore(
        row.try_get("id").map_err(get)?,
        Username::parse(&username).map_err(|e| corrupt_row("username", e))?,
        row.try_get("email").map_err(get)?,
        row.try_get("password_hash").map_err(get)?,
        roles
            .iter()
            .map(|role| Role::parse(role).map_err(|e| corrupt_row("roles", e)))
            .collect::<Result<_, _>>()?,
        row.try_get("created_at").map_err(get)?,
        row.try_get("updated_at").map_err(get)?,
    ))
}

fn role_names(user: &User) -> Vec<String> {
    user.roles().iter().map(|role| role.as_str().to_owned()).collect()
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list(&self, page: u32, limit: u32) -> Result<Vec<User>, DomainError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let sql = format!(
            "SELECT {COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("failed to list users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to find user", e))?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.find_one("email", email).await
    }

    async fn create(&self, user: &User) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, roles, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(user.username().as_str())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(role_names(user))
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("failed to create user", e))?;
        debug!(user_id = %user.id, "inserted user row");
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE users SET username = $2, email = $3, password_hash = $4, roles = $5, \
             updated_at = $6 WHERE id = $1",
        )
        .bind(user.id)
        .bind(user.username().as_str())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(role_names(user))
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("failed to update user", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::AggregateNotFound(user.id));
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("failed to delete user", e))?;
        Ok(result.rows_affected() > 0)
    }
}
