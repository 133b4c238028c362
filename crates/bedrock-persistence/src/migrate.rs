//! Schema migrations.

use bedrock_core::error::DomainError;
use sqlx::PgPool;
use tracing::info;

/// Applies every pending migration from the workspace `migrations/`
/// directory.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    info!("running database migrations");
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::Infrastructure(format!("failed to run migrations: {e}")))?;
    info!("database migrations complete");
    Ok(())
}
