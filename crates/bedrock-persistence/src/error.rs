//! Mapping from `sqlx` failures to domain errors.

use bedrock_core::error::DomainError;

/// Converts a database error, reporting unique-constraint violations as
/// `AlreadyExists` so callers can tell a conflict from an outage.
pub(crate) fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => {
            DomainError::AlreadyExists(format!("{context}: {}", db.message()))
        }
        _ => DomainError::Infrastructure(format!("{context}: {err}")),
    }
}

/// Reports a persisted value that no longer satisfies the domain model.
pub(crate) fn corrupt_row(column: &str, detail: impl std::fmt::Display) -> DomainError {
    DomainError::Infrastructure(format!("invalid value in column {column}: {detail}"))
}
