//! Bedrock — PostgreSQL persistence.
//!
//! Implements the repository ports of the Identity and Storage contexts on
//! top of a `sqlx` connection pool. The schema lives in the workspace
//! `migrations/` directory.

mod error;
pub mod migrate;
pub mod pg_file_repository;
pub mod pg_user_repository;
