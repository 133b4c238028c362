//! Bedrock — Storage bounded context.
//!
//! Responsible for binary assets owned by `(entity type, entity id, field)`
//! triples: the ingestion pipeline, delete and URL use cases, and the
//! cascade that removes a user's files when identity publishes
//! `UserDeleted`.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
