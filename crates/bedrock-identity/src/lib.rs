//! Bedrock — Identity bounded context.
//!
//! Responsible for user accounts. Deleting a user publishes
//! `UserDeleted`, which other contexts subscribe to for cascading cleanup.

pub mod application;
pub mod domain;
pub mod infrastructure;
