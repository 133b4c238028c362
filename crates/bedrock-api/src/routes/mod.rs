//! Route modules organized by bounded context.

pub mod blobs;
pub mod files;
pub mod health;
pub mod users;
