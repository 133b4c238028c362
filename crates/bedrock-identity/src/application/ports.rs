//! Capability contracts the identity use cases depend on.

use async_trait::async_trait;
use bedrock_core::error::DomainError;

/// One-way password hashing.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hashes `password` under a fresh random salt.
    async fn hash(&self, password: &str) -> Result<String, DomainError>;

    /// Checks `password` against a hash produced by [`PasswordHasher::hash`].
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError>;
}
