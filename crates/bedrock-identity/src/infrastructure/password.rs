//! Argon2id password hashing on the blocking thread pool.

use argon2::Argon2;
use argon2::password_hash::{self, PasswordHash, PasswordVerifier, SaltString};
use async_trait::async_trait;
use bedrock_core::error::DomainError;
use rand::Rng;

use crate::application::ports::PasswordHasher;

const SALT_LEN: usize = 16;

/// Argon2id with the crate's default parameters. Hashes are PHC strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2PasswordHasher;

impl Argon2PasswordHasher {
    /// Creates a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn hash_blocking(password: &str) -> Result<String, DomainError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt);
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| DomainError::Infrastructure(format!("password salt encoding failed: {e}")))?;

    password_hash::PasswordHasher::hash_password(&Argon2::default(), password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Infrastructure(format!("password hashing failed: {e}")))
}

fn verify_blocking(password: &str, hash: &str) -> Result<bool, DomainError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| DomainError::Infrastructure(format!("invalid password hash format: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DomainError::Infrastructure(format!(
            "password verification failed: {e}"
        ))),
    }
}

async fn run_blocking<T, F>(job: F) -> Result<T, DomainError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| DomainError::Infrastructure(format!("password task failed: {e}")))?
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    async fn hash(&self, password: &str) -> Result<String, DomainError> {
        let password = password.to_owned();
        run_blocking(move || hash_blocking(&password)).await
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        run_blocking(move || verify_blocking(&password, &hash)).await
    }
}
