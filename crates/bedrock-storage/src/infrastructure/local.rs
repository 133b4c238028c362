//! Local filesystem blob store.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bedrock_core::clock::Clock;
use bytes::Bytes;
use chrono::Duration;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use crate::application::ports::{StorageProvider, UploadOptions, UploadResult};
use crate::error::ProviderError;

/// Stores blobs under a root directory and hands out URLs below a public
/// base URL. Signed URLs carry an expiry and a keyed digest,
/// `sha256(secret:path:expires)` in hex, that
/// [`LocalStorageProvider::verify_signature`] checks.
pub struct LocalStorageProvider {
    root: PathBuf,
    public_base_url: String,
    signing_secret: String,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for LocalStorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorageProvider")
            .field("root", &self.root)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

impl LocalStorageProvider {
    /// Creates the provider, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Io` if the root directory cannot be created.
    pub async fn new(
        root: impl Into<PathBuf>,
        public_base_url: &str,
        signing_secret: &str,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ProviderError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
            signing_secret: signing_secret.to_owned(),
            clock,
        })
    }

    /// Reads a blob, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Backend` for paths escaping the root, or
    /// `ProviderError::Io` for read failures.
    pub async fn read(&self, path: &str) -> Result<Option<Bytes>, ProviderError> {
        let full_path = self.resolve(path)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Whether `signature` was issued for `path` with expiry `expires`
    /// (unix seconds) and the expiry has not passed.
    #[must_use]
    pub fn verify_signature(&self, path: &str, expires: i64, signature: &str) -> bool {
        expires >= self.clock.now().timestamp()
            && digests_match(self.sign(path, expires).as_bytes(), signature.as_bytes())
    }

    fn sign(&self, path: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.signing_secret.as_bytes());
        hasher.update(b":");
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(expires.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    // Only plain relative segments are accepted, so a path can never leave
    // the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, ProviderError> {
        let relative = Path::new(path);
        let plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return Err(ProviderError::Backend(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(relative))
    }

    async fn ensure_parent(path: &Path) -> Result<(), ProviderError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

// Compares every byte regardless of where the first mismatch is.
fn digests_match(expected: &[u8], given: &[u8]) -> bool {
    expected.len() == given.len()
        && expected
            .iter()
            .zip(given)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    async fn upload(
        &self,
        bytes: Bytes,
        options: UploadOptions,
    ) -> Result<UploadResult, ProviderError> {
        let full_path = self.resolve(&options.path)?;
        Self::ensure_parent(&full_path).await?;
        fs::write(&full_path, &bytes).await?;

        let size = bytes.len() as u64;
        debug!(path = %options.path, size, mime_type = %options.mime_type, "wrote blob");
        Ok(UploadResult {
            public_url: self.public_url(&options.path),
            path: options.path,
            size,
        })
    }

    async fn delete(&self, path: &str) -> Result<(), ProviderError> {
        let full_path = self.resolve(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!(path, "deleted blob");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, ProviderError> {
        let full_path = self.resolve(path)?;
        Ok(fs::try_exists(&full_path).await?)
    }

    async fn signed_url(&self, path: &str, ttl_minutes: u32) -> Result<String, ProviderError> {
        self.resolve(path)?;
        let expires = (self.clock.now() + Duration::minutes(i64::from(ttl_minutes))).timestamp();
        Ok(format!(
            "{}?expires={expires}&signature={}",
            self.public_url(path),
            self.sign(path, expires)
        ))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{path}", self.public_base_url)
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), ProviderError> {
        let from = self.resolve(source)?;
        let to = self.resolve(destination)?;
        Self::ensure_parent(&to).await?;
        fs::copy(&from, &to).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bedrock_test_support::FixedClock;

    use super::*;

    const PATH: &str = "test/2026/01/user/u1/a.png";

    async fn provider(dir: &tempfile::TempDir) -> LocalStorageProvider {
        LocalStorageProvider::new(
            dir.path(),
            "http://localhost:3000/files/",
            "secret",
            Arc::new(FixedClock::at_month(2026, 1)),
        )
        .await
        .unwrap()
    }

    fn options(path: &str) -> UploadOptions {
        UploadOptions {
            path: path.to_owned(),
            mime_type: "image/png".to_owned(),
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_upload_read_delete() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let storage = provider(&dir).await;

        // Act
        let result = storage
            .upload(Bytes::from_static(b"pixels"), options(PATH))
            .await
            .unwrap();

        // Assert
        assert_eq!(result.size, 6);
        assert_eq!(result.public_url, format!("http://localhost:3000/files/{PATH}"));
        assert!(storage.exists(PATH).await.unwrap());
        assert_eq!(storage.read(PATH).await.unwrap().unwrap(), Bytes::from_static(b"pixels"));

        storage.delete(PATH).await.unwrap();
        assert!(!storage.exists(PATH).await.unwrap());
        assert!(storage.read(PATH).await.unwrap().is_none());
        storage.delete(PATH).await.unwrap();
    }

    #[tokio::test]
    async fn test_copy_creates_destination_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = provider(&dir).await;
        storage
            .upload(Bytes::from_static(b"x"), options(PATH))
            .await
            .unwrap();

        storage
            .copy(PATH, "test/2026/02/user/u1/copy.png")
            .await
            .unwrap();

        assert!(storage.exists(PATH).await.unwrap());
        assert!(storage.exists("test/2026/02/user/u1/copy.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_paths_outside_root_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = provider(&dir).await;

        let result = storage
            .upload(Bytes::from_static(b"x"), options("../escape.png"))
            .await;

        assert!(matches!(result, Err(ProviderError::Backend(_))));
        assert!(storage.exists("/etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_signed_url_round_trips_through_verification() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let storage = provider(&dir).await;
        let now = FixedClock::at_month(2026, 1).0.timestamp();

        // Act
        let url = storage.signed_url(PATH, 60).await.unwrap();

        // Assert
        let expires = now + 3600;
        let prefix = format!("http://localhost:3000/files/{PATH}?expires={expires}&signature=");
        assert!(url.starts_with(&prefix));
        let signature = &url[prefix.len()..];
        assert_eq!(signature.len(), 64);
        assert!(storage.verify_signature(PATH, expires, signature));
        assert!(!storage.verify_signature("test/2026/01/user/u1/b.png", expires, signature));
        assert!(!storage.verify_signature(PATH, expires + 1, signature));
    }

    #[tokio::test]
    async fn test_expired_signature_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = provider(&dir).await;
        let past = FixedClock::at_month(2025, 12).0.timestamp();
        let signature = storage.sign(PATH, past);

        assert!(!storage.verify_signature(PATH, past, &signature));
    }

    #[test]
    fn test_digest_comparison_requires_exact_match() {
        assert!(digests_match(b"abc123", b"abc123"));
        assert!(!digests_match(b"abc123", b"abc124"));
        assert!(!digests_match(b"abc123", b"abc12"));
        assert!(!digests_match(b"", b"a"));
    }
}
