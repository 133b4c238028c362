//! Process configuration read from the environment.

use std::path::PathBuf;

use bedrock_storage::application::settings::{CascadePolicy, ReplaceStrategy, StorageSettings};

use crate::error::AppError;

const ENVIRONMENTS: [&str; 3] = ["development", "production", "test"];
const DEV_SIGNING_SECRET: &str = "bedrock-development-secret";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// `development`, `production` or `test`. Becomes the first segment of
    /// every blob path.
    pub environment: String,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub signing_secret: String,
    pub replace_strategy: ReplaceStrategy,
    pub cascade: CascadePolicy,
    /// Largest accepted request body on upload routes.
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for missing or malformed values.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for missing or malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL must be set".into()))?;

        let port = var("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;

        let environment = var("APP_ENV", "development");
        if !ENVIRONMENTS.contains(&environment.as_str()) {
            return Err(AppError::Config(format!(
                "APP_ENV must be one of {}, got {environment}",
                ENVIRONMENTS.join(", ")
            )));
        }

        let signing_secret = match lookup("STORAGE_SIGNING_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ if environment == "production" => {
                return Err(AppError::Config(
                    "STORAGE_SIGNING_SECRET must be set in production".into(),
                ));
            }
            _ => DEV_SIGNING_SECRET.to_owned(),
        };

        let replace_strategy = var("UPLOAD_REPLACE_STRATEGY", "delete-then-upload")
            .parse::<ReplaceStrategy>()
            .map_err(|e| AppError::Config(format!("UPLOAD_REPLACE_STRATEGY: {e}")))?;

        let continue_on_item_failure = var("CASCADE_CONTINUE_ON_FAILURE", "true")
            .parse::<bool>()
            .map_err(|e| AppError::Config(format!("CASCADE_CONTINUE_ON_FAILURE: {e}")))?;

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| AppError::Config(format!("MAX_UPLOAD_BYTES: {e}")))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            database_url,
            host: var("HOST", "0.0.0.0"),
            port,
            environment,
            storage_root: PathBuf::from(var("STORAGE_ROOT", "./storage")),
            public_base_url: var("STORAGE_PUBLIC_BASE_URL", "http://localhost:3000/files"),
            signing_secret,
            replace_strategy,
            cascade: CascadePolicy {
                continue_on_item_failure,
            },
            max_upload_bytes,
        })
    }

    /// The subset of the configuration the storage use cases consume.
    #[must_use]
    pub fn storage_settings(&self) -> StorageSettings {
        StorageSettings {
            environment: self.environment.clone(),
            replace_strategy: self.replace_strategy,
            cascade: self.cascade,
        }
    }
}
