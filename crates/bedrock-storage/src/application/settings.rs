//! Runtime policy knobs for the Storage context.

use std::fmt;
use std::str::FromStr;

use bedrock_core::error::DomainError;

/// Order in which an existing file is replaced by a new upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplaceStrategy {
    /// Remove the old blob and record, then upload. A failed upload leaves
    /// the owner with no file.
    #[default]
    DeleteThenUpload,
    /// Upload and record the new file, then remove the old one. A failed
    /// upload keeps the old file; a failed cleanup leaves an orphan.
    UploadThenSwap,
}

impl FromStr for ReplaceStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete-then-upload" => Ok(Self::DeleteThenUpload),
            "upload-then-swap" => Ok(Self::UploadThenSwap),
            other => Err(DomainError::Validation(format!(
                "unknown replace strategy: {other}"
            ))),
        }
    }
}

impl fmt::Display for ReplaceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DeleteThenUpload => "delete-then-upload",
            Self::UploadThenSwap => "upload-then-swap",
        })
    }
}

/// Failure policy of the user-deletion cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadePolicy {
    /// Keep deleting the remaining blobs after one fails. Metadata is
    /// always bulk-deleted when this is set.
    pub continue_on_item_failure: bool,
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self {
            continue_on_item_failure: true,
        }
    }
}

/// Storage configuration consumed by the use cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// First path segment of every blob, e.g. `development`.
    pub environment: String,
    pub replace_strategy: ReplaceStrategy,
    pub cascade: CascadePolicy,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            environment: "development".to_owned(),
            replace_strategy: ReplaceStrategy::default(),
            cascade: CascadePolicy::default(),
        }
    }
}
