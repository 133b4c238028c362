//! Capability contracts the storage use cases depend on.
//!
//! Adapters live in `crate::infrastructure`. Every fallible call returns a
//! [`ProviderError`], which the use cases translate before returning.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::is_image_mime;
use crate::error::ProviderError;

/// MIME types accepted when validation runs without an explicit allow-list.
pub const DEFAULT_ALLOWED_MIME_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
    "application/pdf",
];

/// Quality used when a transform does not specify one.
pub const DEFAULT_QUALITY: u8 = 80;

// Blob store

/// Where and how a blob is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Serialized `FilePath`.
    pub path: String,
    /// Content type stored alongside the blob.
    pub mime_type: String,
    /// Backend-specific key/value annotations.
    pub metadata: BTreeMap<String, String>,
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub path: String,
    pub public_url: String,
    pub size: u64,
}

/// A blob backend addressed by serialized `FilePath`s.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Writes `bytes` at `options.path`, overwriting any existing blob.
    async fn upload(&self, bytes: Bytes, options: UploadOptions)
    -> Result<UploadResult, ProviderError>;

    /// Removes the blob at `path`. Removing a missing blob succeeds.
    async fn delete(&self, path: &str) -> Result<(), ProviderError>;

    /// Whether a blob exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, ProviderError>;

    /// A URL granting temporary read access.
    async fn signed_url(&self, path: &str, ttl_minutes: u32) -> Result<String, ProviderError>;

    /// The permanent public URL. Does not check existence.
    fn public_url(&self, path: &str) -> String;

    /// Copies the blob at `source` to `destination`.
    async fn copy(&self, source: &str, destination: &str) -> Result<(), ProviderError>;
}

// Validation

/// Upload constraints. Every field is optional and independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Allowed content types; [`DEFAULT_ALLOWED_MIME_TYPES`] when `None`.
    pub allowed_mime_types: Option<Vec<String>>,
    pub max_size_bytes: Option<u64>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
}

impl ValidationOptions {
    /// The allow-list in effect.
    #[must_use]
    pub fn effective_allowed_mime_types(&self) -> Vec<String> {
        self.allowed_mime_types.clone().unwrap_or_else(|| {
            DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|mime| (*mime).to_owned())
                .collect()
        })
    }

    /// Whether any width or height bound is set.
    #[must_use]
    pub fn has_dimension_bounds(&self) -> bool {
        self.min_width.is_some()
            || self.max_width.is_some()
            || self.min_height.is_some()
            || self.max_height.is_some()
    }

    fn check_dimensions(&self, dimensions: ImageDimensions) -> Result<(), String> {
        let ImageDimensions { width, height } = dimensions;
        if let Some(min) = self.min_width.filter(|min| width < *min) {
            return Err(format!(
                "Image width ({width}px) is less than minimum ({min}px)"
            ));
        }
        if let Some(max) = self.max_width.filter(|max| width > *max) {
            return Err(format!("Image width ({width}px) exceeds maximum ({max}px)"));
        }
        if let Some(min) = self.min_height.filter(|min| height < *min) {
            return Err(format!(
                "Image height ({height}px) is less than minimum ({min}px)"
            ));
        }
        if let Some(max) = self.max_height.filter(|max| height > *max) {
            return Err(format!(
                "Image height ({height}px) exceeds maximum ({max}px)"
            ));
        }
        Ok(())
    }
}

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Result of [`FileValidator::validate`]. Each rejection names the check
/// that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// All checks passed.
    Valid {
        /// Content-detected MIME type.
        mime_type: String,
    },
    /// The content type could not be detected.
    UnrecognizedType,
    /// The detected type is not on the allow-list.
    TypeNotAllowed {
        detected: String,
        allowed: Vec<String>,
    },
    /// The payload exceeds `max_size_bytes`.
    TooLarge { actual_bytes: u64, max_bytes: u64 },
    /// Dimensions are unreadable or outside the bounds.
    InvalidDimensions(String),
}

/// Content inspection.
#[async_trait]
pub trait FileValidator: Send + Sync {
    /// Detects the MIME type from the content itself.
    async fn detect_mime_type(&self, bytes: &[u8]) -> Result<Option<String>, ProviderError>;

    /// Reads intrinsic image dimensions without decoding pixels.
    async fn dimensions(&self, bytes: &[u8]) -> Result<Option<ImageDimensions>, ProviderError>;

    /// Runs the combined check: allow-list, then size, then (images with a
    /// bound set only) dimensions. Stops at the first failure.
    async fn validate(
        &self,
        bytes: &[u8],
        options: &ValidationOptions,
    ) -> Result<ValidationOutcome, ProviderError> {
        let Some(mime_type) = self.detect_mime_type(bytes).await? else {
            return Ok(ValidationOutcome::UnrecognizedType);
        };

        let allowed = options.effective_allowed_mime_types();
        if !allowed.iter().any(|candidate| *candidate == mime_type) {
            return Ok(ValidationOutcome::TypeNotAllowed {
                detected: mime_type,
                allowed,
            });
        }

        let actual_bytes = bytes.len() as u64;
        if let Some(max_bytes) = options.max_size_bytes.filter(|max| actual_bytes > *max) {
            return Ok(ValidationOutcome::TooLarge {
                actual_bytes,
                max_bytes,
            });
        }

        if is_image_mime(&mime_type) && options.has_dimension_bounds() {
            let Some(dimensions) = self.dimensions(bytes).await? else {
                return Ok(ValidationOutcome::InvalidDimensions(
                    "Could not read image dimensions. File may not be a valid image.".into(),
                ));
            };
            if let Err(reason) = options.check_dimensions(dimensions) {
                return Ok(ValidationOutcome::InvalidDimensions(reason));
            }
        }

        Ok(ValidationOutcome::Valid { mime_type })
    }
}

// Image processing

/// How an image is fitted into the requested box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Fill the box, cropping overflow.
    #[default]
    Cover,
    /// Fit inside the box, padding with transparency.
    Contain,
    /// Stretch to the exact box.
    Fill,
    /// Fit inside the box, no padding.
    Inside,
    /// Cover the box, no cropping.
    Outside,
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl OutputFormat {
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    /// Maps a MIME type back to a format, if it is one we can encode.
    #[must_use]
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/avif" => Some(Self::Avif),
            _ => None,
        }
    }
}

/// Resize request. Images are never enlarged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitMode,
    /// Encoder quality, `1..=100`.
    pub quality: u8,
    pub format: OutputFormat,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            fit: FitMode::Cover,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::Jpeg,
        }
    }
}

/// Output of an image operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    pub mime_type: String,
}

/// Basic facts about an encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Lowercase format name, e.g. `png`.
    pub format: String,
    pub size: u64,
}

/// Raster image operations.
#[async_trait]
pub trait ImageProcessor: Send + Sync {
    /// Resizes and re-encodes according to `options`.
    async fn resize(
        &self,
        bytes: Bytes,
        options: &TransformOptions,
    ) -> Result<ProcessedImage, ProviderError>;

    /// Re-encodes into `format` without resizing.
    async fn convert(
        &self,
        bytes: Bytes,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> Result<ProcessedImage, ProviderError>;

    /// Re-encodes in the source format (JPEG when unsupported) at `quality`.
    async fn optimize(&self, bytes: Bytes, quality: Option<u8>)
    -> Result<ProcessedImage, ProviderError>;

    /// Reads dimensions and format; `None` if the bytes are not an image.
    async fn metadata(&self, bytes: Bytes) -> Result<Option<ImageInfo>, ProviderError>;
}
