//! Value objects for the Storage context.

use std::fmt;
use std::str::FromStr;

use bedrock_core::clock::Clock;
use bedrock_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// The `(entity type, entity id, field)` triple that owns a file, e.g.
/// `("user", "<uuid>", "avatar")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileOwner {
    /// Kind of the owning entity.
    pub entity_type: String,
    /// Identifier of the owning entity. Polymorphic, so kept as text.
    pub entity_id: String,
    /// Slot on the owning entity.
    pub field: String,
}

impl FileOwner {
    /// Builds an owner triple.
    #[must_use]
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for FileOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.entity_type, self.entity_id, self.field)
    }
}

/// Canonical blob address:
/// `{environment}/{year}/{month:02}/{entity_type}/{entity_id}/{filename}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath {
    environment: String,
    year: i32,
    month: u32,
    entity_type: String,
    entity_id: String,
    filename: String,
}

impl FilePath {
    /// Builds a path from its parts.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a segment is empty, a directory
    /// segment contains `/`, or `month` is outside `1..=12`.
    pub fn new(
        environment: &str,
        year: i32,
        month: u32,
        entity_type: &str,
        entity_id: &str,
        filename: &str,
    ) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::Validation(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        for (name, value) in [
            ("environment", environment),
            ("entity type", entity_type),
            ("entity id", entity_id),
        ] {
            if value.is_empty() || value.contains('/') {
                return Err(DomainError::Validation(format!(
                    "{name} must be a non-empty path segment"
                )));
            }
        }
        if filename.is_empty() {
            return Err(DomainError::Validation("filename must not be empty".into()));
        }

        Ok(Self {
            environment: environment.to_owned(),
            year,
            month,
            entity_type: entity_type.to_owned(),
            entity_id: entity_id.to_owned(),
            filename: filename.to_owned(),
        })
    }

    /// Builds the path for a file uploaded now, partitioned by the clock's
    /// current year and month.
    ///
    /// # Errors
    ///
    /// Same as [`FilePath::new`].
    pub fn build(
        owner: &FileOwner,
        filename: &str,
        environment: &str,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let (year, month) = clock.year_month();
        Self::new(
            environment,
            year,
            month,
            &owner.entity_type,
            &owner.entity_id,
            filename,
        )
    }

    /// Deployment environment segment.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Upload year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Upload month, `1..=12`.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Owning entity kind.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Owning entity identifier.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// File name; may itself contain `/`.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{:02}/{}/{}/{}",
            self.environment, self.year, self.month, self.entity_type, self.entity_id, self.filename
        )
    }
}

impl FromStr for FilePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(6, '/').collect();
        let [environment, year, month, entity_type, entity_id, filename] = parts[..] else {
            return Err(DomainError::Validation(format!(
                "invalid file path format: {s}"
            )));
        };
        let year = year
            .parse::<i32>()
            .map_err(|_| DomainError::Validation(format!("invalid year in file path: {s}")))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| DomainError::Validation(format!("invalid month in file path: {s}")))?;
        Self::new(environment, year, month, entity_type, entity_id, filename)
    }
}

/// Content description of a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    mime_type: String,
    size: u64,
    width: Option<u32>,
    height: Option<u32>,
}

impl FileMetadata {
    /// Creates metadata. Width and height are only meaningful for images.
    #[must_use]
    pub fn new(
        mime_type: impl Into<String>,
        size: u64,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Self {
        Self {
            mime_type: mime_type.into(),
            size,
            width,
            height,
        }
    }

    /// MIME type detected from content.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Pixel width, when known.
    #[must_use]
    pub fn width(&self) -> Option<u32> {
        self.width
    }

    /// Pixel height, when known.
    #[must_use]
    pub fn height(&self) -> Option<u32> {
        self.height
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        is_image_mime(&self.mime_type)
    }

    #[must_use]
    pub fn has_dimensions(&self) -> bool {
        self.width.is_some() && self.height.is_some()
    }

    /// Size in kibibytes, rounded to the nearest integer.
    #[must_use]
    pub fn size_in_kb(&self) -> u64 {
        (self.size + 512) / 1024
    }

    /// Size in mebibytes, rounded to two decimals.
    #[must_use]
    pub fn size_in_mb(&self) -> f64 {
        (crate::error::megabytes(self.size) * 100.0).round() / 100.0
    }
}

/// Whether `mime_type` denotes a raster image.
#[must_use]
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}
