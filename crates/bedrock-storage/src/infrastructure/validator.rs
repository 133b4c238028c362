//! Content sniffing backed by the `image` crate.

use std::io::Cursor;

use async_trait::async_trait;
use image::ImageReader;
use tracing::debug;

use crate::application::ports::{FileValidator, ImageDimensions};
use crate::error::ProviderError;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Detects MIME types from magic bytes and reads image dimensions from
/// headers. Declared types and file extensions are never consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileValidator;

impl ImageFileValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileValidator for ImageFileValidator {
    async fn detect_mime_type(&self, bytes: &[u8]) -> Result<Option<String>, ProviderError> {
        if bytes.starts_with(PDF_MAGIC) {
            return Ok(Some("application/pdf".to_owned()));
        }
        Ok(image::guess_format(bytes)
            .ok()
            .map(|format| format.to_mime_type().to_owned()))
    }

    async fn dimensions(&self, bytes: &[u8]) -> Result<Option<ImageDimensions>, ProviderError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        match reader.into_dimensions() {
            Ok((width, height)) => Ok(Some(ImageDimensions { width, height })),
            Err(err) => {
                debug!(error = %err, "could not read image dimensions");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, RgbaImage};

    use super::*;
    use crate::application::ports::{ValidationOptions, ValidationOutcome};

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::new(width, height).write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_detects_type_from_content() {
        let validator = ImageFileValidator::new();

        let png = validator
            .detect_mime_type(&encoded(4, 4, ImageFormat::Png))
            .await
            .unwrap();
        let pdf = validator
            .detect_mime_type(b"%PDF-1.7\n...")
            .await
            .unwrap();
        let text = validator.detect_mime_type(b"just text").await.unwrap();

        assert_eq!(png.as_deref(), Some("image/png"));
        assert_eq!(pdf.as_deref(), Some("application/pdf"));
        assert_eq!(text, None);
    }

    #[tokio::test]
    async fn test_reads_dimensions_from_header() {
        let validator = ImageFileValidator::new();

        let dimensions = validator
            .dimensions(&encoded(120, 80, ImageFormat::Png))
            .await
            .unwrap();

        assert_eq!(
            dimensions,
            Some(ImageDimensions {
                width: 120,
                height: 80
            })
        );
    }

    #[tokio::test]
    async fn test_truncated_image_has_no_dimensions() {
        let validator = ImageFileValidator::new();
        let png = encoded(10, 10, ImageFormat::Png);

        let dimensions = validator.dimensions(&png[..12]).await.unwrap();

        assert_eq!(dimensions, None);
    }

    #[tokio::test]
    async fn test_validate_rejects_small_png() {
        // Arrange
        let validator = ImageFileValidator::new();
        let options = ValidationOptions {
            min_width: Some(100),
            ..ValidationOptions::default()
        };

        // Act
        let outcome = validator
            .validate(&encoded(10, 200, ImageFormat::Png), &options)
            .await
            .unwrap();

        // Assert
        assert_eq!(
            outcome,
            ValidationOutcome::InvalidDimensions(
                "Image width (10px) is less than minimum (100px)".to_owned()
            )
        );
    }
}
