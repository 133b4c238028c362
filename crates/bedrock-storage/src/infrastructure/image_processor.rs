//! Raster image processing on the blocking thread pool.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageReader, RgbaImage};
use tracing::debug;

use crate::application::ports::{
    FitMode, ImageInfo, ImageProcessor, OutputFormat, ProcessedImage, TransformOptions,
    DEFAULT_QUALITY,
};
use crate::error::ProviderError;

const FILTER: FilterType = FilterType::Lanczos3;
const AVIF_SPEED: u8 = 6;

/// [`ImageProcessor`] built on the `image` crate. Decoding and encoding run
/// on `spawn_blocking` so they never stall the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterImageProcessor;

impl RasterImageProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

async fn run_blocking<T, F>(job: F) -> Result<T, ProviderError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProviderError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| ProviderError::Backend(format!("image task failed: {err}")))?
}

fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(1, 100)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scaled(length: u32, factor: f64) -> u32 {
    ((f64::from(length) * factor).round() as u32).max(1)
}

/// Applies the resize described by `options`. Boxes larger than the source
/// are clamped to it, so output is never enlarged.
fn transform(image: &DynamicImage, options: &TransformOptions) -> DynamicImage {
    let (source_width, source_height) = image.dimensions();
    match (options.width, options.height) {
        (None, None) => image.clone(),
        (Some(width), None) => {
            let width = width.min(source_width);
            let factor = f64::from(width) / f64::from(source_width);
            image.resize_exact(width, scaled(source_height, factor), FILTER)
        }
        (None, Some(height)) => {
            let height = height.min(source_height);
            let factor = f64::from(height) / f64::from(source_height);
            image.resize_exact(scaled(source_width, factor), height, FILTER)
        }
        (Some(width), Some(height)) => {
            let width = width.min(source_width);
            let height = height.min(source_height);
            fit(image, width, height, options.fit)
        }
    }
}

fn fit(image: &DynamicImage, width: u32, height: u32, mode: FitMode) -> DynamicImage {
    match mode {
        FitMode::Cover => image.resize_to_fill(width, height, FILTER),
        FitMode::Fill => image.resize_exact(width, height, FILTER),
        FitMode::Inside => image.resize(width, height, FILTER),
        FitMode::Contain => {
            let resized = image.resize(width, height, FILTER).to_rgba8();
            let mut canvas = RgbaImage::new(width, height);
            let x = i64::from((width - resized.width()) / 2);
            let y = i64::from((height - resized.height()) / 2);
            imageops::overlay(&mut canvas, &resized, x, y);
            DynamicImage::ImageRgba8(canvas)
        }
        FitMode::Outside => {
            let (source_width, source_height) = image.dimensions();
            let factor = (f64::from(width) / f64::from(source_width))
                .max(f64::from(height) / f64::from(source_height))
                .min(1.0);
            image.resize_exact(
                scaled(source_width, factor),
                scaled(source_height, factor),
                FILTER,
            )
        }
    }
}

fn encode(
    image: &DynamicImage,
    format: OutputFormat,
    quality: u8,
) -> Result<ProcessedImage, ProviderError> {
    let quality = clamp_quality(quality);
    let mut out = Vec::new();
    match format {
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?,
        OutputFormat::Png => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_with_encoder(PngEncoder::new(&mut out))?,
        OutputFormat::Webp => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_with_encoder(WebPEncoder::new_lossless(&mut out))?,
        OutputFormat::Avif => DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(
            AvifEncoder::new_with_speed_quality(&mut out, AVIF_SPEED, quality),
        )?,
    }

    let (width, height) = image.dimensions();
    debug!(width, height, format = format.mime_type(), size = out.len(), "encoded image");
    Ok(ProcessedImage {
        size: out.len() as u64,
        bytes: Bytes::from(out),
        width,
        height,
        mime_type: format.mime_type().to_owned(),
    })
}

fn source_format(bytes: &[u8]) -> OutputFormat {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| OutputFormat::from_mime_type(format.to_mime_type()))
        .unwrap_or_default()
}

#[async_trait]
impl ImageProcessor for RasterImageProcessor {
    async fn resize(
        &self,
        bytes: Bytes,
        options: &TransformOptions,
    ) -> Result<ProcessedImage, ProviderError> {
        let options = *options;
        run_blocking(move || {
            let image = image::load_from_memory(&bytes)?;
            encode(&transform(&image, &options), options.format, options.quality)
        })
        .await
    }

    async fn convert(
        &self,
        bytes: Bytes,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> Result<ProcessedImage, ProviderError> {
        run_blocking(move || {
            let image = image::load_from_memory(&bytes)?;
            encode(&image, format, quality.unwrap_or(DEFAULT_QUALITY))
        })
        .await
    }

    async fn optimize(
        &self,
        bytes: Bytes,
        quality: Option<u8>,
    ) -> Result<ProcessedImage, ProviderError> {
        run_blocking(move || {
            let format = source_format(&bytes);
            let image = image::load_from_memory(&bytes)?;
            encode(&image, format, quality.unwrap_or(DEFAULT_QUALITY))
        })
        .await
    }

    async fn metadata(&self, bytes: Bytes) -> Result<Option<ImageInfo>, ProviderError> {
        run_blocking(move || {
            let Ok(format) = image::guess_format(&bytes) else {
                return Ok(None);
            };
            let reader = ImageReader::with_format(Cursor::new(&bytes[..]), format);
            let Ok((width, height)) = reader.into_dimensions() else {
                return Ok(None);
            };
            let mime_type = format.to_mime_type();
            Ok(Some(ImageInfo {
                width,
                height,
                format: mime_type
                    .strip_prefix("image/")
                    .unwrap_or(mime_type)
                    .to_owned(),
                size: bytes.len() as u64,
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::Bytes;
    use image::{ImageFormat, Rgba, RgbaImage};

    use super::RasterImageProcessor;
    use crate::application::ports::{
        FitMode, ImageInfo, ImageProcessor, OutputFormat, TransformOptions,
    };
    use crate::error::ProviderError;

    fn png(width: u32, height: u32) -> Bytes {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        Bytes::from(out.into_inner())
    }

    fn boxed(width: u32, height: u32, fit: FitMode, format: OutputFormat) -> TransformOptions {
        TransformOptions {
            width: Some(width),
            height: Some(height),
            fit,
            format,
            ..TransformOptions::default()
        }
    }

    async fn resized(options: TransformOptions) -> (u32, u32) {
        let processed = RasterImageProcessor::new()
            .resize(png(200, 100), &options)
            .await
            .unwrap();
        let decoded = image::load_from_memory(&processed.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (processed.width, processed.height));
        (processed.width, processed.height)
    }

    #[tokio::test]
    async fn test_fit_modes_produce_expected_dimensions() {
        let png_out = OutputFormat::Png;

        assert_eq!(resized(boxed(50, 50, FitMode::Cover, png_out)).await, (50, 50));
        assert_eq!(resized(boxed(50, 50, FitMode::Contain, png_out)).await, (50, 50));
        assert_eq!(resized(boxed(50, 50, FitMode::Fill, png_out)).await, (50, 50));
        assert_eq!(resized(boxed(50, 50, FitMode::Inside, png_out)).await, (50, 25));
        assert_eq!(resized(boxed(50, 50, FitMode::Outside, png_out)).await, (100, 50));
    }

    #[tokio::test]
    async fn test_single_dimension_keeps_aspect_ratio() {
        let options = TransformOptions {
            width: Some(100),
            format: OutputFormat::Png,
            ..TransformOptions::default()
        };

        assert_eq!(resized(options).await, (100, 50));
    }

    #[tokio::test]
    async fn test_resize_never_enlarges() {
        let options = TransformOptions {
            width: Some(800),
            format: OutputFormat::Png,
            ..TransformOptions::default()
        };

        assert_eq!(resized(options).await, (200, 100));
        assert_eq!(
            resized(boxed(400, 400, FitMode::Inside, OutputFormat::Png)).await,
            (200, 100)
        );
    }

    #[tokio::test]
    async fn test_resize_defaults_to_jpeg_output() {
        // Arrange
        let processor = RasterImageProcessor::new();
        let options = boxed(40, 40, FitMode::Cover, OutputFormat::default());

        // Act
        let processed = processor.resize(png(200, 100), &options).await.unwrap();

        // Assert
        assert_eq!(processed.mime_type, "image/jpeg");
        assert_eq!(processed.size, processed.bytes.len() as u64);
        assert_eq!(
            image::guess_format(&processed.bytes).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[tokio::test]
    async fn test_convert_to_webp() {
        let processed = RasterImageProcessor::new()
            .convert(png(20, 10), OutputFormat::Webp, None)
            .await
            .unwrap();

        assert_eq!(processed.mime_type, "image/webp");
        assert_eq!((processed.width, processed.height), (20, 10));
        assert_eq!(
            image::guess_format(&processed.bytes).unwrap(),
            ImageFormat::WebP
        );
    }

    #[tokio::test]
    async fn test_optimize_keeps_source_format() {
        let processed = RasterImageProcessor::new()
            .optimize(png(20, 10), Some(60))
            .await
            .unwrap();

        assert_eq!(processed.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_metadata_reads_header() {
        let processor = RasterImageProcessor::new();
        let bytes = png(30, 12);
        let size = bytes.len() as u64;

        let info = processor.metadata(bytes).await.unwrap();
        let missing = processor
            .metadata(Bytes::from_static(b"not an image"))
            .await
            .unwrap();

        assert_eq!(
            info,
            Some(ImageInfo {
                width: 30,
                height: 12,
                format: "png".to_owned(),
                size,
            })
        );
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_resize_rejects_garbage() {
        let result = RasterImageProcessor::new()
            .resize(Bytes::from_static(b"garbage"), &TransformOptions::default())
            .await;

        assert!(matches!(result, Err(ProviderError::Image(_))));
    }
}
