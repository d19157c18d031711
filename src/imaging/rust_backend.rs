//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format sniffing | `image::ImageReader::with_guessed_format` on the raw file (magic bytes only) |
//! | Decode | `image` crate (pure Rust decoders) |
//! | Mask | draw spec parsed back to polygons, [`rasterize`](super::raster::rasterize) |
//! | Blur | `image::imageops::blur` (Gaussian) |
//! | Thumbnail crop | `image::DynamicImage::resize_to_fill` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, ImageBackend, ImageInfo};
use super::params::{MaskMode, ThumbnailParams, TransformParams};
use super::raster::{Coverage, rasterize};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Open `path` with its format taken from the leading bytes alone.
///
/// The extension is never consulted: content that matches no known
/// signature has no format.
fn open_sniffed(path: &Path) -> Result<ImageReader<BufReader<File>>, BackendError> {
    let file = File::open(path)?;
    Ok(ImageReader::new(BufReader::new(file)).with_guessed_format()?)
}

/// Load and decode an image from disk, detecting the format from its bytes.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    open_sniffed(path)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode and save as baseline JPEG.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100) as u8);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

/// Paint every covered pixel black.
fn redact(mut img: RgbImage, coverage: &Coverage) -> RgbImage {
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if coverage.contains(x, y) {
            *pixel = Rgb([0, 0, 0]);
        }
    }
    img
}

/// Take blurred pixels where `coverage.contains(x, y) == blur_inside`,
/// sharp pixels elsewhere.
fn selective_blur(sharp: RgbImage, coverage: &Coverage, sigma: f32, blur_inside: bool) -> RgbImage {
    // Blur mode with nothing selected leaves the image untouched
    if blur_inside && coverage.count() == 0 {
        return sharp;
    }
    let blurred = image::imageops::blur(&sharp, sigma);
    let mut out = sharp;
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if coverage.contains(x, y) == blur_inside {
            *pixel = *blurred.get_pixel(x, y);
        }
    }
    out
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<ImageInfo, BackendError> {
        let reader = open_sniffed(path)?;
        let format = reader.format();
        let (width, height) = if format == Some(ImageFormat::Jpeg) {
            reader.into_dimensions().map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
            })?
        } else {
            // Rejected upstream either way; dimensions are informational
            reader.into_dimensions().unwrap_or((0, 0))
        };
        Ok(ImageInfo {
            format,
            width,
            height,
        })
    }

    fn transform(&self, params: &TransformParams) -> Result<(), BackendError> {
        let polygons = params.draw_spec.polygons()?;
        let img = load_image(&params.source)?.to_rgb8();
        let coverage = rasterize(&polygons, img.width(), img.height());

        let out = match params.mode {
            MaskMode::Redact => redact(img, &coverage),
            MaskMode::Focus { sigma } => selective_blur(img, &coverage, sigma, false),
            MaskMode::Blur { sigma } => selective_blur(img, &coverage, sigma, true),
        };

        save_jpeg(
            &DynamicImage::ImageRgb8(out),
            &params.output,
            params.quality.value(),
        )
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let filled = img.resize_to_fill(params.width, params.height, FilterType::Lanczos3);
        save_jpeg(&filled, &params.output, params.quality.value())
    }
}
