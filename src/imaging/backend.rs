//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, transform (masked redact/focus/blur), and thumbnail.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust on the
//! `image` crate, no ImageMagick.

use super::params::{ThumbnailParams, TransformParams};
use crate::mask::MaskError;
use image::ImageFormat;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid mask: {0}")]
    Mask(#[from] MaskError),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Detected container format, `None` when the bytes are not recognised.
    pub format: Option<ImageFormat>,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn is_jpeg(&self) -> bool {
        self.format == Some(ImageFormat::Jpeg)
    }

    /// Upper-case format name for messages, e.g. `PNG`.
    pub fn format_name(&self) -> String {
        match self.format {
            Some(format) => format!("{format:?}").to_uppercase(),
            None => "UNKNOWN".to_string(),
        }
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all three operations so the rest of the
/// codebase is backend-agnostic.
pub trait ImageBackend: Send + Sync {
    /// Detect format and dimensions from the file's bytes.
    fn identify(&self, path: &Path) -> Result<ImageInfo, BackendError>;

    /// Apply the masked transform and write the full-size derivative.
    fn transform(&self, params: &TransformParams) -> Result<(), BackendError>;

    /// Fill-resize and center-crop to exact dimensions.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;
}
