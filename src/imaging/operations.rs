//! High-level transform operations.
//!
//! These functions combine configuration with backend execution: validate
//! the source, compute parameters, call the backend. Both derivatives land
//! in a caller-supplied directory under their version-qualified names.

use super::backend::{BackendError, ImageBackend, ImageInfo};
use super::params::{MaskMode, Quality, ThumbnailParams, TransformParams};
use crate::mask::DrawSpec;
use crate::types::{ArtifactKind, Operation, artifact_name};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Unrecognized file format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Blur strengths, thumbnail size and encoding quality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformConfig {
    pub focus_sigma: f32,
    pub blur_sigma: f32,
    pub thumbnail: (u32, u32),
    pub quality: Quality,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            focus_sigma: 25.0,
            blur_sigma: 15.0,
            thumbnail: (400, 400),
            quality: Quality::default(),
        }
    }
}

/// Paths of the two derivatives written by [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivatives {
    pub full_size: PathBuf,
    pub thumbnail: PathBuf,
}

/// Reject anything the backend does not identify as JPEG.
pub fn ensure_jpeg(backend: &impl ImageBackend, path: &Path) -> Result<ImageInfo> {
    let info = backend.identify(path)?;
    if !info.is_jpeg() {
        return Err(TransformError::UnsupportedFormat(info.format_name()));
    }
    Ok(info)
}

/// Plan the full-size transform without executing it.
pub fn plan_transform(
    source: &Path,
    output: &Path,
    draw_spec: &DrawSpec,
    operation: Operation,
    config: &TransformConfig,
) -> TransformParams {
    TransformParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        draw_spec: draw_spec.clone(),
        mode: MaskMode::for_operation(operation, config.focus_sigma, config.blur_sigma),
        quality: config.quality,
    }
}

/// Plan a thumbnail operation without executing it.
pub fn plan_thumbnail(source: &Path, output: &Path, config: &TransformConfig) -> ThumbnailParams {
    let (width, height) = config.thumbnail;
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width,
        height,
        quality: config.quality,
    }
}

/// Produce the full-size and thumbnail derivatives for `(id, version)`.
///
/// The format check runs first, so a non-JPEG source writes nothing. The
/// thumbnail is cropped from the full-size derivative, not the source.
#[allow(clippy::too_many_arguments)]
pub fn apply(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    id: &str,
    version: u64,
    draw_spec: &DrawSpec,
    operation: Operation,
    config: &TransformConfig,
) -> Result<Derivatives> {
    ensure_jpeg(backend, source)?;

    let full_size = output_dir.join(artifact_name(id, version, ArtifactKind::FullSize));
    let thumbnail = output_dir.join(artifact_name(id, version, ArtifactKind::Thumbnail));

    backend.transform(&plan_transform(
        source, &full_size, draw_spec, operation, config,
    ))?;
    backend.thumbnail(&plan_thumbnail(&full_size, &thumbnail, config))?;

    Ok(Derivatives {
        full_size,
        thumbnail,
    })
}
