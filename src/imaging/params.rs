//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations) (which decides what
//! derivatives to produce) and the [`backend`](super::backend) (which does
//! the pixel work), so the backend can be swapped for a mock in tests.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`MaskMode`]: what happens inside vs. outside the mask, with blur strength.
//! - [`TransformParams`]: source, output, draw spec and mode for the full-size derivative.
//! - [`ThumbnailParams`]: source, output and exact crop size for the thumbnail.

use crate::mask::DrawSpec;
use crate::types::Operation;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Per-pixel treatment of the mask.
///
/// `sigma` is the Gaussian standard deviation in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaskMode {
    /// Masked pixels become solid black; nothing is blurred.
    Redact,
    /// Masked pixels stay sharp; everything else is blurred.
    Focus { sigma: f32 },
    /// Masked pixels are blurred; everything else stays sharp.
    Blur { sigma: f32 },
}

impl MaskMode {
    pub fn for_operation(op: Operation, focus_sigma: f32, blur_sigma: f32) -> Self {
        match op {
            Operation::Redact => MaskMode::Redact,
            Operation::Focus => MaskMode::Focus { sigma: focus_sigma },
            Operation::Blur => MaskMode::Blur { sigma: blur_sigma },
        }
    }
}

/// Parameters for producing the full-size derivative.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub draw_spec: DrawSpec,
    pub mode: MaskMode,
    pub quality: Quality,
}

/// Parameters for a thumbnail operation (fill-resize + center crop).
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}
