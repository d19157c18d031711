//! Image processing in pure Rust, no ImageMagick.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::with_guessed_format` + `into_dimensions` |
//! | **Redact** | scanline mask, masked pixels painted black |
//! | **Focus / Blur** | scanline mask + `imageops::blur` composite |
//! | **Thumbnail** | `resize_to_fill` (Lanczos3) |
//! | **Encode** | `JpegEncoder` |
//!
//! The module is split into:
//! - **Raster**: Pure polygon-to-coverage rasterization (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining validation + backend

pub mod backend;
pub mod operations;
mod params;
pub mod raster;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, ImageInfo};
pub use operations::{
    Derivatives, TransformConfig, TransformError, apply, ensure_jpeg, plan_thumbnail,
    plan_transform,
};
pub use params::{MaskMode, Quality, ThumbnailParams, TransformParams};
pub use rust_backend::RustBackend;
