//! Vision annotations: payload model and service client.

pub mod client;
pub mod model;

pub use client::{AnnotationError, AnnotationResponse, Annotator, VisionClient};
pub use model::{
    Annotations, BoundingPoly, ColorInfo, DominantColors, Emotion, EntityAnnotation,
    FaceAnnotation, ImageProperties, Likelihood, Rgb, Vertex,
};
