//! Annotation payload types.
//!
//! Field names mirror the vision service's JSON (camelCase). Every collection
//! is optional: the service omits empty ones, and a missing collection simply
//! contributes no regions. Numeric fields the service leaves out when zero
//! default to `0`.

use serde::{Deserialize, Serialize};

/// Ordinal confidence bucket for a facial expression.
///
/// Declaration order is the ordinal order, so `Likelihood::VeryLikely` is the
/// maximum under `Ord` and `Unknown` the minimum. Values the service adds
/// later parse as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    pub fn is_max(self) -> bool {
        self == Likelihood::VeryLikely
    }
}

impl From<String> for Likelihood {
    fn from(name: String) -> Self {
        match name.as_str() {
            "VERY_UNLIKELY" => Likelihood::VeryUnlikely,
            "UNLIKELY" => Likelihood::Unlikely,
            "POSSIBLE" => Likelihood::Possible,
            "LIKELY" => Likelihood::Likely,
            "VERY_LIKELY" => Likelihood::VeryLikely,
            _ => Likelihood::Unknown,
        }
    }
}

/// Facial expressions the service scores independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emotion {
    Joy,
    Sorrow,
    Anger,
    Surprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAnnotation {
    #[serde(default)]
    pub bounding_poly: BoundingPoly,
    #[serde(default)]
    pub joy_likelihood: Likelihood,
    #[serde(default)]
    pub sorrow_likelihood: Likelihood,
    #[serde(default)]
    pub anger_likelihood: Likelihood,
    #[serde(default)]
    pub surprise_likelihood: Likelihood,
}

impl FaceAnnotation {
    pub fn likelihood(&self, emotion: Emotion) -> Likelihood {
        match emotion {
            Emotion::Joy => self.joy_likelihood,
            Emotion::Sorrow => self.sorrow_likelihood,
            Emotion::Anger => self.anger_likelihood,
            Emotion::Surprise => self.surprise_likelihood,
        }
    }
}

/// A logo or text detection: a region with an optional description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub bounding_poly: BoundingPoly,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInfo {
    #[serde(default)]
    pub color: Rgb,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub pixel_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DominantColors {
    #[serde(default)]
    pub colors: Vec<ColorInfo>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProperties {
    #[serde(default)]
    pub dominant_colors: DominantColors,
}

/// Structured error the service reports for a single image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Everything the service returned for one image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_annotations: Option<Vec<EntityAnnotation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_properties_annotation: Option<ImageProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_annotations: Option<Vec<FaceAnnotation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_annotations: Option<Vec<EntityAnnotation>>,
    /// Index 0 is the aggregate box covering all text; the rest are fragments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_annotations: Option<Vec<EntityAnnotation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceStatus>,
}

impl Annotations {
    pub fn faces(&self) -> &[FaceAnnotation] {
        self.face_annotations.as_deref().unwrap_or_default()
    }

    pub fn logos(&self) -> &[EntityAnnotation] {
        self.logo_annotations.as_deref().unwrap_or_default()
    }

    pub fn texts(&self) -> &[EntityAnnotation] {
        self.text_annotations.as_deref().unwrap_or_default()
    }

    pub fn colors(&self) -> &[ColorInfo] {
        self.image_properties_annotation
            .as_ref()
            .map(|p| p.dominant_colors.colors.as_slice())
            .unwrap_or_default()
    }

    /// Label descriptions, highest score first. Labels without a description
    /// are skipped.
    pub fn labels_by_score(&self) -> Vec<String> {
        let mut labels: Vec<&EntityAnnotation> = self
            .label_annotations
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|l| l.description.is_some())
            .collect();
        labels.sort_by(|a, b| {
            b.score
                .unwrap_or(0.0)
                .total_cmp(&a.score.unwrap_or(0.0))
        });
        labels
            .into_iter()
            .filter_map(|l| l.description.clone())
            .collect()
    }
}
