//! Region selection: which annotated regions get masked.
//!
//! [`select_regions`] is a pure function of the annotation payload and the
//! photo's [`Filters`]. Regions are emitted in a fixed order (faces, then
//! logos, then text) so the resulting draw program is reproducible.
//!
//! Vertex coordinates arrive as floats and are truncated toward zero to
//! integer pixels here, once. The mask compiler only ever sees integers.

use crate::annotation::{Annotations, BoundingPoly, Emotion, FaceAnnotation};
use crate::types::{FaceOperation, Filters, LogoDetection, TextFilter};
use serde::Serialize;

/// Integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Ordered vertices of one region. May be degenerate (fewer than 3 points).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Polygon {
    pub vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Convert annotation vertices, truncating each coordinate toward zero.
    pub fn from_bounding_poly(poly: &BoundingPoly) -> Self {
        Self {
            vertices: poly
                .vertices
                .iter()
                .map(|v| Point::new(truncate(v.x), truncate(v.y)))
                .collect(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3
    }
}

/// The single rounding rule for annotation coordinates.
fn truncate(coord: f64) -> i64 {
    coord.trunc() as i64
}

/// How a [`FaceOperation`] decides whether a face is masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceRule {
    Every,
    Nothing,
    /// Masked only when this expression is at the top of the likelihood scale.
    VeryLikely(Emotion),
}

impl FaceRule {
    pub fn for_operation(op: FaceOperation) -> Self {
        match op {
            FaceOperation::All => FaceRule::Every,
            FaceOperation::None => FaceRule::Nothing,
            FaceOperation::Happy => FaceRule::VeryLikely(Emotion::Joy),
            FaceOperation::Sad => FaceRule::VeryLikely(Emotion::Sorrow),
            FaceOperation::Angry => FaceRule::VeryLikely(Emotion::Anger),
            FaceOperation::Surprised => FaceRule::VeryLikely(Emotion::Surprise),
        }
    }

    pub fn matches(self, face: &FaceAnnotation) -> bool {
        match self {
            FaceRule::Every => true,
            FaceRule::Nothing => false,
            FaceRule::VeryLikely(emotion) => face.likelihood(emotion).is_max(),
        }
    }
}

/// Select the polygons to mask, in draw order.
pub fn select_regions(annotations: &Annotations, filters: &Filters) -> Vec<Polygon> {
    let mut polygons = Vec::new();

    let rule = FaceRule::for_operation(filters.face_operation);
    polygons.extend(
        annotations
            .faces()
            .iter()
            .filter(|face| rule.matches(face))
            .map(|face| Polygon::from_bounding_poly(&face.bounding_poly)),
    );

    if filters.logo_detection == LogoDetection::Yes {
        polygons.extend(
            annotations
                .logos()
                .iter()
                .map(|logo| Polygon::from_bounding_poly(&logo.bounding_poly)),
        );
    }

    polygons.extend(select_text(annotations, &filters.text_of_interest));
    polygons
}

fn select_text(annotations: &Annotations, filter: &TextFilter) -> Vec<Polygon> {
    let texts = annotations.texts();

    if filter.is_wildcard() {
        return texts
            .first()
            .map(|aggregate| Polygon::from_bounding_poly(&aggregate.bounding_poly))
            .into_iter()
            .collect();
    }

    let needle = filter.as_str().to_lowercase();
    texts
        .iter()
        .skip(1)
        .filter(|fragment| {
            fragment
                .description
                .as_deref()
                .is_some_and(|text| !text.is_empty() && text.to_lowercase().contains(&needle))
        })
        .map(|fragment| Polygon::from_bounding_poly(&fragment.bounding_poly))
        .collect()
}
