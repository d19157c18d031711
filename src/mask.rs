//! Mask compilation: polygons to a drawing program.
//!
//! The draw spec is a whitespace-separated token stream:
//!
//! ```text
//! polygon 0,0 10,0 10,10 0,10 polygon 20,20 30,20 30,30
//! ```
//!
//! Each region contributes a `polygon` marker followed by its `x,y` vertex
//! pairs, in selection order. An empty spec is valid and draws nothing. The
//! transform backend consumes the spec exactly as compiled, parsing it back
//! with [`DrawSpec::polygons`].

use crate::selection::{Point, Polygon};
use std::fmt;
use thiserror::Error;

const POLYGON_TOKEN: &str = "polygon";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MaskError {
    #[error("Draw spec has vertex '{0}' before any polygon marker")]
    OrphanVertex(String),
    #[error("Draw spec has malformed vertex '{0}'")]
    MalformedVertex(String),
}

/// A compiled drawing program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DrawSpec(String);

impl DrawSpec {
    /// Wrap an already-compiled program.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of `polygon` markers in the program.
    pub fn polygon_count(&self) -> usize {
        self.0
            .split_whitespace()
            .filter(|t| *t == POLYGON_TOKEN)
            .count()
    }

    /// Parse the program back into polygons, in draw order.
    pub fn polygons(&self) -> Result<Vec<Polygon>, MaskError> {
        let mut polygons: Vec<Polygon> = Vec::new();
        for token in self.0.split_whitespace() {
            if token == POLYGON_TOKEN {
                polygons.push(Polygon::default());
                continue;
            }
            let point = parse_vertex(token)?;
            match polygons.last_mut() {
                Some(polygon) => polygon.vertices.push(point),
                None => return Err(MaskError::OrphanVertex(token.to_string())),
            }
        }
        Ok(polygons)
    }
}

impl fmt::Display for DrawSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_vertex(token: &str) -> Result<Point, MaskError> {
    let malformed = || MaskError::MalformedVertex(token.to_string());
    let (x, y) = token.split_once(',').ok_or_else(malformed)?;
    let x = x.parse().map_err(|_| malformed())?;
    let y = y.parse().map_err(|_| malformed())?;
    Ok(Point::new(x, y))
}

/// Compile polygons into a draw spec, preserving their order.
pub fn compile_mask(polygons: &[Polygon]) -> DrawSpec {
    let tokens: Vec<String> = polygons
        .iter()
        .flat_map(|polygon| {
            std::iter::once(POLYGON_TOKEN.to_string()).chain(
                polygon
                    .vertices
                    .iter()
                    .map(|p| format!("{},{}", p.x, p.y)),
            )
        })
        .collect();
    DrawSpec(tokens.join(" "))
}
