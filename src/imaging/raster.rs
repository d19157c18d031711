//! Pure mask rasterization.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! A pixel `(x, y)` is inside a polygon when its center `(x + 0.5, y + 0.5)`
//! is inside under the even-odd rule. Polygons with fewer than three vertices
//! cover nothing. Overlapping polygons are unioned, so draw order never
//! changes the coverage.

use crate::selection::Polygon;

/// Row-major coverage grid: `true` = masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coverage {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl Coverage {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x, y)]
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn fill_span(&mut self, y: u32, x_start: u32, x_end: u32) {
        for x in x_start..x_end {
            let i = self.index(x, y);
            self.cells[i] = true;
        }
    }
}

/// Rasterize `polygons` onto a `width` x `height` grid.
pub fn rasterize(polygons: &[Polygon], width: u32, height: u32) -> Coverage {
    let mut coverage = Coverage::empty(width, height);
    for polygon in polygons.iter().filter(|p| !p.is_degenerate()) {
        fill_polygon(&mut coverage, polygon);
    }
    coverage
}

/// Scanline fill of one polygon at pixel centers.
fn fill_polygon(coverage: &mut Coverage, polygon: &Polygon) {
    let points: Vec<(f64, f64)> = polygon
        .vertices
        .iter()
        .map(|p| (p.x as f64, p.y as f64))
        .collect();

    let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let first_row = min_y.max(0.0).floor() as u32;
    let last_row = (max_y.ceil().max(0.0) as u32).min(coverage.height);

    let mut crossings: Vec<f64> = Vec::with_capacity(points.len());
    for row in first_row..last_row {
        let cy = row as f64 + 0.5;
        crossings.clear();

        for i in 0..points.len() {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % points.len()];
            // Half-open test so shared vertices are counted once
            if (y0 <= cy) != (y1 <= cy) {
                crossings.push(x0 + (cy - y0) * (x1 - x0) / (y1 - y0));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for pair in crossings.chunks_exact(2) {
            let (start, end) = span_columns(pair[0], pair[1], coverage.width);
            if start < end {
                coverage.fill_span(row, start, end);
            }
        }
    }
}

/// Columns whose centers fall in `[left, right)`, clamped to the grid.
fn span_columns(left: f64, right: f64, width: u32) -> (u32, u32) {
    let start = (left - 0.5).ceil().max(0.0);
    let end = (right - 0.5).ceil().max(0.0);
    (
        (start as u64).min(width as u64) as u32,
        (end as u64).min(width as u64) as u32,
    )
}
