//! CLI output formatting.
//!
//! Every photo is shown the same way: a header line with its positional
//! index, id, and client filename, then indented context lines. Listing and
//! detail views share [`photo_header`] so the same photo reads the same in
//! both.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! Photos
//! 001 4f0c1e… (harbour.jpg) v2
//!     Filters: Redact, text *, logos Yes, faces All
//!     Labels: Boat, Water, Sky
//!     Thumbnail: http://localhost:8080/photos/4f0c…_2-thumbnail.jpeg
//! ```
//!
//! ## Publish
//!
//! ```text
//! Published 4f0c1e… v2 (3 regions masked)
//!     Full size: http://localhost:8080/photos/4f0c…_2-fullsize.jpeg
//!     Thumbnail: http://localhost:8080/photos/4f0c…_2-thumbnail.jpeg
//! ```
//!
//! Each view has a `format_*` function returning `Vec<String>` and a
//! `print_*` wrapper that writes to stdout. Format functions do no I/O.

use crate::pipeline::{PhotoView, Published};
use crate::sweep::SweepPlan;
use crate::types::{Filters, PhotoStatus};

// ============================================================================
// Shared helpers
// ============================================================================

/// 1-based positional index, 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn status_label(status: PhotoStatus) -> &'static str {
    match status {
        PhotoStatus::Uploading => "uploading",
        PhotoStatus::Uploaded => "uploaded",
    }
}

fn filters_line(filters: &Filters) -> String {
    format!(
        "Filters: {}, text {}, logos {}, faces {}",
        filters.operation,
        filters.text_of_interest.as_str(),
        filters.logo_detection,
        filters.face_operation
    )
}

/// Header line: index, id, and filename when known.
///
/// ```text
/// 001 4f0c1e (harbour.jpg) v2
/// 002 77aa01 v0
/// ```
fn photo_header(index: Option<usize>, photo: &PhotoView) -> String {
    let record = &photo.record;
    let mut line = match index {
        Some(i) => format!("{} {}", format_index(i), record.id),
        None => record.id.clone(),
    };
    if let Some(filename) = &record.filename {
        line.push_str(&format!(" ({})", filename));
    }
    line.push_str(&format!(" v{}", record.version));
    line
}

// ============================================================================
// List
// ============================================================================

pub fn format_photo_list(photos: &[PhotoView]) -> Vec<String> {
    if photos.is_empty() {
        return vec!["No published photos".to_string()];
    }

    let mut lines = vec!["Photos".to_string()];
    for (i, photo) in photos.iter().enumerate() {
        lines.push(photo_header(Some(i + 1), photo));
        let ctx = indent(1);
        lines.push(format!("{}{}", ctx, filters_line(&photo.record.filters)));
        if !photo.record.labels.is_empty() {
            lines.push(format!(
                "{}Labels: {}",
                ctx,
                truncate(&photo.record.labels.join(", "), 60)
            ));
        }
        if let Some(urls) = &photo.urls {
            lines.push(format!("{}Thumbnail: {}", ctx, urls.thumbnail));
        }
    }
    lines
}

pub fn print_photo_list(photos: &[PhotoView]) {
    for line in format_photo_list(photos) {
        println!("{}", line);
    }
}

// ============================================================================
// Detail
// ============================================================================

pub fn format_photo(photo: &PhotoView) -> Vec<String> {
    let record = &photo.record;
    let ctx = indent(1);
    let mut lines = vec![
        photo_header(None, photo),
        format!("{}Status: {}", ctx, status_label(record.status)),
        format!("{}Created: {}", ctx, record.created.to_rfc3339()),
        format!("{}{}", ctx, filters_line(&record.filters)),
    ];
    if let Some(color) = &record.color {
        lines.push(format!("{}Color: {}", ctx, color));
    }
    if !record.labels.is_empty() {
        lines.push(format!("{}Labels: {}", ctx, record.labels.join(", ")));
    }
    match &photo.urls {
        Some(urls) => {
            lines.push(format!("{}Original: {}", ctx, urls.original));
            lines.push(format!("{}Full size: {}", ctx, urls.full_size));
            lines.push(format!("{}Thumbnail: {}", ctx, urls.thumbnail));
        }
        None => lines.push(format!("{}Not published yet", ctx)),
    }
    lines
}

pub fn print_photo(photo: &PhotoView) {
    for line in format_photo(photo) {
        println!("{}", line);
    }
}

// ============================================================================
// Publish
// ============================================================================

pub fn format_published(published: &Published) -> Vec<String> {
    let record = &published.photo.record;
    let regions = match published.regions {
        1 => "1 region masked".to_string(),
        n => format!("{} regions masked", n),
    };
    let mut lines = vec![format!(
        "Published {} v{} ({})",
        record.id, record.version, regions
    )];
    if let Some(urls) = &published.photo.urls {
        lines.push(format!("{}Full size: {}", indent(1), urls.full_size));
        lines.push(format!("{}Thumbnail: {}", indent(1), urls.thumbnail));
    }
    lines
}

pub fn print_published(published: &Published) {
    for line in format_published(published) {
        println!("{}", line);
    }
}

// ============================================================================
// Sweep
// ============================================================================

pub fn format_sweep_plan(plan: &SweepPlan) -> Vec<String> {
    let verb = if plan.applied { "Deleted" } else { "Orphaned" };
    let mut lines = vec![format!("{} artifacts ({})", verb, plan.orphans.len())];
    for name in &plan.orphans {
        lines.push(format!("{}{}", indent(1), name));
    }
    lines.push(format!(
        "Kept {} referenced, skipped {} unrecognized",
        plan.kept,
        plan.unrecognized.len()
    ));
    if !plan.applied && !plan.orphans.is_empty() {
        lines.push("Run with --apply to delete".to_string());
    }
    lines
}

pub fn print_sweep_plan(plan: &SweepPlan) {
    for line in format_sweep_plan(plan) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
