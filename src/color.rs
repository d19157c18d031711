//! Dominant color extraction.
//!
//! The highest-scoring palette entry is scaled so its brightest channel is
//! 255, which keeps the hue and saturates the brightness. A black candidate
//! (all channels zero) has nothing to scale and is rendered as-is, `#000000`.

use crate::annotation::{ColorInfo, Rgb};

/// Hex color of the highest-scoring candidate, or `None` for an empty palette.
///
/// On equal scores the earlier candidate wins.
pub fn dominant_color(candidates: &[ColorInfo]) -> Option<String> {
    candidates
        .iter()
        .reduce(|best, c| if c.score > best.score { c } else { best })
        .map(|c| normalized_hex(c.color))
}

/// `#rrggbb` with channels scaled by `255 / max(r, g, b)` and floored.
pub fn normalized_hex(color: Rgb) -> String {
    let channels = [color.red, color.green, color.blue].map(|c| c.clamp(0.0, 255.0));
    let max = channels.iter().copied().fold(0.0_f64, f64::max);

    let scaled = if max > 0.0 {
        channels.map(|c| (255.0 * c / max).floor() as u8)
    } else {
        [0, 0, 0]
    };

    format!("#{:02x}{:02x}{:02x}", scaled[0], scaled[1], scaled[2])
}
