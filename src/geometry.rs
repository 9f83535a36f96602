//! Layout math shared between the on-screen painter and the export
//! compositor. Everything here is scale-agnostic: callers pass coordinates
//! and sizes already in the target space (screen pixels or export pixels).

use egui::{Pos2, Rect, pos2, vec2};

/// Arrowhead length as a multiple of the shaft thickness.
pub const ARROW_HEAD_FACTOR: f32 = 3.0;
/// Arrowhead angle from the shaft, in radians (35 degrees).
pub const ARROW_HEAD_ANGLE: f32 = 0.610_865_2;
/// Arrows shorter than this are drawn without a head.
pub const MIN_ARROW_LENGTH: f32 = 5.0;
/// Line height of the label text as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;
/// Per-glyph width estimate as a multiple of the font size, used where no
/// real text metrics are available (hit testing, fontless export).
pub const GLYPH_WIDTH_FACTOR: f32 = 0.6;

/// Estimate the advance width of `text` at `font_size`.
pub fn approx_text_width(text: &str, font_size: f32) -> f32 {
    let glyphs = text.chars().count().max(1) as f32;
    glyphs * font_size * GLYPH_WIDTH_FACTOR
}

/// Padded bubble rectangle for a label whose text starts at `anchor`
/// (west-anchored, vertically centered). Padding and corner radius are both
/// half the font size, so the anchor always lies inside the bubble.
pub fn bubble_rect(anchor: Pos2, text_width: f32, font_size: f32) -> Rect {
    let pad = font_size / 2.0;
    let half_text_height = font_size * LINE_HEIGHT_FACTOR / 2.0;
    Rect::from_min_max(
        pos2(anchor.x - pad, anchor.y - half_text_height - pad),
        pos2(anchor.x + text_width + pad, anchor.y + half_text_height + pad),
    )
}

/// Corner radius of the bubble, clamped so adjacent corners never overlap.
pub fn bubble_radius(rect: Rect, font_size: f32) -> f32 {
    (font_size / 2.0).min(rect.width() / 2.0).min(rect.height() / 2.0)
}

/// Full geometry of a rendered callout in one output space.
#[derive(Clone, Copy, Debug)]
pub struct CalloutLayout {
    pub bubble: Rect,
    pub corner_radius: f32,
    /// Baseline-ish origin the text is laid out from (left edge, centered
    /// vertically on the anchor).
    pub text_pos: Pos2,
    pub arrow_start: Pos2,
    pub arrow_end: Pos2,
    pub arrow_thickness: f32,
    pub arrow_head_size: f32,
}

/// Compute the callout layout. All inputs are in the target space already:
/// for the screen that means transformed positions and zoom-scaled sizes,
/// for export it means anchor and sizes multiplied by the resolution
/// multiplier.
pub fn callout_layout(
    anchor: Pos2,
    arrow_endpoint: Pos2,
    text_width: f32,
    font_size: f32,
    arrow_thickness: f32,
) -> CalloutLayout {
    let bubble = bubble_rect(anchor, text_width, font_size);
    let text_height = font_size * LINE_HEIGHT_FACTOR;
    CalloutLayout {
        bubble,
        corner_radius: bubble_radius(bubble, font_size),
        text_pos: pos2(anchor.x, anchor.y - text_height / 2.0),
        // The shaft leaves from the bubble center so the bubble hides its
        // tail end.
        arrow_start: bubble.center(),
        arrow_end: arrow_endpoint,
        arrow_thickness,
        arrow_head_size: arrow_thickness * ARROW_HEAD_FACTOR,
    }
}

/// Endpoints of the two arrowhead barbs, or None when the arrow is too
/// short to carry a head.
pub fn arrow_head_points(start: Pos2, end: Pos2, head_size: f32) -> Option<(Pos2, Pos2)> {
    let d = end - start;
    let length = d.length();
    if length < MIN_ARROW_LENGTH {
        return None;
    }
    let n = d / length;

    let (sin_a, cos_a) = ARROW_HEAD_ANGLE.sin_cos();
    // Both barbs point backwards from the tip, rotated off the shaft axis.
    let back = -n;
    let barb1 = vec2(
        back.x * cos_a - back.y * sin_a,
        back.x * sin_a + back.y * cos_a,
    );
    let barb2 = vec2(
        back.x * cos_a + back.y * sin_a,
        -back.x * sin_a + back.y * cos_a,
    );
    Some((end + barb1 * head_size, end + barb2 * head_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bubble_contains_anchor() {
        let anchor = pos2(50.0, 80.0);
        let rect = bubble_rect(anchor, 120.0, 30.0);
        assert!(rect.contains(anchor));
        // West-anchored: most of the bubble extends to the right.
        assert!((anchor.x - rect.min.x) < (rect.max.x - anchor.x));
    }

    #[test]
    fn layout_scales_linearly() {
        let k = 3.0;
        let base = callout_layout(pos2(100.0, 60.0), pos2(20.0, 60.0), 90.0, 30.0, 10.0);
        let scaled = callout_layout(
            pos2(100.0 * k, 60.0 * k),
            pos2(20.0 * k, 60.0 * k),
            90.0 * k,
            30.0 * k,
            10.0 * k,
        );
        assert!((scaled.bubble.width() - base.bubble.width() * k).abs() < 1e-3);
        assert!((scaled.bubble.height() - base.bubble.height() * k).abs() < 1e-3);
        assert!((scaled.arrow_thickness - base.arrow_thickness * k).abs() < 1e-3);
        assert!((scaled.arrow_head_size - base.arrow_head_size * k).abs() < 1e-3);
        assert!((scaled.corner_radius - base.corner_radius * k).abs() < 1e-3);
    }

    #[test]
    fn arrow_head_symmetric_about_shaft() {
        let (b1, b2) = arrow_head_points(pos2(0.0, 0.0), pos2(100.0, 0.0), 30.0).unwrap();
        // Shaft runs along +x, so the barbs mirror each other in y and sit
        // behind the tip.
        assert!((b1.y + b2.y).abs() < 1e-3);
        assert!((b1.x - b2.x).abs() < 1e-3);
        assert!(b1.x < 100.0);
    }

    #[test]
    fn no_head_for_tiny_arrows() {
        assert!(arrow_head_points(pos2(0.0, 0.0), pos2(2.0, 0.0), 30.0).is_none());
    }
}
