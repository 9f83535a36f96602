//! Callout annotation entity and its pure state transitions.
//!
//! An annotation stores only image-space data; projection to the screen
//! happens in `view::ViewTransform` on every repaint. Nothing in here
//! reaches back into the controller or into sibling annotations.

use serde::{Deserialize, Serialize};

use crate::geometry;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    pub fn to_egui(&self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(
            (self.r * 255.0) as u8,
            (self.g * 255.0) as u8,
            (self.b * 255.0) as u8,
            (self.a * 255.0) as u8,
        )
    }

    pub fn from_rgb(rgb: [f32; 3]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 1.0,
        }
    }

    pub fn to_rgb(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_rgba_u8(&self) -> [u8; 4] {
        [
            (self.r * 255.0) as u8,
            (self.g * 255.0) as u8,
            (self.b * 255.0) as u8,
            (self.a * 255.0) as u8,
        ]
    }
}

impl Default for Color4 {
    // Warm red, #FF3333.
    fn default() -> Self {
        Self {
            r: 1.0,
            g: 0.2,
            b: 0.2,
            a: 1.0,
        }
    }
}

/// Style fields applied to newly created callouts. Persisted as part of
/// the user preferences.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelStyle {
    pub size: f32,
    pub color: Color4,
    pub arrow_thickness: f32,
    pub arrow_length: f32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            size: 30.0,
            color: Color4::default(),
            arrow_thickness: 10.0,
            arrow_length: 130.0,
        }
    }
}

/// A labeled marker attached to a point on the image: text on a rounded
/// colored bubble, plus a pointer arrow running from the bubble to a
/// draggable endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: u32,
    /// Attachment point in image space. The label bubble is laid out
    /// around this point.
    pub anchor: (f32, f32),
    /// Anchor divided by the image dimensions at creation time, kept so
    /// the absolute anchor can be re-derived after a reload or resize.
    pub relative_anchor: (f32, f32),
    pub text: String,
    pub size: f32,
    pub color: Color4,
    pub arrow_thickness: f32,
    pub arrow_length: f32,
    /// Pointer tip in image space, independent of the anchor once dragged.
    pub arrow_endpoint: (f32, f32),
    pub selected: bool,
}

impl Annotation {
    pub fn new(
        id: u32,
        anchor: (f32, f32),
        text: String,
        style: &LabelStyle,
        image_size: (f32, f32),
    ) -> Self {
        let relative_anchor = if image_size.0 > 0.0 && image_size.1 > 0.0 {
            (anchor.0 / image_size.0, anchor.1 / image_size.1)
        } else {
            (0.0, 0.0)
        };
        Self {
            id,
            anchor,
            relative_anchor,
            text,
            size: style.size,
            color: style.color,
            arrow_thickness: style.arrow_thickness,
            arrow_length: style.arrow_length,
            // Pointer runs leftward out of the bubble by default, so the
            // tip sits clear of the label text.
            arrow_endpoint: (anchor.0 - style.arrow_length, anchor.1),
            selected: false,
        }
    }

    /// Translate the anchor by an image-space delta. The arrow endpoint
    /// keeps its target.
    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.anchor.0 += dx;
        self.anchor.1 += dy;
    }

    /// Retarget only the pointer tip.
    pub fn move_arrow_endpoint(&mut self, dx: f32, dy: f32) {
        self.arrow_endpoint.0 += dx;
        self.arrow_endpoint.1 += dy;
    }

    /// Recompute the absolute anchor from the cached relative anchor,
    /// e.g. after the underlying image was reloaded at a new size.
    #[cfg(test)]
    pub fn rederive_anchor(&mut self, image_size: (f32, f32)) {
        self.anchor = (
            self.relative_anchor.0 * image_size.0,
            self.relative_anchor.1 * image_size.1,
        );
    }

    /// Padded bounding box of the label bubble, in image space.
    pub fn label_bounds(&self) -> egui::Rect {
        geometry::bubble_rect(
            egui::pos2(self.anchor.0, self.anchor.1),
            geometry::approx_text_width(&self.text, self.size),
            self.size,
        )
    }

    /// True iff `pos` (image space) falls inside the label's bounding box.
    pub fn hit_test(&self, x: f32, y: f32) -> bool {
        self.label_bounds().contains(egui::pos2(x, y))
    }

    pub fn select(&mut self) {
        self.selected = true;
    }

    pub fn deselect(&mut self) {
        self.selected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Annotation {
        Annotation::new(
            1,
            (200.0, 150.0),
            "leak here".to_string(),
            &LabelStyle::default(),
            (800.0, 600.0),
        )
    }

    #[test]
    fn hit_test_contains_own_anchor() {
        let ann = sample();
        assert!(ann.hit_test(200.0, 150.0));
    }

    #[test]
    fn hit_test_misses_far_point() {
        let ann = sample();
        let width = ann.label_bounds().width();
        assert!(!ann.hit_test(200.0 + width * 10.0, 150.0));
        assert!(!ann.hit_test(200.0 - width * 10.0, 150.0));
    }

    #[test]
    fn move_by_leaves_arrow_endpoint() {
        let mut ann = sample();
        let tip = ann.arrow_endpoint;
        ann.move_by(15.0, -8.0);
        assert_eq!(ann.anchor, (215.0, 142.0));
        assert_eq!(ann.arrow_endpoint, tip);
    }

    #[test]
    fn move_arrow_endpoint_leaves_anchor() {
        let mut ann = sample();
        ann.move_arrow_endpoint(-20.0, 30.0);
        assert_eq!(ann.anchor, (200.0, 150.0));
        assert_eq!(ann.arrow_endpoint, (200.0 - 130.0 - 20.0, 180.0));
    }

    #[test]
    fn relative_anchor_rederives_after_resize() {
        let mut ann = sample();
        assert_eq!(ann.relative_anchor, (0.25, 0.25));
        ann.rederive_anchor((1600.0, 1200.0));
        assert_eq!(ann.anchor, (400.0, 300.0));
    }

    #[test]
    fn default_endpoint_offset_by_arrow_length() {
        let ann = sample();
        assert_eq!(ann.arrow_endpoint, (70.0, 150.0));
    }

    #[test]
    fn selection_is_a_plain_flag() {
        let mut ann = sample();
        assert!(!ann.selected);
        ann.select();
        assert!(ann.selected);
        ann.deselect();
        assert!(!ann.selected);
    }
}
