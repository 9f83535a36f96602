//! Zoom/pan transform between image space and screen space, plus the
//! click-versus-pan gesture classification.

use egui::{Pos2, Vec2, pos2};

/// Fixed zoom increment applied per zoom-in/zoom-out step.
pub const ZOOM_STEP: f32 = 0.1;
/// A press/release pair moving less than this (per axis, in screen pixels)
/// counts as a click rather than a pan drag.
pub const CLICK_TOLERANCE: f32 = 5.0;

/// Projects image-space points onto the screen: scale about a pivot (the
/// image center), then translate by the canvas center and the pan offset.
///
/// The zoom factor is unbounded in both directions; zooming past zero
/// inverts the view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan: Vec2,
    /// Scaling pivot in image space, normally the image center.
    pub pivot: Pos2,
}

impl ViewTransform {
    pub fn new(pivot: Pos2) -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            pivot,
        }
    }

    pub fn to_screen(&self, canvas_center: Pos2, p: Pos2) -> Pos2 {
        canvas_center + self.pan + (p - self.pivot) * self.zoom
    }

    pub fn to_image(&self, canvas_center: Pos2, screen: Pos2) -> Pos2 {
        let rel = screen - canvas_center - self.pan;
        self.pivot + rel / self.zoom
    }

    pub fn zoom_in(&mut self) {
        self.zoom += ZOOM_STEP;
    }

    pub fn zoom_out(&mut self) {
        self.zoom -= ZOOM_STEP;
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = Vec2::ZERO;
    }
}

/// Outcome of a finished primary-button gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    Click,
    Pan,
}

/// Classify a press/release pair by how far the pointer traveled.
pub fn classify_gesture(press: Pos2, release: Pos2) -> Gesture {
    if (release.x - press.x).abs() < CLICK_TOLERANCE
        && (release.y - press.y).abs() < CLICK_TOLERANCE
    {
        Gesture::Click
    } else {
        Gesture::Pan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    #[test]
    fn zoom_round_trip_restores_positions() {
        let mut view = ViewTransform::new(pos2(400.0, 300.0));
        view.pan = vec2(12.0, -7.0);
        let center = pos2(640.0, 360.0);
        let anchor = pos2(123.0, 456.0);

        let before = view.to_screen(center, anchor);
        view.zoom_in();
        let zoomed = view.to_screen(center, anchor);
        view.zoom_out();
        let after = view.to_screen(center, anchor);

        assert!((before.x - after.x).abs() < 1e-4);
        assert!((before.y - after.y).abs() < 1e-4);
        assert!(zoomed != before);
    }

    #[test]
    fn screen_image_round_trip() {
        let mut view = ViewTransform::new(pos2(200.0, 100.0));
        view.zoom = 1.7;
        view.pan = vec2(-30.0, 55.0);
        let center = pos2(500.0, 400.0);

        let p = pos2(88.0, 19.0);
        let back = view.to_image(center, view.to_screen(center, p));
        assert!((back.x - p.x).abs() < 1e-3);
        assert!((back.y - p.y).abs() < 1e-3);
    }

    #[test]
    fn zoom_is_unbounded() {
        let mut view = ViewTransform::new(pos2(0.0, 0.0));
        for _ in 0..15 {
            view.zoom_out();
        }
        // Ten steps down from 1.0 crosses zero; nothing clamps it.
        assert!(view.zoom < 0.0);
    }

    #[test]
    fn small_movement_is_a_click() {
        let g = classify_gesture(pos2(100.0, 100.0), pos2(104.0, 103.0));
        assert_eq!(g, Gesture::Click);
    }

    #[test]
    fn large_movement_is_a_pan() {
        let g = classify_gesture(pos2(100.0, 100.0), pos2(100.0, 106.0));
        assert_eq!(g, Gesture::Pan);
    }
}
