//! On-screen rendering of callouts through the egui painter. Uses the same
//! layout math as the export compositor, with real galley metrics for the
//! bubble width.

use egui::{Color32, FontId, Pos2, Stroke, StrokeKind};

use crate::geometry;
use crate::model::Annotation;
use crate::view::ViewTransform;

const TEXT_COLOR: Color32 = Color32::WHITE;
const SELECTION_OUTLINE: Stroke = Stroke {
    width: 2.0,
    color: Color32::WHITE,
};

pub fn draw_annotation(
    painter: &egui::Painter,
    canvas_center: Pos2,
    view: &ViewTransform,
    ann: &Annotation,
) {
    let anchor = view.to_screen(canvas_center, egui::pos2(ann.anchor.0, ann.anchor.1));
    let endpoint = view.to_screen(
        canvas_center,
        egui::pos2(ann.arrow_endpoint.0, ann.arrow_endpoint.1),
    );
    let font_size = ann.size * view.zoom;
    let color = ann.color.to_egui();

    let galley = painter.layout_no_wrap(
        ann.text.clone(),
        FontId::proportional(font_size.max(1.0)),
        TEXT_COLOR,
    );
    let layout = geometry::callout_layout(
        anchor,
        endpoint,
        galley.size().x,
        font_size,
        ann.arrow_thickness * view.zoom,
    );

    // Arrow below the bubble, so the bubble hides the shaft's tail.
    let stroke = Stroke::new(layout.arrow_thickness, color);
    painter.line_segment([layout.arrow_start, layout.arrow_end], stroke);
    if let Some((barb1, barb2)) =
        geometry::arrow_head_points(layout.arrow_start, layout.arrow_end, layout.arrow_head_size)
    {
        painter.line_segment([layout.arrow_end, barb1], stroke);
        painter.line_segment([layout.arrow_end, barb2], stroke);
    }

    painter.rect_filled(layout.bubble, layout.corner_radius, color);
    if ann.selected {
        painter.rect_stroke(
            layout.bubble,
            layout.corner_radius,
            SELECTION_OUTLINE,
            StrokeKind::Middle,
        );
    }

    let text_pos = egui::pos2(anchor.x, anchor.y - galley.size().y / 2.0);
    painter.galley(text_pos, galley, TEXT_COLOR);
}
