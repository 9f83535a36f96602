//! Composite export: bake the base image and every callout into one
//! flattened raster at a resolution multiplier, independent of the
//! on-screen zoom.
//!
//! Drawing goes through tiny-skia (bubble fill, stroked arrow) and
//! ab_glyph (label glyphs). The live view is never touched; this module
//! only ever sees immutable document state.

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, ScaleFont};
use egui::{Pos2, pos2};
use image::{RgbaImage, imageops::FilterType};
use tiny_skia::{
    ColorU8, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform,
};

use crate::geometry::{self, CalloutLayout};
use crate::model::Annotation;

/// Resolution multiplier used when the preferences don't say otherwise.
pub const DEFAULT_MULTIPLIER: u32 = 3;

/// Label text is always white on the colored bubble.
const TEXT_COLOR: [u8; 3] = [255, 255, 255];

/// Ellipse/rounded-corner bezier approximation constant: 4/3·(√2 − 1).
const BEZIER_K: f32 = 0.552_284_8;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("resolution multiplier must be at least 1, got {0}")]
    BadMultiplier(u32),
    #[error("composite of {width}x{height} pixels is not a valid raster surface")]
    Surface { width: u32, height: u32 },
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Callout layout in export pixel space: image coordinates and all style
/// sizes multiplied by `k`.
pub(crate) fn export_layout(ann: &Annotation, k: f32, font: Option<&FontArc>) -> CalloutLayout {
    let size = ann.size * k;
    let text_width = match font {
        Some(font) => measure_text(font, &ann.text, ann.size) * k,
        None => geometry::approx_text_width(&ann.text, ann.size) * k,
    };
    geometry::callout_layout(
        pos2(ann.anchor.0 * k, ann.anchor.1 * k),
        pos2(ann.arrow_endpoint.0 * k, ann.arrow_endpoint.1 * k),
        text_width,
        size,
        ann.arrow_thickness * k,
    )
}

/// Advance width of `text` at `font_size`, kerning included.
pub(crate) fn measure_text(font: &FontArc, text: &str, font_size: f32) -> f32 {
    let scaled = font.as_scaled(font_size);
    let mut width = 0.0f32;
    let mut prev = None;
    for ch in text.chars() {
        let gid = font.glyph_id(ch);
        if let Some(prev_id) = prev {
            width += scaled.kern(prev_id, gid);
        }
        width += scaled.h_advance(gid);
        prev = Some(gid);
    }
    width
}

/// Render the composite: base image upscaled by `multiplier`, then every
/// callout drawn with position, size, arrow thickness, and arrow length
/// scaled by the same factor.
pub fn compose(
    base: &RgbaImage,
    annotations: &[Annotation],
    multiplier: u32,
    font: Option<&FontArc>,
) -> Result<RgbaImage, ExportError> {
    if multiplier == 0 {
        return Err(ExportError::BadMultiplier(multiplier));
    }
    let k = multiplier as f32;
    let (out_w, out_h) = (base.width() * multiplier, base.height() * multiplier);

    let mut img = if multiplier == 1 {
        base.clone()
    } else {
        image::imageops::resize(base, out_w, out_h, FilterType::Lanczos3)
    };

    with_pixmap(&mut img, |pixmap| {
        for ann in annotations {
            let layout = export_layout(ann, k, font);
            draw_callout_shapes(pixmap, ann, &layout);
        }
    })?;

    if let Some(font) = font {
        for ann in annotations {
            let layout = export_layout(ann, k, Some(font));
            draw_label_text(&mut img, font, &ann.text, ann.size * k, layout.bubble.center());
        }
    } else if annotations.iter().any(|a| !a.text.is_empty()) {
        log::warn!("no label font available; exporting bubbles and arrows without text");
    }

    Ok(img)
}

/// Encode the composite to `path`, choosing the format from the extension
/// (JPEG gets an alpha-stripped copy, everything else goes out as-is).
pub fn save_composite(img: &RgbaImage, path: &Path) -> Result<(), ExportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let result = if ext == "jpg" || ext == "jpeg" {
        image::DynamicImage::ImageRgba8(img.clone()).to_rgb8().save(path)
    } else {
        img.save(path)
    };

    result.map_err(|source| ExportError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

/// Wrap an RgbaImage in a tiny-skia Pixmap, apply `f`, and copy the pixels
/// back. Pixmaps hold premultiplied alpha, the image holds straight alpha,
/// so the conversion runs both ways.
fn with_pixmap(
    img: &mut RgbaImage,
    f: impl FnOnce(&mut Pixmap),
) -> Result<(), ExportError> {
    let (w, h) = (img.width(), img.height());
    let size = tiny_skia::IntSize::from_wh(w, h)
        .ok_or(ExportError::Surface { width: w, height: h })?;

    let mut data = Vec::with_capacity(img.as_raw().len());
    for px in img.pixels() {
        let c = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let mut pixmap =
        Pixmap::from_vec(data, size).ok_or(ExportError::Surface { width: w, height: h })?;

    f(&mut pixmap);

    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(())
}

/// Arrow first, bubble on top, so the bubble hides the shaft's tail end.
fn draw_callout_shapes(pixmap: &mut Pixmap, ann: &Annotation, layout: &CalloutLayout) {
    let [r, g, b, a] = ann.color.to_rgba_u8();

    if let Some(path) = build_arrow_path(
        layout.arrow_start,
        layout.arrow_end,
        layout.arrow_head_size,
    ) {
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: layout.arrow_thickness,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    if let Some(path) = build_bubble_path(layout.bubble, layout.corner_radius) {
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

/// Shaft plus two barb lines; stroked with round caps by the caller.
fn build_arrow_path(start: Pos2, end: Pos2, head_size: f32) -> Option<tiny_skia::Path> {
    let (barb1, barb2) = geometry::arrow_head_points(start, end, head_size)?;

    let mut pb = PathBuilder::new();
    pb.move_to(start.x, start.y);
    pb.line_to(end.x, end.y);
    pb.move_to(end.x, end.y);
    pb.line_to(barb1.x, barb1.y);
    pb.move_to(end.x, end.y);
    pb.line_to(barb2.x, barb2.y);
    pb.finish()
}

/// Rounded rectangle via one cubic bezier per corner.
fn build_bubble_path(rect: egui::Rect, radius: f32) -> Option<tiny_skia::Path> {
    let (l, t, r, b) = (rect.min.x, rect.min.y, rect.max.x, rect.max.y);
    if r <= l || b <= t {
        return None;
    }
    let rad = radius.min((r - l) / 2.0).min((b - t) / 2.0).max(0.0);
    let k = rad * BEZIER_K;

    let mut pb = PathBuilder::new();
    pb.move_to(l + rad, t);
    pb.line_to(r - rad, t);
    pb.cubic_to(r - rad + k, t, r, t + rad - k, r, t + rad);
    pb.line_to(r, b - rad);
    pb.cubic_to(r, b - rad + k, r - rad + k, b, r - rad, b);
    pb.line_to(l + rad, b);
    pb.cubic_to(l + rad - k, b, l, b - rad + k, l, b - rad);
    pb.line_to(l, t + rad);
    pb.cubic_to(l, t + rad - k, l + rad - k, t, l + rad, t);
    pb.close();
    pb.finish()
}

/// Rasterize the label centered on the bubble, blending glyph coverage
/// straight onto the image.
fn draw_label_text(img: &mut RgbaImage, font: &FontArc, text: &str, font_size: f32, center: Pos2) {
    let scaled = font.as_scaled(font_size);
    let total_width = measure_text(font, text, font_size);
    let mut pen_x = center.x - total_width / 2.0;
    // Vertically center the glyph block on the bubble; descent is negative.
    let baseline = center.y + (scaled.ascent() + scaled.descent()) / 2.0;

    let (w, h) = (img.width() as i32, img.height() as i32);
    let mut prev = None;
    for ch in text.chars() {
        let gid = font.glyph_id(ch);
        if let Some(prev_id) = prev {
            pen_x += scaled.kern(prev_id, gid);
        }
        let glyph = gid.with_scale_and_position(font_size, ab_glyph::point(pen_x, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i32 + gx as i32;
                let y = bounds.min.y as i32 + gy as i32;
                if x < 0 || y < 0 || x >= w || y >= h || coverage <= 0.0 {
                    return;
                }
                let pixel = img.get_pixel_mut(x as u32, y as u32);
                for (channel, &target) in pixel.0.iter_mut().zip(TEXT_COLOR.iter()).take(3) {
                    *channel =
                        (*channel as f32 * (1.0 - coverage) + target as f32 * coverage) as u8;
                }
            });
        }
        pen_x += scaled.h_advance(gid);
        prev = Some(gid);
    }
}

/// Common system locations of a plain sans-serif face, tried in order.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/gnu-free/FreeSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
];

/// Find a usable label font on this system, if there is one. Export
/// degrades to fontless bubbles when this returns None.
pub fn load_label_font() -> Option<FontArc> {
    for candidate in FONT_CANDIDATES {
        if let Ok(bytes) = std::fs::read(candidate) {
            match FontArc::try_from_vec(bytes) {
                Ok(font) => {
                    log::info!("label font: {candidate}");
                    return Some(font);
                }
                Err(e) => log::debug!("skipping {candidate}: {e}"),
            }
        }
    }
    log::warn!("no label font found; exported composites will omit text");
    None
}
