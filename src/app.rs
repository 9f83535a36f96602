//! The application controller: owns the document, view transform, loaded
//! image, and dialog state, and wires them to egui event handling.

use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use egui::{Pos2, pos2};
use image::RgbaImage;

use crate::config::AppConfig;
use crate::document::Document;
use crate::export;
use crate::render;
use crate::view::{Gesture, ViewTransform, classify_gesture};

/// Screen-pixel radius for grabbing the arrow tip with the move button.
const ARROW_TIP_GRAB_RADIUS: f32 = 10.0;

struct LoadedImage {
    rgba: RgbaImage,
    path: PathBuf,
}

impl LoadedImage {
    fn size(&self) -> (f32, f32) {
        (self.rgba.width() as f32, self.rgba.height() as f32)
    }
}

/// What the secondary-button drag is currently moving.
#[derive(Clone, Copy, Debug)]
enum DragTarget {
    Body(u32),
    ArrowTip(u32),
}

/// Modal text prompt shown after a click on empty canvas.
struct TextPrompt {
    anchor: (f32, f32),
    buf: String,
}

/// Per-annotation settings editor; edits a scratch copy, applied on OK.
struct SettingsDialog {
    id: u32,
    text: String,
    size: f32,
    arrow_thickness: f32,
    color: [f32; 3],
}

pub struct CalloutApp {
    config: AppConfig,
    document: Document,
    view: ViewTransform,
    image: Option<LoadedImage>,
    texture: Option<egui::TextureHandle>,
    label_font: Option<FontArc>,

    press_pos: Option<Pos2>,
    drag_target: Option<DragTarget>,

    text_prompt: Option<TextPrompt>,
    settings: Option<SettingsDialog>,
    confirm_exit: bool,
    allow_close: bool,

    status: String,
}

impl CalloutApp {
    pub fn new(initial_image: Option<PathBuf>) -> Self {
        let mut app = Self {
            config: AppConfig::load_or_default(),
            document: Document::new(),
            view: ViewTransform::new(pos2(0.0, 0.0)),
            image: None,
            texture: None,
            label_font: export::load_label_font(),
            press_pos: None,
            drag_target: None,
            text_prompt: None,
            settings: None,
            confirm_exit: false,
            allow_close: false,
            status: "Open an image to start annotating".to_string(),
        };
        if let Some(path) = initial_image {
            app.load_image(path);
        }
        app
    }

    /// True while a modal dialog owns the input; canvas gestures are
    /// suspended meanwhile.
    fn dialog_open(&self) -> bool {
        self.text_prompt.is_some() || self.settings.is_some() || self.confirm_exit
    }

    // ── Image loading ───────────────────────────────────────────────────

    fn open_image_dialog(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "gif", "webp"]);
        if let Some(dir) = &self.config.last_open_dir {
            dialog = dialog.set_directory(dir);
        }
        // Cancelling the picker silently aborts the open.
        if let Some(path) = dialog.pick_file() {
            self.load_image(path);
        }
    }

    fn load_image(&mut self, path: PathBuf) {
        match image::open(&path) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                let (w, h) = (rgba.width() as f32, rgba.height() as f32);
                // A fresh image means a fresh document: annotations,
                // history, zoom, and pan all reset together.
                self.document.clear();
                self.view = ViewTransform::new(pos2(w / 2.0, h / 2.0));
                self.texture = None;
                self.config.last_open_dir = path.parent().map(Path::to_path_buf);
                self.status = format!("Loaded {}", path.display());
                log::info!("loaded image {} ({w}x{h})", path.display());
                self.image = Some(LoadedImage { rgba, path });
            }
            Err(e) => {
                self.status = format!("Could not open {}: {e}", path.display());
                log::warn!("image load failed: {e}");
            }
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        if let Some(img) = &self.image {
            let size = [img.rgba.width() as usize, img.rgba.height() as usize];
            let pixels = img.rgba.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            self.texture =
                Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
        }
    }

    // ── Export ──────────────────────────────────────────────────────────

    fn save_composite_dialog(&mut self) {
        // Saving with no image loaded is a no-op.
        let Some(img) = &self.image else {
            self.status = "Nothing to save: no image loaded".to_string();
            return;
        };

        let default_name = format!(
            "{}_annotated.png",
            img.path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("composite")
        );
        let mut dialog = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .add_filter("JPEG", &["jpg", "jpeg"])
            .set_file_name(default_name);
        if let Some(dir) = &self.config.last_save_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };

        // The off-screen render must leave the live view exactly as it
        // was, success or not.
        let view_before = self.view;
        let result = export::compose(
            &img.rgba,
            self.document.annotations(),
            self.config.export_multiplier,
            self.label_font.as_ref(),
        )
        .and_then(|composite| export::save_composite(&composite, &path));
        self.view = view_before;

        match result {
            Ok(()) => {
                self.config.last_save_dir = path.parent().map(Path::to_path_buf);
                self.status = format!("Exported {}", path.display());
                log::info!("exported composite to {}", path.display());
            }
            Err(e) => {
                self.status = format!("Export failed: {e}");
                log::error!("export failed: {e}");
            }
        }
    }

    // ── Canvas gestures ─────────────────────────────────────────────────

    /// A finished primary gesture that stayed within the click tolerance:
    /// open settings on an existing callout, otherwise prompt for a new one.
    fn handle_click(&mut self, canvas_center: Pos2, screen_pos: Pos2) {
        let img_pos = self.view.to_image(canvas_center, screen_pos);

        if let Some(id) = self.document.hit_test(img_pos.x, img_pos.y) {
            self.document.select_only(id);
            if let Some(ann) = self.document.get(id) {
                self.settings = Some(SettingsDialog {
                    id,
                    text: ann.text.clone(),
                    size: ann.size,
                    arrow_thickness: ann.arrow_thickness,
                    color: ann.color.to_rgb(),
                });
            }
            return;
        }

        self.document.deselect_all();
        if self.image.is_some() {
            self.text_prompt = Some(TextPrompt {
                anchor: (img_pos.x, img_pos.y),
                buf: String::new(),
            });
        }
    }

    /// Pick what a secondary-button drag starting at `screen_pos` grabs:
    /// the arrow tip wins over the bubble body.
    fn pick_drag_target(&self, canvas_center: Pos2, screen_pos: Pos2) -> Option<DragTarget> {
        for ann in self.document.annotations().iter().rev() {
            let tip = self.view.to_screen(
                canvas_center,
                pos2(ann.arrow_endpoint.0, ann.arrow_endpoint.1),
            );
            if (tip - screen_pos).length() <= ARROW_TIP_GRAB_RADIUS {
                return Some(DragTarget::ArrowTip(ann.id));
            }
        }
        let img_pos = self.view.to_image(canvas_center, screen_pos);
        self.document
            .hit_test(img_pos.x, img_pos.y)
            .map(DragTarget::Body)
    }

    fn handle_canvas_input(&mut self, response: &egui::Response, canvas_center: Pos2) {
        // Primary button: a press resolving within the click tolerance is
        // a click (annotate or edit), further movement is a pan. Quick
        // clicks never turn into egui drag events, so the click path hangs
        // off `clicked()` with our own press tracking for the tolerance.
        if response.ctx.input(|i| i.pointer.primary_pressed()) {
            self.press_pos = response.interact_pointer_pos();
        }
        if response.clicked() {
            if let (Some(press), Some(release)) =
                (self.press_pos.take(), response.interact_pointer_pos())
            {
                if classify_gesture(press, release) == Gesture::Click {
                    self.handle_click(canvas_center, release);
                }
            }
        }
        if response.dragged_by(egui::PointerButton::Primary) {
            self.view.pan += response.drag_delta();
        }
        if response.drag_stopped_by(egui::PointerButton::Primary) {
            self.press_pos = None;
        }

        // Secondary button: move a callout body or retarget its arrow tip.
        if response.drag_started_by(egui::PointerButton::Secondary) {
            if let Some(press) = response.interact_pointer_pos() {
                self.drag_target = self.pick_drag_target(canvas_center, press);
                if self.drag_target.is_some() {
                    self.document.deselect_all();
                }
            }
        }
        if response.dragged_by(egui::PointerButton::Secondary) {
            let delta = response.drag_delta() / self.view.zoom;
            match self.drag_target {
                Some(DragTarget::Body(id)) => {
                    if let Some(ann) = self.document.get_mut(id) {
                        ann.move_by(delta.x, delta.y);
                    }
                }
                Some(DragTarget::ArrowTip(id)) => {
                    if let Some(ann) = self.document.get_mut(id) {
                        ann.move_arrow_endpoint(delta.x, delta.y);
                    }
                }
                None => {}
            }
        }
        if response.drag_stopped_by(egui::PointerButton::Secondary) {
            self.drag_target = None;
        }

        // Wheel: one fixed zoom step per scroll event.
        if response.hovered() {
            let scroll = response.ctx.input(|i| i.raw_scroll_delta.y);
            if scroll > 0.0 {
                self.view.zoom_in();
            } else if scroll < 0.0 {
                self.view.zoom_out();
            }
        }
    }

    // ── Dialogs ─────────────────────────────────────────────────────────

    fn show_text_prompt(&mut self, ctx: &egui::Context) {
        let Some(prompt) = &mut self.text_prompt else {
            return;
        };
        let mut commit = false;
        let mut cancel = false;

        egui::Window::new("New annotation")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("Annotation text:");
                let edit = ui.text_edit_singleline(&mut prompt.buf);
                edit.request_focus();
                if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    commit = true;
                }
                if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                    cancel = true;
                }
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        commit = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if commit {
            let Some(prompt) = self.text_prompt.take() else {
                return;
            };
            // Empty text aborts, same as cancelling the dialog.
            if !prompt.buf.is_empty() {
                if let Some(img) = &self.image {
                    let size = img.size();
                    self.document.create_annotation(
                        prompt.anchor,
                        prompt.buf,
                        &self.config.default_style,
                        size,
                    );
                    self.status = "Annotation added".to_string();
                }
            }
        } else if cancel {
            self.text_prompt = None;
        }
    }

    fn show_settings(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &mut self.settings else {
            return;
        };
        let mut apply = false;
        let mut cancel = false;

        egui::Window::new("Annotation settings")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("Annotation text:");
                ui.text_edit_singleline(&mut dialog.text);
                ui.add(egui::Slider::new(&mut dialog.size, 5.0..=100.0).text("Size"));
                ui.add(
                    egui::Slider::new(&mut dialog.arrow_thickness, 2.0..=100.0)
                        .text("Arrow width"),
                );
                ui.horizontal(|ui| {
                    ui.label("Color:");
                    ui.color_edit_button_rgb(&mut dialog.color);
                });
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        apply = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
                if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                    cancel = true;
                }
            });

        if apply {
            let Some(dialog) = self.settings.take() else {
                return;
            };
            if let Some(ann) = self.document.get_mut(dialog.id) {
                ann.text = dialog.text;
                ann.size = dialog.size;
                ann.arrow_thickness = dialog.arrow_thickness;
                ann.color = crate::model::Color4::from_rgb(dialog.color);
            }
            self.status = "Annotation updated".to_string();
        } else if cancel {
            self.settings = None;
        }
    }

    fn show_exit_confirmation(&mut self, ctx: &egui::Context) {
        if !self.confirm_exit {
            return;
        }
        let mut quit = false;
        let mut stay = false;

        egui::Window::new("Confirm exit")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("If you exit, you are going to lose any unsaved changes. Are you sure?");
                ui.horizontal(|ui| {
                    if ui.button("Exit").clicked() {
                        quit = true;
                    }
                    if ui.button("Cancel").clicked() {
                        stay = true;
                    }
                });
            });

        if quit {
            if let Err(e) = self.config.save() {
                log::warn!("could not save preferences: {e}");
            }
            self.allow_close = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        } else if stay {
            self.confirm_exit = false;
        }
    }

    // ── Chrome ──────────────────────────────────────────────────────────

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open Image").clicked() {
                    self.open_image_dialog();
                }
                if ui.button("Save").clicked() {
                    self.save_composite_dialog();
                }
                ui.separator();
                if ui
                    .add_enabled(self.document.can_undo(), egui::Button::new("Undo"))
                    .clicked()
                    && self.document.undo()
                {
                    self.status = "Undid annotation".to_string();
                }
                if ui
                    .add_enabled(self.document.can_redo(), egui::Button::new("Redo"))
                    .clicked()
                    && self.document.redo()
                {
                    self.status = "Redid annotation".to_string();
                }
                ui.separator();
                if ui.button("Zoom In").clicked() {
                    self.view.zoom_in();
                }
                if ui.button("Zoom Out").clicked() {
                    self.view.zoom_out();
                }
                if ui.button("Reset View").clicked() {
                    self.view.reset();
                }
                ui.label(format!("Zoom: {:.0}%", self.view.zoom * 100.0));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Exit").clicked() {
                        self.confirm_exit = true;
                    }
                });
            });
        });
    }

    fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("{} annotations", self.document.annotations().len()));
                });
            });
        });
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.dialog_open() {
            return;
        }
        let (undo, redo, open, save, zoom_in, zoom_out) = ctx.input(|i| {
            (
                i.modifiers.ctrl && !i.modifiers.shift && i.key_pressed(egui::Key::Z),
                i.modifiers.ctrl && i.modifiers.shift && i.key_pressed(egui::Key::Z),
                i.modifiers.ctrl && i.key_pressed(egui::Key::O),
                i.modifiers.ctrl && i.key_pressed(egui::Key::S),
                i.key_pressed(egui::Key::Plus),
                i.key_pressed(egui::Key::Minus),
            )
        });
        if undo && self.document.undo() {
            self.status = "Undid annotation".to_string();
        }
        if redo && self.document.redo() {
            self.status = "Redid annotation".to_string();
        }
        if open {
            self.open_image_dialog();
        }
        if save {
            self.save_composite_dialog();
        }
        if zoom_in {
            self.view.zoom_in();
        }
        if zoom_out {
            self.view.zoom_out();
        }
    }
}

impl eframe::App for CalloutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_texture(ctx);
        self.handle_shortcuts(ctx);

        // Route window-manager close requests through the confirmation.
        if ctx.input(|i| i.viewport().close_requested()) && !self.allow_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.confirm_exit = true;
        }

        self.show_toolbar(ctx);
        self.show_status_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;
            let canvas_center = canvas_rect.center();

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(26));

            if let (Some(tex), Some(img)) = (&self.texture, &self.image) {
                let (w, h) = img.size();
                let img_rect = egui::Rect::from_min_max(
                    self.view.to_screen(canvas_center, pos2(0.0, 0.0)),
                    self.view.to_screen(canvas_center, pos2(w, h)),
                );
                painter.image(
                    tex.id(),
                    img_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }

            for ann in self.document.annotations() {
                render::draw_annotation(&painter, canvas_center, &self.view, ann);
            }

            if !self.dialog_open() {
                self.handle_canvas_input(&response, canvas_center);
            }
        });

        self.show_text_prompt(ctx);
        self.show_settings(ctx);
        self.show_exit_confirmation(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    fn canvas_app() -> CalloutApp {
        let mut app = CalloutApp::new(None);
        app.image = Some(LoadedImage {
            rgba: RgbaImage::new(64, 64),
            path: PathBuf::from("canvas.png"),
        });
        app
    }

    /// Run one frame of synthetic pointer input against the canvas widget,
    /// wired up exactly like the live update loop.
    fn drive_canvas(app: &mut CalloutApp, ctx: &egui::Context, events: Vec<egui::Event>) {
        // egui resolves pointer interaction against the previous frame's
        // layout, so a fresh context needs one empty warm-up frame before
        // events can hit the canvas widget.
        let mut frames = Vec::new();
        if ctx.cumulative_pass_nr() == 0 {
            frames.push(Vec::new());
        }
        frames.push(events);
        for events in frames {
            let input = egui::RawInput {
                screen_rect: Some(egui::Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0))),
                events,
                ..Default::default()
            };
            let _ = ctx.run(input, |ctx| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    let (response, _painter) =
                        ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
                    let center = response.rect.center();
                    app.handle_canvas_input(&response, center);
                });
            });
        }
    }

    fn primary_button(pos: Pos2, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::default(),
        }
    }

    #[test]
    fn sub_tolerance_click_opens_the_annotation_prompt() {
        let mut app = canvas_app();
        let ctx = egui::Context::default();

        drive_canvas(
            &mut app,
            &ctx,
            vec![
                egui::Event::PointerMoved(pos2(100.0, 100.0)),
                primary_button(pos2(100.0, 100.0), true),
            ],
        );
        drive_canvas(
            &mut app,
            &ctx,
            vec![
                egui::Event::PointerMoved(pos2(103.0, 102.0)),
                primary_button(pos2(103.0, 102.0), false),
            ],
        );

        assert!(app.text_prompt.is_some());
        assert_eq!(app.view.pan, egui::Vec2::ZERO);
    }

    #[test]
    fn long_primary_drag_pans_without_annotating() {
        let mut app = canvas_app();
        let ctx = egui::Context::default();

        drive_canvas(
            &mut app,
            &ctx,
            vec![
                egui::Event::PointerMoved(pos2(100.0, 100.0)),
                primary_button(pos2(100.0, 100.0), true),
            ],
        );
        drive_canvas(
            &mut app,
            &ctx,
            vec![egui::Event::PointerMoved(pos2(160.0, 140.0))],
        );
        drive_canvas(&mut app, &ctx, vec![primary_button(pos2(160.0, 140.0), false)]);

        assert!(app.text_prompt.is_none());
        assert!(app.view.pan != egui::Vec2::ZERO);
    }

    #[test]
    fn click_on_existing_annotation_opens_its_settings() {
        let mut app = canvas_app();
        let style = app.config.default_style;
        let id = app
            .document
            .create_annotation((50.0, 40.0), "note".into(), &style, (64.0, 64.0));

        // Pivot (0,0) and zoom 1, so screen = canvas center + anchor.
        let center = pos2(400.0, 300.0);
        app.handle_click(center, pos2(450.0, 340.0));

        assert_eq!(app.settings.as_ref().map(|s| s.id), Some(id));
        assert_eq!(app.document.selected_id(), Some(id));
        assert!(app.text_prompt.is_none());
    }

    #[test]
    fn loading_an_image_remembers_its_directory() {
        let path = std::env::temp_dir().join("callout-open-test.png");
        RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let mut app = CalloutApp::new(None);
        app.load_image(path.clone());
        assert!(app.image.is_some());
        assert_eq!(app.config.last_open_dir.as_deref(), path.parent());
    }
}
