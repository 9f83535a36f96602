mod app;
mod config;
mod document;
mod export;
mod geometry;
mod history;
mod model;
mod render;
mod view;

use std::path::PathBuf;

use app::CalloutApp;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // An image path on the command line skips the initial open dialog.
    let initial_image = std::env::args().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("Callout"),
        ..Default::default()
    };

    eframe::run_native(
        "Callout",
        options,
        Box::new(move |_cc| Ok(Box::new(CalloutApp::new(initial_image)))),
    )
    .expect("Failed to run eframe");
}
