// GUI entry point for framefit
// This binary provides the desktop window around the batch driver

use eframe::egui;

mod app;
use app::FrameFitApp;

fn main() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([400.0, 660.0])
            .with_resizable(false)
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "FrameFit",
        options,
        Box::new(|cc| Ok(Box::new(FrameFitApp::new(cc)))),
    )
}
