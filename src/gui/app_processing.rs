// Processing implementation for the GUI
// Every action runs synchronously on the UI thread with the current settings snapshot

use super::FrameFitApp;
use eframe::egui;
use framefit::config_file::ConfigFile;
use framefit::image_processing::batch::BatchDriver;
use framefit::utils::{error_println, warn_println};
use image::RgbaImage;
use std::path::PathBuf;

fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("framefit").join("settings.json"))
}

impl FrameFitApp {
    /// Create the driver (and with it the input/output directories) once
    pub(crate) fn init_driver(&mut self) {
        match BatchDriver::new(self.driver_config.clone()) {
            Ok(driver) => self.driver = Some(driver),
            Err(e) => {
                error_println(&format!("{:#}", e));
                self.error_message = format!("{:#}", e);
            }
        }
    }

    /// Load the last used settings, if any
    pub(crate) fn restore_settings(&mut self) {
        let Some(path) = settings_path() else {
            return;
        };
        if !path.is_file() {
            return;
        }

        match ConfigFile::load(&path) {
            Ok(profile) => {
                let settings = profile.apply_to(self.render_settings()).clamped();
                self.width = settings.canvas.width;
                self.height = settings.canvas.height;
                self.offset_x = settings.offset.dx;
                self.offset_y = settings.offset.dy;
                self.mask_shape = settings.mask.shape;
                self.diameter = settings.mask.diameter;
                self.background = settings.canvas.background.0;

                self.driver_config = profile.apply_to_driver(self.driver_config.clone());
            }
            Err(e) => warn_println(&format!("Ignoring saved settings: {:#}", e)),
        }
    }

    pub(crate) fn save_settings(&self) {
        let Some(path) = settings_path() else {
            return;
        };

        let profile = ConfigFile::from_settings("last used", &self.render_settings(), &self.driver_config);
        if let Err(e) = profile.save(&path) {
            warn_println(&format!("Could not save settings: {:#}", e));
        }
    }

    pub(crate) fn select_images(&mut self, ctx: &egui::Context) {
        let files = rfd::FileDialog::new()
            .set_title("Select source images")
            .set_directory(&self.driver_config.input_dir)
            .add_filter("Images", self.driver_config.extensions.as_slice())
            .pick_files();

        // Cancelling the dialog clears the selection
        self.selected_images = files.unwrap_or_default();
        self.refresh_preview(ctx);
    }

    pub(crate) fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });
        if dropped.is_empty() {
            return;
        }

        let Some(driver) = &self.driver else {
            return;
        };

        let accepted = driver.accept_dropped(&dropped);
        if !accepted.is_empty() {
            self.selected_images = accepted;
            self.refresh_preview(ctx);
        }
    }

    /// Re-render the first selected image into the preview
    pub(crate) fn refresh_preview(&mut self, ctx: &egui::Context) {
        let (Some(driver), Some(first)) = (&self.driver, self.selected_images.first()) else {
            return;
        };

        match driver.preview(first, &self.render_settings()) {
            Ok(rendered) => {
                self.status_message.clear();
                self.show_image(ctx, &rendered);
            }
            Err(e) => {
                error_println(&format!("{}", e));
                self.preview = None;
                self.status_message = "Preview error".to_string();
            }
        }
    }

    pub(crate) fn generate_images(&mut self, ctx: &egui::Context) {
        let Some(driver) = &self.driver else {
            return;
        };

        self.error_message.clear();
        let report = driver.generate(&self.selected_images, &self.render_settings(), |_, _| {});

        if let Some(first) = &report.first_output {
            self.show_image(ctx, first);
        }

        self.status_message = format!("{} image(s) saved.", report.saved());
        if report.failed() > 0 {
            self.error_message = format!("{} image(s) could not be processed", report.failed());
        }

        self.save_settings();
    }

    fn show_image(&mut self, ctx: &egui::Context, image: &RgbaImage) {
        if image.width() == 0 || image.height() == 0 {
            self.preview = None;
            return;
        }

        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [image.width() as usize, image.height() as usize],
            image.as_raw(),
        );

        match &mut self.preview {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.preview = Some(ctx.load_texture("preview", color_image, egui::TextureOptions::LINEAR));
            }
        }
    }
}
