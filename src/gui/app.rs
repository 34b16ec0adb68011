use eframe::egui;
use framefit::image_processing::batch::{BatchDriver, DriverConfig};
use framefit::image_processing::{
    CanvasSpec, MaskShape, MaskSpec, PlacementOffset, RenderSettings, MAX_DIMENSION, MAX_OFFSET,
};
use image::Rgb;
use std::path::PathBuf;

#[path = "app_processing.rs"]
mod app_processing;

/// Edge length of the square preview area
pub(crate) const PREVIEW_SIZE: f32 = 300.0;

pub struct FrameFitApp {
    // Image format
    width: u32,
    height: u32,

    // Position in the canvas
    offset_x: i32,
    offset_y: i32,

    // Mask
    mask_shape: MaskShape,
    diameter: u32,

    background: [u8; 3],

    // Selection
    selected_images: Vec<PathBuf>,

    // Driver owns the input/output directories; None if they could not be created
    driver: Option<BatchDriver>,
    driver_config: DriverConfig,

    // Preview state
    preview: Option<egui::TextureHandle>,
    status_message: String,
    error_message: String,
}

impl FrameFitApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let defaults = RenderSettings::default();
        let mut app = Self {
            width: defaults.canvas.width,
            height: defaults.canvas.height,
            offset_x: defaults.offset.dx,
            offset_y: defaults.offset.dy,
            mask_shape: defaults.mask.shape,
            diameter: defaults.mask.diameter,
            background: defaults.canvas.background.0,
            selected_images: Vec::new(),
            driver: None,
            driver_config: DriverConfig::default(),
            preview: None,
            status_message: "Preview".to_string(),
            error_message: String::new(),
        };

        app.restore_settings();
        app.init_driver();
        app
    }

    /// Current values of the controls as a render snapshot
    pub(crate) fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            canvas: CanvasSpec {
                width: self.width,
                height: self.height,
                background: Rgb(self.background),
            },
            offset: PlacementOffset {
                dx: self.offset_x,
                dy: self.offset_y,
            },
            mask: MaskSpec {
                shape: self.mask_shape,
                diameter: self.diameter,
            },
        }
    }

    fn render_preview(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            let (rect, _) = ui.allocate_exact_size(
                egui::vec2(PREVIEW_SIZE, PREVIEW_SIZE),
                egui::Sense::hover(),
            );
            ui.painter().rect_stroke(
                rect,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::GRAY),
                egui::StrokeKind::Inside,
            );

            match &self.preview {
                Some(texture) => {
                    let size = fit_into_preview(texture.size_vec2());
                    let image_rect = egui::Rect::from_center_size(rect.center(), size);
                    ui.put(image_rect, egui::Image::new((texture.id(), size)));
                }
                None => {
                    ui.put(rect, egui::Label::new(&self.status_message));
                }
            }
        });

        if self.preview.is_some() && !self.status_message.is_empty() {
            ui.vertical_centered(|ui| ui.label(&self.status_message));
        }

        ui.add_space(10.0);
    }

    fn render_format_settings(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label("Image format");
            ui.horizontal(|ui| {
                ui.label("Width:");
                ui.add(egui::DragValue::new(&mut self.width).speed(1).range(0..=MAX_DIMENSION));
                ui.label("Height:");
                ui.add(egui::DragValue::new(&mut self.height).speed(1).range(0..=MAX_DIMENSION));
            });
        });
    }

    fn render_position_settings(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label("Position in image");
            ui.horizontal(|ui| {
                ui.label("X:");
                ui.add(egui::DragValue::new(&mut self.offset_x).speed(1).range(-MAX_OFFSET..=MAX_OFFSET));
                ui.label("Y:");
                ui.add(egui::DragValue::new(&mut self.offset_y).speed(1).range(-MAX_OFFSET..=MAX_OFFSET));
            });
        });
    }

    /// Returns true when the shape changed
    fn render_mask_settings(&mut self, ui: &mut egui::Ui) -> bool {
        let previous = self.mask_shape;

        ui.label("Shape mask:");
        egui::ComboBox::from_id_salt("mask_shape")
            .selected_text(shape_label(self.mask_shape))
            .width(ui.available_width())
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.mask_shape, MaskShape::Rectangle, shape_label(MaskShape::Rectangle));
                ui.selectable_value(&mut self.mask_shape, MaskShape::Circle, shape_label(MaskShape::Circle));
            });

        ui.group(|ui| {
            ui.label("Circle mask (optional)");
            ui.horizontal(|ui| {
                ui.label("Diameter:");
                ui.add(egui::DragValue::new(&mut self.diameter).speed(1).range(0..=MAX_DIMENSION));
            });
        });

        self.mask_shape != previous
    }

    fn render_actions(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            ui.label("Background:");
            ui.color_edit_button_srgb(&mut self.background);
        });

        let full_width = egui::vec2(ui.available_width(), 28.0);

        if ui.add_sized(full_width, egui::Button::new("Select images")).clicked() {
            self.select_images(ctx);
        }

        let can_generate = self.driver.is_some() && !self.selected_images.is_empty();
        if ui
            .add_enabled(can_generate, egui::Button::new("Generate images").min_size(full_width))
            .clicked()
        {
            self.generate_images(ctx);
        }

        if !self.selected_images.is_empty() {
            ui.label(format!("{} image(s) selected", self.selected_images.len()));
        }

        if !self.error_message.is_empty() {
            ui.colored_label(egui::Color32::RED, &self.error_message);
        }
    }
}

fn shape_label(shape: MaskShape) -> &'static str {
    match shape {
        MaskShape::Rectangle => "Rectangle",
        MaskShape::Circle => "Circle",
    }
}

/// Scale `size` down (or up) to fit the preview square, keeping aspect ratio
pub(crate) fn fit_into_preview(size: egui::Vec2) -> egui::Vec2 {
    if size.x <= 0.0 || size.y <= 0.0 {
        return egui::Vec2::ZERO;
    }
    let scale = (PREVIEW_SIZE / size.x).min(PREVIEW_SIZE / size.y);
    size * scale
}

impl eframe::App for FrameFitApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_preview(ui);
            self.render_format_settings(ui);
            self.render_position_settings(ui);
            if self.render_mask_settings(ui) {
                self.refresh_preview(ctx);
            }
            ui.add_space(6.0);
            self.render_actions(ui, ctx);
        });
    }
}
