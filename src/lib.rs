// Library exports for reuse by the GUI and other applications
pub mod cli;
pub mod config_file;
pub mod image_processing;
pub mod json_output;
pub mod utils;

// Re-export commonly used types
pub use cli::{OutputFormat, ShapeArg};
pub use image_processing::batch::{BatchDriver, BatchReport, DriverConfig, FailedInput, ProcessingResult};
pub use image_processing::{
    render, render_path, CanvasSpec, ComposeError, MaskShape, MaskSpec, PlacementOffset,
    RenderSettings,
};
pub use json_output::JsonMessage;
