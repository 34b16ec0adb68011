use clap::{Parser, ValueEnum};
use image::Rgb;
use std::path::PathBuf;

use crate::image_processing::{
    batch::DriverConfig, CanvasSpec, MaskShape, MaskSpec, PlacementOffset, RenderSettings,
    MAX_DIMENSION, MAX_OFFSET,
};
use crate::utils::{parse_extension_list, parse_hex_color};

#[derive(
    Debug, Clone, Copy, ValueEnum, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ShapeArg {
    /// Keep the full rectangular canvas
    #[value(name = "rectangle")]
    Rectangle,
    /// Cut the canvas to a soft-edged circle
    #[value(name = "circle")]
    Circle,
}

impl From<ShapeArg> for MaskShape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Rectangle => MaskShape::Rectangle,
            ShapeArg::Circle => MaskShape::Circle,
        }
    }
}

impl From<MaskShape> for ShapeArg {
    fn from(shape: MaskShape) -> Self {
        match shape {
            MaskShape::Rectangle => ShapeArg::Rectangle,
            MaskShape::Circle => ShapeArg::Circle,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    ValueEnum,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Keep the input's extension when it can store alpha, otherwise write PNG
    #[default]
    #[value(name = "auto")]
    Auto,
    /// Always write PNG
    #[value(name = "png")]
    Png,
    /// Always write JPEG (alpha is flattened onto the background color)
    #[value(name = "jpg")]
    Jpg,
}

#[derive(Parser, Debug)]
#[command(
    name = "framefit",
    about = "Places photos onto a fixed-size colored canvas",
    long_about = "
FrameFit - canvas fitting for photos

Every selected image is shrunk to fit the canvas (never enlarged), centered,
shifted by the X/Y offset and composited over the background color. With the
circle mask the result is cut to a soft-edged circle and everything outside it
becomes transparent. One output file is written per input, named after it.

Example Usage:
  # Process everything in ./input_images into ./output_images (400x400, white)
  framefit

  # Specific files, 600x400 black canvas, nudged 20px to the left
  framefit -i a.jpg -i b.png --size 600x400 --background #000000 -x -20

  # Round avatars with a 300px circle, always written as PNG
  framefit -i ~/Photos/team --shape circle --diameter 300 --format png

  # Load settings from a saved profile (explicit flags still win)
  framefit --config avatars.json -o ./out

  # Simulate without writing anything
  framefit -i ~/Photos --dry-run --verbose"
)]
pub struct Args {
    /// Input image files or directories (defaults to the input directory)
    #[arg(short = 'i', long = "input", value_name = "DIR|FILE")]
    pub input_paths: Vec<PathBuf>,

    /// Directory scanned when no inputs are given; created on start
    #[arg(long = "input-dir", default_value = "input_images", value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Output directory for rendered images; created on start
    #[arg(
        short = 'o',
        long = "output",
        default_value = "output_images",
        value_name = "DIR"
    )]
    pub output_dir: PathBuf,

    /// Canvas size (format: WIDTHxHEIGHT, each 0-1280)
    #[arg(
        short = 's',
        long = "size",
        default_value = "400x400",
        value_name = "WIDTHxHEIGHT"
    )]
    pub size: String,

    /// Horizontal offset applied after centering
    #[arg(
        short = 'x',
        long = "offset-x",
        default_value = "0",
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-1280..=1280),
        value_name = "PIXELS"
    )]
    pub offset_x: i32,

    /// Vertical offset applied after centering
    #[arg(
        short = 'y',
        long = "offset-y",
        default_value = "0",
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-1280..=1280),
        value_name = "PIXELS"
    )]
    pub offset_y: i32,

    /// Mask shape applied to the canvas
    #[arg(long = "shape", default_value = "rectangle")]
    pub shape: ShapeArg,

    /// Circle diameter in pixels (used with --shape circle)
    #[arg(
        short = 'd',
        long = "diameter",
        default_value = "400",
        value_parser = clap::value_parser!(u32).range(0..=1280),
        value_name = "PIXELS"
    )]
    pub diameter: u32,

    /// Canvas background color (hex RGB, e.g., #FFFFFF)
    #[arg(
        short = 'b',
        long = "background",
        default_value = "#FFFFFF",
        value_name = "COLOR"
    )]
    pub background: String,

    /// Output file format
    #[arg(long = "format", default_value = "auto")]
    pub format: OutputFormat,

    /// Comma-separated list of image extensions to pick up
    #[arg(long = "extensions", default_value = "png,jpg,jpeg")]
    pub extensions_str: String,

    /// JSON settings profile; flags given on the command line take precedence
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Render everything but do not write any file
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Emit progress as JSON lines on stdout instead of the console UI
    #[arg(long = "json-progress")]
    pub json_progress: bool,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Args {
    /// Parse the size string into width and height
    pub fn parse_size(&self) -> Result<(u32, u32), String> {
        let parts: Vec<&str> = self.size.split('x').collect();
        if parts.len() != 2 {
            return Err(format!(
                "Invalid size format '{}'. Use WIDTHxHEIGHT (e.g., 400x400)",
                self.size
            ));
        }

        let width = parts[0]
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid width: '{}'", parts[0]))?;
        let height = parts[1]
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid height: '{}'", parts[1]))?;

        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(format!(
                "Width and height must be at most {} pixels",
                MAX_DIMENSION
            ));
        }

        Ok((width, height))
    }

    /// Parse the extensions string into a vector
    pub fn parse_extensions(&self) -> Vec<String> {
        parse_extension_list(&self.extensions_str)
    }

    pub fn background_color(&self) -> Result<Rgb<u8>, String> {
        parse_hex_color(&self.background).ok_or_else(|| {
            format!(
                "Invalid background color '{}'. Expected hex format like #RRGGBB",
                self.background
            )
        })
    }

    /// Snapshot of the render parameters, range-checked
    pub fn render_settings(&self) -> Result<RenderSettings, String> {
        let (width, height) = self.parse_size()?;

        if self.offset_x.abs() > MAX_OFFSET || self.offset_y.abs() > MAX_OFFSET {
            return Err(format!(
                "Offsets must be between -{} and {}, got: {},{}",
                MAX_OFFSET, MAX_OFFSET, self.offset_x, self.offset_y
            ));
        }

        if self.diameter > MAX_DIMENSION {
            return Err(format!(
                "Circle diameter must be at most {} pixels, got: {}",
                MAX_DIMENSION, self.diameter
            ));
        }

        Ok(RenderSettings {
            canvas: CanvasSpec {
                width,
                height,
                background: self.background_color()?,
            },
            offset: PlacementOffset {
                dx: self.offset_x,
                dy: self.offset_y,
            },
            mask: MaskSpec {
                shape: self.shape.into(),
                diameter: self.diameter,
            },
        })
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            output_format: self.format,
            extensions: self.parse_extensions(),
            verbose: self.verbose && !self.json_progress,
            dry_run: self.dry_run,
            json_progress: self.json_progress,
        }
    }
}


// Default implementation for tests
#[cfg(test)]
impl Default for Args {
    fn default() -> Self {
        Self {
            input_paths: vec![],
            input_dir: PathBuf::from("input_images"),
            output_dir: PathBuf::from("output_images"),
            size: "400x400".to_string(),
            offset_x: 0,
            offset_y: 0,
            shape: ShapeArg::Rectangle,
            diameter: 400,
            background: "#FFFFFF".to_string(),
            format: OutputFormat::Auto,
            extensions_str: "png,jpg,jpeg".to_string(),
            config_file: None,
            dry_run: false,
            json_progress: false,
            verbose: false,
        }
    }
}
