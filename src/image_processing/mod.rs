pub mod batch;
pub mod canvas;
pub mod mask;
pub mod resize;

use image::{DynamicImage, ImageReader, Rgb, RgbaImage};
use std::path::{Path, PathBuf};

/// Largest canvas edge and circle diameter accepted from the user surfaces
pub const MAX_DIMENSION: u32 = 1280;

/// Largest absolute placement offset accepted from the user surfaces
pub const MAX_OFFSET: i32 = 1280;

/// Errors raised while turning a source file into a rendered canvas.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// The source could not be read or interpreted as an image.
    #[error("failed to decode image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    /// The resampler rejected a buffer handed to it.
    #[error("resampling failed: {0}")]
    Resample(String),
}

/// Target raster size and fill color. Alpha is always opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    pub background: Rgb<u8>,
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            background: Rgb([255, 255, 255]),
        }
    }
}

/// Shift applied after centering, in canvas pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementOffset {
    pub dx: i32,
    pub dy: i32,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MaskShape {
    #[default]
    Rectangle,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskSpec {
    pub shape: MaskShape,
    /// Only used when `shape` is `Circle`
    pub diameter: u32,
}

impl Default for MaskSpec {
    fn default() -> Self {
        Self {
            shape: MaskShape::Rectangle,
            diameter: 400,
        }
    }
}

/// Snapshot of everything a single render call needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSettings {
    pub canvas: CanvasSpec,
    pub offset: PlacementOffset,
    pub mask: MaskSpec,
}

impl RenderSettings {
    /// Pull every value into the range the user surfaces accept
    pub fn clamped(self) -> Self {
        Self {
            canvas: CanvasSpec {
                width: self.canvas.width.min(MAX_DIMENSION),
                height: self.canvas.height.min(MAX_DIMENSION),
                ..self.canvas
            },
            offset: PlacementOffset {
                dx: self.offset.dx.clamp(-MAX_OFFSET, MAX_OFFSET),
                dy: self.offset.dy.clamp(-MAX_OFFSET, MAX_OFFSET),
            },
            mask: MaskSpec {
                diameter: self.mask.diameter.min(MAX_DIMENSION),
                ..self.mask
            },
        }
    }
}

/// Decode a source file, sniffing the format from its content rather than
/// trusting the extension.
pub fn decode_source(path: &Path) -> Result<DynamicImage, ComposeError> {
    let decode_error = |source: image::ImageError| ComposeError::Decode {
        path: path.to_path_buf(),
        source,
    };

    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|err| decode_error(image::ImageError::IoError(err)))?
        .decode()
        .map_err(decode_error)
}

/// Place `source` on a fresh canvas described by `settings`.
///
/// The source is shrunk to fit (never enlarged), centered, shifted by the
/// placement offset and composited over the background using its own alpha.
/// With a circle mask the alpha channel of the whole canvas is replaced by a
/// blurred disc, so anything outside the circle ends up transparent.
///
/// The returned raster is always exactly `canvas.width x canvas.height`.
pub fn render(source: &DynamicImage, settings: &RenderSettings) -> Result<RgbaImage, ComposeError> {
    let spec = &settings.canvas;
    let rgba = source.to_rgba8();

    let resized = resize::resize_to_fit(&rgba, spec.width, spec.height)?;

    let mut output = canvas::new_canvas(spec);
    let position = canvas::placement(spec, resized.dimensions(), settings.offset);
    canvas::paste(&mut output, &resized, position);

    if settings.mask.shape == MaskShape::Circle {
        let alpha = mask::circle_mask(spec.width, spec.height, settings.mask.diameter);
        mask::apply_alpha_mask(&mut output, &alpha);
    }

    Ok(output)
}

/// Decode and render in one step. Decode failures carry the offending path.
pub fn render_path(path: &Path, settings: &RenderSettings) -> Result<RgbaImage, ComposeError> {
    let source = decode_source(path)?;
    render(&source, settings)
}
