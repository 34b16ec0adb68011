use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::RgbaImage;

use super::ComposeError;

/// Compute the size an image gets when shrunk to fit inside a bounding box.
///
/// Follows the usual thumbnail rule: an image that already fits is left
/// alone, otherwise the constrained axis is set to the bound and the other
/// axis is rounded to whichever neighbouring integer keeps the aspect ratio
/// closest. The result never exceeds the source or the bound, and a non-empty
/// axis is never rounded down to zero.
pub fn fit_dimensions(src_width: u32, src_height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if src_width == 0 || src_height == 0 || max_width == 0 || max_height == 0 {
        return (src_width.min(max_width), src_height.min(max_height));
    }

    if src_width <= max_width && src_height <= max_height {
        return (src_width, src_height);
    }

    let aspect = src_width as f64 / src_height as f64;
    let bound_w = max_width as f64;
    let bound_h = max_height as f64;

    if bound_w / bound_h >= aspect {
        // Height is the constraint
        let width = round_aspect(bound_h * aspect, |n| (aspect - n / bound_h).abs());
        (width.min(max_width), max_height)
    } else {
        let height = round_aspect(bound_w / aspect, |n| {
            if n == 0.0 {
                0.0
            } else {
                (aspect - bound_w / n).abs()
            }
        });
        (max_width, height.min(max_height))
    }
}

/// Pick floor or ceil of `number`, whichever scores lower under `key`
/// (floor on ties), clamped to at least 1.
fn round_aspect(number: f64, key: impl Fn(f64) -> f64) -> u32 {
    let floor = number.floor();
    let ceil = number.ceil();
    let best = if key(ceil) < key(floor) { ceil } else { floor };
    (best as u32).max(1)
}

/// Shrink an RGBA image to fit within `max_width x max_height`, keeping its
/// aspect ratio. Images that already fit are returned unchanged.
///
/// Resampling is Lanczos3 on premultiplied alpha, so transparent pixels do
/// not bleed their color into opaque neighbours.
pub fn resize_to_fit(img: &RgbaImage, max_width: u32, max_height: u32) -> Result<RgbaImage, ComposeError> {
    let (src_width, src_height) = img.dimensions();
    let (width, height) = fit_dimensions(src_width, src_height, max_width, max_height);

    if width == 0 || height == 0 {
        return Ok(RgbaImage::new(width, height));
    }

    if width == src_width && height == src_height {
        return Ok(img.clone());
    }

    let src_image = Image::from_vec_u8(src_width, src_height, img.as_raw().clone(), PixelType::U8x4)
        .map_err(|err| ComposeError::Resample(err.to_string()))?;

    let mut dst_image = Image::new(width, height, PixelType::U8x4);

    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3))
        .use_alpha(true);

    Resizer::new()
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|err| ComposeError::Resample(err.to_string()))?;

    RgbaImage::from_raw(width, height, dst_image.buffer().to_vec()).ok_or_else(|| {
        ComposeError::Resample(format!(
            "resized buffer does not match {}x{}",
            width, height
        ))
    })
}
