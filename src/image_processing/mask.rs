use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use imageproc::filter::gaussian_blur_f32;

/// Standard deviation of the blur that softens the circle edge
pub const SOFT_EDGE_SIGMA: f32 = 2.5;

/// Build a canvas-sized alpha mask holding a soft-edged disc.
///
/// The disc's bounding box starts at `((width - diameter) / 2,
/// (height - diameter) / 2)` (floor division, so it may start off-canvas
/// when the diameter exceeds the canvas) and ends `diameter` pixels later,
/// both ends included.
/// Inside is 255, outside 0, with a Gaussian falloff across the edge.
/// A zero diameter yields a fully transparent mask.
pub fn circle_mask(width: u32, height: u32, diameter: u32) -> GrayImage {
    if width == 0 || height == 0 || diameter == 0 {
        return GrayImage::new(width, height);
    }

    // Drawn and blurred in f32 so the result can be rounded once at the end
    let blurred = gaussian_blur_f32(&filled_disc(width, height, diameter), SOFT_EDGE_SIGMA);
    GrayImage::from_fn(width, height, |x, y| {
        Luma([blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    })
}

/// Hard-edged disc filling the inclusive box `left..=left + diameter`
/// (same for y), so it is `diameter + 1` pixels across. The center sits at
/// `left + diameter / 2.0`; odd diameters are centered between two pixels
/// instead of being shifted.
fn filled_disc(width: u32, height: u32, diameter: u32) -> ImageBuffer<Luma<f32>, Vec<f32>> {
    let offset = diameter as f64 / 2.0;
    let center_x = (width as i64 - diameter as i64).div_euclid(2) as f64 + offset;
    let center_y = (height as i64 - diameter as i64).div_euclid(2) as f64 + offset;
    // Half a pixel past the outermost pixel centers of the box
    let radius = (diameter as f64 + 1.0) / 2.0;

    ImageBuffer::from_fn(width, height, |x, y| {
        let dx = x as f64 - center_x;
        let dy = y as f64 - center_y;
        if dx * dx + dy * dy <= radius * radius {
            Luma([255.0f32])
        } else {
            Luma([0.0f32])
        }
    })
}

/// Overwrite the alpha channel of `image` with `mask`.
///
/// This is a replacement, not a multiply: whatever alpha the composite had
/// before is discarded.
pub fn apply_alpha_mask(image: &mut RgbaImage, mask: &GrayImage) {
    debug_assert_eq!(image.dimensions(), mask.dimensions());

    for (pixel, alpha) in image.pixels_mut().zip(mask.pixels()) {
        pixel[3] = alpha[0];
    }
}
