use image::{Pixel, Rgb, RgbImage, Rgba, RgbaImage};

use super::{CanvasSpec, PlacementOffset};

/// Allocate a canvas filled with the opaque background color
pub fn new_canvas(spec: &CanvasSpec) -> RgbaImage {
    let Rgb([r, g, b]) = spec.background;
    RgbaImage::from_pixel(spec.width, spec.height, Rgba([r, g, b, 255]))
}

/// Top-left corner for an image of `size` centered on the canvas and then
/// shifted by `offset`. Uses floor division so odd leftovers go right/down.
pub fn placement(spec: &CanvasSpec, size: (u32, u32), offset: PlacementOffset) -> (i64, i64) {
    let (width, height) = size;
    let x = (spec.width as i64 - width as i64).div_euclid(2) + offset.dx as i64;
    let y = (spec.height as i64 - height as i64).div_euclid(2) + offset.dy as i64;
    (x, y)
}

/// Alpha-composite `top` over `canvas` at `position`. Parts falling outside
/// the canvas are clipped.
///
/// This is a true "over": the alpha channel is composited, not blended like
/// the color bands, so an opaque canvas stays opaque under semi-transparent
/// source pixels (a plain masked paste would leave a 50% pixel at about 75%
/// alpha).
pub fn paste(canvas: &mut RgbaImage, top: &RgbaImage, position: (i64, i64)) {
    let (x, y) = position;
    let left = x.max(0);
    let upper = y.max(0);
    let right = (x + top.width() as i64).min(canvas.width() as i64);
    let lower = (y + top.height() as i64).min(canvas.height() as i64);

    for cy in upper..lower {
        for cx in left..right {
            let source = *top.get_pixel((cx - x) as u32, (cy - y) as u32);
            let target = canvas.get_pixel_mut(cx as u32, cy as u32);
            *target = over(*target, source);
        }
    }
}

/// Source-over compositing of a single pixel, rounded to the nearest value.
/// `Pixel::blend` truncates, which turns an opaque result into alpha 254.
fn over(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    match top[3] {
        0 => return bottom,
        255 => return top,
        _ => {}
    }

    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0 * (1.0 - top_alpha);
    let alpha = top_alpha + bottom_alpha;

    let channel = |i: usize| {
        ((top[i] as f32 * top_alpha + bottom[i] as f32 * bottom_alpha) / alpha).round() as u8
    };

    Rgba([channel(0), channel(1), channel(2), (alpha * 255.0).round() as u8])
}

/// Composite an RGBA raster over a solid color and drop the alpha channel,
/// for encoders that cannot store transparency.
pub fn flatten(image: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let Rgb([r, g, b]) = background;
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        over(Rgba([r, g, b, 255]), *image.get_pixel(x, y)).to_rgb()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    fn spec(width: u32, height: u32) -> CanvasSpec {
        CanvasSpec {
            width,
            height,
            background: Rgb([255, 255, 255]),
        }
    }

    #[test]
    fn test_new_canvas_is_opaque_background() {
        let canvas = new_canvas(&CanvasSpec {
            width: 3,
            height: 2,
            background: Rgb([1, 2, 3]),
        });

        assert_eq!(canvas.dimensions(), (3, 2));
        assert!(canvas.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
    }

    #[test]
    fn test_placement_centers_without_offset() {
        assert_eq!(placement(&spec(400, 400), (400, 200), PlacementOffset::default()), (0, 100));
        assert_eq!(placement(&spec(10, 10), (3, 3), PlacementOffset::default()), (3, 3));
    }

    #[test]
    fn test_placement_applies_offset_after_centering() {
        let offset = PlacementOffset { dx: -20, dy: 15 };
        assert_eq!(placement(&spec(400, 400), (400, 200), offset), (-20, 115));
    }

    #[test]
    fn test_paste_clips_outside_canvas() {
        let mut canvas = new_canvas(&spec(10, 10));
        let top: RgbaImage = ImageBuffer::from_pixel(6, 6, Rgba([0, 0, 0, 255]));

        paste(&mut canvas, &top, (-3, 7));

        assert_eq!(canvas.get_pixel(0, 7), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(2, 9), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(3, 9), &Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(0, 6), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_paste_semi_transparent_keeps_canvas_opaque() {
        let mut canvas = new_canvas(&spec(2, 1));
        let mut top: RgbaImage = ImageBuffer::from_pixel(2, 1, Rgba([0, 0, 0, 128]));
        top.put_pixel(1, 0, Rgba([0, 0, 0, 0]));

        paste(&mut canvas, &top, (0, 0));

        let half = canvas.get_pixel(0, 0);
        assert_eq!(half[3], 255);
        assert!((120..=135).contains(&half[0]), "blended red was {}", half[0]);
        assert_eq!(half[0], half[1]);
        assert_eq!(half[1], half[2]);

        assert_eq!(canvas.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_paste_fully_outside_is_noop() {
        let mut canvas = new_canvas(&spec(10, 10));
        let before = canvas.clone();
        let top: RgbaImage = ImageBuffer::from_pixel(4, 4, Rgba([0, 0, 0, 255]));

        paste(&mut canvas, &top, (1280, -1280));

        assert_eq!(canvas, before);
    }

    #[test]
    fn test_over_on_transparent_bottom_takes_top() {
        assert_eq!(over(Rgba([0, 0, 0, 0]), Rgba([40, 50, 60, 100])), Rgba([40, 50, 60, 100]));
    }

    #[test]
    fn test_flatten_rounds_half_transparent_pixels() {
        let image: RgbaImage = ImageBuffer::from_pixel(1, 1, Rgba([0, 0, 0, 128]));

        let flat = flatten(&image, Rgb([255, 255, 255]));

        assert_eq!(flat.get_pixel(0, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn test_flatten_uses_background_for_transparent_pixels() {
        let mut image: RgbaImage = ImageBuffer::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        image.put_pixel(1, 0, Rgba([10, 20, 30, 255]));

        let flat = flatten(&image, Rgb([200, 100, 50]));

        assert_eq!(flat.get_pixel(0, 0), &Rgb([200, 100, 50]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }
}
