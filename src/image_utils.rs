// src/image_utils.rs - Conversions between raster images and masks

use image::{Pixel, Rgba, RgbaImage};

use crate::bounds::Bounds2D;
use crate::config::ForegroundRule;
use crate::mask2d::Mask2D;

/// Colour used for contour overlays
pub const CONTOUR_COLOR_RGB: [u8; 3] = [255, 0, 255];

/// Does `pixel` belong to the foreground under `rule`?
#[inline]
pub fn is_foreground(pixel: &Rgba<u8>, rule: ForegroundRule, threshold: u8) -> bool {
    match rule {
        ForegroundRule::Alpha => pixel[3] >= threshold,
        ForegroundRule::Luma => pixel.to_luma()[0] >= threshold,
    }
}

/// Mask over the whole image, one cell per pixel.
///
/// Bounds are `(0, 0, width, height)`; tighten them with `optimize_bounds`.
pub fn mask_from_image(image: &RgbaImage, rule: ForegroundRule, threshold: u8) -> Mask2D {
    let (width, height) = image.dimensions();
    let bounds = Bounds2D::new(0, 0, width as i32, height as i32);
    let cells = image.pixels().map(|p| is_foreground(p, rule, threshold)).collect();

    Mask2D { bounds, cells }
}

/// Render the bounds window of a mask as opaque white cells on a transparent canvas.
///
/// Pixel `(0, 0)` is the bounds origin, so the canvas is exactly `width x height`.
pub fn mask_to_image(mask: &Mask2D) -> RgbaImage {
    let b = mask.bounds();
    let mut image = RgbaImage::new(b.width.max(0) as u32, b.height.max(0) as u32);
    for (x, y) in mask.points() {
        image.put_pixel((x - b.x) as u32, (y - b.y) as u32, Rgba([255, 255, 255, 255]));
    }
    image
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

/// Create a debug image with specified points marked in color
pub fn create_debug_image(
    image: &RgbaImage,
    points: &[(i32, i32)],
    color: [u8; 3],
    point_size: u32,
) -> RgbaImage {
    let mut debug_image = image.clone();
    let (width, height) = debug_image.dimensions();
    let radius = (point_size / 2) as i32;

    for &(x, y) in points {
        for dy in 0..point_size as i32 {
            for dx in 0..point_size as i32 {
                let px = x - radius + dx;
                let py = y - radius + dy;

                if in_bounds(px, py, width, height) {
                    debug_image.put_pixel(px as u32, py as u32, Rgba([color[0], color[1], color[2], 255]));
                }
            }
        }
    }

    debug_image
}
