//! Generated test scenes: flat fields, disks, rectangles, gradients and
//! checkerboards on an RGB canvas.

use image::{Rgb, RgbImage};

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

pub fn uniform(width: u32, height: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width, height, color)
}

/// Paints every pixel with `(x - cx)² + (y - cy)² <= r²`.
pub fn paint_disk(image: &mut RgbImage, center: (i32, i32), radius: i32, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    let r2 = radius as i64 * radius as i64;
    for y in 0..height {
        for x in 0..width {
            let dx = x as i64 - center.0 as i64;
            let dy = y as i64 - center.1 as i64;
            if dx * dx + dy * dy <= r2 {
                image.put_pixel(x, y, color);
            }
        }
    }
}

/// Fills the half-open box `[x, x + w) × [y, y + h)`, clipped to the image.
pub fn paint_rect(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    for py in y..(y + h).min(height) {
        for px in x..(x + w).min(width) {
            image.put_pixel(px, py, color);
        }
    }
}

/// A single disk on a flat background.
pub fn disk(width: u32, height: u32, center: (i32, i32), radius: i32, fg: Rgb<u8>, bg: Rgb<u8>) -> RgbImage {
    let mut image = uniform(width, height, bg);
    paint_disk(&mut image, center, radius, fg);
    image
}

/// Alternating square cells, starting with `a` at the origin.
pub fn checkerboard(width: u32, height: u32, cell: u32, a: Rgb<u8>, b: Rgb<u8>) -> RgbImage {
    let cell = cell.max(1);
    RgbImage::from_fn(width, height, |x, y| if (x / cell + y / cell) % 2 == 0 { a } else { b })
}

/// Left-to-right gray ramp from 0 to 255.
pub fn horizontal_gradient(width: u32, height: u32) -> RgbImage {
    let span = width.saturating_sub(1).max(1) as f32;
    RgbImage::from_fn(width, height, |x, _| {
        let level = (x as f32 / span * 255.0).round() as u8;
        Rgb([level, level, level])
    })
}

/// Demo scene: a gray part with three bright disks of different sizes, a dark
/// square and a red patch on a black background.
pub fn demo_scene() -> RgbImage {
    let mut image = uniform(640, 480, BLACK);
    paint_rect(&mut image, 20, 20, 280, 200, Rgb([100, 100, 100]));
    paint_disk(&mut image, (80, 80), 8, WHITE);
    paint_disk(&mut image, (160, 120), 6, WHITE);
    paint_disk(&mut image, (230, 170), 7, WHITE);
    paint_rect(&mut image, 360, 60, 120, 120, WHITE);
    paint_rect(&mut image, 380, 80, 80, 80, BLACK);
    paint_rect(&mut image, 60, 280, 200, 150, Rgb([220, 30, 30]));
    image
}
