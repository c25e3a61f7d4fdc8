use image::GrayImage;
use kornia::{image::allocator::CpuAllocator, imgproc};

use super::{BridgeError, CpuImage, into_gray, size_of};

/// Pixels strictly above `threshold` become 255, everything else 0.
pub fn threshold_binary(gray: &GrayImage, threshold: u8) -> Result<GrayImage, BridgeError> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Ok(GrayImage::new(width, height));
    }

    let source = CpuImage::<u8, 1>::new(size_of(width, height), gray.as_raw().clone(), CpuAllocator)?;
    let mut binary = CpuImage::<u8, 1>::from_size_val(source.size(), 0u8, CpuAllocator)?;
    imgproc::threshold::threshold_binary(&source, &mut binary, threshold, 255)?;

    into_gray(width, height, binary.as_slice().to_vec())
}

/// Otsu's between-class variance threshold over an arbitrary pixel sample.
///
/// Takes a slice rather than an image because the blob stage only feeds it the
/// selected pixels of a circle or masked ROI; `imageproc::contrast::otsu_level`
/// would count the unselected ones too. Returns 0 for an empty sample.
pub fn otsu_threshold(pixels: &[u8]) -> u8 {
    let mut histogram = [0u32; 256];
    for &value in pixels {
        histogram[value as usize] += 1;
    }

    let total_pixels = pixels.len() as f64;
    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(value, &count)| value as f64 * count as f64)
        .sum();

    let mut sum_background = 0f64;
    let mut weight_background = 0f64;
    let mut max_variance = f64::MIN;
    let mut threshold = 0u8;

    for (value, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }

        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += value as f64 * count as f64;

        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum_total - sum_background) / weight_foreground;
        let variance =
            weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);

        if variance > max_variance {
            max_variance = variance;
            threshold = value as u8;
        }
    }

    threshold
}
