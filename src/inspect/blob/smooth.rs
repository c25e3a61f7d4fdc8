use image::{GrayImage, Luma};
use imageproc::filter::bilateral::GaussianEuclideanColorDistance;
use imageproc::filter::bilateral_filter;
use imageproc::map::map_pixels;

/// Neighbourhood radius of the smoothing window (11×11).
const RADIUS: u8 = 5;
const REBINARIZE_AT: u8 = 128;

/// Edge-preserving (bilateral) smoothing of a binary mask, re-binarized at 128.
///
/// Spatial and range sigmas are both `sigma`. A non-positive sigma leaves the
/// mask untouched.
pub fn smooth_mask(mask: &GrayImage, sigma: f64) -> GrayImage {
    if sigma <= 0.0 || !sigma.is_finite() {
        return mask.clone();
    }
    let sigma = sigma as f32;
    let smoothed: GrayImage = bilateral_filter(mask, RADIUS, sigma, GaussianEuclideanColorDistance::new(sigma));
    map_pixels(&smoothed, |px| Luma([if px[0] >= REBINARIZE_AT { 255 } else { 0 }]))
}
