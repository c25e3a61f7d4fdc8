use image::{GrayImage, RgbImage};
use kornia::{image::allocator::CpuAllocator, imgproc};

use super::{BridgeError, CpuImage, into_gray, size_of};

/// Converts an RGB patch to 8-bit luminance using kornia's integer weights.
pub fn gray_from_rgb(rgb: &RgbImage) -> Result<GrayImage, BridgeError> {
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Ok(GrayImage::new(width, height));
    }

    let image = CpuImage::<u8, 3>::new(size_of(width, height), rgb.as_raw().clone(), CpuAllocator)?;
    let mut gray = CpuImage::<u8, 1>::from_size_val(image.size(), 0u8, CpuAllocator)?;
    imgproc::color::gray_from_rgb_u8(&image, &mut gray)?;

    into_gray(width, height, gray.as_slice().to_vec())
}
