//! Thin bridge between `image` buffers and kornia's imgproc kernels.

use image::GrayImage;
use kornia::image::{Image, ImageError, ImageSize, allocator::CpuAllocator};

pub mod greyscale;
pub use greyscale::gray_from_rgb;
pub mod threshold;
pub use threshold::{otsu_threshold, threshold_binary};

pub(crate) type CpuImage<T, const C: usize> = Image<T, C, CpuAllocator>;

/// Errors raised while moving pixel buffers in and out of kornia.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("kornia image error: {0}")]
    Kornia(#[from] ImageError),
    #[error("buffer does not fit a {width}x{height} image")]
    BufferSize { width: u32, height: u32 },
}

fn size_of(width: u32, height: u32) -> ImageSize {
    ImageSize {
        width: width as usize,
        height: height as usize,
    }
}

fn into_gray(width: u32, height: u32, buffer: Vec<u8>) -> Result<GrayImage, BridgeError> {
    GrayImage::from_raw(width, height, buffer).ok_or(BridgeError::BufferSize { width, height })
}
