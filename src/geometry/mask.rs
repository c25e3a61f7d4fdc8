use image::{GrayImage, Luma, imageops::{self, FilterType}};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::point::Point;

/// Per-ROI inclusion mask in the ROI's local frame.
///
/// A value of 0 excludes the pixel; anything else includes it. A mask with no
/// non-zero pixel means "no restriction".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoiMask(GrayImage);

impl RoiMask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    /// Rebuilds a mask from persisted rows; `None` if the rows don't match the size.
    pub fn from_rows(rows: &[Vec<u8>], width: u32, height: u32) -> Option<Self> {
        if rows.is_empty() {
            return Some(Self::empty(width, height));
        }
        if rows.len() != height as usize || rows.iter().any(|row| row.len() != width as usize) {
            return None;
        }
        let buffer = rows.iter().flatten().copied().collect();
        GrayImage::from_raw(width, height, buffer).map(Self)
    }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        let width = self.0.width() as usize;
        if width == 0 {
            return vec![Vec::new(); self.0.height() as usize];
        }
        self.0.as_raw().chunks(width).map(<[u8]>::to_vec).collect()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_raw().iter().all(|&px| px == 0)
    }

    pub fn includes(&self, x: u32, y: u32) -> bool {
        self.0
            .get_pixel_checked(x, y)
            .is_some_and(|px| px[0] > 0)
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }

    /// Nearest-neighbour resample, keeping the mask binary.
    pub fn resampled(&self, width: u32, height: u32) -> Self {
        let (w, h) = self.0.dimensions();
        if (w, h) == (width, height) {
            return self.clone();
        }
        if w == 0 || h == 0 || self.is_empty() {
            return Self::empty(width, height);
        }
        Self(imageops::resize(&self.0, width, height, FilterType::Nearest))
    }

    /// Paints an included disk centred on a local-frame point.
    pub fn paint_disk(&mut self, center: Point<i32>, radius: i32) {
        draw_filled_circle_mut(&mut self.0, (center.x, center.y), radius.max(0), Luma([255u8]));
    }

    pub fn clear(&mut self) {
        for px in self.0.pixels_mut() {
            *px = Luma([0]);
        }
    }
}
