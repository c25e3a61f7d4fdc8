use image::{GrayImage, Luma, RgbImage};

use crate::geometry::Roi;
use crate::kornia::{self, BridgeError};

/// The pixels an operator sees: the ROI's local patch plus the selection of
/// pixels that take part in the analysis.
///
/// A local pixel is selected when it samples a pixel inside the frame, lies
/// inside the ROI's shape, and (for a non-empty mask) is included by the mask.
#[derive(Debug, Clone)]
pub struct RegionView<'a> {
    roi: &'a Roi,
    rgb: RgbImage,
    selection: GrayImage,
    selected: usize,
}

impl<'a> RegionView<'a> {
    pub fn sample(frame: &RgbImage, roi: &'a Roi) -> Self {
        let (width, height) = (roi.width(), roi.height());
        let (frame_w, frame_h) = frame.dimensions();
        let masked = !roi.mask().is_empty();

        let mut rgb = RgbImage::new(width, height);
        let mut selection = GrayImage::new(width, height);
        let mut selected = 0usize;

        for v in 0..height {
            for u in 0..width {
                let source = roi.sample_position(u, v);
                let in_frame = (0..frame_w as i64).contains(&source.x) && (0..frame_h as i64).contains(&source.y);
                if !in_frame {
                    continue;
                }
                rgb.put_pixel(u, v, *frame.get_pixel(source.x as u32, source.y as u32));
                if roi.shape_includes(u, v) && (!masked || roi.mask().includes(u, v)) {
                    selection.put_pixel(u, v, Luma([255]));
                    selected += 1;
                }
            }
        }

        Self {
            roi,
            rgb,
            selection,
            selected,
        }
    }

    pub fn roi(&self) -> &Roi {
        self.roi
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Bounding-box area of the ROI, the denominator of fill and tolerance ratios.
    pub fn area(&self) -> f64 {
        self.roi.area()
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn selection(&self) -> &GrayImage {
        &self.selection
    }

    pub fn selected_count(&self) -> usize {
        self.selected
    }

    pub fn is_selected(&self, u: u32, v: u32) -> bool {
        self.selection.get_pixel_checked(u, v).is_some_and(|px| px[0] > 0)
    }

    pub fn gray(&self) -> Result<GrayImage, BridgeError> {
        kornia::gray_from_rgb(&self.rgb)
    }

    /// Zeroes unselected pixels of a patch-sized single-channel image.
    pub fn retain_selected(&self, image: &mut GrayImage) {
        for (px, sel) in image.pixels_mut().zip(self.selection.pixels()) {
            if sel[0] == 0 {
                *px = Luma([0]);
            }
        }
    }

    /// Values of `image` at selected pixels, row-major.
    pub fn selected_values<'b>(&'b self, image: &'b GrayImage) -> impl Iterator<Item = u8> + 'b {
        image
            .pixels()
            .zip(self.selection.pixels())
            .filter(|(_, sel)| sel[0] > 0)
            .map(|(px, _)| px[0])
    }

    /// Maps a local pixel-index coordinate into image pixel-index coordinates.
    pub fn to_image(&self, u: f64, v: f64) -> (f64, f64) {
        let (x, y) = self.roi.local_to_image(u + 0.5, v + 0.5);
        (x - 0.5, y - 0.5)
    }
}
