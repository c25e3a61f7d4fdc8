use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use super::mask::RoiMask;

pub type RoiId = u32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoiShape {
    #[default]
    Rectangle,
    Circle,
}

/// A region of interest: a w×h box at (x, y), rotated by `angle` degrees
/// about its center, carrying a mask in its own local frame.
///
/// The local frame has its origin at the unrotated box's top-left corner. The
/// mask always has the ROI's dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Roi {
    pub(crate) id: RoiId,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) angle: f64,
    pub(crate) shape: RoiShape,
    pub(crate) mask: RoiMask,
}

impl Roi {
    pub(crate) fn new(id: RoiId, x: i32, y: i32, width: u32, height: u32, shape: RoiShape) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            angle: 0.0,
            shape,
            mask: RoiMask::empty(width, height),
        }
    }

    /// Rebuilds a persisted ROI. `None` when the mask doesn't match the box.
    pub fn restore(
        id: RoiId,
        origin: Point<i32>,
        width: u32,
        height: u32,
        angle: f64,
        shape: RoiShape,
        mask: RoiMask,
    ) -> Option<Self> {
        if mask.dimensions() != (width, height) || !angle.is_finite() {
            return None;
        }
        Some(Self {
            id,
            x: origin.x,
            y: origin.y,
            width,
            height,
            angle,
            shape,
            mask,
        })
    }

    pub fn id(&self) -> RoiId {
        self.id
    }

    pub fn origin(&self) -> Point<i32> {
        Point::new(self.x, self.y)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn shape(&self) -> RoiShape {
        self.shape
    }

    pub fn mask(&self) -> &RoiMask {
        &self.mask
    }

    /// Area of the bounding box in pixels.
    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Radius of the inscribed disk, used by circle ROIs.
    pub fn radius(&self) -> f64 {
        self.width.min(self.height) as f64 / 2.0
    }

    fn rotation(&self) -> (f64, f64) {
        let radians = self.angle.to_radians();
        (radians.cos(), radians.sin())
    }

    /// Maps a continuous local-frame coordinate to image coordinates.
    pub fn local_to_image(&self, u: f64, v: f64) -> (f64, f64) {
        let (cx, cy) = self.center();
        let (cos, sin) = self.rotation();
        let du = u - self.width as f64 / 2.0;
        let dv = v - self.height as f64 / 2.0;
        (cx + du * cos - dv * sin, cy + du * sin + dv * cos)
    }

    /// Inverse of [`Roi::local_to_image`].
    pub fn image_to_local(&self, x: f64, y: f64) -> (f64, f64) {
        let (cx, cy) = self.center();
        let (cos, sin) = self.rotation();
        let dx = x - cx;
        let dy = y - cy;
        (
            dx * cos + dy * sin + self.width as f64 / 2.0,
            -dx * sin + dy * cos + self.height as f64 / 2.0,
        )
    }

    /// Image pixel sampled for local pixel (u, v): nearest neighbour at the pixel center.
    pub fn sample_position(&self, u: u32, v: u32) -> Point<i64> {
        let (x, y) = self.local_to_image(u as f64 + 0.5, v as f64 + 0.5);
        Point::new(x.floor() as i64, y.floor() as i64)
    }

    /// Shape test for a continuous local-frame coordinate. Edges are inclusive.
    pub fn contains_local(&self, u: f64, v: f64) -> bool {
        match self.shape {
            RoiShape::Rectangle => {
                (0.0..=self.width as f64).contains(&u) && (0.0..=self.height as f64).contains(&v)
            }
            RoiShape::Circle => {
                let du = u - self.width as f64 / 2.0;
                let dv = v - self.height as f64 / 2.0;
                du.hypot(dv) <= self.radius()
            }
        }
    }

    /// Hit test in image coordinates, honouring rotation.
    pub fn contains(&self, point: Point<i32>) -> bool {
        let (u, v) = self.image_to_local(point.x as f64, point.y as f64);
        self.contains_local(u, v)
    }

    /// Whether local pixel (u, v) lies inside the shape, judged at its center.
    pub fn shape_includes(&self, u: u32, v: u32) -> bool {
        u < self.width && v < self.height && self.contains_local(u as f64 + 0.5, v as f64 + 0.5)
    }

    /// Box corners in image coordinates, clockwise from the local origin.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (w, h) = (self.width as f64, self.height as f64);
        [
            self.local_to_image(0.0, 0.0),
            self.local_to_image(w, 0.0),
            self.local_to_image(w, h),
            self.local_to_image(0.0, h),
        ]
    }
}
