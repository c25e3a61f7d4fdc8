use std::f64::consts::PI;

use imageproc::geometry::{contour_area, min_area_rect};
use imageproc::point::Point;

use crate::inspect::InspectError;
use crate::inspect::contour::{hull_area, min_enclosing_circle, pixel_corners};
use crate::params::ParameterStore;

use super::measure::BlobShape;

/// Minimum area ratio a blob must reach against its fitted bounding shape.
const FIT_RATIO: f64 = 0.8;
/// Margin, in pixels, within which a blob counts as touching the ROI edge.
const EDGE_MARGIN: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundingShape {
    None,
    Rectangle,
    Circle,
}

impl BoundingShape {
    pub fn from_params(params: &ParameterStore) -> Result<Self, InspectError> {
        match params.text("blob_bounding_shape")? {
            "None" => Ok(BoundingShape::None),
            "Rectangle" => Ok(BoundingShape::Rectangle),
            "Circle" => Ok(BoundingShape::Circle),
            other => Err(InspectError::InvalidChoice {
                name: "blob_bounding_shape".to_owned(),
                value: other.to_owned(),
            }),
        }
    }
}

/// Area of the fitted bounding shape, if one is requested.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundingFit {
    Rectangle([Point<i32>; 4]),
    Circle { center: (f64, f64), radius: f64 },
}

impl BoundingFit {
    pub fn area(&self) -> f64 {
        match self {
            BoundingFit::Rectangle(corners) => contour_area(&corners[..]).abs(),
            BoundingFit::Circle { radius, .. } => PI * radius * radius,
        }
    }
}

/// Accepted blob together with the descriptors computed while filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub shape: BlobShape,
    pub circularity: f64,
    pub aspect_ratio: f64,
    pub solidity: f64,
    pub fit: Option<BoundingFit>,
}

/// The blob acceptance gates, read once per evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobFilter {
    pub area: (f64, f64),
    pub width: (f64, f64),
    pub height: (f64, f64),
    pub circularity: (f64, f64),
    pub aspect_ratio: (f64, f64),
    pub solidity: (f64, f64),
    pub bounding: BoundingShape,
    pub boundary_exclusion: bool,
}

fn within(value: f64, (lo, hi): (f64, f64)) -> bool {
    lo <= value && value <= hi
}

impl BlobFilter {
    pub fn from_params(params: &ParameterStore) -> Result<Self, InspectError> {
        Ok(Self {
            area: params.range("blob_area_min", "blob_area_max")?,
            width: params.range("blob_width_min", "blob_width_max")?,
            height: params.range("blob_height_min", "blob_height_max")?,
            circularity: params.range("blob_circularity_min", "blob_circularity_max")?,
            aspect_ratio: params.range("blob_aspect_ratio_min", "blob_aspect_ratio_max")?,
            solidity: params.range("blob_solidity_min", "blob_solidity_max")?,
            bounding: BoundingShape::from_params(params)?,
            boundary_exclusion: params.flag("boundary_exclusion")?,
        })
    }

    /// Runs the gates in order: area, size, circularity, aspect ratio,
    /// solidity, bounding-shape fit, boundary exclusion.
    pub fn accept(&self, shape: BlobShape, roi_width: u32, roi_height: u32) -> Option<Accepted> {
        if !within(shape.area, self.area) {
            return None;
        }
        let bounds = shape.bounds;
        if !within(bounds.width as f64, self.width) || !within(bounds.height as f64, self.height) {
            return None;
        }
        let circularity = shape.circularity();
        if !within(circularity, self.circularity) {
            return None;
        }
        let aspect_ratio = shape.aspect_ratio();
        if !within(aspect_ratio, self.aspect_ratio) {
            return None;
        }

        let corners = pixel_corners(&shape.points);
        let hull = hull_area(&corners);
        let solidity = if hull > 0.0 { shape.area / hull } else { 0.0 };
        if !within(solidity, self.solidity) {
            return None;
        }

        let fit = match self.bounding {
            BoundingShape::None => None,
            BoundingShape::Rectangle => Some(BoundingFit::Rectangle(min_area_rect(&corners))),
            BoundingShape::Circle => min_enclosing_circle(&corners).map(|circle| BoundingFit::Circle {
                center: circle.center,
                radius: circle.radius,
            }),
        };
        if self.bounding != BoundingShape::None {
            let fit_area = fit.as_ref().map_or(0.0, BoundingFit::area);
            if fit_area <= 0.0 || shape.area / fit_area < FIT_RATIO {
                return None;
            }
        }

        if self.boundary_exclusion {
            let (w, h) = (roi_width as i32, roi_height as i32);
            let touches = bounds.x <= EDGE_MARGIN
                || bounds.y <= EDGE_MARGIN
                || bounds.x + bounds.width >= w - EDGE_MARGIN
                || bounds.y + bounds.height >= h - EDGE_MARGIN;
            if touches {
                return None;
            }
        }

        Some(Accepted {
            shape,
            circularity,
            aspect_ratio,
            solidity,
            fit,
        })
    }
}
