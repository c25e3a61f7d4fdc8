//! Blob detection: segment the patch, smooth the mask, trace external
//! contours, gate each blob, measure the survivors and judge the set.

use imageproc::point::Point;
use tracing::debug;

use crate::params::ParameterStore;

use super::contour::orientation;
use super::{InspectError, Metric, Outcome, Overlay, RegionView};

pub mod filter;
pub mod judge;
pub mod measure;
pub mod segment;
pub mod smooth;

pub use filter::{BlobFilter, BoundingFit, BoundingShape};
pub use judge::{BlobOutputs, JudgmentCriteria, JudgmentMode};
pub use measure::{BlobShape, LocalBox, trace_blobs};
pub use segment::{ColorMode, segment};
pub use smooth::smooth_mask;

/// Orientation needs at least this many contour points.
const MIN_ORIENTATION_POINTS: usize = 5;

pub(crate) const RANGE_PAIRS: &[(&str, &str)] = &[
    ("blob_area_min", "blob_area_max"),
    ("blob_width_min", "blob_width_max"),
    ("blob_height_min", "blob_height_max"),
    ("blob_circularity_min", "blob_circularity_max"),
    ("blob_aspect_ratio_min", "blob_aspect_ratio_max"),
    ("blob_solidity_min", "blob_solidity_max"),
    ("blob_rgb_r_min", "blob_rgb_r_max"),
    ("blob_rgb_g_min", "blob_rgb_g_max"),
    ("blob_rgb_b_min", "blob_rgb_b_max"),
    ("blob_hsv_h_min", "blob_hsv_h_max"),
    ("blob_hsv_s_min", "blob_hsv_s_max"),
    ("blob_hsv_v_min", "blob_hsv_v_max"),
    ("blob_count_min", "blob_count_max"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct BlobMeasurement {
    pub area: f64,
    pub perimeter: f64,
    pub circularity: f64,
    pub aspect_ratio: f64,
    pub solidity: f64,
    /// Center of gravity in image coordinates.
    pub centroid: (f64, f64),
    /// Bounding box `(x, y, w, h)` offset by the ROI origin.
    pub position: (i32, i32, i32, i32),
    /// Major-axis angle in degrees, when the contour is long enough.
    pub orientation: Option<f64>,
    pub fit: Option<BoundingFit>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlobReport {
    pub blobs: Vec<BlobMeasurement>,
    pub count: usize,
    pub largest_area: f64,
    /// 0 when no blob survived.
    pub smallest_area: f64,
    pub total_area: f64,
    /// Total blob area over the ROI box area, in percent.
    pub fill_percentage: f64,
}

impl BlobReport {
    fn collect(blobs: Vec<BlobMeasurement>, roi_area: f64) -> Self {
        let count = blobs.len();
        let total_area: f64 = blobs.iter().map(|b| b.area).sum();
        let largest_area = blobs.iter().map(|b| b.area).fold(0.0, f64::max);
        let smallest_area = if count == 0 {
            0.0
        } else {
            blobs.iter().map(|b| b.area).fold(f64::INFINITY, f64::min)
        };
        let fill_percentage = if count > 0 && roi_area > 0.0 {
            total_area / roi_area * 100.0
        } else {
            0.0
        };
        Self {
            blobs,
            count,
            largest_area,
            smallest_area,
            total_area,
            fill_percentage,
        }
    }

    pub fn areas(&self) -> Vec<f64> {
        self.blobs.iter().map(|b| b.area).collect()
    }
}

/// What a preview draws for one accepted blob, in local coordinates.
#[derive(Debug, Clone)]
pub(crate) struct BlobOverlay {
    pub contour: Vec<Point<i32>>,
    pub centroid: (f64, f64),
    pub fit: Option<BoundingFit>,
}

/// Judgment ranges and the textual choices, beyond the plain parameter pairs.
pub(crate) fn validate(params: &ParameterStore, judgment: &JudgmentCriteria) -> Result<(), InspectError> {
    let pairs = [
        ("blob_count_min", judgment.blob_count_min, "blob_count_max", judgment.blob_count_max),
        ("blob_area_min", judgment.blob_area_min, "blob_area_max", judgment.blob_area_max),
    ];
    for (min_name, min, max_name, max) in pairs {
        if !ParameterStore::validate_range(min, max) {
            return Err(InspectError::InvalidRange {
                min: format!("judgment {min_name}"),
                max: format!("judgment {max_name}"),
            });
        }
    }
    ColorMode::from_params(params)?;
    BoundingShape::from_params(params)?;
    Ok(())
}

/// Segments, smooths, traces and gates the blobs of one region.
pub fn detect(region: &RegionView, params: &ParameterStore) -> Result<(BlobReport, Vec<BlobShape>), InspectError> {
    let filter = BlobFilter::from_params(params)?;
    let sigma = params.number("blob_bilateral_sigma")?;

    let foreground = segment(region, params)?;
    let smoothed = smooth_mask(&foreground, sigma);
    let traced = trace_blobs(&smoothed);
    debug!(roi = region.roi().id(), traced = traced.len(), "blob contours traced");

    let origin = region.roi().origin();
    let mut accepted_shapes = Vec::new();
    let mut blobs = Vec::new();
    for shape in traced {
        let Some(accepted) = filter.accept(shape, region.width(), region.height()) else {
            continue;
        };
        let bounds = accepted.shape.bounds;
        let orientation = (accepted.shape.points.len() >= MIN_ORIENTATION_POINTS)
            .then(|| orientation(&accepted.shape.points));
        blobs.push(BlobMeasurement {
            area: accepted.shape.area,
            perimeter: accepted.shape.perimeter,
            circularity: accepted.circularity,
            aspect_ratio: accepted.aspect_ratio,
            solidity: accepted.solidity,
            centroid: region.to_image(accepted.shape.centroid.0, accepted.shape.centroid.1),
            position: (bounds.x + origin.x, bounds.y + origin.y, bounds.width, bounds.height),
            orientation,
            fit: accepted.fit,
        });
        accepted_shapes.push(accepted.shape);
    }

    Ok((BlobReport::collect(blobs, region.area()), accepted_shapes))
}

pub(crate) fn evaluate(
    region: &RegionView,
    params: &ParameterStore,
    judgment: &JudgmentCriteria,
) -> Result<Outcome, InspectError> {
    let (report, shapes) = detect(region, params)?;
    let (verdict, detail) = judgment.judge(&report.areas());

    let overlay = shapes
        .into_iter()
        .zip(report.blobs.iter())
        .map(|(shape, blob)| BlobOverlay {
            centroid: shape.centroid,
            contour: shape.points,
            fit: blob.fit.clone(),
        })
        .collect();

    Ok(Outcome {
        verdict,
        metric: Metric::Blobs(report),
        detail,
        overlay: Overlay::Blobs(overlay),
    })
}
