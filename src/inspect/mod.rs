//! Single-ROI inspection operators.
//!
//! Every operator samples the ROI's local patch through [`RegionView`], reads
//! its parameters from the [`ParameterStore`], and yields an OK/NG
//! [`InspectionResult`]. Range validation happens up front so a misconfigured
//! operator never produces a result.

use std::fmt;

use image::{GrayImage, RgbImage};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Roi, RoiId};
use crate::kornia::BridgeError;
use crate::params::{ParamError, ParameterStore};

pub mod blob;
pub mod color;
pub mod contour;
pub mod contrast;
pub mod density;
pub mod edge;
pub mod focus;
pub mod measurement;
pub mod preview;
pub mod region;

pub use blob::{BlobMeasurement, BlobOutputs, BlobReport, JudgmentCriteria, JudgmentMode};
pub use preview::Preview;
pub use region::RegionView;

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("select an ROI first")]
    NoRoiSelected,
    #[error("ROI {0} does not exist")]
    UnknownRoi(RoiId),
    #[error("{min} must not exceed {max}")]
    InvalidRange { min: String, max: String },
    #[error("`{name}` has unsupported value `{value}`")]
    InvalidChoice { name: String, value: String },
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// The implemented inspection operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operator {
    Density,
    Contrast,
    Edge,
    BlobDetection,
    ColorDetection,
    Measurement,
    FocusCheck,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Density,
        Operator::Contrast,
        Operator::Edge,
        Operator::BlobDetection,
        Operator::ColorDetection,
        Operator::Measurement,
        Operator::FocusCheck,
    ];

    /// Name written to the inspection log.
    pub fn label(self) -> &'static str {
        match self {
            Operator::Density => "Density Inspection",
            Operator::Contrast => "Contrast Inspection",
            Operator::Edge => "Edge Inspection",
            Operator::BlobDetection => "Blob Detection",
            Operator::ColorDetection => "Color Detection",
            Operator::Measurement => "Measurement",
            Operator::FocusCheck => "Focus Check",
        }
    }

    /// Parses a label or a short command-line name such as `blob` or `focus`.
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|op| {
            op.label().eq_ignore_ascii_case(&lowered)
                || op.label().to_ascii_lowercase().starts_with(&lowered)
        })
    }

    /// The min/max parameter pairs this operator consumes.
    pub fn range_pairs(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Operator::Density => &[("density_threshold_min", "density_threshold_max")],
            Operator::Contrast => &[("contrast_threshold_min", "contrast_threshold_max")],
            Operator::Edge => &[
                ("edge_threshold_min", "edge_threshold_max"),
                ("edge_canny_low", "edge_canny_high"),
            ],
            Operator::BlobDetection => blob::RANGE_PAIRS,
            Operator::ColorDetection => &[
                ("color_ratio_min", "color_ratio_max"),
                ("color_hue_min", "color_hue_max"),
                ("color_saturation_min", "color_saturation_max"),
                ("color_brightness_min", "color_brightness_max"),
            ],
            Operator::Measurement => &[("measurement_tolerance_min", "measurement_tolerance_max")],
            Operator::FocusCheck => &[("focus_threshold_min", "focus_threshold_max")],
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NG")]
    Ng,
}

impl Verdict {
    /// OK iff `min <= value <= max`.
    pub fn within(value: f64, min: f64, max: f64) -> Self {
        if min <= value && value <= max {
            Verdict::Ok
        } else {
            Verdict::Ng
        }
    }

    pub fn is_ok(self) -> bool {
        self == Verdict::Ok
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Ok => "OK",
            Verdict::Ng => "NG",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    Scalar(f64),
    Blobs(BlobReport),
}

impl Metric {
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Metric::Scalar(value) => Some(*value),
            Metric::Blobs(_) => None,
        }
    }

    pub fn blobs(&self) -> Option<&BlobReport> {
        match self {
            Metric::Blobs(report) => Some(report),
            Metric::Scalar(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectionResult {
    pub roi_id: RoiId,
    pub operator: Operator,
    pub verdict: Verdict,
    pub metric: Metric,
    pub detail: String,
}

/// Visual by-product of an operator, used for previews.
#[derive(Debug, Clone)]
pub(crate) enum Overlay {
    Plain,
    Pixels(GrayImage),
    Contours(Vec<Vec<Point<i32>>>),
    Blobs(Vec<blob::BlobOverlay>),
}

pub(crate) struct Outcome {
    pub verdict: Verdict,
    pub metric: Metric,
    pub detail: String,
    pub overlay: Overlay,
}

/// A result together with the patch it was computed on.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub result: InspectionResult,
    pub(crate) patch: RgbImage,
    pub(crate) selection: GrayImage,
    pub(crate) overlay: Overlay,
}

impl Evaluation {
    pub fn preview(&self) -> Preview {
        preview::render(self)
    }
}

/// Runs operators against the current parameters and judgment settings.
pub struct Inspector<'a> {
    params: &'a ParameterStore,
    judgment: &'a JudgmentCriteria,
}

impl<'a> Inspector<'a> {
    pub fn new(params: &'a ParameterStore, judgment: &'a JudgmentCriteria) -> Self {
        Self { params, judgment }
    }

    /// Checks every range and choice the operator depends on.
    pub fn validate(&self, operator: Operator) -> Result<(), InspectError> {
        if let Some((min, max)) = self.params.first_inverted(operator.range_pairs())? {
            return Err(InspectError::InvalidRange {
                min: min.to_owned(),
                max: max.to_owned(),
            });
        }
        match operator {
            Operator::Edge => edge::validate(self.params),
            Operator::BlobDetection => blob::validate(self.params, self.judgment),
            _ => Ok(()),
        }
    }

    /// Validates, then evaluates one operator on one ROI of `frame`.
    pub fn evaluate(&self, operator: Operator, frame: &RgbImage, roi: &Roi) -> Result<Evaluation, InspectError> {
        self.validate(operator)?;
        let region = RegionView::sample(frame, roi);
        let outcome = match operator {
            Operator::Density => density::evaluate(&region, self.params)?,
            Operator::Contrast => contrast::evaluate(&region, self.params)?,
            Operator::Edge => edge::evaluate(&region, self.params)?,
            Operator::BlobDetection => blob::evaluate(&region, self.params, self.judgment)?,
            Operator::ColorDetection => color::evaluate(&region, self.params)?,
            Operator::Measurement => measurement::evaluate(&region, self.params)?,
            Operator::FocusCheck => focus::evaluate(&region, self.params)?,
        };
        debug!(roi = roi.id(), %operator, verdict = %outcome.verdict, detail = %outcome.detail, "operator evaluated");

        Ok(Evaluation {
            result: InspectionResult {
                roi_id: roi.id(),
                operator,
                verdict: outcome.verdict,
                metric: outcome.metric,
                detail: outcome.detail,
            },
            patch: region.rgb().clone(),
            selection: region.selection().clone(),
            overlay: outcome.overlay,
        })
    }
}

/// Population mean and standard deviation; `None` for an empty sample.
pub(crate) fn mean_std(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut count = 0usize;
    let mut sum = 0f64;
    let mut sum_sq = 0f64;
    for value in values {
        count += 1;
        sum += value;
        sum_sq += value * value;
    }
    if count == 0 {
        return None;
    }
    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    Some((mean, variance.sqrt()))
}
