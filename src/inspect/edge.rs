use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::median_filter;

use crate::params::ParameterStore;

use super::{InspectError, Metric, Outcome, Overlay, RegionView, Verdict};

const MEDIAN_KERNEL: &str = "edge_median_blur";

/// The median kernel must be a positive odd size.
pub(crate) fn validate(params: &ParameterStore) -> Result<(), InspectError> {
    let kernel = params.number(MEDIAN_KERNEL)?;
    if kernel < 1.0 || kernel.fract() != 0.0 || kernel as i64 % 2 == 0 {
        return Err(InspectError::InvalidChoice {
            name: MEDIAN_KERNEL.to_owned(),
            value: kernel.to_string(),
        });
    }
    Ok(())
}

/// Median-smoothed Canny edges of the patch, kept only where selected.
pub fn edge_map(region: &RegionView, kernel: u32, low: f32, high: f32) -> Result<GrayImage, InspectError> {
    let gray = region.gray()?;
    let radius = kernel / 2;
    let smoothed = if radius > 0 { median_filter(&gray, radius, radius) } else { gray };
    let mut edges = canny(&smoothed, low, high);
    region.retain_selected(&mut edges);
    Ok(edges)
}

pub(crate) fn evaluate(region: &RegionView, params: &ParameterStore) -> Result<Outcome, InspectError> {
    let (min, max) = params.range("edge_threshold_min", "edge_threshold_max")?;
    let (low, high) = params.range("edge_canny_low", "edge_canny_high")?;
    let kernel = params.number(MEDIAN_KERNEL)? as u32;

    let edges = edge_map(region, kernel, low as f32, high as f32)?;
    let count = region.selected_values(&edges).filter(|&px| px > 0).count() as f64;

    Ok(Outcome {
        verdict: Verdict::within(count, min, max),
        metric: Metric::Scalar(count),
        detail: format!("Edge Sum: {count:.2} (Range: [{min}, {max}])"),
        overlay: Overlay::Pixels(edges),
    })
}
