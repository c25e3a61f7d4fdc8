use imageproc::filter::filter_clamped;
use imageproc::kernel::Kernel;

use crate::params::ParameterStore;

use super::{InspectError, Metric, Outcome, Overlay, RegionView, Verdict, mean_std};

const LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// Variance of the Laplacian response over the selected pixels.
///
/// The filter sees the whole patch so the outline of a circle or mask is not
/// read as detail; only the reduction is restricted to the selection. Sharp
/// detail drives the variance up; a defocused or flat patch scores near 0.
pub fn laplacian_variance(region: &RegionView) -> Result<f64, InspectError> {
    let gray = region.gray()?;
    let response: Vec<f32> = filter_clamped(&gray, Kernel::new(&LAPLACIAN, 3, 3)).into_raw();
    let values = response
        .iter()
        .zip(region.selection().pixels())
        .filter(|(_, sel)| sel[0] > 0)
        .map(|(&value, _)| f64::from(value));
    Ok(mean_std(values).map_or(0.0, |(_, std)| std * std))
}

pub(crate) fn evaluate(region: &RegionView, params: &ParameterStore) -> Result<Outcome, InspectError> {
    let (min, max) = params.range("focus_threshold_min", "focus_threshold_max")?;
    let variance = laplacian_variance(region)?;
    Ok(Outcome {
        verdict: Verdict::within(variance, min, max),
        metric: Metric::Scalar(variance),
        detail: format!("Focus Variance: {variance:.2} (Range: [{min}, {max}])"),
        overlay: Overlay::Plain,
    })
}
