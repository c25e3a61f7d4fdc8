use crate::params::ParameterStore;

use super::{InspectError, Metric, Outcome, Overlay, RegionView, Verdict, mean_std};

/// Population standard deviation of the selected gray levels.
pub fn contrast(region: &RegionView) -> Result<f64, InspectError> {
    let gray = region.gray()?;
    Ok(mean_std(region.selected_values(&gray).map(f64::from)).map_or(0.0, |(_, std)| std))
}

pub(crate) fn evaluate(region: &RegionView, params: &ParameterStore) -> Result<Outcome, InspectError> {
    let (min, max) = params.range("contrast_threshold_min", "contrast_threshold_max")?;
    let value = contrast(region)?;
    Ok(Outcome {
        verdict: Verdict::within(value, min, max),
        metric: Metric::Scalar(value),
        detail: format!("Contrast: {value:.2} (Range: [{min}, {max}])"),
        overlay: Overlay::Plain,
    })
}
