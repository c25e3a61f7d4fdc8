use crate::params::ParameterStore;

use super::{InspectError, Metric, Outcome, Overlay, RegionView, Verdict, mean_std};

/// Mean gray level over the selected pixels, 0 when nothing is selected.
pub fn mean_density(region: &RegionView) -> Result<f64, InspectError> {
    let gray = region.gray()?;
    Ok(mean_std(region.selected_values(&gray).map(f64::from)).map_or(0.0, |(mean, _)| mean))
}

pub(crate) fn evaluate(region: &RegionView, params: &ParameterStore) -> Result<Outcome, InspectError> {
    let (min, max) = params.range("density_threshold_min", "density_threshold_max")?;
    let mean = mean_density(region)?;
    Ok(Outcome {
        verdict: Verdict::within(mean, min, max),
        metric: Metric::Scalar(mean),
        detail: format!("Mean Density: {mean:.2} (Range: [{min}, {max}])"),
        overlay: Overlay::Plain,
    })
}
