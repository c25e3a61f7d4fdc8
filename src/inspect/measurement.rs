use imageproc::edges::canny;
use imageproc::geometry::contour_area;
use imageproc::point::Point;

use crate::params::ParameterStore;

use super::contour::external_contours;
use super::{InspectError, Metric, Outcome, Overlay, RegionView, Verdict};

const CANNY_LOW: f32 = 100.0;
const CANNY_HIGH: f32 = 200.0;

/// Largest external contour of the selected part of the patch's edge map,
/// with its polygon area.
pub fn largest_contour(region: &RegionView) -> Result<Option<(Vec<Point<i32>>, f64)>, InspectError> {
    let mut edges = canny(&region.gray()?, CANNY_LOW, CANNY_HIGH);
    region.retain_selected(&mut edges);
    let largest = external_contours(&edges)
        .into_iter()
        .map(|contour| {
            let area = contour_area(&contour.points).abs();
            (contour.points, area)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1));
    Ok(largest)
}

pub(crate) fn evaluate(region: &RegionView, params: &ParameterStore) -> Result<Outcome, InspectError> {
    let (tol_min, tol_max) = params.range("measurement_tolerance_min", "measurement_tolerance_max")?;

    let Some((points, area)) = largest_contour(region)? else {
        return Ok(Outcome {
            verdict: Verdict::Ng,
            metric: Metric::Scalar(0.0),
            detail: "No contours found".to_owned(),
            overlay: Overlay::Plain,
        });
    };

    let min = tol_min * region.area();
    let max = tol_max * region.area();
    Ok(Outcome {
        verdict: Verdict::within(area, min, max),
        metric: Metric::Scalar(area),
        detail: format!("Area: {area:.2} px² (Range: [{min:.2}, {max:.2}])"),
        overlay: Overlay::Contours(vec![points]),
    })
}
