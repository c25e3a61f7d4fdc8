use image::{GrayImage, Luma, Rgb};
use palette::{FromColor, Hsv, Srgb};

use crate::params::ParameterStore;

use super::{InspectError, Metric, Outcome, Overlay, RegionView, Verdict};

/// HSV on the 8-bit machine-vision scale: hue in [0, 180), saturation and
/// value in [0, 255].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv8 {
    pub hue: f64,
    pub saturation: f64,
    pub value: f64,
}

impl Hsv8 {
    pub fn from_rgb(pixel: Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        let hsv: Hsv = Hsv::from_color(Srgb::new(r, g, b).into_format::<f32>());
        let degrees = f64::from(hsv.hue.into_positive_degrees());
        Self {
            hue: (degrees / 2.0).round() % 180.0,
            saturation: (f64::from(hsv.saturation) * 255.0).round(),
            value: (f64::from(hsv.value) * 255.0).round(),
        }
    }
}

/// Inclusive HSV box, as used by color ratio and HSV blob segmentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HsvRange {
    pub hue: (f64, f64),
    pub saturation: (f64, f64),
    pub value: (f64, f64),
}

impl HsvRange {
    pub fn contains(&self, hsv: Hsv8) -> bool {
        let within = |v: f64, (lo, hi): (f64, f64)| lo <= v && v <= hi;
        within(hsv.hue, self.hue) && within(hsv.saturation, self.saturation) && within(hsv.value, self.value)
    }

    /// 255 where the patch pixel falls inside the box, else 0.
    pub fn mask(&self, region: &RegionView) -> GrayImage {
        let rgb = region.rgb();
        GrayImage::from_fn(rgb.width(), rgb.height(), |u, v| {
            let hit = self.contains(Hsv8::from_rgb(*rgb.get_pixel(u, v)));
            Luma([if hit { 255 } else { 0 }])
        })
    }
}

/// Color-detection box derived from a picked pixel: ±10 hue, ±50 saturation
/// and brightness, clamped to the scale.
pub fn range_around(picked: Hsv8) -> HsvRange {
    HsvRange {
        hue: ((picked.hue - 10.0).max(0.0), (picked.hue + 10.0).min(180.0)),
        saturation: ((picked.saturation - 50.0).max(0.0), (picked.saturation + 50.0).min(255.0)),
        value: ((picked.value - 50.0).max(0.0), (picked.value + 50.0).min(255.0)),
    }
}

fn configured_range(params: &ParameterStore) -> Result<HsvRange, InspectError> {
    Ok(HsvRange {
        hue: params.range("color_hue_min", "color_hue_max")?,
        saturation: params.range("color_saturation_min", "color_saturation_max")?,
        value: params.range("color_brightness_min", "color_brightness_max")?,
    })
}

pub(crate) fn evaluate(region: &RegionView, params: &ParameterStore) -> Result<Outcome, InspectError> {
    let (min, max) = params.range("color_ratio_min", "color_ratio_max")?;
    let mut matched = configured_range(params)?.mask(region);
    region.retain_selected(&mut matched);

    let hits = region.selected_values(&matched).filter(|&px| px > 0).count();
    let ratio = match region.selected_count() {
        0 => 0.0,
        total => hits as f64 / total as f64 * 100.0,
    };

    Ok(Outcome {
        verdict: Verdict::within(ratio, min, max),
        metric: Metric::Scalar(ratio),
        detail: format!("Color Ratio: {ratio:.2}% (Range: [{min}, {max}])"),
        overlay: Overlay::Pixels(matched),
    })
}
