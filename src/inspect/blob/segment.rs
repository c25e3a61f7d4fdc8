use image::{GrayImage, Luma};

use crate::kornia::{otsu_threshold, threshold_binary};
use crate::params::ParameterStore;

use crate::inspect::color::{Hsv8, HsvRange};
use crate::inspect::{InspectError, RegionView};

/// How foreground pixels are told apart from background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Grayscale,
    Rgb,
    Hsv,
}

impl ColorMode {
    pub fn from_params(params: &ParameterStore) -> Result<Self, InspectError> {
        match params.text("blob_color_mode")? {
            "Grayscale" => Ok(ColorMode::Grayscale),
            "RGB" => Ok(ColorMode::Rgb),
            "HSV" => Ok(ColorMode::Hsv),
            other => Err(InspectError::InvalidChoice {
                name: "blob_color_mode".to_owned(),
                value: other.to_owned(),
            }),
        }
    }
}

fn channel_range(params: &ParameterStore, channel: &str) -> Result<(f64, f64), InspectError> {
    Ok(params.range(&format!("blob_rgb_{channel}_min"), &format!("blob_rgb_{channel}_max"))?)
}

/// Binary foreground of the patch, already restricted to the selection.
pub fn segment(region: &RegionView, params: &ParameterStore) -> Result<GrayImage, InspectError> {
    let mut binary = match ColorMode::from_params(params)? {
        ColorMode::Grayscale => {
            let gray = region.gray()?;
            let threshold = if params.flag("blob_threshold_manual")? {
                params.number("blob_threshold_value")?.clamp(0.0, 255.0) as u8
            } else {
                otsu_threshold(&region.selected_values(&gray).collect::<Vec<_>>())
            };
            threshold_binary(&gray, threshold)?
        }
        ColorMode::Rgb => {
            let ranges = [
                channel_range(params, "r")?,
                channel_range(params, "g")?,
                channel_range(params, "b")?,
            ];
            let rgb = region.rgb();
            GrayImage::from_fn(rgb.width(), rgb.height(), |u, v| {
                let px = rgb.get_pixel(u, v).0;
                let hit = px
                    .iter()
                    .zip(ranges.iter())
                    .all(|(&c, &(lo, hi))| lo <= c as f64 && c as f64 <= hi);
                Luma([if hit { 255 } else { 0 }])
            })
        }
        ColorMode::Hsv => {
            let range = HsvRange {
                hue: params.range("blob_hsv_h_min", "blob_hsv_h_max")?,
                saturation: params.range("blob_hsv_s_min", "blob_hsv_s_max")?,
                value: params.range("blob_hsv_v_min", "blob_hsv_v_max")?,
            };
            let rgb = region.rgb();
            GrayImage::from_fn(rgb.width(), rgb.height(), |u, v| {
                let hit = range.contains(Hsv8::from_rgb(*rgb.get_pixel(u, v)));
                Luma([if hit { 255 } else { 0 }])
            })
        }
    };
    region.retain_selected(&mut binary);
    Ok(binary)
}
