//! Named, typed inspection parameters with change notification.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Number(_) => "number",
            ParamValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Number(value) => write!(f, "{value}"),
            ParamValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Number(value as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("unknown parameter `{0}`")]
    Unknown(String),
    #[error("parameter `{name}` expects a {expected} value, got {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

type Listener = Arc<dyn Fn(&str, &ParamValue) + Send + Sync>;

const DEFAULTS: &[(&str, Seed)] = &[
    ("density_threshold_min", Seed::Num(90.0)),
    ("density_threshold_max", Seed::Num(110.0)),
    ("contrast_threshold_min", Seed::Num(10.0)),
    ("contrast_threshold_max", Seed::Num(30.0)),
    ("edge_threshold_min", Seed::Num(50.0)),
    ("edge_threshold_max", Seed::Num(150.0)),
    ("edge_canny_low", Seed::Num(50.0)),
    ("edge_canny_high", Seed::Num(150.0)),
    ("edge_sobel_kernel", Seed::Num(3.0)),
    ("edge_median_blur", Seed::Num(5.0)),
    ("template_threshold_min", Seed::Num(0.7)),
    ("template_threshold_max", Seed::Num(0.9)),
    ("contour_area_threshold_min", Seed::Num(400.0)),
    ("contour_area_threshold_max", Seed::Num(600.0)),
    ("contour_perimeter_min", Seed::Num(50.0)),
    ("contour_perimeter_max", Seed::Num(500.0)),
    ("contour_circularity_min", Seed::Num(0.5)),
    ("contour_circularity_max", Seed::Num(1.0)),
    ("contour_gaussian_blur", Seed::Num(5.0)),
    ("contour_morph_kernel", Seed::Num(3.0)),
    ("contour_hierarchy_mode", Seed::Text("External")),
    ("blob_threshold_manual", Seed::Flag(true)),
    ("blob_threshold_value", Seed::Num(128.0)),
    ("blob_area_min", Seed::Num(50.0)),
    ("blob_area_max", Seed::Num(200.0)),
    ("blob_width_min", Seed::Num(10.0)),
    ("blob_width_max", Seed::Num(100.0)),
    ("blob_height_min", Seed::Num(10.0)),
    ("blob_height_max", Seed::Num(100.0)),
    ("blob_circularity_min", Seed::Num(0.8)),
    ("blob_circularity_max", Seed::Num(1.0)),
    ("blob_aspect_ratio_min", Seed::Num(0.5)),
    ("blob_aspect_ratio_max", Seed::Num(2.0)),
    ("blob_solidity_min", Seed::Num(0.8)),
    ("blob_solidity_max", Seed::Num(1.0)),
    ("blob_bounding_shape", Seed::Text("None")),
    ("blob_color_mode", Seed::Text("Grayscale")),
    ("blob_rgb_r_min", Seed::Num(0.0)),
    ("blob_rgb_r_max", Seed::Num(255.0)),
    ("blob_rgb_g_min", Seed::Num(0.0)),
    ("blob_rgb_g_max", Seed::Num(255.0)),
    ("blob_rgb_b_min", Seed::Num(0.0)),
    ("blob_rgb_b_max", Seed::Num(255.0)),
    ("blob_hsv_h_min", Seed::Num(0.0)),
    ("blob_hsv_h_max", Seed::Num(180.0)),
    ("blob_hsv_s_min", Seed::Num(0.0)),
    ("blob_hsv_s_max", Seed::Num(255.0)),
    ("blob_hsv_v_min", Seed::Num(0.0)),
    ("blob_hsv_v_max", Seed::Num(255.0)),
    ("blob_bilateral_sigma", Seed::Num(10.0)),
    ("blob_count_min", Seed::Num(1.0)),
    ("blob_count_max", Seed::Num(6.0)),
    ("boundary_exclusion", Seed::Flag(true)),
    ("measurement_tolerance_min", Seed::Num(0.1)),
    ("measurement_tolerance_max", Seed::Num(0.3)),
    ("focus_threshold_min", Seed::Num(80.0)),
    ("focus_threshold_max", Seed::Num(120.0)),
    ("gpio_trigger_pin", Seed::Num(-1.0)),
    ("color_ratio_min", Seed::Num(0.0)),
    ("color_ratio_max", Seed::Num(100.0)),
    ("color_hue_min", Seed::Num(0.0)),
    ("color_hue_max", Seed::Num(180.0)),
    ("color_saturation_min", Seed::Num(0.0)),
    ("color_saturation_max", Seed::Num(255.0)),
    ("color_brightness_min", Seed::Num(0.0)),
    ("color_brightness_max", Seed::Num(255.0)),
];

enum Seed {
    Num(f64),
    Flag(bool),
    Text(&'static str),
}

impl Seed {
    fn value(&self) -> ParamValue {
        match self {
            Seed::Num(value) => ParamValue::Number(*value),
            Seed::Flag(value) => ParamValue::Bool(*value),
            Seed::Text(value) => ParamValue::Text((*value).to_owned()),
        }
    }
}

/// The full parameter table. Names are fixed; only values change.
#[derive(Clone)]
pub struct ParameterStore {
    values: BTreeMap<String, ParamValue>,
    listeners: Vec<Listener>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        let values = DEFAULTS
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.value()))
            .collect();
        Self {
            values,
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterStore")
            .field("values", &self.values)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl PartialEq for ParameterStore {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn values(&self) -> &BTreeMap<String, ParamValue> {
        &self.values
    }

    fn lookup(&self, name: &str) -> Result<&ParamValue, ParamError> {
        self.values
            .get(name)
            .ok_or_else(|| ParamError::Unknown(name.to_owned()))
    }

    fn mismatch(name: &str, expected: &'static str, found: &ParamValue) -> ParamError {
        ParamError::TypeMismatch {
            name: name.to_owned(),
            expected,
            found: found.kind(),
        }
    }

    pub fn number(&self, name: &str) -> Result<f64, ParamError> {
        match self.lookup(name)? {
            ParamValue::Number(value) => Ok(*value),
            other => Err(Self::mismatch(name, "number", other)),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool, ParamError> {
        match self.lookup(name)? {
            ParamValue::Bool(value) => Ok(*value),
            other => Err(Self::mismatch(name, "bool", other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, ParamError> {
        match self.lookup(name)? {
            ParamValue::Text(value) => Ok(value),
            other => Err(Self::mismatch(name, "text", other)),
        }
    }

    /// Updates a known parameter, keeping its type, and notifies listeners
    /// when the value actually changed.
    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<(), ParamError> {
        let value = value.into();
        let current = self.lookup(name)?;
        if std::mem::discriminant(current) != std::mem::discriminant(&value) {
            return Err(Self::mismatch(name, current.kind(), &value));
        }
        if *current == value {
            return Ok(());
        }
        debug!(name, %value, "parameter changed");
        self.values.insert(name.to_owned(), value.clone());
        for listener in &self.listeners {
            listener(name, &value);
        }
        Ok(())
    }

    /// `true` iff `min <= max`. Callers refuse to run an operation otherwise.
    pub fn validate_range(min: f64, max: f64) -> bool {
        min <= max
    }

    /// Named-pair form of [`ParameterStore::validate_range`]. A pair that is
    /// not fully present (or not numeric) does not apply and passes.
    pub fn check_pair(&self, min: &str, max: &str) -> bool {
        match self.range(min, max) {
            Ok((low, high)) => Self::validate_range(low, high),
            Err(_) => true,
        }
    }

    /// Reads a `(min, max)` pair of numbers.
    pub fn range(&self, min: &str, max: &str) -> Result<(f64, f64), ParamError> {
        Ok((self.number(min)?, self.number(max)?))
    }

    /// First pair, in order, whose min exceeds its max.
    pub fn first_inverted<'a>(
        &self,
        pairs: &[(&'a str, &'a str)],
    ) -> Result<Option<(&'a str, &'a str)>, ParamError> {
        for &(min, max) in pairs {
            let (low, high) = self.range(min, max)?;
            if !Self::validate_range(low, high) {
                return Ok(Some((min, max)));
            }
        }
        Ok(None)
    }

    /// Registers a callback invoked after every effective change.
    pub fn subscribe(&mut self, listener: impl Fn(&str, &ParamValue) + Send + Sync + 'static) {
        self.listeners.push(Arc::new(listener));
    }

    /// Takes every value of `other` while keeping this store's listeners,
    /// which hear about each value that differs.
    pub fn assign(&mut self, other: &ParameterStore) {
        for (name, value) in &other.values {
            if let Err(err) = self.set(name, value.clone()) {
                warn!(%err, "skipping parameter while assigning");
            }
        }
    }

    /// Applies persisted values, skipping unknown names and mistyped values.
    ///
    /// Returns the names that were skipped.
    pub fn apply_persisted(&mut self, persisted: &BTreeMap<String, serde_json::Value>) -> Vec<String> {
        let mut skipped = Vec::new();
        for (name, raw) in persisted {
            let outcome = serde_json::from_value::<ParamValue>(raw.clone())
                .map_err(|_| ParamError::TypeMismatch {
                    name: name.clone(),
                    expected: "bool, number or text",
                    found: "other",
                })
                .and_then(|value| self.set(name, value));
            if let Err(err) = outcome {
                warn!(%err, "skipping persisted parameter");
                skipped.push(name.clone());
            }
        }
        skipped
    }
}
