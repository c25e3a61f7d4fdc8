use std::fmt;

use serde::{Deserialize, Serialize};

use crate::inspect::Operator;

/// Cycle features in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Density,
    Contrast,
    Edge,
    TemplateMatching,
    ContourAnalysis,
    BlobDetection,
    ColorDetection,
    Measurement,
    FocusCheck,
}

impl Feature {
    pub const ORDER: [Feature; 9] = [
        Feature::Density,
        Feature::Contrast,
        Feature::Edge,
        Feature::TemplateMatching,
        Feature::ContourAnalysis,
        Feature::BlobDetection,
        Feature::ColorDetection,
        Feature::Measurement,
        Feature::FocusCheck,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::Density => "Density",
            Feature::Contrast => "Contrast",
            Feature::Edge => "Edge",
            Feature::TemplateMatching => "Template Matching",
            Feature::ContourAnalysis => "Contour Analysis",
            Feature::BlobDetection => "Blob Detection",
            Feature::ColorDetection => "Color Detection",
            Feature::Measurement => "Measurement",
            Feature::FocusCheck => "Focus Check",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ORDER
            .into_iter()
            .find(|feature| feature.name().eq_ignore_ascii_case(name.trim()))
    }

    /// The operator behind the feature; `None` for placeholders.
    pub fn operator(self) -> Option<Operator> {
        match self {
            Feature::Density => Some(Operator::Density),
            Feature::Contrast => Some(Operator::Contrast),
            Feature::Edge => Some(Operator::Edge),
            Feature::TemplateMatching | Feature::ContourAnalysis => None,
            Feature::BlobDetection => Some(Operator::BlobDetection),
            Feature::ColorDetection => Some(Operator::ColorDetection),
            Feature::Measurement => Some(Operator::Measurement),
            Feature::FocusCheck => Some(Operator::FocusCheck),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-feature enable flags, persisted under the features' display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleFeatures {
    #[serde(rename = "Density")]
    pub density: bool,
    #[serde(rename = "Contrast")]
    pub contrast: bool,
    #[serde(rename = "Edge")]
    pub edge: bool,
    #[serde(rename = "Template Matching")]
    pub template_matching: bool,
    #[serde(rename = "Contour Analysis")]
    pub contour_analysis: bool,
    #[serde(rename = "Blob Detection")]
    pub blob_detection: bool,
    #[serde(rename = "Color Detection")]
    pub color_detection: bool,
    #[serde(rename = "Measurement")]
    pub measurement: bool,
    #[serde(rename = "Focus Check")]
    pub focus_check: bool,
}

impl Default for CycleFeatures {
    fn default() -> Self {
        Self {
            density: true,
            contrast: false,
            edge: true,
            template_matching: false,
            contour_analysis: false,
            blob_detection: true,
            color_detection: false,
            measurement: false,
            focus_check: false,
        }
    }
}

impl CycleFeatures {
    /// Everything off.
    pub fn none() -> Self {
        Self {
            density: false,
            contrast: false,
            edge: false,
            template_matching: false,
            contour_analysis: false,
            blob_detection: false,
            color_detection: false,
            measurement: false,
            focus_check: false,
        }
    }

    fn slot(&mut self, feature: Feature) -> &mut bool {
        match feature {
            Feature::Density => &mut self.density,
            Feature::Contrast => &mut self.contrast,
            Feature::Edge => &mut self.edge,
            Feature::TemplateMatching => &mut self.template_matching,
            Feature::ContourAnalysis => &mut self.contour_analysis,
            Feature::BlobDetection => &mut self.blob_detection,
            Feature::ColorDetection => &mut self.color_detection,
            Feature::Measurement => &mut self.measurement,
            Feature::FocusCheck => &mut self.focus_check,
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Density => self.density,
            Feature::Contrast => self.contrast,
            Feature::Edge => self.edge,
            Feature::TemplateMatching => self.template_matching,
            Feature::ContourAnalysis => self.contour_analysis,
            Feature::BlobDetection => self.blob_detection,
            Feature::ColorDetection => self.color_detection,
            Feature::Measurement => self.measurement,
            Feature::FocusCheck => self.focus_check,
        }
    }

    pub fn set(&mut self, feature: Feature, enabled: bool) {
        *self.slot(feature) = enabled;
    }

    pub fn with(mut self, feature: Feature, enabled: bool) -> Self {
        self.set(feature, enabled);
        self
    }

    /// Enabled features in execution order.
    pub fn enabled(&self) -> Vec<Feature> {
        Feature::ORDER
            .into_iter()
            .filter(|&feature| self.is_enabled(feature))
            .collect()
    }
}
