//! JSON persistence for the cycle configuration and the parameter settings.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cycle::CycleFeatures;
use crate::geometry::{MIN_ROI_SIDE, Roi, RoiId, RoiMask, RoiSet, RoiShape};
use crate::inspect::{BlobOutputs, JudgmentCriteria};
use crate::params::ParameterStore;
use crate::setup::InspectionSetup;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("ROI {id}: {reason}")]
    MalformedRoi { id: RoiId, reason: String },
    #[error("ROI id {0} appears more than once")]
    DuplicateRoi(RoiId),
}

/// Named ROI record as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiRecord {
    pub id: RoiId,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub shape: RoiShape,
    /// `height` rows of `width` values; empty means an all-zero mask.
    #[serde(default)]
    pub mask: Vec<Vec<u8>>,
}

/// Positional form `[x, y, w, h, id, angle, shape, mask]` found in older files.
#[derive(Debug, Clone, Deserialize)]
struct LegacyRoi(i32, i32, u32, u32, RoiId, f64, RoiShape, Vec<Vec<u8>>);

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StoredRoi {
    Legacy(LegacyRoi),
    Record(RoiRecord),
}

impl From<StoredRoi> for RoiRecord {
    fn from(stored: StoredRoi) -> Self {
        match stored {
            StoredRoi::Record(record) => record,
            StoredRoi::Legacy(LegacyRoi(x, y, width, height, id, angle, shape, mask)) => RoiRecord {
                id,
                x,
                y,
                width,
                height,
                angle,
                shape,
                mask,
            },
        }
    }
}

fn deserialize_rois<'de, D>(deserializer: D) -> Result<Vec<RoiRecord>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let stored = Vec::<StoredRoi>::deserialize(deserializer)?;
    Ok(stored.into_iter().map(RoiRecord::from).collect())
}

impl RoiRecord {
    pub fn from_roi(roi: &Roi) -> Self {
        Self {
            id: roi.id(),
            x: roi.origin().x,
            y: roi.origin().y,
            width: roi.width(),
            height: roi.height(),
            angle: roi.angle(),
            shape: roi.shape(),
            mask: roi.mask().to_rows(),
        }
    }

    pub fn into_roi(self) -> Result<Roi, ConfigError> {
        let malformed = |reason: String| ConfigError::MalformedRoi { id: self.id, reason };
        if self.width <= MIN_ROI_SIDE || self.height <= MIN_ROI_SIDE {
            return Err(malformed(format!(
                "size {}x{} is at or below the {MIN_ROI_SIDE} px minimum",
                self.width, self.height
            )));
        }
        let mask = RoiMask::from_rows(&self.mask, self.width, self.height).ok_or_else(|| {
            malformed(format!("mask does not have {} rows of {} values", self.height, self.width))
        })?;
        Roi::restore(
            self.id,
            Point::new(self.x, self.y),
            self.width,
            self.height,
            self.angle,
            self.shape,
            mask,
        )
        .ok_or_else(|| malformed("angle is not a finite number".to_owned()))
    }
}

/// On-disk cycle configuration. Every key is optional when loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub params: BTreeMap<String, serde_json::Value>,
    pub cycle_features: CycleFeatures,
    #[serde(deserialize_with = "deserialize_rois")]
    pub rois: Vec<RoiRecord>,
    pub blob_outputs: BlobOutputs,
    pub judgment_criteria: JudgmentCriteria,
}

impl CycleConfig {
    pub fn capture(setup: &InspectionSetup) -> Self {
        let params = setup
            .params
            .iter()
            .filter_map(|(name, value)| Some((name.to_owned(), serde_json::to_value(value).ok()?)))
            .collect();
        Self {
            params,
            cycle_features: setup.features.clone(),
            rois: setup.rois.iter().map(RoiRecord::from_roi).collect(),
            blob_outputs: setup.blob_outputs.clone(),
            judgment_criteria: setup.judgment.clone(),
        }
    }

    /// Builds a fresh setup: defaults, then whatever the file provides.
    pub fn into_setup(self) -> Result<InspectionSetup, ConfigError> {
        let mut rois = Vec::with_capacity(self.rois.len());
        for record in self.rois {
            if rois.iter().any(|roi: &Roi| roi.id() == record.id) {
                return Err(ConfigError::DuplicateRoi(record.id));
            }
            rois.push(record.into_roi()?);
        }

        let mut params = ParameterStore::default();
        let skipped = params.apply_persisted(&self.params);
        if !skipped.is_empty() {
            warn!(?skipped, "ignored parameters while loading configuration");
        }

        Ok(InspectionSetup {
            rois: RoiSet::from_rois(rois),
            params,
            features: self.cycle_features,
            blob_outputs: self.blob_outputs,
            judgment: self.judgment_criteria,
        })
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_cycle_config(setup: &InspectionSetup, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    write_json(path, &CycleConfig::capture(setup))?;
    info!(path = %path.display(), rois = setup.rois.len(), "cycle configuration saved");
    Ok(())
}

/// Reads a configuration into a new setup; the caller swaps it in on success.
pub fn load_cycle_config(path: impl AsRef<Path>) -> Result<InspectionSetup, ConfigError> {
    let path = path.as_ref();
    let setup = read_json::<CycleConfig>(path)?.into_setup()?;
    info!(path = %path.display(), rois = setup.rois.len(), "cycle configuration loaded");
    Ok(setup)
}

pub fn save_settings(params: &ParameterStore, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    write_json(path, params.values())?;
    info!(path = %path.display(), "settings saved");
    Ok(())
}

/// Applies a settings file on top of `params`. On error `params` is untouched.
pub fn load_settings(params: &mut ParameterStore, path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    let persisted: BTreeMap<String, serde_json::Value> = read_json(path)?;
    let skipped = params.apply_persisted(&persisted);
    info!(path = %path.display(), skipped = skipped.len(), "settings loaded");
    Ok(skipped)
}
