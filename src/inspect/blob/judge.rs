use serde::{Deserialize, Serialize};

use crate::inspect::Verdict;

use super::BlobReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgmentMode {
    #[default]
    #[serde(rename = "At least one blob")]
    AtLeastOne,
    #[serde(rename = "Blob count limit")]
    CountRange,
}

/// OK/NG rules applied to the accepted blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgmentCriteria {
    pub blob_count_min: f64,
    pub blob_count_max: f64,
    pub blob_area_min: f64,
    pub blob_area_max: f64,
    pub criteria_type: JudgmentMode,
}

impl Default for JudgmentCriteria {
    fn default() -> Self {
        Self {
            blob_count_min: 1.0,
            blob_count_max: 6.0,
            blob_area_min: 50.0,
            blob_area_max: 200.0,
            criteria_type: JudgmentMode::AtLeastOne,
        }
    }
}

impl JudgmentCriteria {
    /// The count check for the active mode, then one area check per blob.
    /// Failures are joined with `"; "`; a clean pass reads `"Passed"`.
    pub fn judge(&self, areas: &[f64]) -> (Verdict, String) {
        let mut details = Vec::new();
        let count = areas.len();
        match self.criteria_type {
            JudgmentMode::AtLeastOne if count == 0 => details.push("No blobs detected".to_owned()),
            JudgmentMode::AtLeastOne => {}
            JudgmentMode::CountRange => {
                if Verdict::within(count as f64, self.blob_count_min, self.blob_count_max) == Verdict::Ng {
                    details.push(format!(
                        "Blob count {count} outside range [{}, {}]",
                        self.blob_count_min, self.blob_count_max
                    ));
                }
            }
        }
        for &area in areas {
            if Verdict::within(area, self.blob_area_min, self.blob_area_max) == Verdict::Ng {
                details.push(format!(
                    "Blob area {area:.1} outside range [{}, {}]",
                    self.blob_area_min, self.blob_area_max
                ));
            }
        }

        if details.is_empty() {
            (Verdict::Ok, "Passed".to_owned())
        } else {
            (Verdict::Ng, details.join("; "))
        }
    }
}

/// Which blob measurements are shown alongside a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobOutputs {
    pub count: bool,
    pub largest_area: bool,
    pub smallest_area: bool,
    pub center_of_gravity: bool,
    pub positions: bool,
    pub orientation: bool,
    pub total_area: bool,
    pub fill_percentage: bool,
}

impl Default for BlobOutputs {
    fn default() -> Self {
        Self {
            count: true,
            largest_area: false,
            smallest_area: false,
            center_of_gravity: false,
            positions: false,
            orientation: false,
            total_area: false,
            fill_percentage: false,
        }
    }
}

fn first_two<T>(items: &[T], fmt: impl Fn(&T) -> String) -> String {
    let shown: Vec<String> = items.iter().take(2).map(fmt).collect();
    let mut text = shown.join("; ");
    if items.len() > 2 {
        text.push_str("...");
    }
    text
}

impl BlobOutputs {
    /// One display line per enabled output.
    pub fn summarize(&self, report: &BlobReport) -> Vec<String> {
        let mut lines = Vec::new();
        if self.count {
            lines.push(format!("Count: {}", report.count));
        }
        if self.largest_area {
            lines.push(format!("Largest Area: {:.1} px²", report.largest_area));
        }
        if self.smallest_area {
            lines.push(format!("Smallest Area: {:.1} px²", report.smallest_area));
        }
        if self.center_of_gravity {
            let text = first_two(&report.blobs, |b| format!("({:.1}, {:.1})", b.centroid.0, b.centroid.1));
            lines.push(format!("Center Of Gravity: {text}"));
        }
        if self.positions {
            let text = first_two(&report.blobs, |b| {
                let (x, y, w, h) = b.position;
                format!("({x}, {y}, {w}, {h})")
            });
            lines.push(format!("Positions: {text}"));
        }
        if self.orientation {
            let angles: Vec<f64> = report.blobs.iter().filter_map(|b| b.orientation).collect();
            lines.push(format!("Orientation: {}", first_two(&angles, |a| format!("{a:.1}"))));
        }
        if self.total_area {
            lines.push(format!("Total Area: {:.1} px²", report.total_area));
        }
        if self.fill_percentage {
            lines.push(format!("Fill Percentage: {:.2}%", report.fill_percentage));
        }
        lines
    }
}
