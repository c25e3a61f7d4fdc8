//! ROI-based machine-vision inspection: draw regions on a frame, run image
//! operators inside them, and judge every cycle OK or NG.

pub mod config;
pub mod cycle;
pub mod geometry;
pub mod inspect;
pub mod kornia;
pub mod log_sink;
pub mod overlay;
pub mod params;
pub mod setup;
pub mod source;
pub mod station;
pub mod synthetic;

pub use cycle::{CycleError, CycleFeatures, CycleOrchestrator, CycleReport, CycleState, Feature};
pub use geometry::{Roi, RoiId, RoiSet, RoiShape};
pub use inspect::{InspectError, InspectionResult, Inspector, Operator, Verdict};
pub use params::{ParamValue, ParameterStore};
pub use setup::InspectionSetup;
pub use station::{Mode, Station, TriggerHandle};
