//! The inspection cycle: every enabled feature on every ROI, in order, against
//! one frame, with an overall OK/NG.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::geometry::RoiId;
use crate::inspect::{InspectError, InspectionResult, Operator, Verdict};
use crate::log_sink::{LogRecord, LogSink};
use crate::setup::InspectionSetup;
use crate::source::{AcquisitionError, ImageSource};

pub mod features;
pub mod state;

pub use features::{CycleFeatures, Feature};
pub use state::{CycleState, RunState};

/// Latest result per ROI and operator.
pub type CycleResults = BTreeMap<RoiId, BTreeMap<Operator, InspectionResult>>;

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("a cycle is already running")]
    AlreadyRunning,
    #[error("no ROIs defined")]
    NoRois,
    #[error("{feature} is misconfigured: {source}")]
    Validation {
        feature: Feature,
        #[source]
        source: InspectError,
    },
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error("{operator} failed on ROI {roi}: {source}")]
    Operator {
        roi: RoiId,
        operator: Operator,
        #[source]
        source: InspectError,
    },
}

/// Receives state changes, progress and results while a cycle runs.
pub trait CycleObserver {
    fn on_state(&mut self, _state: CycleState) {}
    fn on_progress(&mut self, _percent: f64) {}
    fn on_result(&mut self, _result: &InspectionResult) {}
}

impl CycleObserver for () {}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Completed or Failed; the state machine is back at Idle by the time
    /// the report is returned.
    pub state: CycleState,
    pub overall: Verdict,
    pub invocations: usize,
    /// Enabled features that have no operator behind them.
    pub skipped: Vec<Feature>,
}

#[derive(Debug, Default)]
pub struct CycleOrchestrator {
    state: Arc<RunState>,
    results: CycleResults,
    progress: f64,
}

impl CycleOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares the state with trigger handles and edit gates.
    pub fn run_state(&self) -> Arc<RunState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> CycleState {
        self.state.current()
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn results(&self) -> &CycleResults {
        &self.results
    }

    /// NG if any recorded result is NG; `None` before the first result.
    pub fn overall(&self) -> Option<Verdict> {
        let mut results = self.results.values().flat_map(BTreeMap::values).peekable();
        results.peek()?;
        Some(if results.all(|result| result.verdict.is_ok()) {
            Verdict::Ok
        } else {
            Verdict::Ng
        })
    }

    /// Validates every enabled operator's parameters.
    pub fn preflight(setup: &InspectionSetup) -> Result<(), CycleError> {
        let inspector = setup.inspector();
        for feature in setup.features.enabled() {
            if let Some(operator) = feature.operator() {
                inspector
                    .validate(operator)
                    .map_err(|source| CycleError::Validation { feature, source })?;
            }
        }
        Ok(())
    }

    /// Runs one cycle.
    ///
    /// Rejections (already running, no ROIs, failed pre-flight) leave the state
    /// untouched. Once Running, the cycle always ends in Completed or Failed and
    /// then returns to Idle, even when it errors out.
    pub fn run(
        &mut self,
        setup: &InspectionSetup,
        source: &mut dyn ImageSource,
        log: &mut dyn LogSink,
        observer: &mut dyn CycleObserver,
    ) -> Result<CycleReport, CycleError> {
        if !self.state.is_idle() {
            warn!("cycle rejected: already running");
            return Err(CycleError::AlreadyRunning);
        }
        if setup.rois.is_empty() {
            warn!("cycle rejected: no ROIs defined");
            return Err(CycleError::NoRois);
        }
        if let Err(err) = Self::preflight(setup) {
            warn!(%err, "cycle rejected");
            return Err(err);
        }
        if !self.state.try_begin() {
            warn!("cycle rejected: already running");
            return Err(CycleError::AlreadyRunning);
        }

        info!(rois = setup.rois.len(), features = setup.features.enabled().len(), "cycle started");
        self.results.clear();
        self.progress = 0.0;
        observer.on_state(CycleState::Running);

        let outcome = self.execute(setup, source, log, observer);
        let finished = match &outcome {
            Ok(report) if report.overall.is_ok() => CycleState::Completed,
            _ => CycleState::Failed,
        };
        self.state.store(finished);
        observer.on_state(finished);
        self.state.store(CycleState::Idle);
        observer.on_state(CycleState::Idle);

        match outcome {
            Ok(mut report) => {
                report.state = finished;
                info!(overall = %report.overall, invocations = report.invocations, "cycle finished");
                Ok(report)
            }
            Err(err) => {
                warn!(%err, "cycle failed");
                Err(err)
            }
        }
    }

    fn execute(
        &mut self,
        setup: &InspectionSetup,
        source: &mut dyn ImageSource,
        log: &mut dyn LogSink,
        observer: &mut dyn CycleObserver,
    ) -> Result<CycleReport, CycleError> {
        let frame = source.grab()?;
        let features = setup.features.enabled();
        let inspector = setup.inspector();
        let total = setup.rois.len() * features.len();

        let mut completed = 0usize;
        let mut invocations = 0usize;
        let mut skipped: Vec<Feature> = Vec::new();

        for roi in setup.rois.iter() {
            for &feature in &features {
                match feature.operator() {
                    Some(operator) => {
                        let evaluation = inspector.evaluate(operator, &frame, roi).map_err(|err| CycleError::Operator {
                            roi: roi.id(),
                            operator,
                            source: err,
                        })?;
                        let result = evaluation.result;
                        if let Err(err) = log.append(&LogRecord::now(&result)) {
                            warn!(%err, "inspection log write failed");
                        }
                        observer.on_result(&result);
                        self.results.entry(roi.id()).or_default().insert(operator, result);
                        invocations += 1;
                    }
                    None if !skipped.contains(&feature) => {
                        warn!(%feature, "feature is not implemented; skipped this cycle");
                        skipped.push(feature);
                    }
                    None => {}
                }

                completed += 1;
                self.progress = if completed == total {
                    100.0
                } else {
                    completed as f64 * 100.0 / total as f64
                };
                observer.on_progress(self.progress);
            }
        }

        if total == 0 {
            self.progress = 100.0;
            observer.on_progress(self.progress);
        }

        Ok(CycleReport {
            state: CycleState::Running,
            overall: self.overall().unwrap_or(Verdict::Ok),
            invocations,
            skipped,
        })
    }
}
