//! The station ties a setup to its frame sources, log sink and trigger line,
//! gates edits by mode and cycle state, and drives the main loop.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use image::RgbImage;
use imageproc::point::Point;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{self, ConfigError};
use crate::cycle::{CycleError, CycleObserver, CycleOrchestrator, CycleReport, CycleResults, CycleState, RunState};
use crate::geometry::{GestureMode, RoiId, RoiSet};
use crate::inspect::color::{Hsv8, range_around};
use crate::inspect::{Evaluation, InspectError, InspectionResult, Operator, Preview};
use crate::log_sink::{LogRecord, LogSink};
use crate::overlay::render_overlay;
use crate::params::{ParamError, ParamValue};
use crate::setup::InspectionSetup;
use crate::source::{AcquisitionError, ImageSource, TestImageSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Geometry and mask edits allowed; triggers ignored.
    Setup,
    /// Edits rejected; hardware triggers start cycles.
    Run,
}

/// User-facing notification channel for rejected or failed actions.
pub trait Notifier: Send {
    fn notify(&self, message: &str);
}

/// Forwards notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        warn!(target: "notify", "{message}");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StationError {
    #[error("not available in run mode")]
    RunMode,
    #[error("not available while the cycle is {0}")]
    CycleActive(CycleState),
    #[error("no frame available")]
    NoFrame,
    #[error("point ({x}, {y}) is outside the frame")]
    OutsideFrame { x: i32, y: i32 },
    #[error("snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Inspect(#[from] InspectError),
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Cloneable, thread-safe entry point for cycle start requests.
///
/// A request is accepted only in run mode, while the cycle is Idle and no
/// other request is pending. Accepted requests are delivered to the station
/// loop, which runs the cycle on its own thread.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    state: Arc<RunState>,
    pending: Arc<AtomicBool>,
    run_mode: Arc<AtomicBool>,
    sender: mpsc::UnboundedSender<()>,
}

impl TriggerHandle {
    pub fn request_cycle_start(&self) -> bool {
        if !self.run_mode.load(Ordering::Acquire) {
            debug!("trigger ignored outside run mode");
            return false;
        }
        let state = self.state.current();
        if state != CycleState::Idle {
            warn!(%state, "trigger ignored: cycle not idle");
            return false;
        }
        if self.pending.swap(true, Ordering::AcqRel) {
            warn!("trigger ignored: a cycle start is already pending");
            return false;
        }
        if self.sender.send(()).is_err() {
            self.pending.store(false, Ordering::Release);
            warn!("trigger ignored: station loop has stopped");
            return false;
        }
        info!("cycle start requested");
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Frame source seen by the orchestrator: test image override, then the live
/// source, then the static image.
struct FrameSource<'a> {
    live: Option<&'a mut Box<dyn ImageSource + Send>>,
    fallback: Option<&'a RgbImage>,
    forced: Option<&'a RgbImage>,
}

impl ImageSource for FrameSource<'_> {
    fn grab(&mut self) -> Result<RgbImage, AcquisitionError> {
        if let Some(image) = self.forced {
            return Ok(image.clone());
        }
        match (&mut self.live, self.fallback) {
            (Some(live), _) => live.grab(),
            (None, Some(image)) => Ok(image.clone()),
            (None, None) => Err(AcquisitionError::Unavailable("no live source and no static image".to_owned())),
        }
    }
}

pub struct Station {
    setup: InspectionSetup,
    orchestrator: CycleOrchestrator,
    mode: Mode,
    run_mode: Arc<AtomicBool>,
    snap_to_grid: bool,
    live: Option<Box<dyn ImageSource + Send>>,
    static_image: Option<RgbImage>,
    test_images: TestImageSet,
    use_test_image: bool,
    log: Box<dyn LogSink + Send>,
    notifier: Box<dyn Notifier>,
    pending: Arc<AtomicBool>,
    sender: mpsc::UnboundedSender<()>,
    receiver: mpsc::UnboundedReceiver<()>,
    frame: Option<RgbImage>,
    hovered: Option<RoiId>,
    last_report: Option<CycleReport>,
}

impl Station {
    pub fn new(setup: InspectionSetup, log: Box<dyn LogSink + Send>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            setup,
            orchestrator: CycleOrchestrator::new(),
            mode: Mode::Setup,
            run_mode: Arc::new(AtomicBool::new(false)),
            snap_to_grid: false,
            live: None,
            static_image: None,
            test_images: TestImageSet::default(),
            use_test_image: false,
            log,
            notifier: Box::new(TracingNotifier),
            pending: Arc::new(AtomicBool::new(false)),
            sender,
            receiver,
            frame: None,
            hovered: None,
            last_report: None,
        }
    }

    pub fn with_live_source(mut self, source: Box<dyn ImageSource + Send>) -> Self {
        self.live = Some(source);
        self
    }

    pub fn with_static_image(mut self, image: RgbImage) -> Self {
        self.static_image = Some(image);
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn setup(&self) -> &InspectionSetup {
        &self.setup
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.run_mode.store(mode == Mode::Run, Ordering::Release);
        if mode == Mode::Run {
            self.hovered = None;
            self.setup.rois.end_gesture();
            self.setup.rois.end_mask_edit();
        }
        info!(?mode, "mode changed");
    }

    pub fn set_snap_to_grid(&mut self, snap: bool) {
        self.snap_to_grid = snap;
    }

    pub fn snap_to_grid(&self) -> bool {
        self.snap_to_grid
    }

    pub fn state(&self) -> CycleState {
        self.orchestrator.state()
    }

    pub fn progress(&self) -> f64 {
        self.orchestrator.progress()
    }

    pub fn results(&self) -> &CycleResults {
        self.orchestrator.results()
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    /// The configured trigger input line; `None` while `gpio_trigger_pin`
    /// is -1, in which case nothing should drive triggers.
    pub fn trigger_pin(&self) -> Option<u32> {
        let pin = self.setup.params.number("gpio_trigger_pin").ok()?;
        (pin >= 0.0).then_some(pin as u32)
    }

    pub fn trigger_handle(&self) -> TriggerHandle {
        TriggerHandle {
            state: self.orchestrator.run_state(),
            pending: Arc::clone(&self.pending),
            run_mode: Arc::clone(&self.run_mode),
            sender: self.sender.clone(),
        }
    }

    /// Same gate as [`TriggerHandle::request_cycle_start`].
    pub fn request_cycle_start(&self) -> bool {
        self.trigger_handle().request_cycle_start()
    }

    fn reject(&self, err: StationError) -> StationError {
        self.notifier.notify(&err.to_string());
        err
    }

    fn ensure_editable(&self) -> Result<(), StationError> {
        if self.mode == Mode::Run {
            return Err(self.reject(StationError::RunMode));
        }
        let state = self.state();
        if state != CycleState::Idle {
            return Err(self.reject(StationError::CycleActive(state)));
        }
        Ok(())
    }

    /// Runs a geometry edit, if edits are currently allowed.
    pub fn edit_rois<R>(&mut self, edit: impl FnOnce(&mut RoiSet, bool) -> R) -> Result<R, StationError> {
        self.ensure_editable()?;
        let snap = self.snap_to_grid;
        Ok(edit(&mut self.setup.rois, snap))
    }

    /// Mutable access to parameters, features and judgment settings, gated
    /// like geometry edits.
    pub fn edit_setup<R>(&mut self, edit: impl FnOnce(&mut InspectionSetup) -> R) -> Result<R, StationError> {
        self.ensure_editable()?;
        Ok(edit(&mut self.setup))
    }

    pub fn set_param(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<(), StationError> {
        self.ensure_editable()?;
        self.setup.params.set(name, value).map_err(|err| self.reject(err.into()))
    }

    /// Hover feedback: the ROI under the cursor and what a drag would do.
    pub fn hover(&mut self, point: Point<i32>) -> Option<(RoiId, GestureMode)> {
        if self.mode != Mode::Setup {
            self.hovered = None;
            return None;
        }
        let hit = self.setup.rois.hover(point);
        self.hovered = hit.map(|(id, _)| id);
        hit
    }

    fn frame_source(&mut self) -> FrameSource<'_> {
        let forced = if self.use_test_image { self.test_images.current() } else { None };
        FrameSource {
            live: self.live.as_mut(),
            fallback: self.static_image.as_ref(),
            forced,
        }
    }

    fn grab_frame(&mut self) -> Result<RgbImage, StationError> {
        let grabbed = self.frame_source().grab();
        grabbed.map_err(|err| self.reject(err.into()))
    }

    /// Grabs a fresh frame for display; failures are reported and the tick skipped.
    pub fn refresh_frame(&mut self) -> Option<&RgbImage> {
        match self.grab_frame() {
            Ok(frame) => {
                self.frame = Some(frame);
                self.frame.as_ref()
            }
            Err(_) => None,
        }
    }

    /// The last frame with ROIs drawn over it.
    pub fn render_overlay(&self) -> Option<RgbImage> {
        self.frame
            .as_ref()
            .map(|frame| render_overlay(frame, &self.setup.rois, self.hovered))
    }

    fn selected_roi(&self) -> Result<RoiId, StationError> {
        self.setup
            .rois
            .selected()
            .ok_or_else(|| self.reject(InspectError::NoRoiSelected.into()))
    }

    fn evaluate_selected(&mut self, operator: Operator) -> Result<Evaluation, StationError> {
        let id = self.selected_roi()?;
        let frame = self.grab_frame()?;
        let roi = self
            .setup
            .rois
            .get(id)
            .ok_or_else(|| self.reject(InspectError::UnknownRoi(id).into()))?;
        self.setup
            .inspector()
            .evaluate(operator, &frame, roi)
            .map_err(|err| self.reject(err.into()))
    }

    /// Runs one operator on the selected ROI and logs the result.
    pub fn run_operator(&mut self, operator: Operator) -> Result<InspectionResult, StationError> {
        let result = self.evaluate_selected(operator)?.result;
        if let Err(err) = self.log.append(&LogRecord::now(&result)) {
            self.notifier.notify(&err.to_string());
        }
        info!(roi = result.roi_id, %operator, verdict = %result.verdict, "{}", result.detail);
        Ok(result)
    }

    /// Same computation as [`Station::run_operator`], rendered as an
    /// annotated patch. Nothing is logged.
    pub fn preview_operator(&mut self, operator: Operator) -> Result<Preview, StationError> {
        Ok(self.evaluate_selected(operator)?.preview())
    }

    pub fn run_cycle(&mut self) -> Result<CycleReport, StationError> {
        self.run_cycle_with(&mut ())
    }

    pub fn run_cycle_with(&mut self, observer: &mut dyn CycleObserver) -> Result<CycleReport, StationError> {
        let forced = if self.use_test_image { self.test_images.current() } else { None };
        let mut source = FrameSource {
            live: self.live.as_mut(),
            fallback: self.static_image.as_ref(),
            forced,
        };
        let outcome = self
            .orchestrator
            .run(&self.setup, &mut source, &mut *self.log, observer);
        match outcome {
            Ok(report) => {
                self.last_report = Some(report.clone());
                Ok(report)
            }
            Err(err) => Err(self.reject(err.into())),
        }
    }

    /// Sets the color-detection ranges around the frame pixel under `point`.
    pub fn pick_color(&mut self, point: Point<i32>) -> Result<Hsv8, StationError> {
        self.ensure_editable()?;
        let frame = self.grab_frame()?;
        let pixel = (point.x >= 0 && point.y >= 0)
            .then(|| frame.get_pixel_checked(point.x as u32, point.y as u32))
            .flatten()
            .ok_or_else(|| self.reject(StationError::OutsideFrame { x: point.x, y: point.y }))?;
        let picked = Hsv8::from_rgb(*pixel);
        let range = range_around(picked);
        let updates = [
            ("color_hue_min", range.hue.0),
            ("color_hue_max", range.hue.1),
            ("color_saturation_min", range.saturation.0),
            ("color_saturation_max", range.saturation.1),
            ("color_brightness_min", range.value.0),
            ("color_brightness_max", range.value.1),
        ];
        for (name, value) in updates {
            self.setup.params.set(name, value)?;
        }
        info!(h = picked.hue, s = picked.saturation, v = picked.value, "color picked");
        Ok(picked)
    }

    pub fn load_test_images<P: AsRef<Path>>(&mut self, paths: &[P]) -> usize {
        self.set_test_images(TestImageSet::load(paths))
    }

    pub fn set_test_images(&mut self, images: TestImageSet) -> usize {
        self.test_images = images;
        self.use_test_image = !self.test_images.is_empty();
        self.test_images.len()
    }

    /// Steps to the next test image and makes it the active frame source.
    pub fn next_test_image(&mut self) -> Option<usize> {
        if self.test_images.advance().is_none() {
            self.notifier.notify("no test images loaded");
            return None;
        }
        self.use_test_image = true;
        Some(self.test_images.index())
    }

    /// Leaves test images and goes back to the live or static source.
    pub fn use_live_frames(&mut self) {
        self.use_test_image = false;
    }

    /// One cycle per test image, in order; the previous frame source is
    /// restored afterwards. Setup mode only.
    pub fn run_test_cycle(&mut self) -> Result<Vec<Result<CycleReport, StationError>>, StationError> {
        if self.mode == Mode::Run {
            return Err(self.reject(StationError::RunMode));
        }
        if self.test_images.is_empty() {
            self.notifier.notify("no test images loaded");
            return Ok(Vec::new());
        }
        let previous = (self.use_test_image, self.test_images.index());
        self.use_test_image = true;
        let mut reports = Vec::with_capacity(self.test_images.len());
        for index in 0..self.test_images.len() {
            while self.test_images.index() != index {
                self.test_images.advance();
            }
            reports.push(self.run_cycle());
        }
        while self.test_images.index() != previous.1 {
            self.test_images.advance();
        }
        self.use_test_image = previous.0;
        Ok(reports)
    }

    /// Writes the current frame as `snapshot_<timestamp>.png` under `dir`.
    pub fn save_snapshot(&mut self, dir: impl AsRef<Path>) -> Result<PathBuf, StationError> {
        let frame = match self.frame.clone() {
            Some(frame) => frame,
            None => self.grab_frame()?,
        };
        let path = dir
            .as_ref()
            .join(format!("snapshot_{}.png", Local::now().format("%Y%m%d_%H%M%S")));
        frame
            .save(&path)
            .map_err(|source| self.reject(StationError::Snapshot { path: path.clone(), source }))?;
        info!(path = %path.display(), "snapshot saved");
        Ok(path)
    }

    pub fn save_config(&self, path: impl AsRef<Path>) -> Result<(), StationError> {
        config::save_cycle_config(&self.setup, path).map_err(|err| self.reject(err.into()))
    }

    /// Replaces the whole setup; on failure the current one stays in place.
    ///
    /// Parameter listeners carry over and are told about every value the
    /// loaded configuration changes.
    pub fn load_config(&mut self, path: impl AsRef<Path>) -> Result<(), StationError> {
        self.ensure_editable()?;
        let mut setup = config::load_cycle_config(path).map_err(|err| self.reject(err.into()))?;
        let mut params = self.setup.params.clone();
        params.assign(&setup.params);
        setup.params = params;
        self.setup = setup;
        self.hovered = None;
        Ok(())
    }

    pub fn save_settings(&self, path: impl AsRef<Path>) -> Result<(), StationError> {
        config::save_settings(&self.setup.params, path).map_err(|err| self.reject(err.into()))
    }

    pub fn load_settings(&mut self, path: impl AsRef<Path>) -> Result<Vec<String>, StationError> {
        self.ensure_editable()?;
        let mut params = self.setup.params.clone();
        let skipped = config::load_settings(&mut params, path).map_err(|err| self.reject(err.into()))?;
        self.setup.params = params;
        Ok(skipped)
    }

    /// Runs the cycle for a delivered trigger request.
    fn handle_trigger(&mut self) -> Option<CycleReport> {
        self.pending.store(false, Ordering::Release);
        if self.mode != Mode::Run {
            debug!("dropping trigger delivered after leaving run mode");
            return None;
        }
        self.run_cycle().ok()
    }

    /// Delivers every queued trigger request without waiting.
    pub fn drain_triggers(&mut self) -> Vec<CycleReport> {
        let mut reports = Vec::new();
        while self.receiver.try_recv().is_ok() {
            reports.extend(self.handle_trigger());
        }
        reports
    }

    /// Main loop: refreshes the frame every `period` and runs triggered
    /// cycles until `shutdown` resolves.
    pub async fn run(&mut self, period: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(period);
        tokio::pin!(shutdown);
        info!(period_ms = period.as_millis() as u64, "station loop started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(()) = self.receiver.recv() => {
                    if let Some(report) = self.handle_trigger() {
                        info!(overall = %report.overall, "triggered cycle finished");
                    }
                }
                _ = ticker.tick() => {
                    self.refresh_frame();
                }
            }
        }
        info!("station loop stopped");
    }
}
