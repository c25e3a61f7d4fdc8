use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::Rgb;
use imageproc::point::Point;
use roi_inspect::config::save_cycle_config;
use roi_inspect::cycle::CycleObserver;
use roi_inspect::geometry::GestureMode;
use roi_inspect::inspect::InspectError;
use roi_inspect::log_sink::{LogRecord, LogSink, LogSinkError, NullLogSink};
use roi_inspect::source::TestImageSet;
use roi_inspect::station::{Notifier, StationError};
use roi_inspect::synthetic;
use roi_inspect::{CycleState, InspectionSetup, Mode, Operator, RoiShape, Station, TriggerHandle, Verdict};

#[derive(Clone, Default)]
struct Collected(Arc<Mutex<Vec<String>>>);

impl Notifier for Collected {
    fn notify(&self, message: &str) {
        self.0.lock().expect("lock").push(message.to_owned());
    }
}

#[derive(Clone, Default)]
struct SharedLog(Arc<Mutex<Vec<LogRecord>>>);

impl LogSink for SharedLog {
    fn append(&mut self, record: &LogRecord) -> Result<(), LogSinkError> {
        self.0.lock().expect("lock").push(record.clone());
        Ok(())
    }
}

fn one_roi_station() -> Station {
    let mut setup = InspectionSetup::new();
    setup
        .rois
        .create_roi(Point::new(10, 10), Point::new(60, 60), RoiShape::Rectangle, false)
        .expect("roi");
    Station::new(setup, Box::new(NullLogSink)).with_static_image(synthetic::uniform(100, 100, Rgb([100, 100, 100])))
}

#[test]
fn run_mode_rejects_edits() {
    let notes = Collected::default();
    let mut station = one_roi_station().with_notifier(Box::new(notes.clone()));

    station.set_mode(Mode::Run);
    let err = station
        .edit_rois(|rois, snap| rois.create_roi(Point::new(0, 0), Point::new(50, 50), RoiShape::Circle, snap))
        .unwrap_err();
    assert!(matches!(err, StationError::RunMode));
    assert!(matches!(station.set_param("density_threshold_min", 10.0), Err(StationError::RunMode)));
    assert_eq!(station.setup().rois.len(), 1);
    assert_eq!(notes.0.lock().expect("lock").len(), 2);
    assert_eq!(station.hover(Point::new(20, 20)), None);

    station.set_mode(Mode::Setup);
    let created = station
        .edit_rois(|rois, snap| rois.create_roi(Point::new(0, 0), Point::new(50, 50), RoiShape::Circle, snap))
        .expect("edit allowed");
    assert_eq!(created, Some(1));
    station.set_param("density_threshold_min", 10.0).expect("param");
    assert_eq!(station.hover(Point::new(58, 58)), Some((0, GestureMode::Resize)));
}

#[test]
fn triggers_only_count_in_run_mode() {
    let mut station = one_roi_station();
    let trigger = station.trigger_handle();
    assert!(!trigger.request_cycle_start());
    assert!(station.drain_triggers().is_empty());

    station.set_mode(Mode::Run);
    assert!(trigger.request_cycle_start());
    assert!(trigger.is_pending());
    assert!(!station.request_cycle_start(), "second request while one is pending");

    let reports = station.drain_triggers();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].invocations, 3);
    assert!(!trigger.is_pending());
    assert_eq!(station.state(), CycleState::Idle);
    assert_eq!(station.progress(), 100.0);
    assert!(station.last_report().is_some());
}

#[test]
fn pending_trigger_dropped_after_leaving_run_mode() {
    let mut station = one_roi_station();
    station.set_mode(Mode::Run);
    assert!(station.request_cycle_start());
    station.set_mode(Mode::Setup);
    assert!(station.drain_triggers().is_empty());
    assert!(!station.trigger_handle().is_pending());
}

struct RetriggerDuringCycle {
    trigger: TriggerHandle,
    accepted: Vec<bool>,
    states: Vec<CycleState>,
}

impl CycleObserver for RetriggerDuringCycle {
    fn on_state(&mut self, state: CycleState) {
        self.states.push(state);
    }

    fn on_progress(&mut self, _percent: f64) {
        self.accepted.push(self.trigger.request_cycle_start());
    }
}

#[test]
fn trigger_during_cycle_is_ignored() {
    let mut station = one_roi_station();
    station.set_mode(Mode::Run);
    let mut observer = RetriggerDuringCycle {
        trigger: station.trigger_handle(),
        accepted: Vec::new(),
        states: Vec::new(),
    };

    station.run_cycle_with(&mut observer).expect("cycle");
    assert_eq!(observer.accepted, vec![false, false, false]);
    assert_eq!(observer.states.first(), Some(&CycleState::Running));
    assert_eq!(observer.states.last(), Some(&CycleState::Idle));
    assert!(station.drain_triggers().is_empty());
}

#[tokio::test]
async fn station_loop_runs_triggered_cycles() {
    let log = SharedLog::default();
    let mut setup = InspectionSetup::new();
    setup
        .rois
        .create_roi(Point::new(10, 10), Point::new(60, 60), RoiShape::Rectangle, false)
        .expect("roi");
    let mut station = Station::new(setup, Box::new(log.clone()))
        .with_static_image(synthetic::uniform(100, 100, Rgb([100, 100, 100])));
    station.set_mode(Mode::Run);

    let trigger = station.trigger_handle();
    assert!(trigger.request_cycle_start());

    station
        .run(Duration::from_millis(5), tokio::time::sleep(Duration::from_millis(100)))
        .await;

    assert!(!trigger.is_pending());
    assert_eq!(log.0.lock().expect("lock").len(), 3);
    let report = station.last_report().expect("triggered cycle ran");
    assert_eq!(report.overall, Verdict::Ng);
    assert!(station.render_overlay().is_some());
}

#[test]
fn single_operator_needs_a_selection() {
    let mut station = one_roi_station();
    let err = station.run_operator(Operator::Density).unwrap_err();
    assert!(matches!(err, StationError::Inspect(InspectError::NoRoiSelected)));

    station.edit_rois(|rois, _| rois.select(0)).expect("edit");
    let result = station.run_operator(Operator::Density).expect("density");
    assert_eq!(result.verdict, Verdict::Ok);

    let preview = station.preview_operator(Operator::Density).expect("preview");
    assert_eq!(preview.image.dimensions(), (50, 50));
    assert_eq!(preview.verdict, Verdict::Ok);
}

#[test]
fn picked_color_sets_detection_ranges() {
    let mut setup = InspectionSetup::new();
    setup
        .rois
        .create_roi(Point::new(0, 0), Point::new(40, 40), RoiShape::Rectangle, false)
        .expect("roi");
    let mut station =
        Station::new(setup, Box::new(NullLogSink)).with_static_image(synthetic::uniform(40, 40, Rgb([255, 0, 0])));

    let picked = station.pick_color(Point::new(5, 5)).expect("pick");
    assert_eq!((picked.hue, picked.saturation, picked.value), (0.0, 255.0, 255.0));
    let params = &station.setup().params;
    assert_eq!(params.range("color_hue_min", "color_hue_max"), Ok((0.0, 10.0)));
    assert_eq!(params.range("color_saturation_min", "color_saturation_max"), Ok((205.0, 255.0)));

    station.edit_rois(|rois, _| rois.select(0)).expect("edit");
    let result = station.run_operator(Operator::ColorDetection).expect("color");
    assert_eq!(result.metric.scalar(), Some(100.0));

    assert!(matches!(
        station.pick_color(Point::new(-1, 3)),
        Err(StationError::OutsideFrame { x: -1, y: 3 })
    ));
}

#[test]
fn test_images_drive_cycles() {
    let mut station = one_roi_station();
    let images = TestImageSet::new(vec![
        synthetic::uniform(100, 100, Rgb([100, 100, 100])),
        synthetic::uniform(100, 100, Rgb([10, 10, 10])),
    ]);
    assert_eq!(station.set_test_images(images), 2);

    let reports = station.run_test_cycle().expect("setup mode");
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(Result::is_ok));

    assert_eq!(station.next_test_image(), Some(1));
    let report = station.run_cycle().expect("cycle");
    assert_eq!(report.overall, Verdict::Ng);
}

#[test]
fn test_cycle_needs_setup_mode() {
    let notes = Collected::default();
    let mut station = one_roi_station().with_notifier(Box::new(notes.clone()));
    station.set_test_images(TestImageSet::new(vec![synthetic::uniform(100, 100, Rgb([100, 100, 100]))]));

    station.set_mode(Mode::Run);
    assert!(matches!(station.run_test_cycle(), Err(StationError::RunMode)));
    assert_eq!(notes.0.lock().expect("lock").len(), 1);
    assert!(station.last_report().is_none());

    station.set_mode(Mode::Setup);
    assert_eq!(station.run_test_cycle().expect("setup mode").len(), 1);
}

#[test]
fn config_load_keeps_parameter_listeners() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cycle.json");
    let mut saved = InspectionSetup::new();
    saved.params.set("focus_threshold_min", 42.0).expect("set");
    save_cycle_config(&saved, &path).expect("save");

    let heard = Arc::new(Mutex::new(Vec::new()));
    let mut station = one_roi_station();
    let sink = Arc::clone(&heard);
    station
        .edit_setup(|setup| {
            setup
                .params
                .subscribe(move |name, value| sink.lock().expect("lock").push(format!("{name}={value}")))
        })
        .expect("edit");

    station.load_config(&path).expect("load");
    assert_eq!(station.setup().params.number("focus_threshold_min"), Ok(42.0));
    assert_eq!(*heard.lock().expect("lock"), vec!["focus_threshold_min=42".to_owned()]);

    station.set_param("density_threshold_min", 5.0).expect("param");
    assert_eq!(heard.lock().expect("lock").len(), 2);
}

#[test]
fn trigger_pin_unset_by_default() {
    let mut station = one_roi_station();
    assert_eq!(station.trigger_pin(), None);
    station.set_param("gpio_trigger_pin", 17.0).expect("param");
    assert_eq!(station.trigger_pin(), Some(17));
    station.set_param("gpio_trigger_pin", -1.0).expect("param");
    assert_eq!(station.trigger_pin(), None);
}

#[test]
fn snapshot_writes_png() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut station = one_roi_station();
    assert!(station.refresh_frame().is_some());
    let path = station.save_snapshot(dir.path()).expect("snapshot");
    assert!(path.exists());
    let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
    assert!(name.starts_with("snapshot_") && name.ends_with(".png"), "{name}");
}

#[test]
fn missing_frame_source_is_reported() {
    let mut setup = InspectionSetup::new();
    setup
        .rois
        .create_roi(Point::new(0, 0), Point::new(40, 40), RoiShape::Rectangle, false)
        .expect("roi");
    let mut station = Station::new(setup, Box::new(NullLogSink));
    assert!(station.refresh_frame().is_none());
    assert!(matches!(station.run_cycle(), Err(StationError::Cycle(_))));
    assert_eq!(station.state(), CycleState::Idle);
}
