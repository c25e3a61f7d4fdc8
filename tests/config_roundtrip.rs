use std::fs;

use imageproc::point::Point;
use roi_inspect::config::{ConfigError, RoiRecord, load_cycle_config, load_settings, save_cycle_config, save_settings};
use roi_inspect::inspect::{JudgmentCriteria, JudgmentMode};
use roi_inspect::log_sink::NullLogSink;
use roi_inspect::{Feature, InspectionSetup, ParameterStore, RoiShape, Station};

fn records(setup: &InspectionSetup) -> Vec<RoiRecord> {
    setup.rois.iter().map(RoiRecord::from_roi).collect()
}

fn sample_setup() -> InspectionSetup {
    let mut setup = InspectionSetup::new();
    let a = setup
        .rois
        .create_roi(Point::new(10, 10), Point::new(110, 70), RoiShape::Rectangle, false)
        .expect("roi a");
    let b = setup
        .rois
        .create_roi(Point::new(200, 100), Point::new(260, 160), RoiShape::Circle, false)
        .expect("roi b");
    setup.rois.set_angle(a, 33.5);
    setup.rois.begin_mask_edit(b);
    setup.rois.paint_mask(b, Point::new(30, 30), 8);
    setup.rois.end_mask_edit();
    // Leave a gap in the ids so the counter has to be recomputed.
    let c = setup
        .rois
        .create_roi(Point::new(300, 0), Point::new(340, 40), RoiShape::Rectangle, false)
        .expect("roi c");
    setup.rois.delete(a);
    let _ = c;

    setup.params.set("blob_color_mode", "HSV").expect("set");
    setup.params.set("blob_area_max", 900.0).expect("set");
    setup.params.set("boundary_exclusion", false).expect("set");
    setup.features.set(Feature::FocusCheck, true);
    setup.features.set(Feature::Edge, false);
    setup.blob_outputs.positions = true;
    setup.judgment.criteria_type = JudgmentMode::CountRange;
    setup.judgment.blob_count_max = 3.0;
    setup
}

#[test]
fn cycle_config_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cycle_config.json");
    let setup = sample_setup();

    save_cycle_config(&setup, &path).expect("save");
    let loaded = load_cycle_config(&path).expect("load");

    assert_eq!(records(&loaded), records(&setup));
    assert_eq!(loaded.params, setup.params);
    assert_eq!(loaded.features, setup.features);
    assert_eq!(loaded.blob_outputs, setup.blob_outputs);
    assert_eq!(loaded.judgment, setup.judgment);
    assert_eq!(loaded.rois.next_id(), 3);
    assert!(!loaded.rois.get(1).expect("circle").mask().is_empty());
}

#[test]
fn missing_and_unknown_keys_are_tolerated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("partial.json");
    fs::write(
        &path,
        r#"{
            "version": 7,
            "params": {"density_threshold_min": 80, "retired_option": true},
            "cycle_features": {"Contrast": true}
        }"#,
    )
    .expect("write");

    let loaded = load_cycle_config(&path).expect("load");
    assert!(loaded.rois.is_empty());
    assert_eq!(loaded.rois.next_id(), 0);
    assert_eq!(loaded.params.number("density_threshold_min"), Ok(80.0));
    assert_eq!(loaded.params.number("density_threshold_max"), Ok(110.0));
    assert!(loaded.features.is_enabled(Feature::Contrast));
    assert!(loaded.features.is_enabled(Feature::Density));
    assert_eq!(loaded.judgment, JudgmentCriteria::default());
}

#[test]
fn legacy_positional_rois_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("legacy.json");
    fs::write(
        &path,
        r#"{"rois": [[5, 6, 40, 30, 4, 12.5, "circle", []], {"id": 9, "x": 0, "y": 0, "width": 20, "height": 20}]}"#,
    )
    .expect("write");

    let loaded = load_cycle_config(&path).expect("load");
    let legacy = loaded.rois.get(4).expect("legacy roi");
    assert_eq!(legacy.origin(), Point::new(5, 6));
    assert_eq!((legacy.width(), legacy.height()), (40, 30));
    assert_eq!(legacy.angle(), 12.5);
    assert_eq!(legacy.shape(), RoiShape::Circle);
    assert_eq!(legacy.mask().dimensions(), (40, 30));

    let named = loaded.rois.get(9).expect("named roi");
    assert_eq!(named.shape(), RoiShape::Rectangle);
    assert_eq!(loaded.rois.next_id(), 10);
}

#[test]
fn malformed_rois_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");

    let small = dir.path().join("small.json");
    fs::write(&small, r#"{"rois": [{"id": 0, "x": 0, "y": 0, "width": 10, "height": 50}]}"#).expect("write");
    assert!(matches!(load_cycle_config(&small), Err(ConfigError::MalformedRoi { id: 0, .. })));

    let mask = dir.path().join("mask.json");
    fs::write(
        &mask,
        r#"{"rois": [{"id": 1, "x": 0, "y": 0, "width": 20, "height": 20, "mask": [[0, 1]]}]}"#,
    )
    .expect("write");
    assert!(matches!(load_cycle_config(&mask), Err(ConfigError::MalformedRoi { id: 1, .. })));

    let dupes = dir.path().join("dupes.json");
    fs::write(
        &dupes,
        r#"{"rois": [{"id": 2, "x": 0, "y": 0, "width": 20, "height": 20},
                     {"id": 2, "x": 30, "y": 0, "width": 20, "height": 20}]}"#,
    )
    .expect("write");
    assert!(matches!(load_cycle_config(&dupes), Err(ConfigError::DuplicateRoi(2))));

    let missing = dir.path().join("missing.json");
    assert!(matches!(load_cycle_config(&missing), Err(ConfigError::Io { .. })));
}

#[test]
fn failed_load_keeps_station_setup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ not json").expect("write");

    let mut station = Station::new(sample_setup(), Box::new(NullLogSink));
    let before = records(station.setup());
    assert!(station.load_config(&broken).is_err());
    assert_eq!(records(station.setup()), before);
    assert_eq!(station.setup().params.text("blob_color_mode"), Ok("HSV"));

    let good = dir.path().join("good.json");
    save_cycle_config(&InspectionSetup::new(), &good).expect("save");
    station.load_config(&good).expect("load");
    assert!(station.setup().rois.is_empty());
}

#[test]
fn settings_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("settings.json");

    let mut params = ParameterStore::new();
    params.set("focus_threshold_min", 12.0).expect("set");
    params.set("blob_bounding_shape", "Rectangle").expect("set");
    save_settings(&params, &path).expect("save");

    let mut restored = ParameterStore::new();
    let skipped = load_settings(&mut restored, &path).expect("load");
    assert!(skipped.is_empty());
    assert_eq!(restored, params);

    let mut untouched = ParameterStore::new();
    assert!(load_settings(&mut untouched, dir.path().join("nope.json")).is_err());
    assert_eq!(untouched, ParameterStore::new());
}
