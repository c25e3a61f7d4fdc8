use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use roi_inspect::params::ParamError;
use roi_inspect::{ParamValue, ParameterStore};
use serde_json::json;

#[test]
fn defaults_are_seeded() {
    let params = ParameterStore::new();
    assert_eq!(params.number("density_threshold_min"), Ok(90.0));
    assert_eq!(params.number("density_threshold_max"), Ok(110.0));
    assert_eq!(params.flag("boundary_exclusion"), Ok(true));
    assert_eq!(params.text("blob_color_mode"), Ok("Grayscale"));
    assert_eq!(params.text("blob_bounding_shape"), Ok("None"));
    assert_eq!(params.number("gpio_trigger_pin"), Ok(-1.0));
    assert_eq!(params.number("color_hue_max"), Ok(180.0));
}

#[test]
fn validate_range_accepts_equal_bounds() {
    assert!(ParameterStore::validate_range(1.0, 1.0));
    assert!(ParameterStore::validate_range(0.0, 255.0));
    assert!(!ParameterStore::validate_range(5.0, 4.0));
}

#[test]
fn set_keeps_types() {
    let mut params = ParameterStore::new();
    assert_eq!(
        params.set("density_threshold_min", true),
        Err(ParamError::TypeMismatch {
            name: "density_threshold_min".to_owned(),
            expected: "number",
            found: "bool",
        })
    );
    assert!(matches!(params.set("no_such_param", 1.0), Err(ParamError::Unknown(_))));
    assert!(matches!(params.number("blob_color_mode"), Err(ParamError::TypeMismatch { .. })));

    params.set("density_threshold_min", 42).expect("number");
    assert_eq!(params.get("density_threshold_min"), Some(&ParamValue::Number(42.0)));
}

#[test]
fn listeners_see_effective_changes_only() {
    let mut params = ParameterStore::new();
    let seen: Arc<Mutex<Vec<(String, ParamValue)>>> = Arc::default();
    let sink = Arc::clone(&seen);
    params.subscribe(move |name, value| {
        sink.lock().expect("lock").push((name.to_owned(), value.clone()));
    });

    params.set("edge_canny_low", 60.0).expect("set");
    params.set("edge_canny_low", 60.0).expect("unchanged");
    params.set("boundary_exclusion", false).expect("set");
    let _ = params.set("edge_canny_low", "sixty");

    let seen = seen.lock().expect("lock");
    assert_eq!(
        *seen,
        vec![
            ("edge_canny_low".to_owned(), ParamValue::Number(60.0)),
            ("boundary_exclusion".to_owned(), ParamValue::Bool(false)),
        ]
    );
}

#[test]
fn first_inverted_reports_the_pair() {
    let mut params = ParameterStore::new();
    let pairs = [
        ("density_threshold_min", "density_threshold_max"),
        ("contrast_threshold_min", "contrast_threshold_max"),
    ];
    assert_eq!(params.first_inverted(&pairs), Ok(None));
    params.set("contrast_threshold_min", 50.0).expect("set");
    assert_eq!(
        params.first_inverted(&pairs),
        Ok(Some(("contrast_threshold_min", "contrast_threshold_max")))
    );
}

#[test]
fn persisted_values_skip_unknown_and_mistyped() {
    let mut params = ParameterStore::new();
    let persisted: BTreeMap<String, serde_json::Value> = [
        ("blob_area_min".to_owned(), json!(12.5)),
        ("blob_color_mode".to_owned(), json!("HSV")),
        ("legacy_knob".to_owned(), json!(3)),
        ("boundary_exclusion".to_owned(), json!("yes")),
        ("blob_area_max".to_owned(), json!([1, 2])),
    ]
    .into_iter()
    .collect();

    let skipped = params.apply_persisted(&persisted);
    assert_eq!(skipped, vec!["blob_area_max", "boundary_exclusion", "legacy_knob"]);
    assert_eq!(params.number("blob_area_min"), Ok(12.5));
    assert_eq!(params.text("blob_color_mode"), Ok("HSV"));
    assert_eq!(params.flag("boundary_exclusion"), Ok(true));
}

#[test]
fn absent_pairs_do_not_apply() {
    let mut params = ParameterStore::new();
    assert!(params.check_pair("density_threshold_min", "density_threshold_max"));
    assert!(params.check_pair("missing_min", "density_threshold_max"));
    params.set("density_threshold_max", 10.0).expect("set");
    assert!(!params.check_pair("density_threshold_min", "density_threshold_max"));
}
