use approx::assert_abs_diff_eq;
use image::Rgb;
use imageproc::point::Point;
use roi_inspect::synthetic::{self, BLACK};
use roi_inspect::{InspectError, InspectionSetup, Operator, RoiShape, Verdict};

const GRAY: Rgb<u8> = Rgb([100, 100, 100]);

fn full_frame(width: i32, height: i32, shape: RoiShape) -> (InspectionSetup, u32) {
    let mut setup = InspectionSetup::new();
    let id = setup
        .rois
        .create_roi(Point::new(0, 0), Point::new(width, height), shape, false)
        .expect("full-frame ROI");
    (setup, id)
}

fn scalar(setup: &InspectionSetup, op: Operator, frame: &image::RgbImage, id: u32) -> (Verdict, f64, String) {
    let roi = setup.rois.get(id).expect("roi");
    let result = setup.inspector().evaluate(op, frame, roi).expect("evaluation").result;
    let value = result.metric.scalar().expect("scalar metric");
    (result.verdict, value, result.detail)
}

#[test]
fn density_of_uniform_patch() {
    let (setup, id) = full_frame(60, 40, RoiShape::Rectangle);
    let frame = synthetic::uniform(60, 40, GRAY);
    let (verdict, mean, detail) = scalar(&setup, Operator::Density, &frame, id);
    assert_eq!(verdict, Verdict::Ok);
    assert_abs_diff_eq!(mean, 100.0, epsilon = 1e-9);
    assert_eq!(detail, "Mean Density: 100.00 (Range: [90, 110])");
}

#[test]
fn density_outside_range_is_ng() {
    let (setup, id) = full_frame(60, 40, RoiShape::Rectangle);
    let frame = synthetic::uniform(60, 40, Rgb([200, 200, 200]));
    let (verdict, mean, _) = scalar(&setup, Operator::Density, &frame, id);
    assert_eq!(verdict, Verdict::Ng);
    assert_abs_diff_eq!(mean, 200.0, epsilon = 1e-9);
}

#[test]
fn circle_roi_ignores_box_corners() {
    let (setup, id) = full_frame(40, 40, RoiShape::Circle);
    let frame = synthetic::disk(40, 40, (20, 20), 22, GRAY, BLACK);
    let (verdict, mean, _) = scalar(&setup, Operator::Density, &frame, id);
    assert_abs_diff_eq!(mean, 100.0, epsilon = 1e-9);
    assert_eq!(verdict, Verdict::Ok);
}

#[test]
fn mask_restricts_density_to_painted_pixels() {
    let (mut setup, id) = full_frame(60, 60, RoiShape::Rectangle);
    let mut frame = synthetic::uniform(60, 60, BLACK);
    synthetic::paint_rect(&mut frame, 0, 0, 20, 20, GRAY);

    setup.rois.begin_mask_edit(id);
    assert!(setup.rois.paint_mask(id, Point::new(10, 10), 5));
    setup.rois.end_mask_edit();

    let (verdict, mean, _) = scalar(&setup, Operator::Density, &frame, id);
    assert_abs_diff_eq!(mean, 100.0, epsilon = 1e-9);
    assert_eq!(verdict, Verdict::Ok);
}

#[test]
fn contrast_of_checkerboard() {
    let (mut setup, id) = full_frame(100, 100, RoiShape::Rectangle);
    setup.params.set("contrast_threshold_min", 90.0).expect("set");
    setup.params.set("contrast_threshold_max", 110.0).expect("set");
    let frame = synthetic::checkerboard(100, 100, 10, BLACK, Rgb([200, 200, 200]));
    let (verdict, std, detail) = scalar(&setup, Operator::Contrast, &frame, id);
    assert_abs_diff_eq!(std, 100.0, epsilon = 1e-6);
    assert_eq!(verdict, Verdict::Ok);
    assert!(detail.starts_with("Contrast: 100.00"), "{detail}");
}

#[test]
fn color_ratio_of_solid_red() {
    let (mut setup, id) = full_frame(50, 50, RoiShape::Rectangle);
    let frame = synthetic::uniform(50, 50, Rgb([255, 0, 0]));
    setup.params.set("color_hue_max", 10.0).expect("set");
    setup.params.set("color_ratio_min", 90.0).expect("set");

    let (verdict, ratio, detail) = scalar(&setup, Operator::ColorDetection, &frame, id);
    assert_abs_diff_eq!(ratio, 100.0, epsilon = 1e-9);
    assert_eq!(verdict, Verdict::Ok);
    assert!(detail.starts_with("Color Ratio: 100.00%"), "{detail}");

    let blue = synthetic::uniform(50, 50, Rgb([0, 0, 255]));
    let (verdict, ratio, _) = scalar(&setup, Operator::ColorDetection, &blue, id);
    assert_abs_diff_eq!(ratio, 0.0, epsilon = 1e-9);
    assert_eq!(verdict, Verdict::Ng);
}

#[test]
fn edges_absent_on_flat_patch() {
    let (setup, id) = full_frame(50, 50, RoiShape::Rectangle);
    let frame = synthetic::uniform(50, 50, GRAY);
    let (verdict, count, detail) = scalar(&setup, Operator::Edge, &frame, id);
    assert_eq!(count, 0.0);
    assert_eq!(verdict, Verdict::Ng);
    assert!(detail.starts_with("Edge Sum: 0.00 "), "{detail}");
}

#[test]
fn edges_found_on_checkerboard() {
    let (mut setup, id) = full_frame(100, 100, RoiShape::Rectangle);
    setup.params.set("edge_threshold_max", 100_000.0).expect("set");
    setup.params.set("edge_median_blur", 1.0).expect("set");
    let frame = synthetic::checkerboard(100, 100, 20, BLACK, Rgb([255, 255, 255]));
    let (verdict, count, _) = scalar(&setup, Operator::Edge, &frame, id);
    assert!(count > 50.0, "edge count {count}");
    assert_eq!(verdict, Verdict::Ok);
}

#[test]
fn even_median_kernel_is_rejected() {
    let (mut setup, id) = full_frame(50, 50, RoiShape::Rectangle);
    setup.params.set("edge_median_blur", 4.0).expect("set");
    let frame = synthetic::uniform(50, 50, GRAY);
    let roi = setup.rois.get(id).expect("roi");
    let err = setup.inspector().evaluate(Operator::Edge, &frame, roi).unwrap_err();
    assert!(matches!(err, InspectError::InvalidChoice { .. }), "{err}");
}

#[test]
fn measurement_without_contours() {
    let (setup, id) = full_frame(50, 50, RoiShape::Rectangle);
    let frame = synthetic::uniform(50, 50, GRAY);
    let (verdict, area, detail) = scalar(&setup, Operator::Measurement, &frame, id);
    assert_eq!(verdict, Verdict::Ng);
    assert_eq!(area, 0.0);
    assert_eq!(detail, "No contours found");
}

#[test]
fn measurement_reports_contour_area() {
    let (setup, id) = full_frame(100, 100, RoiShape::Rectangle);
    let frame = synthetic::disk(100, 100, (50, 50), 20, Rgb([255, 255, 255]), BLACK);
    let (_, area, detail) = scalar(&setup, Operator::Measurement, &frame, id);
    assert!(area > 700.0 && area < 1600.0, "area {area}");
    assert!(detail.starts_with("Area: "), "{detail}");
    assert!(detail.ends_with("(Range: [1000.00, 3000.00])"), "{detail}");
}

#[test]
fn focus_of_flat_and_sharp_patches() {
    let (setup, id) = full_frame(50, 50, RoiShape::Rectangle);
    let flat = synthetic::uniform(50, 50, GRAY);
    let (verdict, variance, _) = scalar(&setup, Operator::FocusCheck, &flat, id);
    assert_abs_diff_eq!(variance, 0.0, epsilon = 1e-9);
    assert_eq!(verdict, Verdict::Ng);

    let sharp = synthetic::checkerboard(50, 50, 2, BLACK, Rgb([255, 255, 255]));
    let (_, variance, _) = scalar(&setup, Operator::FocusCheck, &sharp, id);
    assert!(variance > 1000.0, "variance {variance}");
}

#[test]
fn circle_outline_is_not_image_content() {
    let (setup, id) = full_frame(80, 80, RoiShape::Circle);
    let flat = synthetic::uniform(80, 80, GRAY);

    let (_, variance, _) = scalar(&setup, Operator::FocusCheck, &flat, id);
    assert_abs_diff_eq!(variance, 0.0, epsilon = 1e-9);

    let (_, count, _) = scalar(&setup, Operator::Edge, &flat, id);
    assert_eq!(count, 0.0);

    let (verdict, _, detail) = scalar(&setup, Operator::Measurement, &flat, id);
    assert_eq!(verdict, Verdict::Ng);
    assert_eq!(detail, "No contours found");
}

#[test]
fn mask_outline_is_not_image_content() {
    let (mut setup, id) = full_frame(60, 60, RoiShape::Rectangle);
    setup.rois.begin_mask_edit(id);
    assert!(setup.rois.paint_mask(id, Point::new(30, 30), 12));
    setup.rois.end_mask_edit();
    let flat = synthetic::uniform(60, 60, GRAY);

    let (_, variance, _) = scalar(&setup, Operator::FocusCheck, &flat, id);
    assert_abs_diff_eq!(variance, 0.0, epsilon = 1e-9);

    let (_, count, _) = scalar(&setup, Operator::Edge, &flat, id);
    assert_eq!(count, 0.0);

    let (_, _, detail) = scalar(&setup, Operator::Measurement, &flat, id);
    assert_eq!(detail, "No contours found");
}

#[test]
fn measurement_inside_circle_roi_finds_the_part() {
    let (setup, id) = full_frame(80, 80, RoiShape::Circle);
    let frame = synthetic::disk(80, 80, (40, 40), 15, Rgb([255, 255, 255]), BLACK);
    let (_, area, _) = scalar(&setup, Operator::Measurement, &frame, id);
    assert!(area > 400.0 && area < 1100.0, "area {area}");
}

#[test]
fn inverted_range_is_refused() {
    let (mut setup, id) = full_frame(50, 50, RoiShape::Rectangle);
    setup.params.set("density_threshold_min", 200.0).expect("set");
    setup.params.set("density_threshold_max", 100.0).expect("set");
    let frame = synthetic::uniform(50, 50, GRAY);
    let roi = setup.rois.get(id).expect("roi");
    match setup.inspector().evaluate(Operator::Density, &frame, roi) {
        Err(InspectError::InvalidRange { min, max }) => {
            assert_eq!(min, "density_threshold_min");
            assert_eq!(max, "density_threshold_max");
        }
        other => panic!("expected InvalidRange, got {other:?}"),
    }
}

#[test]
fn rotated_roi_samples_rotated_patch() {
    // Bright vertical bar; a horizontal ROI rotated by 90 degrees lies inside it.
    let mut frame = synthetic::uniform(100, 100, BLACK);
    synthetic::paint_rect(&mut frame, 40, 0, 20, 100, GRAY);

    let mut setup = InspectionSetup::new();
    let id = setup
        .rois
        .create_roi(Point::new(10, 44), Point::new(90, 56), RoiShape::Rectangle, false)
        .expect("roi");
    let (_, unrotated, _) = scalar(&setup, Operator::Density, &frame, id);
    assert!(unrotated < 50.0, "mean {unrotated}");

    assert!(setup.rois.set_angle(id, 90.0));
    let (verdict, rotated, _) = scalar(&setup, Operator::Density, &frame, id);
    assert_abs_diff_eq!(rotated, 100.0, epsilon = 1e-9);
    assert_eq!(verdict, Verdict::Ok);
}

#[test]
fn operator_names_parse() {
    assert_eq!(Operator::parse("Density Inspection"), Some(Operator::Density));
    assert_eq!(Operator::parse("blob"), Some(Operator::BlobDetection));
    assert_eq!(Operator::parse("nonsense"), None);
}
