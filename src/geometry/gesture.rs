use imageproc::point::Point;

use super::roi::{Roi, RoiId, RoiShape};

/// Proximity, in pixels, at which a handle captures a drag.
pub const HANDLE_RADIUS: f64 = 10.0;

/// What a drag started at a given point does to the ROI under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    Move,
    Resize,
    Rotate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Gesture {
    pub roi: RoiId,
    pub mode: GestureMode,
    pub last: Point<i32>,
}

/// Picks the gesture for a point already known to hit `roi`.
///
/// The center handle wins over the resize handle, which wins over a move.
pub fn classify(roi: &Roi, point: Point<i32>) -> GestureMode {
    let (px, py) = (point.x as f64, point.y as f64);
    let (cx, cy) = roi.center();
    if (px - cx).abs() < HANDLE_RADIUS && (py - cy).abs() < HANDLE_RADIUS {
        return GestureMode::Rotate;
    }

    let near_handle = match roi.shape() {
        RoiShape::Rectangle => {
            let (u, v) = roi.image_to_local(px, py);
            let (w, h) = (roi.width() as f64, roi.height() as f64);
            let near_x = u.abs() < HANDLE_RADIUS || (u - w).abs() < HANDLE_RADIUS;
            let near_y = v.abs() < HANDLE_RADIUS || (v - h).abs() < HANDLE_RADIUS;
            near_x && near_y
        }
        RoiShape::Circle => ((px - cx).hypot(py - cy) - roi.radius()).abs() < HANDLE_RADIUS,
    };

    if near_handle {
        GestureMode::Resize
    } else {
        GestureMode::Move
    }
}
