//! ROI geometry: the ordered ROI list, its id counter, selection and the
//! interactive edits (create, move, resize, rotate, mask painting).

use imageproc::point::Point;
use tracing::debug;

pub mod gesture;
pub mod mask;
pub mod roi;

pub use gesture::{GestureMode, HANDLE_RADIUS, classify};
pub use mask::RoiMask;
pub use roi::{Roi, RoiId, RoiShape};

use gesture::Gesture;

/// Smallest side accepted by [`RoiSet::resize`]; creation needs strictly more.
pub const MIN_ROI_SIDE: u32 = 10;
pub const GRID_PITCH: i32 = 10;
pub const DEFAULT_BRUSH_RADIUS: i32 = 5;

fn snap(value: i64) -> i64 {
    let pitch = GRID_PITCH as f64;
    ((value as f64 / pitch).round() * pitch) as i64
}

fn to_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Ordered ROI list with a monotonically increasing id counter.
#[derive(Debug, Clone, Default)]
pub struct RoiSet {
    rois: Vec<Roi>,
    next_id: RoiId,
    selected: Option<RoiId>,
    mask_edit: Option<RoiId>,
    gesture: Option<Gesture>,
}

impl RoiSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from persisted ROIs; the counter resumes after the highest id.
    pub fn from_rois(rois: Vec<Roi>) -> Self {
        let next_id = rois.iter().map(Roi::id).max().map_or(0, |id| id + 1);
        Self {
            rois,
            next_id,
            ..Self::default()
        }
    }

    pub fn next_id(&self) -> RoiId {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Roi> {
        self.rois.iter()
    }

    pub fn as_slice(&self) -> &[Roi] {
        &self.rois
    }

    pub fn get(&self, id: RoiId) -> Option<&Roi> {
        self.rois.iter().find(|roi| roi.id == id)
    }

    fn get_mut(&mut self, id: RoiId) -> Option<&mut Roi> {
        self.rois.iter_mut().find(|roi| roi.id == id)
    }

    /// Creates an ROI from a drag between two corners.
    ///
    /// Returns `None` when either side ends up at or below [`MIN_ROI_SIDE`].
    pub fn create_roi(
        &mut self,
        start: Point<i32>,
        end: Point<i32>,
        shape: RoiShape,
        snap_to_grid: bool,
    ) -> Option<RoiId> {
        let mut x = start.x.min(end.x) as i64;
        let mut y = start.y.min(end.y) as i64;
        let mut width = (end.x as i64 - start.x as i64).abs();
        let mut height = (end.y as i64 - start.y as i64).abs();
        if snap_to_grid {
            x = snap(x);
            y = snap(y);
            width = snap(width);
            height = snap(height);
        }

        let min_side = MIN_ROI_SIDE as i64;
        if width <= min_side || height <= min_side {
            debug!(width, height, "drag too small for an ROI");
            return None;
        }

        let id = self.next_id;
        self.rois.push(Roi::new(
            id,
            to_i32(x),
            to_i32(y),
            width.min(u32::MAX as i64) as u32,
            height.min(u32::MAX as i64) as u32,
            shape,
        ));
        self.next_id += 1;
        debug!(id, x, y, width, height, ?shape, "ROI created");
        Some(id)
    }

    /// First ROI in list order whose shape contains the point.
    pub fn hit_test(&self, point: Point<i32>) -> Option<RoiId> {
        self.rois.iter().find(|roi| roi.contains(point)).map(Roi::id)
    }

    /// Selects the ROI under the point; a miss clears the selection.
    pub fn select_at(&mut self, point: Point<i32>) -> Option<RoiId> {
        self.selected = self.hit_test(point);
        self.selected
    }

    pub fn select(&mut self, id: RoiId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<RoiId> {
        self.selected
    }

    pub fn selected_roi(&self) -> Option<&Roi> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Translates an ROI. Unknown ids are ignored.
    pub fn move_by(&mut self, id: RoiId, dx: i32, dy: i32, snap_to_grid: bool) -> bool {
        let Some(roi) = self.get_mut(id) else {
            return false;
        };
        let mut x = roi.x as i64 + dx as i64;
        let mut y = roi.y as i64 + dy as i64;
        if snap_to_grid {
            x = snap(x);
            y = snap(y);
        }
        roi.x = to_i32(x);
        roi.y = to_i32(y);
        true
    }

    /// Applies a resize drag from `from` to `to`.
    ///
    /// Rectangles grow by the drag delta; circles take twice the pointer's
    /// distance from the center as their diameter. Both clamp at
    /// [`MIN_ROI_SIDE`], and the mask is resampled to the new size.
    pub fn resize(&mut self, id: RoiId, from: Point<i32>, to: Point<i32>, snap_to_grid: bool) -> bool {
        let Some(roi) = self.get(id) else {
            return false;
        };
        let min_side = MIN_ROI_SIDE as i64;
        let (mut width, mut height) = match roi.shape {
            RoiShape::Rectangle => (
                (roi.width as i64 + (to.x as i64 - from.x as i64)).max(min_side),
                (roi.height as i64 + (to.y as i64 - from.y as i64)).max(min_side),
            ),
            RoiShape::Circle => {
                let (cx, cy) = roi.center();
                let radius = (to.x as f64 - cx).hypot(to.y as f64 - cy);
                let side = ((radius * 2.0) as i64).max(min_side);
                (side, side)
            }
        };
        if snap_to_grid {
            width = snap(width);
            height = snap(height);
        }
        self.resize_to(id, width.min(u32::MAX as i64) as u32, height.min(u32::MAX as i64) as u32)
    }

    /// Sets an ROI's size directly, resampling its mask nearest-neighbour.
    pub fn resize_to(&mut self, id: RoiId, width: u32, height: u32) -> bool {
        let Some(roi) = self.get_mut(id) else {
            return false;
        };
        let width = width.max(MIN_ROI_SIDE);
        let height = height.max(MIN_ROI_SIDE);
        roi.mask = roi.mask.resampled(width, height);
        roi.width = width;
        roi.height = height;
        true
    }

    /// Points the ROI's local x axis at `pointer`.
    pub fn rotate_towards(&mut self, id: RoiId, pointer: Point<i32>) -> bool {
        let Some(roi) = self.get_mut(id) else {
            return false;
        };
        let (cx, cy) = roi.center();
        roi.angle = (pointer.y as f64 - cy).atan2(pointer.x as f64 - cx).to_degrees();
        true
    }

    pub fn set_angle(&mut self, id: RoiId, degrees: f64) -> bool {
        match self.get_mut(id) {
            Some(roi) if degrees.is_finite() => {
                roi.angle = degrees;
                true
            }
            _ => false,
        }
    }

    /// ROI under the point and the gesture a drag from there would start.
    pub fn hover(&self, point: Point<i32>) -> Option<(RoiId, GestureMode)> {
        self.rois
            .iter()
            .find(|roi| roi.contains(point))
            .map(|roi| (roi.id, classify(roi, point)))
    }

    /// Starts a drag: selects the ROI under the point and picks the gesture.
    pub fn begin_gesture(&mut self, point: Point<i32>) -> Option<(RoiId, GestureMode)> {
        let hit = self.hover(point);
        self.selected = hit.map(|(id, _)| id);
        self.gesture = hit.map(|(roi, mode)| Gesture {
            roi,
            mode,
            last: point,
        });
        hit
    }

    /// Applies the active gesture incrementally. No-op without one.
    pub fn drag_gesture(&mut self, point: Point<i32>, snap_to_grid: bool) -> bool {
        let Some(gesture) = self.gesture else {
            return false;
        };
        let applied = match gesture.mode {
            GestureMode::Move => self.move_by(
                gesture.roi,
                point.x - gesture.last.x,
                point.y - gesture.last.y,
                snap_to_grid,
            ),
            GestureMode::Resize => self.resize(gesture.roi, gesture.last, point, snap_to_grid),
            GestureMode::Rotate => self.rotate_towards(gesture.roi, point),
        };
        self.gesture = Some(Gesture { last: point, ..gesture });
        applied
    }

    pub fn end_gesture(&mut self) -> Option<GestureMode> {
        self.gesture.take().map(|gesture| gesture.mode)
    }

    pub fn active_gesture(&self) -> Option<(RoiId, GestureMode)> {
        self.gesture.map(|gesture| (gesture.roi, gesture.mode))
    }

    /// Enters mask-edit mode for one ROI.
    pub fn begin_mask_edit(&mut self, id: RoiId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.mask_edit = Some(id);
        true
    }

    pub fn end_mask_edit(&mut self) -> Option<RoiId> {
        self.mask_edit.take()
    }

    pub fn mask_edit_target(&self) -> Option<RoiId> {
        self.mask_edit
    }

    /// Paints an included disk at a local-frame point of the ROI being edited.
    ///
    /// Outside mask-edit mode, for another ROI, or for a point off the ROI this
    /// does nothing and returns `false`.
    pub fn paint_mask(&mut self, id: RoiId, local: Point<i32>, radius: i32) -> bool {
        if self.mask_edit != Some(id) {
            return false;
        }
        let Some(roi) = self.get_mut(id) else {
            return false;
        };
        let inside = (0..roi.width as i64).contains(&(local.x as i64))
            && (0..roi.height as i64).contains(&(local.y as i64));
        if inside {
            roi.mask.paint_disk(local, radius);
        }
        inside
    }

    /// Converts an image point into the edited ROI's frame and paints there.
    pub fn paint_mask_at(&mut self, id: RoiId, point: Point<i32>, radius: i32) -> bool {
        let Some(roi) = self.get(id) else {
            return false;
        };
        let (u, v) = roi.image_to_local(point.x as f64, point.y as f64);
        self.paint_mask(id, Point::new(u.floor() as i32, v.floor() as i32), radius)
    }

    pub fn clear_mask(&mut self, id: RoiId) -> bool {
        match self.get_mut(id) {
            Some(roi) => {
                roi.mask.clear();
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: RoiId) -> bool {
        let before = self.rois.len();
        self.rois.retain(|roi| roi.id != id);
        if self.rois.len() == before {
            return false;
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.mask_edit == Some(id) {
            self.mask_edit = None;
        }
        if self.gesture.is_some_and(|gesture| gesture.roi == id) {
            self.gesture = None;
        }
        true
    }

    /// Drops every ROI and resets the id counter to 0.
    pub fn clear_all(&mut self) {
        *self = Self::default();
    }
}
