use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};

use crate::geometry::{Roi, RoiId, RoiSet, RoiShape};

const OUTLINE: Rgb<u8> = Rgb([0, 120, 215]);
const SELECTED: Rgb<u8> = Rgb([40, 167, 69]);
const HOVERED: Rgb<u8> = Rgb([255, 193, 7]);
const HANDLE: Rgb<u8> = Rgb([255, 255, 255]);
const MASK_TINT: [f32; 3] = [255.0, 0.0, 255.0];
const MASK_ALPHA: f32 = 0.3;
const HANDLE_DOT: i32 = 4;

fn tint_mask(canvas: &mut RgbImage, roi: &Roi) {
    if roi.mask().is_empty() {
        return;
    }
    let (width, height) = canvas.dimensions();
    for v in 0..roi.height() {
        for u in 0..roi.width() {
            if !roi.mask().includes(u, v) {
                continue;
            }
            let p = roi.sample_position(u, v);
            if p.x < 0 || p.y < 0 || p.x >= width as i64 || p.y >= height as i64 {
                continue;
            }
            let px = canvas.get_pixel_mut(p.x as u32, p.y as u32);
            for (channel, tint) in px.0.iter_mut().zip(MASK_TINT) {
                *channel = (*channel as f32 * (1.0 - MASK_ALPHA) + tint * MASK_ALPHA).round() as u8;
            }
        }
    }
}

fn outline(canvas: &mut RgbImage, roi: &Roi, color: Rgb<u8>) {
    match roi.shape() {
        RoiShape::Rectangle => {
            let corners = roi.corners();
            for (a, b) in corners.iter().zip(corners.iter().cycle().skip(1)) {
                draw_line_segment_mut(canvas, (a.0 as f32, a.1 as f32), (b.0 as f32, b.1 as f32), color);
            }
        }
        RoiShape::Circle => {
            let (cx, cy) = roi.center();
            draw_hollow_circle_mut(canvas, (cx.round() as i32, cy.round() as i32), roi.radius().round() as i32, color);
        }
    }
}

fn handles(canvas: &mut RgbImage, roi: &Roi) {
    let (cx, cy) = roi.center();
    draw_filled_circle_mut(canvas, (cx.round() as i32, cy.round() as i32), HANDLE_DOT, HANDLE);
    if roi.shape() == RoiShape::Rectangle {
        for (x, y) in roi.corners() {
            draw_filled_circle_mut(canvas, (x.round() as i32, y.round() as i32), HANDLE_DOT, HANDLE);
        }
    }
}

/// Draws every ROI onto a copy of `frame`: mask tint, outline, and handles on
/// the selected ROI.
pub fn render_overlay(frame: &RgbImage, rois: &RoiSet, hovered: Option<RoiId>) -> RgbImage {
    let mut canvas = frame.clone();
    for roi in rois.iter() {
        tint_mask(&mut canvas, roi);
    }
    for roi in rois.iter() {
        let selected = rois.selected() == Some(roi.id());
        let color = if selected {
            SELECTED
        } else if hovered == Some(roi.id()) {
            HOVERED
        } else {
            OUTLINE
        };
        outline(&mut canvas, roi, color);
        if selected {
            handles(&mut canvas, roi);
        }
    }
    canvas
}
