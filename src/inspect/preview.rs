use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;

use super::blob::BoundingFit;
use super::{Evaluation, Overlay, Verdict};

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const BLUE: Rgb<u8> = Rgb([0, 120, 215]);

/// An annotated patch for the external display surface.
#[derive(Debug, Clone)]
pub struct Preview {
    pub title: String,
    pub image: RgbImage,
    pub caption: String,
    pub verdict: Verdict,
}

fn dim_unselected(image: &mut RgbImage, evaluation: &Evaluation) {
    for (px, sel) in image.pixels_mut().zip(evaluation.selection.pixels()) {
        if sel[0] == 0 {
            px.0 = px.0.map(|c| c / 3);
        }
    }
}

fn draw_polyline(image: &mut RgbImage, points: &[Point<i32>], color: Rgb<u8>) {
    if let [single] = points {
        if let Some(px) = image.get_pixel_mut_checked(single.x as u32, single.y as u32) {
            *px = color;
        }
        return;
    }
    for (a, b) in points.iter().zip(points.iter().cycle().skip(1)) {
        draw_line_segment_mut(image, (a.x as f32, a.y as f32), (b.x as f32, b.y as f32), color);
    }
}

pub(crate) fn render(evaluation: &Evaluation) -> Preview {
    let result = &evaluation.result;
    let mut image = evaluation.patch.clone();
    dim_unselected(&mut image, evaluation);

    match &evaluation.overlay {
        Overlay::Plain => {}
        Overlay::Pixels(hits) => {
            for (px, hit) in image.pixels_mut().zip(hits.pixels()) {
                if hit[0] > 0 {
                    *px = GREEN;
                }
            }
        }
        Overlay::Contours(contours) => {
            for contour in contours {
                draw_polyline(&mut image, contour, GREEN);
            }
        }
        Overlay::Blobs(blobs) => {
            for blob in blobs {
                draw_polyline(&mut image, &blob.contour, GREEN);
                match &blob.fit {
                    Some(BoundingFit::Rectangle(corners)) => draw_polyline(&mut image, corners, BLUE),
                    Some(BoundingFit::Circle { center, radius }) => draw_hollow_circle_mut(
                        &mut image,
                        (center.0.round() as i32, center.1.round() as i32),
                        radius.round() as i32,
                        BLUE,
                    ),
                    None => {}
                }
                let (cx, cy) = blob.centroid;
                draw_filled_circle_mut(&mut image, (cx.round() as i32, cy.round() as i32), 2, RED);
            }
        }
    }

    let frame_color = if result.verdict.is_ok() { GREEN } else { RED };
    let (width, height) = image.dimensions();
    draw_hollow_rect_mut(&mut image, Rect::at(0, 0).of_size(width.max(1), height.max(1)), frame_color);

    Preview {
        title: format!("{} Preview ROI {}", result.operator, result.roi_id),
        image,
        caption: format!("{}: {}", result.verdict, result.detail),
        verdict: result.verdict,
    }
}
