use std::collections::VecDeque;
use std::f64::consts::PI;

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::geometry::arc_length;
use imageproc::point::Point;
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::inspect::contour::external_contours;

/// Axis-aligned box in the ROI's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Shape descriptors of one external contour, before any filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobShape {
    pub points: Vec<Point<i32>>,
    /// Filled area: component pixels plus enclosed holes.
    pub area: f64,
    pub perimeter: f64,
    pub bounds: LocalBox,
    /// First moment of the filled region, local pixel coordinates.
    pub centroid: (f64, f64),
}

impl BlobShape {
    pub fn circularity(&self) -> f64 {
        if self.perimeter > 0.0 {
            4.0 * PI * self.area / (self.perimeter * self.perimeter)
        } else {
            0.0
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.bounds.height > 0 {
            self.bounds.width as f64 / self.bounds.height as f64
        } else {
            0.0
        }
    }
}

fn bounds_of(points: &[Point<i32>]) -> Option<LocalBox> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    Some(LocalBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

/// Every external blob of a binary mask, in contour-tracing order.
pub fn trace_blobs(binary: &GrayImage) -> Vec<BlobShape> {
    let contours = external_contours(binary);
    if contours.is_empty() {
        return Vec::new();
    }
    let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));

    contours
        .into_iter()
        .filter_map(|contour| {
            let bounds = bounds_of(&contour.points)?;
            let seed = contour.points[0];
            let label = labels.get_pixel(seed.x as u32, seed.y as u32)[0];
            let (area, centroid) = filled_region(&labels, label, bounds);
            let perimeter = arc_length(&contour.points, true);
            Some(BlobShape {
                points: contour.points,
                area,
                perimeter,
                bounds,
                centroid,
            })
        })
        .collect()
}

/// Area and centroid of a component with its holes filled.
///
/// Floods the background from a one-pixel frame around the bounding box
/// (4-connected, since the foreground is 8-connected); whatever the flood
/// can't reach belongs to the blob.
fn filled_region(labels: &Image<Luma<u32>>, label: u32, bounds: LocalBox) -> (f64, (f64, f64)) {
    let width = (bounds.width + 2) as usize;
    let height = (bounds.height + 2) as usize;
    let origin_x = bounds.x - 1;
    let origin_y = bounds.y - 1;

    let is_wall = |cx: usize, cy: usize| {
        let x = origin_x + cx as i32;
        let y = origin_y + cy as i32;
        x >= 0
            && y >= 0
            && (x as u32) < labels.width()
            && (y as u32) < labels.height()
            && labels.get_pixel(x as u32, y as u32)[0] == label
    };

    let mut outside = vec![false; width * height];
    let mut queue = VecDeque::new();
    for cx in 0..width {
        for cy in [0, height - 1] {
            outside[cy * width + cx] = true;
            queue.push_back((cx, cy));
        }
    }
    for cy in 1..height - 1 {
        for cx in [0, width - 1] {
            outside[cy * width + cx] = true;
            queue.push_back((cx, cy));
        }
    }

    while let Some((cx, cy)) = queue.pop_front() {
        for (dx, dy) in [(-1isize, 0isize), (1, 0), (0, -1), (0, 1)] {
            let nx = cx as isize + dx;
            let ny = cy as isize + dy;
            if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
                continue;
            }
            let (nx, ny) = (nx as usize, ny as usize);
            let idx = ny * width + nx;
            if outside[idx] || is_wall(nx, ny) {
                continue;
            }
            outside[idx] = true;
            queue.push_back((nx, ny));
        }
    }

    let mut count = 0usize;
    let mut sum_x = 0f64;
    let mut sum_y = 0f64;
    for cy in 0..height {
        for cx in 0..width {
            if outside[cy * width + cx] {
                continue;
            }
            count += 1;
            sum_x += (origin_x + cx as i32) as f64;
            sum_y += (origin_y + cy as i32) as f64;
        }
    }
    if count == 0 {
        return (0.0, (bounds.x as f64, bounds.y as f64));
    }
    (count as f64, (sum_x / count as f64, sum_y / count as f64))
}
