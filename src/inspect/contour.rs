//! Planar shape math on traced contours.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::geometry::{contour_area, convex_hull};
use imageproc::point::Point;

/// Outermost borders of the foreground, one per top-level component.
pub fn external_contours(binary: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|contour| matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none())
        .collect()
}

/// The four corners of every pixel on the contour, deduplicated.
///
/// Hull and bounding-shape fits run on these so that a one-pixel-wide blob
/// still has a positive area.
pub fn pixel_corners(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut corners: Vec<Point<i32>> = points
        .iter()
        .flat_map(|p| {
            [
                Point::new(p.x, p.y),
                Point::new(p.x + 1, p.y),
                Point::new(p.x, p.y + 1),
                Point::new(p.x + 1, p.y + 1),
            ]
        })
        .collect();
    corners.sort_by_key(|p| (p.x, p.y));
    corners.dedup();
    corners
}

/// Area of the convex hull around the given points.
pub fn hull_area(points: &[Point<i32>]) -> f64 {
    let hull: Vec<Point<i32>> = convex_hull(points);
    if hull.len() < 3 {
        return 0.0;
    }
    contour_area(&hull).abs()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: (f64, f64),
    pub radius: f64,
}

impl Circle {
    fn contains(&self, p: (f64, f64)) -> bool {
        (p.0 - self.center.0).hypot(p.1 - self.center.1) <= self.radius + 1e-7
    }

    fn diameter(a: (f64, f64), b: (f64, f64)) -> Self {
        let center = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
        Self {
            center,
            radius: (a.0 - center.0).hypot(a.1 - center.1),
        }
    }

    fn circumscribed(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<Self> {
        let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
        if d.abs() < f64::EPSILON {
            return None;
        }
        let sq = |p: (f64, f64)| p.0 * p.0 + p.1 * p.1;
        let ux = (sq(a) * (b.1 - c.1) + sq(b) * (c.1 - a.1) + sq(c) * (a.1 - b.1)) / d;
        let uy = (sq(a) * (c.0 - b.0) + sq(b) * (a.0 - c.0) + sq(c) * (b.0 - a.0)) / d;
        Some(Self {
            center: (ux, uy),
            radius: (a.0 - ux).hypot(a.1 - uy),
        })
    }
}

/// Smallest circle enclosing every point (iterative Welzl).
pub fn min_enclosing_circle(points: &[Point<i32>]) -> Option<Circle> {
    let hull: Vec<Point<i32>> = convex_hull(points);
    let pts: Vec<(f64, f64)> = hull.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    let first = *pts.first()?;
    let mut circle = Circle {
        center: first,
        radius: 0.0,
    };
    for i in 1..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = Circle {
            center: pts[i],
            radius: 0.0,
        };
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = Circle::diameter(pts[i], pts[j]);
            for k in 0..j {
                if circle.contains(pts[k]) {
                    continue;
                }
                if let Some(c) = Circle::circumscribed(pts[i], pts[j], pts[k]) {
                    circle = c;
                }
            }
        }
    }
    Some(circle)
}

/// Major-axis angle of the moment-equivalent ellipse of the contour points.
///
/// The ellipse shares the points' second-order central moments, so this is a
/// closed-form ellipse fit rather than a least-squares one. Degrees in
/// [0, 180), measured from the local +x axis towards +y (clockwise on screen,
/// since y grows downwards). A horizontal bar reads 0 and a vertical one 90.
pub fn orientation(points: &[Point<i32>]) -> f64 {
    let n = points.len() as f64;
    let (mx, my) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let (mx, my) = (mx / n, my / n);
    let (mut mu20, mut mu02, mut mu11) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.x as f64 - mx;
        let dy = p.y as f64 - my;
        mu20 += dx * dx;
        mu02 += dy * dy;
        mu11 += dx * dy;
    }
    let angle = 0.5 * (2.0 * mu11).atan2(mu20 - mu02);
    angle.to_degrees().rem_euclid(180.0)
}
