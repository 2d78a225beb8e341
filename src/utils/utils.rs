use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn default() -> Self {
        Point { x: 0.0, y: 0.0 }
    }
    pub fn new(_x: f64, _y: f64) -> Self {
        Point { x: _x, y: _y }
    }
}

pub fn squared_distance(p1: &Point, p2: &Point) -> f64 {
    let dx = p1.x - p2.x;
    let dy = p1.y - p2.y;
    dx * dx + dy * dy
}

pub fn euclidean_distance(p1: &Point, p2: &Point) -> f64 {
    f64::sqrt(squared_distance(p1, p2))
}

/// Signed area of a closed polygon (shoelace formula).
/// Positive for counter-clockwise vertex order in a y-up frame.
pub fn polygon_signed_area(xs: &[f64], ys: &[f64]) -> f64 {
    let n = usize::min(xs.len(), ys.len());
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += xs[i] * ys[j] - xs[j] * ys[i];
    }
    0.5 * sum
}

pub fn polygon_area(xs: &[f64], ys: &[f64]) -> f64 {
    f64::abs(polygon_signed_area(xs, ys))
}

/// Centroid of a closed polygon.
/// Degenerate polygons (fewer than 3 vertices or zero area) fall back to the vertex mean.
pub fn polygon_centroid(xs: &[f64], ys: &[f64]) -> Point {
    let n = usize::min(xs.len(), ys.len());
    if n == 0 {
        return Point::default();
    }
    let signed_area = polygon_signed_area(xs, ys);
    if n < 3 || signed_area.abs() < f64::EPSILON {
        let cx = xs[..n].iter().sum::<f64>() / n as f64;
        let cy = ys[..n].iter().sum::<f64>() / n as f64;
        return Point::new(cx, cy);
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let cross = xs[i] * ys[j] - xs[j] * ys[i];
        cx += (xs[i] + xs[j]) * cross;
        cy += (ys[i] + ys[j]) * cross;
    }
    let factor = 1.0 / (6.0 * signed_area);
    Point::new(cx * factor, cy * factor)
}
