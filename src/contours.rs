use bresenham::Bresenham;
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use serde::{Deserialize, Serialize};

use crate::image_utils::{in_bounds, MASK_ON};

/// Contours whose enclosed area is at most this are flagged in previews
pub const SIGNIFICANT_AREA: f64 = 100.0;

/// Integer pixel coordinate, origin top-left, y increasing downward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One closed boundary in pixel space. The last point connects back to the
/// first implicitly; the first point is never repeated at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<PixelPoint>,
}

impl Contour {
    pub fn new(points: Vec<PixelPoint>) -> Self {
        Self { points }
    }

    pub fn from_coords(coords: &[(i32, i32)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| PixelPoint::new(x, y)).collect())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// At least three vertices, i.e. exportable as a closed polyline
    pub fn is_polygon(&self) -> bool {
        self.points.len() >= 3
    }

    /// Enclosed area (shoelace, absolute value)
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    /// Closed perimeter length in pixels
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                ((b.x - a.x) as f64).hypot((b.y - a.y) as f64)
            })
            .sum()
    }

    /// (min_x, min_y, max_x, max_y), or None for an empty contour
    pub fn bounding_box(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.points.first()?;
        Some(self.points.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        ))
    }

    pub fn is_significant(&self) -> bool {
        self.area() > SIGNIFICANT_AREA
    }
}

/// Absolute shoelace area of a closed point ring
pub fn polygon_area(points: &[PixelPoint]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum();
    (twice as f64 / 2.0).abs()
}

/// Drop points that sit in the middle of a straight horizontal, vertical or
/// diagonal run, keeping only the run end points.
pub fn compress_chain(points: &[PixelPoint]) -> Vec<PixelPoint> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let compressed: Vec<PixelPoint> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let curr = points[i];
            let next = points[(i + 1) % n];
            (curr.x - prev.x, curr.y - prev.y) != (next.x - curr.x, next.y - curr.y)
        })
        .map(|i| points[i])
        .collect();

    if compressed.is_empty() {
        points.to_vec()
    } else {
        compressed
    }
}

/// Outer boundaries of the top-level connected components of `foreground`
/// (every non-zero pixel). Holes and nested components are ignored. Points are
/// chain-compressed; results come back in raster discovery order.
pub fn find_external_contours(foreground: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(foreground)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            let points: Vec<PixelPoint> = c
                .points
                .iter()
                .map(|p| PixelPoint::new(p.x, p.y))
                .collect();
            Contour::new(compress_chain(&points))
        })
        .collect()
}

/// Rasterize contours as filled regions (interior plus boundary) onto a fresh
/// `width` x `height` mask.
pub fn fill_contours(width: u32, height: u32, contours: &[Contour]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for contour in contours {
        fill_polygon(&mut mask, &contour.points);
    }
    mask
}

fn set_on(mask: &mut GrayImage, x: i32, y: i32) {
    let (width, height) = mask.dimensions();
    if in_bounds(x, y, width, height) {
        mask.put_pixel(x as u32, y as u32, Luma([MASK_ON]));
    }
}

fn fill_polygon(mask: &mut GrayImage, points: &[PixelPoint]) {
    let n = points.len();
    if n == 0 {
        return;
    }

    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);

    // Even-odd scanline fill through pixel centres; half-open edge spans
    // keep shared vertices from being counted twice
    let mut crossings = Vec::new();
    for y in min_y..=max_y {
        crossings.clear();
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            if (a.y <= y && b.y > y) || (b.y <= y && a.y > y) {
                let t = (y - a.y) as f64 / (b.y - a.y) as f64;
                crossings.push(a.x as f64 + t * (b.x - a.x) as f64);
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));
        for pair in crossings.chunks_exact(2) {
            let start = pair[0].ceil() as i32;
            let end = pair[1].floor() as i32;
            for x in start..=end {
                set_on(mask, x, y);
            }
        }
    }

    // Boundary pixels, which the centre test can miss on slanted edges
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        for (x, y) in Bresenham::new((a.x as isize, a.y as isize), (b.x as isize, b.y as isize)) {
            set_on(mask, x as i32, y as i32);
        }
        set_on(mask, b.x, b.y);
    }
}
