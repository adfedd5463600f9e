// Manual edits layered on top of extracted contours

use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::contours::{Contour, PixelPoint};
use crate::errors::Result;

/// Vertices used to approximate a circle or ellipse
pub const CIRCLE_SEGMENTS: usize = 16;

/// Point in scene (pixel) coordinates as produced by a pointer device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenePoint {
    pub x: f64,
    pub y: f64,
}

impl ScenePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Truncate toward zero onto the pixel grid
    fn to_pixel(self) -> PixelPoint {
        PixelPoint::new(self.x as i32, self.y as i32)
    }
}

/// User-drawn geometry, described by the drag that created it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeSpec {
    /// Axis-aligned rectangle spanned by two opposite corners
    Rectangle { start: ScenePoint, end: ScenePoint },
    /// Isosceles triangle inside the drag rectangle; the apex sits on the
    /// start row and the base on the end row
    Triangle { start: ScenePoint, end: ScenePoint },
    /// Ellipse inscribed in the drag rectangle
    Circle { start: ScenePoint, end: ScenePoint },
    /// Freehand stroke, closed back to its first point
    Freehand { points: Vec<ScenePoint> },
}

impl ShapeSpec {
    pub fn to_contour(&self) -> Contour {
        match self {
            ShapeSpec::Rectangle { start, end } => {
                let (left, right) = (start.x.min(end.x), start.x.max(end.x));
                let (top, bottom) = (start.y.min(end.y), start.y.max(end.y));
                Contour::new(
                    [(left, top), (right, top), (right, bottom), (left, bottom)]
                        .iter()
                        .map(|&(x, y)| ScenePoint::new(x, y).to_pixel())
                        .collect(),
                )
            }
            ShapeSpec::Triangle { start, end } => {
                let mid_x = (start.x + end.x) / 2.0;
                let corners = if end.y < start.y {
                    // Dragged upward: base along the end row, apex down at the start row
                    [
                        ScenePoint::new(start.x, end.y),
                        ScenePoint::new(end.x, end.y),
                        ScenePoint::new(mid_x, start.y),
                    ]
                } else {
                    [
                        ScenePoint::new(start.x, start.y),
                        ScenePoint::new(end.x, start.y),
                        ScenePoint::new(mid_x, end.y),
                    ]
                };
                Contour::new(corners.iter().map(|p| p.to_pixel()).collect())
            }
            ShapeSpec::Circle { start, end } => {
                let center_x = (start.x + end.x) / 2.0;
                let center_y = (start.y + end.y) / 2.0;
                let radius_x = (end.x - start.x).abs() / 2.0;
                let radius_y = (end.y - start.y).abs() / 2.0;
                Contour::new(
                    (0..CIRCLE_SEGMENTS)
                        .map(|i| {
                            let angle = 2.0 * PI * i as f64 / CIRCLE_SEGMENTS as f64;
                            ScenePoint::new(
                                center_x + radius_x * angle.cos(),
                                center_y + radius_y * angle.sin(),
                            )
                            .to_pixel()
                        })
                        .collect(),
                )
            }
            ShapeSpec::Freehand { points } => {
                Contour::new(points.iter().map(|p| p.to_pixel()).collect())
            }
        }
    }
}

/// Combine extracted contours with the user's erasures and additions.
///
/// Contours listed in `erased_contours` are dropped whole. Remaining contours
/// lose every point whose `(contour index, point index)` is in
/// `erased_points` and are kept only while they still have three points.
/// `manual_contours` are appended as-is, after the extracted ones.
pub fn merge_for_export(
    extracted: &[Contour],
    erased_contours: &BTreeSet<usize>,
    erased_points: &BTreeSet<(usize, usize)>,
    manual_contours: &[Contour],
) -> Vec<Contour> {
    let mut merged: Vec<Contour> = extracted
        .iter()
        .enumerate()
        .filter(|(i, _)| !erased_contours.contains(i))
        .filter_map(|(i, contour)| {
            let points: Vec<PixelPoint> = contour
                .points
                .iter()
                .enumerate()
                .filter(|(j, _)| !erased_points.contains(&(i, *j)))
                .map(|(_, p)| *p)
                .collect();
            if points.len() >= 3 {
                Some(Contour::new(points))
            } else {
                None
            }
        })
        .collect();

    merged.extend(manual_contours.iter().cloned());
    merged
}

/// Editing state owned by the caller between pipeline runs.
///
/// Indices refer to the most recent extraction result, so the erasure sets
/// must be reset whenever a new image is loaded or extraction is rerun.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub erased_contours: BTreeSet<usize>,
    #[serde(default)]
    pub erased_points: BTreeSet<(usize, usize)>,
    #[serde(default)]
    pub manual_shapes: Vec<ShapeSpec>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load annotations from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save annotations as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn erase_contour(&mut self, contour_index: usize) {
        self.erased_contours.insert(contour_index);
    }

    pub fn erase_point(&mut self, contour_index: usize, point_index: usize) {
        self.erased_points.insert((contour_index, point_index));
    }

    pub fn add_shape(&mut self, shape: ShapeSpec) {
        self.manual_shapes.push(shape);
    }

    /// Remove a manual shape as a whole; returns it if the index existed
    pub fn remove_shape(&mut self, index: usize) -> Option<ShapeSpec> {
        if index < self.manual_shapes.len() {
            Some(self.manual_shapes.remove(index))
        } else {
            None
        }
    }

    /// Forget erasures that point into a previous extraction result
    pub fn reset_erasures(&mut self) {
        self.erased_contours.clear();
        self.erased_points.clear();
    }

    pub fn reset(&mut self) {
        self.reset_erasures();
        self.manual_shapes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.erased_contours.is_empty() && self.erased_points.is_empty() && self.manual_shapes.is_empty()
    }

    /// Manual shapes as contours, in creation order
    pub fn manual_contours(&self) -> Vec<Contour> {
        self.manual_shapes.iter().map(ShapeSpec::to_contour).collect()
    }

    pub fn merge(&self, extracted: &[Contour]) -> Vec<Contour> {
        merge_for_export(
            extracted,
            &self.erased_contours,
            &self.erased_points,
            &self.manual_contours(),
        )
    }
}
