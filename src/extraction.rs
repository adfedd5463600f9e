// Contour extraction: find, rank, gap-close and simplify region boundaries

use std::cmp::Ordering;

use geo::{Coord, LineString, Simplify};
use image::{GrayImage, Luma};

use crate::contours::{fill_contours, find_external_contours, Contour, PixelPoint};
use crate::errors::{VectorizeError, Result};
use crate::image_utils::{ensure_non_empty, kernel_side, MASK_ON};
use crate::morphology::close_square;

/// Region to vectorize: every mask pixel that is not fully on
fn fill_region(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let value = mask.get_pixel(x, y)[0];
        Luma([if value != MASK_ON { MASK_ON } else { 0 }])
    })
}

/// Discover outer contours and keep the `largest_n` by enclosed area.
///
/// Point and line fragments (area 0) are ranked like any other contour so
/// the gap-closing pass can still rasterize them. The sort is stable, so
/// equal areas keep raster discovery order.
fn ranked_external_contours(foreground: &GrayImage, largest_n: usize) -> Vec<Contour> {
    let mut ranked: Vec<(f64, Contour)> = find_external_contours(foreground)
        .into_iter()
        .map(|c| (c.area(), c))
        .collect();

    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    ranked.truncate(largest_n);
    ranked.into_iter().map(|(_, c)| c).collect()
}

/// Douglas-Peucker tolerance for a given image size
pub fn simplification_epsilon(simplify_pct: f64, width: u32, height: u32) -> f64 {
    let diagonal = (width as f64).hypot(height as f64);
    simplify_pct * 0.01 * diagonal
}

/// Simplify a closed contour with Douglas-Peucker tolerance `epsilon`.
///
/// If the reduction leaves fewer than three vertices the input is returned
/// unchanged, so a polygon never collapses into a segment.
pub fn simplify_contour(contour: &Contour, epsilon: f64) -> Contour {
    if contour.len() < 3 || epsilon <= 0.0 {
        return contour.clone();
    }

    let mut coords: Vec<Coord<f64>> = contour
        .points
        .iter()
        .map(|p| Coord { x: p.x as f64, y: p.y as f64 })
        .collect();
    coords.push(coords[0]);

    let simplified = LineString::new(coords).simplify(&epsilon);
    let mut points: Vec<PixelPoint> = simplified
        .coords()
        .map(|c| PixelPoint::new(c.x.round() as i32, c.y.round() as i32))
        .collect();

    // Drop the ring's closing duplicate
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    if points.len() >= 3 {
        Contour::new(points)
    } else {
        contour.clone()
    }
}

/// Extract the dominant closed outlines from a binary edge mask.
///
/// Dark mask pixels are the subject. Contours are ranked by area and capped
/// at `largest_n`; with `gap_threshold > 0` the kept contours are filled,
/// morphologically closed and re-extracted so nearby fragments merge; with
/// `simplify_pct > 0` each contour is reduced with a tolerance of that
/// percentage of the image diagonal, and contours that had fewer than three
/// points even before simplification are dropped.
///
/// Without simplification, point and line fragments are returned as found;
/// they cannot be exported and are filtered by the pipeline.
pub fn extract_contours(
    mask: &GrayImage,
    largest_n: usize,
    simplify_pct: f64,
    gap_threshold: f64,
) -> Result<Vec<Contour>> {
    let (width, height) = mask.dimensions();
    ensure_non_empty(width, height, "mask")?;

    if !simplify_pct.is_finite() || simplify_pct < 0.0 {
        return Err(VectorizeError::InvalidInput(format!(
            "simplify_pct must be a non-negative number (got {})",
            simplify_pct
        )));
    }
    if !gap_threshold.is_finite() || gap_threshold < 0.0 {
        return Err(VectorizeError::InvalidInput(format!(
            "gap_threshold must be a non-negative number (got {})",
            gap_threshold
        )));
    }

    let largest_n = largest_n.max(1);

    let mut contours = ranked_external_contours(&fill_region(mask), largest_n);
    if contours.is_empty() {
        log::debug!("No contours found in {}x{} mask", width, height);
        return Ok(contours);
    }
    log::debug!("First pass kept {} contour(s)", contours.len());

    if gap_threshold > 0.0 {
        let side = kernel_side(gap_threshold);
        let combined = fill_contours(width, height, &contours);
        let closed = close_square(&combined, side)?;
        let merged = ranked_external_contours(&closed, largest_n);

        if merged.is_empty() {
            log::debug!("Gap closing produced no contours; keeping first pass");
        } else {
            log::debug!(
                "Gap closing with {}px kernel: {} -> {} contour(s)",
                side,
                contours.len(),
                merged.len()
            );
            contours = merged;
        }
    }

    if simplify_pct > 0.0 {
        let epsilon = simplification_epsilon(simplify_pct, width, height);
        contours = contours
            .iter()
            .filter(|c| {
                if !c.is_polygon() {
                    log::debug!("Dropping {}-point fragment before simplification", c.len());
                }
                c.is_polygon()
            })
            .map(|c| {
                let simplified = simplify_contour(c, epsilon);
                log::debug!("Simplified contour: {} -> {} points", c.len(), simplified.len());
                simplified
            })
            .collect();
    }

    Ok(contours)
}
