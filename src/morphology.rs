use image::GrayImage;

use crate::errors::{VectorizeError, Result};
use crate::image_utils::ensure_non_empty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Max,
    Min,
}

/// Window of a square kernel along one axis: `[i - anchor, i - anchor + side)`
#[inline]
fn window(i: i32, side: u32, limit: u32) -> (u32, u32) {
    let anchor = (side / 2) as i32;
    let start = (i - anchor).max(0);
    let end = (i - anchor + side as i32 - 1).min(limit as i32 - 1);
    (start as u32, end as u32)
}

/// Square min/max filter, applied as a horizontal pass then a vertical pass.
/// Pixels outside the image never contribute.
fn square_extremum(mask: &GrayImage, side: u32, extremum: Extremum) -> GrayImage {
    let (width, height) = mask.dimensions();
    let pick = |a: u8, b: u8| match extremum {
        Extremum::Max => a.max(b),
        Extremum::Min => a.min(b),
    };
    let seed = match extremum {
        Extremum::Max => u8::MIN,
        Extremum::Min => u8::MAX,
    };

    let mut horizontal = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let (start, end) = window(x as i32, side, width);
            let mut value = seed;
            for sx in start..=end {
                value = pick(value, mask.get_pixel(sx, y)[0]);
            }
            horizontal.get_pixel_mut(x, y)[0] = value;
        }
    }

    let mut result = GrayImage::new(width, height);
    for y in 0..height {
        let (start, end) = window(y as i32, side, height);
        for x in 0..width {
            let mut value = seed;
            for sy in start..=end {
                value = pick(value, horizontal.get_pixel(x, sy)[0]);
            }
            result.get_pixel_mut(x, y)[0] = value;
        }
    }

    result
}

fn check_kernel(mask: &GrayImage, side: u32) -> Result<()> {
    ensure_non_empty(mask.width(), mask.height(), "mask")?;
    if side == 0 {
        return Err(VectorizeError::InvalidInput(
            "Kernel size must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Dilate with a `side` x `side` square of ones (one iteration)
pub fn dilate_square(mask: &GrayImage, side: u32) -> Result<GrayImage> {
    check_kernel(mask, side)?;
    if side == 1 {
        return Ok(mask.clone());
    }
    Ok(square_extremum(mask, side, Extremum::Max))
}

/// Erode with a `side` x `side` square of ones (one iteration)
pub fn erode_square(mask: &GrayImage, side: u32) -> Result<GrayImage> {
    check_kernel(mask, side)?;
    if side == 1 {
        return Ok(mask.clone());
    }
    Ok(square_extremum(mask, side, Extremum::Min))
}

/// Morphological closing: dilation followed by erosion with the same square
pub fn close_square(mask: &GrayImage, side: u32) -> Result<GrayImage> {
    let dilated = dilate_square(mask, side)?;
    erode_square(&dilated, side)
}
