use image::{DynamicImage, GrayImage, Luma, RgbImage};

use crate::errors::{VectorizeError, Result};

/// Mask value marking "on" pixels
pub const MASK_ON: u8 = 255;

/// Fixed-point BT.601 luma weights (sum to 1 << 14)
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Reject images with a zero dimension
pub fn ensure_non_empty(width: u32, height: u32, what: &str) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(VectorizeError::InvalidInput(format!(
            "{} is empty ({}x{})", what, width, height
        )));
    }
    Ok(())
}

/// Convert an RGB image to single-channel luma (0.299 R + 0.587 G + 0.114 B)
pub fn rgb_to_gray(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = (r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B
            + (1 << (LUMA_SHIFT - 1)))
            >> LUMA_SHIFT;
        gray.put_pixel(x, y, Luma([luma.min(255) as u8]));
    }

    gray
}

/// Grayscale view of any decoded image; single-channel inputs pass through
pub fn to_grayscale(image: &DynamicImage) -> Result<GrayImage> {
    ensure_non_empty(image.width(), image.height(), "image")?;

    Ok(match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => rgb_to_gray(&other.to_rgb8()),
    })
}

/// Accept a decoded image as a mask only if it is single-channel 8-bit
pub fn mask_from_image(image: &DynamicImage) -> Result<GrayImage> {
    match image {
        DynamicImage::ImageLuma8(mask) => {
            ensure_non_empty(mask.width(), mask.height(), "mask")?;
            Ok(mask.clone())
        }
        other => Err(VectorizeError::InvalidInput(format!(
            "mask must have exactly one 8-bit channel (got {:?})",
            other.color()
        ))),
    }
}

/// Bump an even kernel size to the next odd value
#[inline]
pub fn force_odd(size: u32) -> u32 {
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

/// Side length of a square kernel from a fractional setting: floor, at least 1
#[inline]
pub fn kernel_side(setting: f64) -> u32 {
    if setting.is_finite() && setting >= 1.0 {
        setting.floor() as u32
    } else {
        1
    }
}

/// Flip every pixel of a mask (255 - value)
pub fn invert_mask(mask: &mut GrayImage) {
    for pixel in mask.pixels_mut() {
        pixel.0[0] = 255 - pixel.0[0];
    }
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn gaussian_kernel_is_forced_odd() {
        assert_eq!(force_odd(4), 5);
        assert_eq!(force_odd(6), 7);
        assert_eq!(force_odd(3), 3);
        assert_eq!(force_odd(9), 9);
    }

    #[test]
    fn kernel_side_floors_and_clamps() {
        assert_eq!(kernel_side(3.0), 3);
        assert_eq!(kernel_side(1.5), 1);
        assert_eq!(kernel_side(0.0), 1);
        assert_eq!(kernel_side(6.9), 6);
        assert_eq!(kernel_side(f64::NAN), 1);
    }

    #[test]
    fn luma_uses_bt601_weights() {
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([255, 255, 255]));
        let gray = rgb_to_gray(&img);
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn empty_image_is_invalid_input() {
        let img = DynamicImage::new_rgb8(0, 10);
        assert!(to_grayscale(&img).is_err());
    }

    #[test]
    fn color_image_is_not_a_mask() {
        let img = DynamicImage::new_rgb8(4, 4);
        let err = mask_from_image(&img).unwrap_err();
        assert!(matches!(err, VectorizeError::InvalidInput(_)));

        let gray = DynamicImage::new_luma8(4, 4);
        assert!(mask_from_image(&gray).is_ok());
    }
}
