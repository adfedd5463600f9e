use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// Black axis-aligned square (`x0..x1`, `y0..y1`, exclusive) on a white RGB canvas.
pub fn square_on_white(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> DynamicImage {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    let img = RgbImage::from_fn(width, height, |x, y| {
        if x >= x0 && x < x1 && y >= y0 && y < y1 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    DynamicImage::ImageRgb8(img)
}

/// White mask with dark rectangular blobs given as inclusive `(x0, y0, x1, y1)`.
pub fn mask_with_blobs(width: u32, height: u32, blobs: &[(u32, u32, u32, u32)]) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let inside = blobs
            .iter()
            .any(|&(x0, y0, x1, y1)| x >= x0 && x <= x1 && y >= y0 && y <= y1);
        Luma([if inside { 0 } else { 255 }])
    })
}

/// White mask with a dark one-pixel-wide square outline (inclusive corners).
pub fn mask_with_ring(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let on_vertical = (x == x0 || x == x1) && y >= y0 && y <= y1;
        let on_horizontal = (y == y0 || y == y1) && x >= x0 && x <= x1;
        Luma([if on_vertical || on_horizontal { 0 } else { 255 }])
    })
}
