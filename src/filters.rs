// Smoothing filters applied ahead of edge detection

use image::GrayImage;
use imageproc::filter::separable_filter_equal;

use crate::image_utils::force_odd;

/// Half-width of the bilateral window for a neighbourhood `diameter`.
///
/// A zero diameter derives the half-width from `sigma_space` (1.5 sigma).
pub fn bilateral_radius(diameter: u32, sigma_space: f64) -> u32 {
    let radius = if diameter > 0 {
        diameter / 2
    } else if sigma_space.is_finite() && sigma_space > 0.0 {
        (sigma_space * 1.5).round() as u32
    } else {
        1
    };
    radius.max(1)
}

/// Edge-preserving bilateral filter on a grayscale image.
///
/// Adapts the diameter/sigma parameter set onto
/// `imageproc::filter::bilateral_filter`, which takes a half-width window.
/// Non-positive sigmas fall back to 1.
pub fn bilateral_filter(
    image: &GrayImage,
    diameter: u32,
    sigma_color: f64,
    sigma_space: f64,
) -> GrayImage {
    let sigma_color = if sigma_color > 0.0 { sigma_color } else { 1.0 };
    let sigma_space = if sigma_space > 0.0 { sigma_space } else { 1.0 };
    let radius = bilateral_radius(diameter, sigma_space);

    imageproc::filter::bilateral_filter(image, radius, sigma_color as f32, sigma_space as f32)
}

/// 1D Gaussian kernel of `size` taps, sigma derived from the size
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = force_odd(size.max(1));
    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i32;

    let raw: Vec<f64> = (-half..=half)
        .map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f64 = raw.iter().sum();

    raw.iter().map(|w| (w / total) as f32).collect()
}

/// Gaussian blur with an explicit kernel size (even sizes are bumped to odd)
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    let kernel = gaussian_kernel(kernel_size);
    separable_filter_equal(image, &kernel)
}
