// Edge mask construction: grayscale -> bilateral -> gaussian -> canny -> dilate -> invert

use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;

use crate::config::Parameters;
use crate::errors::Result;
use crate::filters::{bilateral_filter, gaussian_blur};
use crate::image_utils::{force_odd, invert_mask, kernel_side, to_grayscale};
use crate::morphology::dilate_square;

/// Hysteresis thresholds actually handed to the edge detector.
///
/// An upper threshold below the lower one is legal: the strong threshold is
/// raised to meet the lower one, which removes the weak band.
pub fn hysteresis_thresholds(params: &Parameters) -> (f32, f32) {
    let low = params.canny_lower.max(0.0) as f32;
    let high = params.canny_upper.max(params.canny_lower).max(0.0) as f32;
    (low, high)
}

/// Build the thickened binary edge mask for `image`.
///
/// Output pixels are 0 or 255 and the mask has the input's dimensions. With
/// `params.invert` the edges are 0 on a 255 background.
pub fn build_edge_mask(image: &DynamicImage, params: &Parameters) -> Result<GrayImage> {
    let gray = to_grayscale(image)?;
    let (width, height) = gray.dimensions();

    let smoothed = bilateral_filter(
        &gray,
        params.bilateral_diameter,
        params.bilateral_sigma_color,
        params.bilateral_sigma_space,
    );

    let kernel_size = force_odd(params.gaussian_kernel_size);
    let blurred = gaussian_blur(&smoothed, kernel_size);

    if params.canny_upper < params.canny_lower {
        log::warn!(
            "canny_upper {} < canny_lower {}; weak edges will not be linked",
            params.canny_upper, params.canny_lower
        );
    }
    let (low, high) = hysteresis_thresholds(params);
    let edges = canny(&blurred, low, high);

    let thickness = kernel_side(params.edge_thickness);
    let mut mask = dilate_square(&edges, thickness)?;

    if params.invert {
        invert_mask(&mut mask);
    }

    log::debug!(
        "Edge mask {}x{}: gaussian {}, canny {}/{}, thickness {}, invert {}",
        width, height, kernel_size, low, high, thickness, params.invert
    );

    Ok(mask)
}
