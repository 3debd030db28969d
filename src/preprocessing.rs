use image::{DynamicImage, GrayImage, Luma, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::error::OperationError;

/// Blur imageproc's Canny always applies before computing gradients
const CANNY_INTERNAL_SIGMA: f32 = 1.4;

/// Canny thresholds are given for intensities in [0, 1]; imageproc works on
/// raw 8-bit gradients.
pub const CANNY_THRESHOLD_SCALE: f32 = 255.0;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

fn check_sigma(sigma: f32) -> Result<(), OperationError> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(())
    } else {
        Err(OperationError::Failed(format!("sigma must be positive, got {}", sigma)))
    }
}

/// Apply Gaussian blur to a single-channel image
pub fn apply_blur(img: &GrayImage, sigma: f32) -> Result<GrayImage, OperationError> {
    check_sigma(sigma)?;
    Ok(gaussian_blur_f32(img, sigma))
}

/// Apply Gaussian blur to each color channel independently
pub fn apply_blur_rgb(img: &RgbImage, sigma: f32) -> Result<RgbImage, OperationError> {
    check_sigma(sigma)?;
    Ok(gaussian_blur_f32(img, sigma))
}

/// Median over a square window of side `2 * radius + 1`
pub fn apply_median(img: &GrayImage, radius: u32) -> GrayImage {
    median_filter(img, radius, radius)
}

pub fn apply_median_rgb(img: &RgbImage, radius: u32) -> RgbImage {
    median_filter(img, radius, radius)
}

/// Sobel gradient magnitude scaled so a full black-to-white step maps to
/// about 0.71 of the intensity range (kernel normalised by 4, magnitude by
/// sqrt 2).
pub fn sobel_magnitude(img: &GrayImage) -> GrayImage {
    let gx = horizontal_sobel(img);
    let gy = vertical_sobel(img);
    let norm = 4.0 * std::f32::consts::SQRT_2;

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let dx = gx.get_pixel(x, y)[0] as f32;
        let dy = gy.get_pixel(x, y)[0] as f32;
        let magnitude = (dx * dx + dy * dy).sqrt() / norm;
        Luma([magnitude.round().min(255.0) as u8])
    })
}

/// Detect edges using Canny edge detector.
///
/// `sigma` is the total smoothing; imageproc's own blur is accounted for
/// by pre-blurring with the remainder. Thresholds are in unit intensity.
pub fn detect_edges(
    img: &GrayImage,
    sigma: f32,
    low_threshold: f32,
    high_threshold: f32,
) -> Result<GrayImage, OperationError> {
    check_sigma(sigma)?;
    if low_threshold > high_threshold {
        return Err(OperationError::Failed(format!(
            "low threshold {} exceeds high threshold {}",
            low_threshold, high_threshold
        )));
    }

    let extra = (sigma * sigma - CANNY_INTERNAL_SIGMA * CANNY_INTERNAL_SIGMA).max(0.0).sqrt();
    let smoothed;
    let input = if extra > 0.0 {
        smoothed = gaussian_blur_f32(img, extra);
        &smoothed
    } else {
        img
    };

    Ok(canny(
        input,
        low_threshold * CANNY_THRESHOLD_SCALE,
        high_threshold * CANNY_THRESHOLD_SCALE,
    ))
}
