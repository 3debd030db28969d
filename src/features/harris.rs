use image::GrayImage;
use serde::Serialize;

use imageproc::corners::Corner;
use imageproc::suppress::local_maxima;

use super::response::{FloatImage, harris_response, sort_by_response};
use crate::error::OperationError;
use crate::models::DetectionResult;

/// Window sigma of the structure tensor
const WINDOW_SIGMA: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HarrisParams {
    /// Minimum separation (Chebyshev) between reported corners, also the
    /// excluded border width
    pub min_distance: u32,
    /// Sensitivity factor of the corner measure
    pub k: f64,
    /// Peaks must exceed this fraction of the strongest response
    pub threshold_rel: f64,
}

/// Harris corners: response map, then thresholded and spaced peaks.
pub fn detect(gray: &GrayImage, params: &HarrisParams) -> Result<DetectionResult, OperationError> {
    let response = harris_response(gray, params.k as f32, WINDOW_SIGMA);
    let peaks = corner_peaks(&response, params.min_distance, params.threshold_rel as f32);

    let (coordinates, responses) = peaks.into_iter().map(|(r, c, v)| ((r, c), v)).unzip();
    DetectionResult::new(coordinates, responses)
}

/// Local maxima of `response` as (row, col, value), strongest first.
///
/// A peak must be the best candidate in its `(2 * min_distance + 1)`
/// window, lie strictly above `threshold_rel * max`, stay `min_distance`
/// away from the border, and be more than `min_distance` (Chebyshev) from
/// every stronger peak already kept.
pub fn corner_peaks(response: &FloatImage, min_distance: u32, threshold_rel: f32) -> Vec<(f32, f32, f32)> {
    let (w, h) = response.dimensions();
    let max = response.pixels().map(|p| p[0]).fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() || max <= 0.0 {
        return Vec::new();
    }
    let threshold = threshold_rel * max;

    let above: Vec<Corner> = response
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > threshold)
        .map(|(x, y, p)| Corner::new(x, y, p[0]))
        .collect();

    let border = min_distance;
    let mut candidates: Vec<(f32, f32, f32)> = local_maxima(&above, min_distance.max(1))
        .into_iter()
        .filter(|c| {
            c.x >= border && c.y >= border && c.x < w.saturating_sub(border) && c.y < h.saturating_sub(border)
        })
        .map(|c| (c.y as f32, c.x as f32, c.score))
        .collect();
    sort_by_response(&mut candidates);

    let spacing = min_distance as f32;
    let mut kept: Vec<(f32, f32, f32)> = Vec::new();
    for candidate in candidates {
        let crowded = kept.iter().any(|k| {
            (k.0 - candidate.0).abs().max((k.1 - candidate.1).abs()) <= spacing
        });
        if !crowded {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn finds_the_corner_of_a_bright_square() {
        let mut img = GrayImage::from_pixel(40, 40, Luma([0]));
        for y in 10..30 {
            for x in 10..30 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let params = HarrisParams {
            min_distance: 3,
            k: 0.05,
            threshold_rel: 0.1,
        };
        let result = detect(&img, &params).unwrap();
        let near = |v: f32, target: f32| (v - target).abs() <= 2.0;
        for &(row, col) in result.coordinates() {
            let on_corner = (near(row, 10.0) || near(row, 29.0)) && (near(col, 10.0) || near(col, 29.0));
            assert!(on_corner, "unexpected corner at ({}, {})", row, col);
        }
        for (r, c) in [(10.0, 10.0), (10.0, 29.0), (29.0, 10.0), (29.0, 29.0)] {
            assert!(
                result.coordinates().iter().any(|&(row, col)| near(row, r) && near(col, c)),
                "missing corner near ({}, {})",
                r,
                c
            );
        }
    }

    #[test]
    fn blank_image_has_no_corners() {
        let img = GrayImage::from_pixel(32, 32, Luma([90]));
        let params = HarrisParams {
            min_distance: 5,
            k: 0.05,
            threshold_rel: 0.01,
        };
        assert!(detect(&img, &params).unwrap().is_empty());
    }
}
