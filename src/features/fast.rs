use image::GrayImage;
use imageproc::corners::{Corner, corners_fast9, corners_fast12};
use imageproc::suppress::local_maxima;
use serde::Serialize;

use crate::error::OperationError;
use crate::models::DetectionResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FastParams {
    /// Contiguous arc length of the segment test (9 or 12)
    pub n: u32,
    /// Intensity difference on the 0-255 scale
    pub threshold: u8,
}

/// FAST corners with 3×3 non-maximum suppression on the corner score
pub fn detect(gray: &GrayImage, params: &FastParams) -> Result<DetectionResult, OperationError> {
    let corners = fast_corners(gray, params.n, params.threshold)?;
    let kept = suppress_non_maximum(&corners);

    let coordinates = kept.iter().map(|c| (c.y as f32, c.x as f32)).collect();
    let responses = kept.iter().map(|c| c.score).collect();
    DetectionResult::new(coordinates, responses)
}

/// Raw segment-test corners (no suppression)
pub fn fast_corners(gray: &GrayImage, n: u32, threshold: u8) -> Result<Vec<Corner>, OperationError> {
    match n {
        9 => Ok(corners_fast9(gray, threshold)),
        12 => Ok(corners_fast12(gray, threshold)),
        other => Err(OperationError::Failed(format!(
            "FAST arc length must be 9 or 12, got {}",
            other
        ))),
    }
}

/// Keep corners whose score is the best in their 3×3 neighbourhood,
/// in raster order.
pub fn suppress_non_maximum(corners: &[Corner]) -> Vec<Corner> {
    let mut kept = local_maxima(corners, 1);
    kept.sort_by_key(|c| (c.y, c.x));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn neighbouring_corners_keep_only_the_strongest() {
        let corners = vec![Corner::new(5, 5, 10.0), Corner::new(6, 5, 30.0), Corner::new(20, 20, 5.0)];
        let kept = suppress_non_maximum(&corners);
        assert_eq!(kept, vec![Corner::new(6, 5, 30.0), Corner::new(20, 20, 5.0)]);
    }

    #[test]
    fn bright_square_gives_scored_corners() {
        let mut img = GrayImage::from_pixel(32, 32, Luma([20]));
        for y in 8..24 {
            for x in 8..24 {
                img.put_pixel(x, y, Luma([220]));
            }
        }
        let result = detect(&img, &FastParams { n: 9, threshold: 30 }).unwrap();
        assert!(!result.is_empty());
        assert_eq!(result.responses().len(), result.len());
        assert!(result.responses().iter().all(|&r| r > 0.0));
    }

    #[test]
    fn unsupported_arc_length_fails() {
        let img = GrayImage::new(16, 16);
        assert!(fast_corners(&img, 10, 20).is_err());
    }
}
