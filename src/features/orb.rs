use image::GrayImage;
use image::imageops::{self, FilterType};
use serde::Serialize;

use super::fast::{fast_corners, suppress_non_maximum};
use super::response::{harris_response, sort_by_response};
use crate::error::OperationError;
use crate::models::DetectionResult;

const PYRAMID_LEVELS: u32 = 8;
const DOWNSCALE: f32 = 1.2;
/// 0.08 on the unit intensity scale
const FAST_THRESHOLD: u8 = 20;
const HARRIS_K: f32 = 0.04;
/// Keypoints closer than this to a level's border have no full patch
const PATCH_RADIUS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbParams {
    pub n_keypoints: usize,
}

/// ORB keypoint detection: FAST-9 corners on every pyramid level, ranked by
/// Harris response, strongest `n_keypoints` kept. Coordinates are mapped
/// back to the full-resolution image.
pub fn detect(gray: &GrayImage, params: &OrbParams) -> Result<DetectionResult, OperationError> {
    let (base_w, base_h) = gray.dimensions();
    let mut candidates: Vec<(f32, f32, f32)> = Vec::new();

    for level in 0..PYRAMID_LEVELS {
        let scale = DOWNSCALE.powi(level as i32);
        let w = (base_w as f32 / scale).round() as u32;
        let h = (base_h as f32 / scale).round() as u32;
        if w <= 2 * PATCH_RADIUS || h <= 2 * PATCH_RADIUS {
            break;
        }

        let resized;
        let layer = if level == 0 {
            gray
        } else {
            resized = imageops::resize(gray, w, h, FilterType::Triangle);
            &resized
        };

        let corners = fast_corners(layer, 9, FAST_THRESHOLD)?;
        let corners = suppress_non_maximum(&corners);
        if corners.is_empty() {
            continue;
        }
        let response = harris_response(layer, HARRIS_K, 1.0);

        for c in corners {
            let inside = c.x >= PATCH_RADIUS
                && c.y >= PATCH_RADIUS
                && c.x < w - PATCH_RADIUS
                && c.y < h - PATCH_RADIUS;
            if inside {
                let r = response.get_pixel(c.x, c.y)[0];
                candidates.push((c.y as f32 * scale, c.x as f32 * scale, r));
            }
        }
    }

    sort_by_response(&mut candidates);
    candidates.truncate(params.n_keypoints);

    let (coordinates, responses) = candidates.into_iter().map(|(r, c, v)| ((r, c), v)).unzip();
    DetectionResult::new(coordinates, responses)
}
