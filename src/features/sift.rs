use image::{GrayImage, Luma};
use serde::Serialize;

use super::response::{FloatImage, gaussian_blur, sort_by_response, to_unit};
use crate::error::OperationError;
use crate::models::DetectionResult;

const SIGMA: f32 = 1.6;
/// Blur assumed to be present in the input already
const INPUT_SIGMA: f32 = 0.5;
const INTERVALS: usize = 3;
const CONTRAST_THRESHOLD: f32 = 0.04;
const EDGE_RATIO: f32 = 10.0;
const MIN_OCTAVE_SIZE: u32 = 16;
const BORDER: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiftParams {
    pub n_keypoints: usize,
}

/// Difference-of-Gaussians scale-space extrema, filtered for contrast and
/// edge response; the strongest `n_keypoints` by |DoG| are kept.
pub fn detect(gray: &GrayImage, params: &SiftParams) -> Result<DetectionResult, OperationError> {
    let prefilter = 0.5 * CONTRAST_THRESHOLD / INTERVALS as f32;
    let contrast = CONTRAST_THRESHOLD / INTERVALS as f32;
    let edge_limit = (EDGE_RATIO + 1.0).powi(2) / EDGE_RATIO;

    let mut base = gaussian_blur(&to_unit(gray), (SIGMA * SIGMA - INPUT_SIGMA * INPUT_SIGMA).sqrt());
    let mut candidates: Vec<(f32, f32, f32)> = Vec::new();
    let mut octave_scale = 1.0f32;

    while base.width() >= MIN_OCTAVE_SIZE && base.height() >= MIN_OCTAVE_SIZE {
        let gaussians = octave_gaussians(&base);
        let dogs: Vec<FloatImage> = gaussians
            .windows(2)
            .map(|pair| difference(&pair[1], &pair[0]))
            .collect();

        let (w, h) = base.dimensions();
        for i in 1..=INTERVALS {
            for y in BORDER..h.saturating_sub(BORDER) {
                for x in BORDER..w.saturating_sub(BORDER) {
                    let v = dogs[i].get_pixel(x, y)[0];
                    if v.abs() <= prefilter || !is_extremum(&dogs[i - 1..=i + 1], x, y, v) {
                        continue;
                    }
                    if v.abs() < contrast || is_edge(&dogs[i], x, y, edge_limit) {
                        continue;
                    }
                    candidates.push((y as f32 * octave_scale, x as f32 * octave_scale, v.abs()));
                }
            }
        }

        base = downsample(&gaussians[INTERVALS]);
        octave_scale *= 2.0;
    }

    sort_by_response(&mut candidates);
    candidates.truncate(params.n_keypoints);

    let (coordinates, responses) = candidates.into_iter().map(|(r, c, v)| ((r, c), v)).unzip();
    DetectionResult::new(coordinates, responses)
}

/// `INTERVALS + 3` progressively blurred images of one octave
fn octave_gaussians(base: &FloatImage) -> Vec<FloatImage> {
    let k = 2f32.powf(1.0 / INTERVALS as f32);
    let mut images = vec![base.clone()];
    let mut previous = SIGMA;
    for _ in 1..INTERVALS + 3 {
        let total = previous * k;
        let step = (total * total - previous * previous).sqrt();
        let next = gaussian_blur(images.last().unwrap_or(base), step);
        images.push(next);
        previous = total;
    }
    images
}

fn difference(a: &FloatImage, b: &FloatImage) -> FloatImage {
    FloatImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0] - b.get_pixel(x, y)[0]])
    })
}

/// Every second pixel in both directions
fn downsample(img: &FloatImage) -> FloatImage {
    FloatImage::from_fn(img.width() / 2, img.height() / 2, |x, y| *img.get_pixel(x * 2, y * 2))
}

/// `v` is the max or min of its 3×3×3 neighbourhood across adjacent scales
fn is_extremum(layers: &[FloatImage], x: u32, y: u32, v: f32) -> bool {
    let mut is_max = true;
    let mut is_min = true;
    for layer in layers {
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                let n = layer.get_pixel(nx, ny)[0];
                if n > v {
                    is_max = false;
                }
                if n < v {
                    is_min = false;
                }
            }
        }
        if !is_max && !is_min {
            return false;
        }
    }
    is_max || is_min
}

/// Principal curvature ratio test on the 2D Hessian
fn is_edge(dog: &FloatImage, x: u32, y: u32, limit: f32) -> bool {
    let d = |dx: i64, dy: i64| dog.get_pixel((x as i64 + dx) as u32, (y as i64 + dy) as u32)[0];
    let centre = d(0, 0);
    let dxx = d(1, 0) + d(-1, 0) - 2.0 * centre;
    let dyy = d(0, 1) + d(0, -1) - 2.0 * centre;
    let dxy = (d(1, 1) - d(-1, 1) - d(1, -1) + d(-1, -1)) / 4.0;
    let trace = dxx + dyy;
    let det = dxx * dyy - dxy * dxy;
    det <= 0.0 || trace * trace / det >= limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_circle_mut;

    #[test]
    fn detects_an_isolated_blob() {
        let mut img = GrayImage::from_pixel(64, 64, Luma([20]));
        draw_filled_circle_mut(&mut img, (32, 32), 4, Luma([230]));
        let result = detect(&img, &SiftParams { n_keypoints: 10 }).unwrap();
        assert!(!result.is_empty());
        let &(row, col) = result.coordinates().first().unwrap();
        assert!((row - 32.0).abs() <= 3.0 && (col - 32.0).abs() <= 3.0);
    }

    #[test]
    fn respects_keypoint_budget() {
        let img = crate::gallery::checkerboard(96, 96, 8);
        let result = detect(&img, &SiftParams { n_keypoints: 5 }).unwrap();
        assert!(result.len() <= 5);
    }
}
