//! Float-image helpers shared by the corner and blob detectors.

use image::buffer::ConvertBuffer;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Intensities scaled to [0, 1]
pub fn to_unit(img: &GrayImage) -> FloatImage {
    img.convert()
}

/// `gaussian_blur_f32`, with a non-positive sigma meaning "no blur"
pub fn gaussian_blur(img: &FloatImage, sigma: f32) -> FloatImage {
    if sigma <= 0.0 {
        return img.clone();
    }
    gaussian_blur_f32(img, sigma)
}

/// Harris corner measure `det(A) - k * trace(A)^2`, where A is the
/// Gaussian-weighted structure tensor of the unit-scaled Sobel gradients.
pub fn harris_response(img: &GrayImage, k: f32, sigma: f32) -> FloatImage {
    let gx = horizontal_sobel(img);
    let gy = vertical_sobel(img);
    // 4 for the kernel weights, 255 for the intensity range
    let norm = 4.0 * 255.0;
    let (w, h) = img.dimensions();

    let mut ixx = FloatImage::new(w, h);
    let mut iyy = FloatImage::new(w, h);
    let mut ixy = FloatImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let dx = gx.get_pixel(x, y)[0] as f32 / norm;
            let dy = gy.get_pixel(x, y)[0] as f32 / norm;
            ixx.put_pixel(x, y, Luma([dx * dx]));
            iyy.put_pixel(x, y, Luma([dy * dy]));
            ixy.put_pixel(x, y, Luma([dx * dy]));
        }
    }

    let axx = gaussian_blur(&ixx, sigma);
    let ayy = gaussian_blur(&iyy, sigma);
    let axy = gaussian_blur(&ixy, sigma);

    FloatImage::from_fn(w, h, |x, y| {
        let a = axx.get_pixel(x, y)[0];
        let b = ayy.get_pixel(x, y)[0];
        let c = axy.get_pixel(x, y)[0];
        let det = a * b - c * c;
        let trace = a + b;
        Luma([det - k * trace * trace])
    })
}

/// Sort (row, col, response) triples strongest first; ties fall back to
/// position so results are deterministic.
pub fn sort_by_response(points: &mut [(f32, f32, f32)]) {
    points.sort_by(|a, b| {
        b.2.total_cmp(&a.2)
            .then(a.0.total_cmp(&b.0))
            .then(a.1.total_cmp(&b.1))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unit_scale_maps_full_range() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
        let unit = to_unit(&img);
        assert_relative_eq!(unit.get_pixel(0, 0)[0], 0.0);
        assert_relative_eq!(unit.get_pixel(1, 0)[0], 1.0);
    }

    #[test]
    fn zero_sigma_leaves_image_untouched() {
        let img = FloatImage::from_fn(5, 4, |x, y| Luma([(x * y) as f32]));
        assert_eq!(gaussian_blur(&img, 0.0), img);
    }

    #[test]
    fn harris_is_zero_on_flat_image() {
        let img = GrayImage::from_pixel(16, 16, Luma([128]));
        let response = harris_response(&img, 0.05, 1.0);
        assert!(response.pixels().all(|p| p[0] == 0.0));
    }
}
