use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

pub const KEYPOINT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const KEYPOINT_RADIUS: i32 = 2;

/// Copy of `image` as RGB with a filled dot at every (row, col) coordinate.
///
/// With no coordinates the result is just the RGB conversion of `image`.
pub fn draw_keypoints(image: &DynamicImage, coordinates: &[(f32, f32)]) -> RgbImage {
    let mut marked = image.to_rgb8();
    for &(row, col) in coordinates {
        draw_filled_circle_mut(
            &mut marked,
            (col.round() as i32, row.round() as i32),
            KEYPOINT_RADIUS,
            KEYPOINT_COLOR,
        );
    }
    marked
}

/// Marker shape for point overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossStyle {
    /// Diagonal cross
    X,
    /// Upright cross
    Plus,
}

/// Draw crosses centered on (x, y) points.
pub fn draw_crosses(canvas: &mut RgbImage, points: &[(f32, f32)], color: Rgb<u8>, style: CrossStyle) {
    const ARM: f32 = 5.0;
    for &(x, y) in points {
        let segments = match style {
            CrossStyle::X => [
                ((x - ARM, y - ARM), (x + ARM, y + ARM)),
                ((x - ARM, y + ARM), (x + ARM, y - ARM)),
            ],
            CrossStyle::Plus => [((x - ARM, y), (x + ARM, y)), ((x, y - ARM), (x, y + ARM))],
        };
        for (start, end) in segments {
            draw_line_segment_mut(canvas, start, end, color);
            // second pass one pixel over so markers stay visible when scaled
            draw_line_segment_mut(canvas, (start.0 + 1.0, start.1), (end.0 + 1.0, end.1), color);
        }
    }
}
