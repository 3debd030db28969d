//! Smoothing and gradient filters (module 1).

use image::DynamicImage;
use serde::Serialize;

use crate::error::OperationError;
use crate::models::{ColorParameters, LogValue, parameter_fields};
use crate::pipeline::{Operation, OperationSpec, OperationTable, is_multichannel};
use crate::preprocessing;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaussianParams {
    pub sigma: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MedianParams {
    /// Half-width of the square footprint
    pub footprint_radius: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    Gaussian(GaussianParams),
    Median(MedianParams),
    Sobel,
}

impl Operation for FilterOp {
    type Output = DynamicImage;

    fn apply(
        &self,
        input: &DynamicImage,
        color: Option<&ColorParameters>,
    ) -> Result<DynamicImage, OperationError> {
        let per_channel = color.is_some_and(ColorParameters::is_per_channel) && is_multichannel(input);

        let filtered = match self {
            FilterOp::Gaussian(p) if per_channel => {
                DynamicImage::ImageRgb8(preprocessing::apply_blur_rgb(&input.to_rgb8(), p.sigma as f32)?)
            }
            FilterOp::Gaussian(p) => DynamicImage::ImageLuma8(preprocessing::apply_blur(
                &preprocessing::to_grayscale(input),
                p.sigma as f32,
            )?),
            FilterOp::Median(p) if per_channel => {
                DynamicImage::ImageRgb8(preprocessing::apply_median_rgb(&input.to_rgb8(), p.footprint_radius))
            }
            FilterOp::Median(p) => DynamicImage::ImageLuma8(preprocessing::apply_median(
                &preprocessing::to_grayscale(input),
                p.footprint_radius,
            )),
            FilterOp::Sobel => {
                DynamicImage::ImageLuma8(preprocessing::sobel_magnitude(&preprocessing::to_grayscale(input)))
            }
        };
        Ok(filtered)
    }

    fn parameters(&self) -> Vec<(String, LogValue)> {
        match self {
            FilterOp::Gaussian(p) => parameter_fields(p),
            FilterOp::Median(p) => parameter_fields(p),
            FilterOp::Sobel => Vec::new(),
        }
    }
}

/// The filtering module's configuration table
pub fn filter_table() -> OperationTable<FilterOp> {
    OperationTable::new("filter", "Filter Comparison")
        .operation_column("filter_name")
        .add(
            OperationSpec::new(
                "gaussian_sigma1",
                FilterOp::Gaussian(GaussianParams { sigma: 1.0 }),
                "Standard smoothing",
            )
            .with_color_parameters(ColorParameters::PER_CHANNEL),
        )
        .add(
            OperationSpec::new(
                "gaussian_sigma3",
                FilterOp::Gaussian(GaussianParams { sigma: 3.0 }),
                "Strong smoothing",
            )
            .with_color_parameters(ColorParameters::PER_CHANNEL),
        )
        .add(
            OperationSpec::new(
                "median_disk3",
                FilterOp::Median(MedianParams { footprint_radius: 3 }),
                "Salt-pepper removal, k=3",
            )
            .grayscale(),
        )
        .add(
            OperationSpec::new(
                "median_disk5",
                FilterOp::Median(MedianParams { footprint_radius: 5 }),
                "Strong salt-pepper removal, k=5",
            )
            .grayscale(),
        )
        .add(OperationSpec::new("sobel", FilterOp::Sobel, "Gradient magnitude (edge)").grayscale())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn median_removes_isolated_salt() {
        let mut img = GrayImage::from_pixel(9, 9, Luma([10]));
        img.put_pixel(4, 4, Luma([255]));
        let op = FilterOp::Median(MedianParams { footprint_radius: 1 });

        let out = op.apply(&DynamicImage::ImageLuma8(img), None).unwrap().to_luma8();
        assert_eq!(out.get_pixel(4, 4)[0], 10);
    }

    #[test]
    fn gaussian_keeps_channels_only_with_color_parameters() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 100, 0])));
        let op = FilterOp::Gaussian(GaussianParams { sigma: 1.0 });

        let color = op.apply(&img, Some(&ColorParameters::PER_CHANNEL)).unwrap();
        let centre = color.to_rgb8().get_pixel(4, 4).0;
        for (got, want) in centre.iter().zip([200u8, 100, 0]) {
            assert!(got.abs_diff(want) <= 1);
        }

        let gray = op.apply(&img, None).unwrap();
        assert!(matches!(gray, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn non_positive_sigma_is_an_error() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        let op = FilterOp::Gaussian(GaussianParams { sigma: 0.0 });
        assert!(op.apply(&img, None).is_err());
    }
}
