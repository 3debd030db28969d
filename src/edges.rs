//! Sobel and Canny edge detection (module 2).

use image::DynamicImage;
use serde::Serialize;

use crate::error::OperationError;
use crate::models::{ColorParameters, LogValue, parameter_fields};
use crate::pipeline::{Operation, OperationSpec, OperationTable};
use crate::preprocessing;

/// Canny settings; thresholds are in unit intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CannyParams {
    pub sigma: f64,
    pub low_threshold: f64,
    pub high_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeOp {
    Sobel,
    Canny(CannyParams),
}

impl Operation for EdgeOp {
    type Output = DynamicImage;

    fn apply(
        &self,
        input: &DynamicImage,
        _color: Option<&ColorParameters>,
    ) -> Result<DynamicImage, OperationError> {
        let gray = preprocessing::to_grayscale(input);
        let edges = match self {
            EdgeOp::Sobel => preprocessing::sobel_magnitude(&gray),
            EdgeOp::Canny(p) => preprocessing::detect_edges(
                &gray,
                p.sigma as f32,
                p.low_threshold as f32,
                p.high_threshold as f32,
            )?,
        };
        Ok(DynamicImage::ImageLuma8(edges))
    }

    fn parameters(&self) -> Vec<(String, LogValue)> {
        match self {
            EdgeOp::Sobel => Vec::new(),
            EdgeOp::Canny(p) => parameter_fields(p),
        }
    }
}

fn canny(name: &str, sigma: f64, low_threshold: f64, high_threshold: f64, notes: &str) -> OperationSpec<EdgeOp> {
    OperationSpec::new(
        name,
        EdgeOp::Canny(CannyParams {
            sigma,
            low_threshold,
            high_threshold,
        }),
        notes,
    )
    .grayscale()
}

/// The edge module's configuration table
pub fn edge_table() -> OperationTable<EdgeOp> {
    OperationTable::new("edge", "Edge Detection Comparison")
        .operation_column("method")
        .gray_original()
        .add(OperationSpec::new("sobel", EdgeOp::Sobel, "Sobel").grayscale())
        .add(canny(
            "canny_sigma1_low_thresh",
            1.0,
            0.05,
            0.15,
            "Threshold experiment: sigma=1.0, low thresholds",
        ))
        .add(canny(
            "canny_sigma1_high_thresh",
            1.0,
            0.1,
            0.3,
            "Threshold experiment: sigma=1.0, high thresholds",
        ))
        .add(canny(
            "canny_sigma3_low_thresh",
            3.0,
            0.05,
            0.15,
            "Threshold experiment: sigma=3.0, low thresholds",
        ))
        .add(canny(
            "canny_sigma3_high_thresh",
            3.0,
            0.1,
            0.3,
            "Threshold experiment: sigma=3.0, high thresholds",
        ))
}
