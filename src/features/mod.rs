//! Keypoint detection (module 3).

pub mod fast;
pub mod harris;
pub mod orb;
pub mod response;
#[cfg(feature = "sift")]
pub mod sift;

use image::{DynamicImage, GrayImage};
use serde::Serialize;

use crate::error::OperationError;
use crate::models::{ColorParameters, DetectionResult, LogValue, parameter_fields};
use crate::pipeline::{Operation, OperationSpec, OperationTable};
use crate::preprocessing;

pub use fast::FastParams;
pub use harris::HarrisParams;
pub use orb::OrbParams;

/// Parameters of the optional SIFT detector. Declared unconditionally so
/// the table is the same with or without the `sift` feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiftConfig {
    pub n_keypoints: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureOp {
    Harris(HarrisParams),
    Fast(FastParams),
    Orb(OrbParams),
    Sift(SiftConfig),
}

impl Operation for FeatureOp {
    type Output = DetectionResult;

    fn apply(
        &self,
        input: &DynamicImage,
        _color: Option<&ColorParameters>,
    ) -> Result<DetectionResult, OperationError> {
        let gray = preprocessing::to_grayscale(input);
        match self {
            FeatureOp::Harris(p) => harris::detect(&gray, p),
            FeatureOp::Fast(p) => fast::detect(&gray, p),
            FeatureOp::Orb(p) => orb::detect(&gray, p),
            FeatureOp::Sift(p) => detect_sift(&gray, p),
        }
    }

    fn parameters(&self) -> Vec<(String, LogValue)> {
        match self {
            FeatureOp::Harris(p) => parameter_fields(p),
            FeatureOp::Fast(p) => parameter_fields(p),
            FeatureOp::Orb(p) => parameter_fields(p),
            FeatureOp::Sift(p) => parameter_fields(p),
        }
    }
}

#[cfg(feature = "sift")]
fn detect_sift(gray: &GrayImage, config: &SiftConfig) -> Result<DetectionResult, OperationError> {
    sift::detect(
        gray,
        &sift::SiftParams {
            n_keypoints: config.n_keypoints,
        },
    )
}

#[cfg(not(feature = "sift"))]
fn detect_sift(_gray: &GrayImage, _config: &SiftConfig) -> Result<DetectionResult, OperationError> {
    Err(OperationError::Unavailable { capability: "sift" })
}

/// Whether this build can run the SIFT detector
pub fn sift_available() -> bool {
    cfg!(feature = "sift")
}

/// The feature module's configuration table
pub fn feature_table() -> OperationTable<FeatureOp> {
    let harris = |min_distance| {
        FeatureOp::Harris(HarrisParams {
            min_distance,
            k: 0.05,
            threshold_rel: 0.01,
        })
    };
    let fast = |threshold| FeatureOp::Fast(FastParams { n: 9, threshold });

    OperationTable::new("feature", "Feature Detection Comparison")
        .operation_column("method")
        .gray_original()
        .add(OperationSpec::new("harris_mindist5_k0.05", harris(5), "Harris: minimum distance 5px").grayscale())
        .add(OperationSpec::new("harris_mindist20_k0.05", harris(20), "Harris: minimum distance 20px").grayscale())
        .add(OperationSpec::new("fast_n9_thresh10", fast(10), "FAST-9: standard threshold").grayscale())
        .add(OperationSpec::new("fast_n9_thresh30", fast(30), "FAST-9: high threshold").grayscale())
        .add(
            OperationSpec::new(
                "orb_200_features",
                FeatureOp::Orb(OrbParams { n_keypoints: 200 }),
                "ORB: target 200 keypoints",
            )
            .grayscale(),
        )
        .add(
            OperationSpec::new(
                "orb_500_features",
                FeatureOp::Orb(OrbParams { n_keypoints: 500 }),
                "ORB: target 500 keypoints",
            )
            .grayscale(),
        )
        .add(
            OperationSpec::new(
                "sift_500_features",
                FeatureOp::Sift(SiftConfig { n_keypoints: 500 }),
                "SIFT: target 500 keypoints",
            )
            .grayscale(),
        )
}
