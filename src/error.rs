use std::path::PathBuf;

use thiserror::Error;

use crate::models::TransformKind;

/// Failures of a single operation, input or transform configuration.
///
/// None of these abort a run on their own: the pipeline logs them and moves
/// on to the next operation (or configuration).
#[derive(Debug, Error)]
pub enum OperationError {
    /// An optional gallery image is not present on disk
    #[error("optional input not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// A detection backend was not compiled into this build
    #[error("capability '{capability}' is not available in this build")]
    Unavailable { capability: &'static str },

    #[error("{kind} transform needs exactly {expected} correspondences, got {actual}")]
    Correspondence {
        kind: TransformKind,
        expected: usize,
        actual: usize,
    },

    #[error("transform estimation failed: {0}")]
    Estimation(String),

    #[error("detection result has {coordinates} coordinates but {responses} responses")]
    InvalidDetection { coordinates: usize, responses: usize },

    #[error("operation failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl OperationError {
    /// Whether this error means "skip quietly with a warning" rather than
    /// an unexpected failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, OperationError::Unavailable { .. })
    }
}
