pub mod config;
pub mod edges;
pub mod error;
pub mod features;
pub mod filtering;
pub mod gallery;
pub mod geometry;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod preprocessing;

pub use config::{Module, RunConfig};
pub use error::OperationError;
pub use gallery::Gallery;
pub use geometry::{EstimatedTransform, GeometrySummary};
pub use models::{ColorParameters, DetectionResult, LogRecord, LogValue, TransformKind, TransformSpec};
pub use pipeline::{
    Artifact, BatchPipeline, ImageReport, Operation, OperationSpec, OperationTable, PipelineContext, RunSummary,
    SkippedOperation,
};
