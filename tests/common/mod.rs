mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from imgbatch for tests
pub use imgbatch::gallery::Gallery;
pub use imgbatch::models::{ColorParameters, DetectionResult, LogRecord, LogValue};
pub use imgbatch::output::ComparisonRenderer;
pub use imgbatch::pipeline::{BatchPipeline, Operation, OperationSpec, OperationTable, PipelineContext};
