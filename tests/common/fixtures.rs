use std::cell::RefCell;
use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imgbatch::OperationError;
use imgbatch::gallery::{self, Gallery};
use imgbatch::models::{ColorParameters, DetectionResult, LogValue};
use imgbatch::output::ComparisonRenderer;
use imgbatch::pipeline::{BatchPipeline, Operation, PipelineContext};
use tempfile::TempDir;

/// Small cells keep the comparison figures cheap to render
pub const TEST_CELL_SIZE: u32 = 64;

/// Creates a pipeline writing into a fresh temporary directory.
/// Returns both the pipeline and the directory (which must be kept alive).
pub fn create_test_pipeline() -> (BatchPipeline, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let pipeline = BatchPipeline::new(test_context(dir.path()));
    (pipeline, dir)
}

/// Context with a text-free renderer writing under `root`
pub fn test_context(root: &Path) -> PipelineContext {
    PipelineContext::new(
        root,
        ComparisonRenderer::without_text().with_cell_size(TEST_CELL_SIZE),
    )
}

/// Gallery {"checkerboard": 8×8 grayscale}
pub fn checkerboard_gallery() -> Gallery {
    Gallery::new().with(
        "checkerboard",
        DynamicImage::ImageLuma8(gallery::checkerboard(8, 8, 2)),
    )
}

/// A grayscale and a color image, small enough for every detector
pub fn small_gallery() -> Gallery {
    let mut color = RgbImage::from_pixel(48, 40, Rgb([30, 60, 90]));
    for y in 10..30 {
        for x in 12..36 {
            color.put_pixel(x, y, Rgb([220, 200, 40]));
        }
    }
    Gallery::new()
        .with("board", DynamicImage::ImageLuma8(gallery::checkerboard(64, 64, 8)))
        .with("patch", DynamicImage::ImageRgb8(color))
}

pub fn blank_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([128])))
}

/// Returns its input unchanged
#[derive(Debug, Clone, Copy)]
pub struct Identity;

impl Operation for Identity {
    type Output = DynamicImage;

    fn apply(&self, input: &DynamicImage, _color: Option<&ColorParameters>) -> Result<DynamicImage, OperationError> {
        Ok(input.clone())
    }

    fn parameters(&self) -> Vec<(String, LogValue)> {
        Vec::new()
    }
}

/// A detector that never finds anything
#[derive(Debug, Clone, Copy)]
pub struct NoKeypoints;

impl Operation for NoKeypoints {
    type Output = DetectionResult;

    fn apply(&self, _input: &DynamicImage, _color: Option<&ColorParameters>) -> Result<DetectionResult, OperationError> {
        Ok(DetectionResult::empty())
    }

    fn parameters(&self) -> Vec<(String, LogValue)> {
        vec![("threshold".to_string(), LogValue::Float(0.5))]
    }
}

/// Identity, a missing backend, or a plain failure
#[derive(Debug, Clone, Copy)]
pub enum MaybeAvailable {
    Present,
    Missing,
    Broken,
}

impl Operation for MaybeAvailable {
    type Output = DynamicImage;

    fn apply(&self, input: &DynamicImage, _color: Option<&ColorParameters>) -> Result<DynamicImage, OperationError> {
        match self {
            MaybeAvailable::Present => Ok(input.clone()),
            MaybeAvailable::Missing => Err(OperationError::Unavailable { capability: "test-backend" }),
            MaybeAvailable::Broken => Err(OperationError::Failed("broken on purpose".to_string())),
        }
    }

    fn parameters(&self) -> Vec<(String, LogValue)> {
        Vec::new()
    }
}

/// Identity that remembers the color type and color parameters it was
/// called with, in call order
#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: RefCell<Vec<(ColorType, Option<ColorParameters>)>>,
}

impl Operation for Recorder {
    type Output = DynamicImage;

    fn apply(&self, input: &DynamicImage, color: Option<&ColorParameters>) -> Result<DynamicImage, OperationError> {
        self.calls.borrow_mut().push((input.color(), color.copied()));
        Ok(input.clone())
    }

    fn parameters(&self) -> Vec<(String, LogValue)> {
        Vec::new()
    }
}

/// Every regular file under `dir`, recursively
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(list_files(&path));
        } else {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// Header and rows of a CSV file
pub fn read_csv(path: &Path) -> anyhow::Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::Reader::from_path(path)?;
    let header = reader.headers()?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for row in reader.records() {
        rows.push(row?.iter().map(String::from).collect());
    }
    Ok((header, rows))
}
