use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;

use crate::error::OperationError;
use crate::gallery::Gallery;
use crate::models::{ColorParameters, DetectionResult, LogRecord, LogValue};
use crate::output::{self, ComparisonRenderer};

/// Everything the pipeline needs besides the table and the images
pub struct PipelineContext {
    /// Directory all artifacts of one run are written under
    pub output_root: PathBuf,
    pub renderer: ComparisonRenderer,
}

impl PipelineContext {
    pub fn new(output_root: impl Into<PathBuf>, renderer: ComparisonRenderer) -> Self {
        Self {
            output_root: output_root.into(),
            renderer,
        }
    }
}

/// A configured image operation.
///
/// The result kind is fixed by `Output`, so the pipeline never has to look
/// at what an operation returned to decide how to persist or log it.
pub trait Operation {
    type Output: Artifact;

    /// Run on the effective input. `color` is only set when the input is a
    /// multi-channel image and the operation accepts color.
    fn apply(
        &self,
        input: &DynamicImage,
        color: Option<&ColorParameters>,
    ) -> Result<Self::Output, OperationError>;

    /// Base parameters, as written to the parameter log
    fn parameters(&self) -> Vec<(String, LogValue)>;
}

/// How an operation result is saved, compared and logged
pub trait Artifact {
    /// Image persisted for this result; `source` is the untouched original.
    fn render(&self, source: &DynamicImage) -> DynamicImage;

    /// Panel for the comparison figure; `gray_source` is the grayscale
    /// original.
    fn comparison_panel(&self, gray_source: &DynamicImage) -> DynamicImage;

    /// Derived fields for the parameter log
    fn metrics(&self) -> Vec<(String, LogValue)> {
        Vec::new()
    }
}

impl Artifact for DynamicImage {
    fn render(&self, _source: &DynamicImage) -> DynamicImage {
        self.clone()
    }

    fn comparison_panel(&self, _gray_source: &DynamicImage) -> DynamicImage {
        to_gray(self)
    }
}

impl Artifact for DetectionResult {
    fn render(&self, source: &DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgb8(output::draw_keypoints(source, self.coordinates()))
    }

    fn comparison_panel(&self, gray_source: &DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgb8(output::draw_keypoints(gray_source, self.coordinates()))
    }

    fn metrics(&self) -> Vec<(String, LogValue)> {
        let mean = self.mean_response().map(|m| (m * 1e4).round() / 1e4);
        vec![
            ("num_features".to_string(), LogValue::from(self.len())),
            ("mean_response".to_string(), LogValue::from(mean)),
        ]
    }
}

/// One row of an operation table
#[derive(Debug, Clone)]
pub struct OperationSpec<O> {
    /// Unique within its table; used in file names and the log
    pub name: String,
    pub operation: O,
    pub requires_grayscale: bool,
    pub color_parameters: Option<ColorParameters>,
    pub notes: String,
}

impl<O> OperationSpec<O> {
    pub fn new(name: impl Into<String>, operation: O, notes: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operation,
            requires_grayscale: false,
            color_parameters: None,
            notes: notes.into(),
        }
    }

    pub fn grayscale(mut self) -> Self {
        self.requires_grayscale = true;
        self
    }

    pub fn with_color_parameters(mut self, params: ColorParameters) -> Self {
        self.color_parameters = Some(params);
        self
    }
}

/// A named list of operations plus the naming conventions of its outputs
#[derive(Debug, Clone)]
pub struct OperationTable<O> {
    /// Prefix of the `<name>_parameters.csv` log
    pub name: String,
    /// Comparison figure title, completed with " for <image>"
    pub title: String,
    /// Log column holding the operation name
    pub operation_column: String,
    /// Label of the first comparison panel
    pub original_label: String,
    /// Also persist `<image>_original_gray.png`
    pub save_gray_original: bool,
    pub operations: Vec<OperationSpec<O>>,
}

impl<O> OperationTable<O> {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            operation_column: "operation".to_string(),
            original_label: "Original".to_string(),
            save_gray_original: false,
            operations: Vec::new(),
        }
    }

    pub fn operation_column(mut self, column: impl Into<String>) -> Self {
        self.operation_column = column.into();
        self
    }

    /// Compare against the grayscale original and save it alongside.
    pub fn gray_original(mut self) -> Self {
        self.original_label = "Original (Grayscale)".to_string();
        self.save_gray_original = true;
        self
    }

    pub fn add(mut self, spec: OperationSpec<O>) -> Self {
        self.operations.push(spec);
        self
    }

    pub fn csv_file_name(&self) -> String {
        format!("{}_parameters.csv", self.name)
    }
}

/// An (image, operation) pair that produced no record
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOperation {
    pub image: String,
    pub operation: String,
    pub reason: String,
    /// The capability was missing rather than the operation failing
    pub unavailable: bool,
}

/// What processing one image produced
#[derive(Debug, Clone)]
pub struct ImageReport {
    pub image: String,
    pub records: Vec<LogRecord>,
    pub skipped: Vec<SkippedOperation>,
    /// Labels of the comparison panels, in figure order
    pub panels: Vec<String>,
}

/// What a whole run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub records: Vec<LogRecord>,
    pub skipped: Vec<SkippedOperation>,
    pub images: Vec<ImageReport>,
    pub csv_path: PathBuf,
}

/// Applies an operation table to every image of a gallery
pub struct BatchPipeline {
    context: PipelineContext,
}

impl BatchPipeline {
    pub fn new(context: PipelineContext) -> Self {
        Self { context }
    }

    pub fn output_root(&self) -> &Path {
        &self.context.output_root
    }

    /// Process every image (gallery order) with every operation (table
    /// order), then write the parameter log.
    pub fn run<O: Operation>(&self, table: &OperationTable<O>, gallery: &Gallery) -> Result<RunSummary> {
        let root = self.output_root();
        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create output directory {}", root.display()))?;

        let mut images = Vec::new();
        for (id, image) in gallery.iter() {
            images.push(self.process_image(table, id, image)?);
        }

        // per-image batches are concatenated only here
        let records: Vec<LogRecord> = images.iter().flat_map(|r| r.records.iter().cloned()).collect();
        let skipped: Vec<SkippedOperation> = images.iter().flat_map(|r| r.skipped.iter().cloned()).collect();

        let csv_path = root.join(table.csv_file_name());
        output::write_records(&csv_path, &records)
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;

        Ok(RunSummary {
            records,
            skipped,
            images,
            csv_path,
        })
    }

    /// Run every operation of `table` on one image.
    ///
    /// Operation failures are logged and recorded as skipped; only failing
    /// to write the image's own directory, original or comparison figure is
    /// an error.
    pub fn process_image<O: Operation>(
        &self,
        table: &OperationTable<O>,
        id: &str,
        image: &DynamicImage,
    ) -> Result<ImageReport> {
        log::info!("Processing image: {}", id);

        let image_dir = self.output_root().join(id);
        std::fs::create_dir_all(&image_dir)
            .with_context(|| format!("Failed to create {}", image_dir.display()))?;

        let gray = to_gray(image);
        output::save_image(&image_dir.join(format!("{}_original.png", id)), image)
            .with_context(|| format!("Failed to save original of {}", id))?;
        if table.save_gray_original {
            output::save_image(&image_dir.join(format!("{}_original_gray.png", id)), &gray)
                .with_context(|| format!("Failed to save grayscale original of {}", id))?;
        }

        let mut panels: Vec<(String, DynamicImage)> = vec![(table.original_label.clone(), gray.clone())];
        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for spec in &table.operations {
            log::debug!("  Applying: {}...", spec.name);
            match self.apply_one(table, spec, id, image, &gray, &image_dir) {
                Ok((panel, record)) => {
                    panels.push((spec.name.clone(), panel));
                    records.push(record);
                }
                Err(e) => {
                    if e.is_unavailable() {
                        log::warn!("  Skipping {} on {}: {}", spec.name, id, e);
                    } else {
                        log::warn!("  {} failed on {}: {}", spec.name, id, e);
                    }
                    skipped.push(SkippedOperation {
                        image: id.to_string(),
                        operation: spec.name.clone(),
                        reason: e.to_string(),
                        unavailable: e.is_unavailable(),
                    });
                }
            }
        }

        let comparison_path = self.output_root().join(format!("comparison_{}.png", id));
        self.context
            .renderer
            .render_to(&panels, &format!("{} for {}", table.title, id), &comparison_path)
            .with_context(|| format!("Failed to write {}", comparison_path.display()))?;

        Ok(ImageReport {
            image: id.to_string(),
            records,
            skipped,
            panels: panels.into_iter().map(|(label, _)| label).collect(),
        })
    }

    fn apply_one<O: Operation>(
        &self,
        table: &OperationTable<O>,
        spec: &OperationSpec<O>,
        id: &str,
        image: &DynamicImage,
        gray: &DynamicImage,
        image_dir: &Path,
    ) -> Result<(DynamicImage, LogRecord), OperationError> {
        let is_color = is_multichannel(image);
        let input = if is_color && spec.requires_grayscale {
            gray
        } else {
            image
        };
        let color = if is_color && !spec.requires_grayscale {
            spec.color_parameters.as_ref()
        } else {
            None
        };

        let result = spec.operation.apply(input, color)?;

        let rendered = result.render(image);
        output::save_image(&image_dir.join(format!("{}_{}.png", id, spec.name)), &rendered)?;

        let mut record = LogRecord::new()
            .with("image", id)
            .with(table.operation_column.as_str(), spec.name.as_str());
        record.extend(result.metrics());
        record.insert("notes", spec.notes.as_str());
        record.extend(spec.operation.parameters());

        Ok((result.comparison_panel(gray), record))
    }
}

/// Whether the image carries color channels
pub fn is_multichannel(image: &DynamicImage) -> bool {
    image.color().has_color()
}

/// Single-channel luminance version of an image (grayscale images are
/// returned unchanged).
pub fn to_gray(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) => image.clone(),
        other => DynamicImage::ImageLuma8(other.to_luma8()),
    }
}
