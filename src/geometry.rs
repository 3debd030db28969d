//! Projective and affine warps estimated from point correspondences
//! (module 4).

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{DynamicImage, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection, warp};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use crate::error::OperationError;
use crate::gallery::Gallery;
use crate::models::{LogRecord, TransformKind, TransformSpec, check_correspondences, format_points};
use crate::output;
use crate::pipeline::{PipelineContext, SkippedOperation, to_gray};

/// The single gallery image this module works on
pub const GEOMETRY_IMAGE: &str = "checkerboard";

const TABLE_NAME: &str = "geometry";

/// A 3×3 matrix mapping source (x, y) points onto destination points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedTransform {
    pub kind: TransformKind,
    pub matrix: Matrix3<f64>,
}

impl EstimatedTransform {
    /// Least-squares estimate from correspondences.
    ///
    /// The correspondence count is checked before anything is solved.
    /// Points are normalised (centroid at the origin, mean distance √2)
    /// before the solve to keep the system well conditioned.
    pub fn estimate(kind: TransformKind, src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Self, OperationError> {
        check_correspondences(kind, src, dst)?;

        let src_norm = normalization(src)?;
        let dst_norm = normalization(dst)?;
        let src_n: Vec<[f64; 2]> = src.iter().map(|p| apply_h(&src_norm, *p)).collect();
        let dst_n: Vec<[f64; 2]> = dst.iter().map(|p| apply_h(&dst_norm, *p)).collect();

        let normalized = match kind {
            TransformKind::Affine => solve_affine(&src_n, &dst_n)?,
            TransformKind::Projective => solve_projective(&src_n, &dst_n)?,
        };

        let dst_inv = dst_norm
            .try_inverse()
            .ok_or_else(|| OperationError::Estimation("destination normalisation is singular".into()))?;
        let mut matrix = dst_inv * normalized * src_norm;

        let scale = matrix[(2, 2)];
        if scale.abs() < 1e-12 {
            return Err(OperationError::Estimation("transform maps points to infinity".into()));
        }
        matrix /= scale;

        if !matrix.iter().all(|v| v.is_finite()) || matrix.try_inverse().is_none() {
            return Err(OperationError::Estimation("estimated matrix is not invertible".into()));
        }
        if kind == TransformKind::Affine {
            // exact affine bottom row
            matrix[(2, 0)] = 0.0;
            matrix[(2, 1)] = 0.0;
        }

        Ok(Self { kind, matrix })
    }

    /// Map an (x, y) point
    pub fn apply(&self, point: [f64; 2]) -> [f64; 2] {
        apply_h(&self.matrix, point)
    }

    pub fn rows(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    /// The same mapping as an imageproc projection
    pub fn projection(&self) -> Result<Projection, OperationError> {
        let rows = self.rows();
        let flat: [f32; 9] = [
            rows[0][0] as f32,
            rows[0][1] as f32,
            rows[0][2] as f32,
            rows[1][0] as f32,
            rows[1][1] as f32,
            rows[1][2] as f32,
            rows[2][0] as f32,
            rows[2][1] as f32,
            rows[2][2] as f32,
        ];
        Projection::from_matrix(flat)
            .ok_or_else(|| OperationError::Estimation("matrix is not a valid projection".into()))
    }
}

fn apply_h(m: &Matrix3<f64>, [x, y]: [f64; 2]) -> [f64; 2] {
    let v = m * Vector3::new(x, y, 1.0);
    [v.x / v.z, v.y / v.z]
}

/// Similarity moving the centroid to the origin with mean distance √2
fn normalization(points: &[[f64; 2]]) -> Result<Matrix3<f64>, OperationError> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if !mean_dist.is_finite() || mean_dist < 1e-12 {
        return Err(OperationError::Estimation("points are coincident".into()));
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Ok(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

/// Solve `a * x = b` in the least-squares sense, refusing rank-deficient
/// systems.
fn least_squares(a: DMatrix<f64>, b: DVector<f64>) -> Result<DVector<f64>, OperationError> {
    let unknowns = a.ncols();
    let svd = a.svd(true, true);
    let largest = svd.singular_values.max();
    let eps = largest.max(1.0) * 1e-10;
    if svd.rank(eps) < unknowns {
        return Err(OperationError::Estimation(
            "correspondences are degenerate (e.g. collinear)".into(),
        ));
    }
    svd.solve(&b, eps)
        .map_err(|e| OperationError::Estimation(e.to_string()))
}

fn solve_affine(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Matrix3<f64>, OperationError> {
    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 6);
    let mut b = DVector::<f64>::zeros(2 * n);
    for (i, ([x, y], [u, v])) in src.iter().zip(dst).enumerate() {
        let (r0, r1) = (2 * i, 2 * i + 1);
        a[(r0, 0)] = *x;
        a[(r0, 1)] = *y;
        a[(r0, 2)] = 1.0;
        a[(r1, 3)] = *x;
        a[(r1, 4)] = *y;
        a[(r1, 5)] = 1.0;
        b[r0] = *u;
        b[r1] = *v;
    }
    let p = least_squares(a, b)?;
    Ok(Matrix3::new(p[0], p[1], p[2], p[3], p[4], p[5], 0.0, 0.0, 1.0))
}

fn solve_projective(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Matrix3<f64>, OperationError> {
    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 8);
    let mut b = DVector::<f64>::zeros(2 * n);
    for (i, ([x, y], [u, v])) in src.iter().zip(dst).enumerate() {
        let (r0, r1) = (2 * i, 2 * i + 1);
        a[(r0, 0)] = *x;
        a[(r0, 1)] = *y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -x * u;
        a[(r0, 7)] = -y * u;
        a[(r1, 3)] = *x;
        a[(r1, 4)] = *y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -x * v;
        a[(r1, 7)] = -y * v;
        b[r0] = *u;
        b[r1] = *v;
    }
    let h = least_squares(a, b)?;
    Ok(Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0))
}

/// Image corners as (x, y): top-left, top-right, bottom-right, bottom-left
pub fn corners(width: u32, height: u32) -> [[f64; 2]; 4] {
    let (w, h) = (width as f64, height as f64);
    [[0.0, 0.0], [w - 1.0, 0.0], [w - 1.0, h - 1.0], [0.0, h - 1.0]]
}

/// The module's two transform configurations for an image of the given size
pub fn transform_specs(width: u32, height: u32) -> Result<Vec<TransformSpec>, OperationError> {
    let (w, h) = (width as f64, height as f64);
    let src4 = corners(width, height);

    Ok(vec![
        TransformSpec::new(
            "projective_transform",
            TransformKind::Projective,
            src4.to_vec(),
            vec![
                [w * 0.1, h * 0.2],
                [w * 0.9, h * 0.1],
                [w * 0.8, h * 0.9],
                [w * 0.2, h * 0.8],
            ],
            "Homography (projective transform) simulation: perspective view",
        )?,
        TransformSpec::new(
            "affine_shear_transform",
            TransformKind::Affine,
            src4[..3].to_vec(),
            vec![[0.0, 0.0], [w - 1.0, 0.0], [w - 150.0, h - 1.0]],
            "Affine transform simulation: shear effect",
        )?,
    ])
}

/// Destination points to draw: the configured ones for a projective
/// transform, or all four corners mapped through the estimate for an affine
/// one (whose 4th point exists only for display).
pub fn plot_destination_points(
    spec: &TransformSpec,
    estimate: &EstimatedTransform,
    src4: &[[f64; 2]; 4],
) -> Vec<[f64; 2]> {
    match spec.kind {
        TransformKind::Projective => spec.dst_points.clone(),
        TransformKind::Affine => src4.iter().map(|p| estimate.apply(*p)).collect(),
    }
}

/// What the geometry module produced
#[derive(Debug, Clone)]
pub struct GeometrySummary {
    pub records: Vec<LogRecord>,
    pub skipped: Vec<SkippedOperation>,
    pub estimates: Vec<(String, EstimatedTransform)>,
    pub csv_path: PathBuf,
}

/// Estimate, warp and document every transform configuration on the
/// checkerboard image. Returns `None` when the gallery has no checkerboard.
pub fn run_geometry(context: &PipelineContext, gallery: &Gallery) -> Result<Option<GeometrySummary>> {
    let Some(image) = gallery.get(GEOMETRY_IMAGE) else {
        log::error!("'{}' not found in the gallery", GEOMETRY_IMAGE);
        return Ok(None);
    };
    let specs = transform_specs(image.width(), image.height())
        .context("Invalid transform configuration")?;
    run_transforms(context, image, &specs).map(Some)
}

/// Run a list of transform configurations on one image.
pub fn run_transforms(
    context: &PipelineContext,
    image: &DynamicImage,
    specs: &[TransformSpec],
) -> Result<GeometrySummary> {
    let root = &context.output_root;
    let id = GEOMETRY_IMAGE;
    let image_dir = root.join(id);
    std::fs::create_dir_all(&image_dir)
        .with_context(|| format!("Failed to create {}", image_dir.display()))?;

    let gray = to_gray(image);
    output::save_image(&image_dir.join(format!("{}_original.png", id)), &gray)
        .with_context(|| format!("Failed to save original of {}", id))?;

    let src4 = corners(gray.width(), gray.height());
    let mut panels = vec![("Original".to_string(), gray.clone())];
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut estimates = Vec::new();

    for spec in specs {
        log::info!("  Applying: {}...", spec.name);

        let estimate = match EstimatedTransform::estimate(spec.kind, &spec.src_points, &spec.dst_points) {
            Ok(estimate) => estimate,
            Err(e) => {
                log::error!("  Matrix estimation failed for {}: {}", spec.name, e);
                skipped.push(SkippedOperation {
                    image: id.to_string(),
                    operation: spec.name.clone(),
                    reason: e.to_string(),
                    unavailable: false,
                });
                continue;
            }
        };

        match write_transform_artifacts(context, &gray, spec, &estimate, &src4) {
            Ok(warped) => {
                panels.push((spec.name.clone(), warped));
                records.push(
                    LogRecord::new()
                        .with("transform_name", spec.name.as_str())
                        .with("type", spec.kind.type_name())
                        .with("src_points_used", format_points(&spec.src_points))
                        .with("dst_points_used", format_points(&spec.dst_points))
                        .with("notes", spec.notes.as_str()),
                );
                estimates.push((spec.name.clone(), estimate));
            }
            Err(e) => {
                log::warn!("  {} failed: {}", spec.name, e);
                skipped.push(SkippedOperation {
                    image: id.to_string(),
                    operation: spec.name.clone(),
                    reason: e.to_string(),
                    unavailable: false,
                });
            }
        }
    }

    let comparison_path = root.join(format!("comparison_{}.png", id));
    context
        .renderer
        .render_to(&panels, &format!("Geometry Comparison for {}", id), &comparison_path)
        .with_context(|| format!("Failed to write {}", comparison_path.display()))?;

    let csv_path = root.join(format!("{}_parameters.csv", TABLE_NAME));
    output::write_records(&csv_path, &records)
        .with_context(|| format!("Failed to write {}", csv_path.display()))?;

    Ok(GeometrySummary {
        records,
        skipped,
        estimates,
        csv_path,
    })
}

/// Warp, overlay and matrix files for one configuration; returns the warp.
fn write_transform_artifacts(
    context: &PipelineContext,
    gray: &DynamicImage,
    spec: &TransformSpec,
    estimate: &EstimatedTransform,
    src4: &[[f64; 2]; 4],
) -> Result<DynamicImage, OperationError> {
    let root = &context.output_root;
    let id = GEOMETRY_IMAGE;

    let projection = estimate.projection()?;
    let warped = DynamicImage::ImageLuma8(warp(
        &gray.to_luma8(),
        &projection,
        Interpolation::Bilinear,
        Luma([0u8]),
    ));
    output::save_image(&root.join(id).join(format!("{}_{}.png", id, spec.name)), &warped)?;

    let to_f32 = |points: &[[f64; 2]]| -> Vec<(f32, f32)> {
        points.iter().map(|[x, y]| (*x as f32, *y as f32)).collect()
    };
    let plot_dst = plot_destination_points(spec, estimate, src4);
    let overlay = context
        .renderer
        .render_overlay(gray, &to_f32(&src4[..]), &warped, &to_f32(&plot_dst[..]), &spec.name);
    let overlay_path = root.join(format!("overlay_{}.png", spec.name));
    output::save_image(&overlay_path, &DynamicImage::ImageRgb8(overlay))?;
    log::info!("Overlay plot saved to: {}", output::file_name(&overlay_path));

    let header = format!(
        "Estimated matrix ({})\nType: {}",
        spec.name,
        spec.kind.type_name()
    );
    output::save_matrix(&root.join(format!("matrix_{}.txt", spec.name)), &estimate.rows(), &header)?;

    Ok(warped)
}
