mod common;

use common::*;
use imgbatch::OperationError;
use imgbatch::gallery::builtin_gallery;
use imgbatch::geometry::{self, EstimatedTransform};
use imgbatch::models::{TransformKind, TransformSpec};
use tempfile::TempDir;

#[test]
fn test_geometry_artifacts() -> anyhow::Result<()> {
    // 1. Built-in gallery (200×200 checkerboard)
    let dir = TempDir::new()?;
    let context = test_context(dir.path());
    let gallery = builtin_gallery();

    // 2. Run
    let summary = geometry::run_geometry(&context, &gallery)?.expect("checkerboard present");

    // 3. Warps, overlays, matrices, comparison and log
    let root = dir.path();
    for name in ["projective_transform", "affine_shear_transform"] {
        assert!(root.join(format!("checkerboard/checkerboard_{}.png", name)).exists());
        assert!(root.join(format!("overlay_{}.png", name)).exists());
        assert!(root.join(format!("matrix_{}.txt", name)).exists());
    }
    assert!(root.join("checkerboard/checkerboard_original.png").exists());
    assert!(root.join("comparison_checkerboard.png").exists());
    assert!(summary.skipped.is_empty());

    // 4. Matrix file layout
    let text = std::fs::read_to_string(root.join("matrix_affine_shear_transform.txt"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Estimated matrix (affine_shear_transform)");
    assert_eq!(lines[1], "Type: AffineTransform");
    assert_eq!(lines[2], "");
    assert_eq!(lines[5], "0.0000\t0.0000\t1.0000");

    // 5. One log row per configuration
    let (header, rows) = read_csv(&summary.csv_path)?;
    assert_eq!(
        header,
        vec!["transform_name", "type", "src_points_used", "dst_points_used", "notes"]
    );
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], "ProjectiveTransform");
    assert_eq!(rows[1][2], "[[0.0, 0.0], [199.0, 0.0], [199.0, 199.0]]");

    Ok(())
}

#[test]
fn test_geometry_without_checkerboard() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let context = test_context(dir.path());
    let gallery = Gallery::new().with("blank", blank_image(10, 10));

    assert!(geometry::run_geometry(&context, &gallery)?.is_none());
    Ok(())
}

#[test]
fn test_correspondence_count_is_checked() {
    let four = vec![[0.0, 0.0], [9.0, 0.0], [9.0, 9.0], [0.0, 9.0]];

    // affine needs 3
    let err = TransformSpec::new("bad_affine", TransformKind::Affine, four.clone(), four.clone(), "").unwrap_err();
    assert!(matches!(err, OperationError::Correspondence { expected: 3, actual: 4, .. }));

    // projective needs 4
    let three = four[..3].to_vec();
    let err = EstimatedTransform::estimate(TransformKind::Projective, &three, &three).unwrap_err();
    assert!(matches!(err, OperationError::Correspondence { expected: 4, actual: 3, .. }));
}

#[test]
fn test_degenerate_configuration_is_skipped() -> anyhow::Result<()> {
    // 1. One collinear configuration next to a valid one
    let dir = TempDir::new()?;
    let context = test_context(dir.path());
    let image = builtin_gallery().get("checkerboard").unwrap().clone();
    let collinear = vec![[0.0, 0.0], [50.0, 50.0], [100.0, 100.0]];
    let specs = vec![
        TransformSpec::new("collinear", TransformKind::Affine, collinear.clone(), collinear, "")?,
        TransformSpec::new(
            "shift",
            TransformKind::Affine,
            vec![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]],
            vec![[5.0, 0.0], [15.0, 0.0], [5.0, 10.0]],
            "",
        )?,
    ];

    // 2. Run
    let summary = geometry::run_transforms(&context, &image, &specs)?;

    // 3. The degenerate one is skipped, the other still runs
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].operation, "collinear");
    assert_eq!(summary.records.len(), 1);
    assert!(!dir.path().join("matrix_collinear.txt").exists());
    assert!(dir.path().join("matrix_shift.txt").exists());

    Ok(())
}
