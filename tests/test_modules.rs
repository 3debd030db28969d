mod common;

use common::*;
use imgbatch::{edges, features, filtering};

#[test]
fn test_filter_table_on_small_gallery() -> anyhow::Result<()> {
    // 1. Run the filter table
    let (pipeline, dir) = create_test_pipeline();
    let gallery = small_gallery();
    let table = filtering::filter_table();
    let summary = pipeline.run(&table, &gallery)?;

    // 2. Every operation succeeds on every image
    assert!(summary.skipped.is_empty());
    assert_eq!(summary.records.len(), gallery.len() * table.operations.len());
    assert!(dir.path().join("filter_parameters.csv").exists());

    // 3. Gaussian keeps color, Sobel is single-channel
    let blurred = image::open(dir.path().join("patch/patch_gaussian_sigma1.png"))?.to_rgb8();
    assert!(blurred.pixels().any(|p| p[0] != p[2]));
    let sobel = image::open(dir.path().join("patch/patch_sobel.png"))?.to_rgb8();
    assert!(sobel.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));

    // 4. Parameters are flattened into their own columns
    let (header, _) = read_csv(&summary.csv_path)?;
    assert_eq!(&header[..3], &["image", "filter_name", "notes"]);
    assert!(header.contains(&"sigma".to_string()));
    assert!(header.contains(&"footprint_radius".to_string()));

    Ok(())
}

#[test]
fn test_edge_table_on_small_gallery() -> anyhow::Result<()> {
    // 1. Run the edge table
    let (pipeline, dir) = create_test_pipeline();
    let gallery = small_gallery();
    let summary = pipeline.run(&edges::edge_table(), &gallery)?;

    // 2. Five methods per image, gray originals saved
    assert_eq!(summary.records.len(), gallery.len() * 5);
    assert!(dir.path().join("board/board_original_gray.png").exists());
    assert!(dir.path().join("edge_parameters.csv").exists());

    // 3. Canny output is binary and finds the checkerboard edges
    let canny = image::open(dir.path().join("board/board_canny_sigma1_low_thresh.png"))?.to_luma8();
    assert!(canny.pixels().all(|p| p[0] == 0 || p[0] == 255));
    assert!(canny.pixels().any(|p| p[0] == 255));

    // 4. Canny rows carry their thresholds
    let record = summary
        .records
        .iter()
        .find(|r| r.get_str("method") == Some("canny_sigma3_high_thresh"))
        .unwrap();
    assert_eq!(record.get_float("sigma"), Some(3.0));
    assert_eq!(record.get_float("high_threshold"), Some(0.3));

    Ok(())
}

#[test]
fn test_feature_table_on_small_gallery() -> anyhow::Result<()> {
    // 1. Run the feature table
    let (pipeline, dir) = create_test_pipeline();
    let gallery = small_gallery();
    let table = features::feature_table();
    let summary = pipeline.run(&table, &gallery)?;

    // 2. SIFT is only skipped when it was not compiled in
    let expected_skips = if features::sift_available() { 0 } else { gallery.len() };
    assert_eq!(summary.skipped.len(), expected_skips);
    assert_eq!(
        summary.records.len(),
        gallery.len() * table.operations.len() - expected_skips
    );

    // 3. Every record has a feature count, and a mean exactly when it found something
    for record in &summary.records {
        let count = record.get_int("num_features").unwrap();
        match record.get("mean_response") {
            Some(LogValue::Null) => assert_eq!(count, 0),
            Some(LogValue::Float(_)) => assert!(count > 0),
            other => panic!("unexpected mean_response {:?}", other),
        }
    }

    // 4. Harris finds the checkerboard's interior corners
    let harris = summary
        .records
        .iter()
        .find(|r| r.get_str("image") == Some("board") && r.get_str("method") == Some("harris_mindist5_k0.05"))
        .unwrap();
    assert!(harris.get_int("num_features").unwrap() > 0);
    assert!(dir.path().join("feature_parameters.csv").exists());

    Ok(())
}
