mod common;

use common::*;
use imgbatch::output::write_records;
use tempfile::TempDir;

#[test]
fn test_header_is_union_of_keys() -> anyhow::Result<()> {
    // 1. Records with different key sets
    let dir = TempDir::new()?;
    let path = dir.path().join("mixed_parameters.csv");
    let records = vec![
        LogRecord::new().with("image", "a").with("sigma", 1.0),
        LogRecord::new()
            .with("image", "b")
            .with("footprint_radius", 3i64)
            .with("mean_response", LogValue::Null),
    ];

    // 2. Write
    write_records(&path, &records)?;

    // 3. Header in first-seen order, missing keys empty
    let (header, rows) = read_csv(&path)?;
    assert_eq!(header, vec!["image", "sigma", "footprint_radius", "mean_response"]);
    assert_eq!(rows[0], vec!["a", "1.0", "", ""]);
    assert_eq!(rows[1], vec!["b", "", "3", ""]);

    Ok(())
}

#[test]
fn test_empty_log_is_empty_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested/empty_parameters.csv");

    write_records(&path, &[])?;

    assert_eq!(std::fs::read_to_string(&path)?, "");
    Ok(())
}
