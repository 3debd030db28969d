use std::path::Path;

use crate::error::OperationError;
use crate::models::LogRecord;

/// Union of record keys in first-seen order
pub fn header_of(records: &[LogRecord]) -> Vec<String> {
    let mut header: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !header.iter().any(|h| h == key) {
                header.push(key.to_string());
            }
        }
    }
    header
}

/// Write records as CSV. Keys missing from a record and `Null` values
/// become empty cells. An empty record list produces an empty file.
pub fn write_records(path: &Path, records: &[LogRecord]) -> Result<(), OperationError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let header = header_of(records);
    let mut writer = csv::Writer::from_path(path)?;

    if !header.is_empty() {
        writer.write_record(&header)?;
        for record in records {
            writer.write_record(
                header
                    .iter()
                    .map(|key| record.get(key).map(|v| v.to_string()).unwrap_or_default()),
            )?;
        }
    }
    writer.flush()?;

    log::info!("Parameters saved to: {}", super::file_name(path));
    Ok(())
}
