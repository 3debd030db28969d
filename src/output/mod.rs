//! Writers for everything a run leaves on disk: images, the parameter CSV,
//! comparison grids, transform overlays and matrices.

pub mod comparison;
pub mod csv_log;
pub mod markers;

use std::fs;
use std::path::Path;

use image::DynamicImage;

use crate::error::OperationError;

pub use comparison::{ComparisonRenderer, PanelPlacement};
pub use csv_log::write_records;
pub use markers::{draw_crosses, draw_keypoints};

/// Save an image as 8-bit RGB, creating parent directories as needed.
///
/// Grayscale input is expanded to three channels and float data in [0, 1]
/// is scaled to 8 bits, so every saved artifact has the same layout.
pub fn save_image(path: &Path, image: &DynamicImage) -> Result<(), OperationError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    image.to_rgb8().save(path)?;
    log::debug!("saved {}", path.display());
    Ok(())
}

/// Write a 3×3 matrix as text: optional header, blank line, then one row
/// per line with tab-separated values at 4 decimals.
pub fn save_matrix(path: &Path, matrix: &[[f64; 3]; 3], header: &str) -> Result<(), OperationError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut text = String::new();
    if !header.is_empty() {
        text.push_str(header);
        text.push_str("\n\n");
    }
    for row in matrix {
        let cells: Vec<String> = row.iter().map(|v| format!("{:.4}", v)).collect();
        text.push_str(&cells.join("\t"));
        text.push('\n');
    }
    fs::write(path, text)?;
    log::info!("matrix saved to {}", file_name(path));
    Ok(())
}

/// Last path component for console messages
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
