use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

use super::markers::{CrossStyle, draw_crosses};
use crate::error::OperationError;

const CELL_SIZE: u32 = 256;
const MARGIN: u32 = 8;
const LABEL_HEIGHT: u32 = 24;
const TITLE_HEIGHT: u32 = 40;
const LABEL_SCALE: f32 = 16.0;
const TITLE_SCALE: f32 = 24.0;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const SOURCE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const DESTINATION_COLOR: Rgb<u8> = Rgb([0, 160, 0]);

/// Fonts tried when no explicit font is configured
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Where a panel landed on the canvas, so callers can map image
/// coordinates onto it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelPlacement {
    pub x: u32,
    pub y: u32,
    pub scale: f32,
}

impl PanelPlacement {
    /// Map an (x, y) point of the source image into canvas coordinates.
    pub fn map(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (self.x as f32 + x * self.scale, self.y as f32 + y * self.scale)
    }
}

/// Lays out labelled panels on a white canvas.
///
/// Text is only drawn when a TrueType font could be loaded; the layout is
/// the same either way.
pub struct ComparisonRenderer {
    font: Option<FontVec>,
    cell_size: u32,
}

impl ComparisonRenderer {
    /// Load `font_path` if given, otherwise the first readable system font.
    pub fn new(font_path: Option<&Path>) -> Self {
        let candidates: Vec<PathBuf> = match font_path {
            Some(path) => vec![path.to_path_buf()],
            None => SYSTEM_FONTS.iter().map(PathBuf::from).collect(),
        };

        let font = candidates.iter().find_map(|path| {
            let bytes = std::fs::read(path).ok()?;
            match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    log::debug!("using font {}", path.display());
                    Some(font)
                }
                Err(e) => {
                    log::warn!("could not parse font {}: {}", path.display(), e);
                    None
                }
            }
        });

        if font.is_none() {
            log::info!("no usable font found; comparison figures are rendered without titles");
        }

        Self {
            font,
            cell_size: CELL_SIZE,
        }
    }

    /// Renderer that never draws text (used by tests and headless runs)
    pub fn without_text() -> Self {
        Self {
            font: None,
            cell_size: CELL_SIZE,
        }
    }

    pub fn with_cell_size(mut self, cell_size: u32) -> Self {
        self.cell_size = cell_size.max(1);
        self
    }

    /// Arrange panels in two rows (row-major), each with its label above
    /// it, under an overall title. Unused cells stay blank.
    pub fn render(&self, panels: &[(String, DynamicImage)], title: &str) -> RgbImage {
        let rows = 2;
        let cols = ((panels.len() as u32 + 1) / 2).max(1);
        let mut canvas = self.blank_canvas(rows, cols);
        self.draw_title(&mut canvas, title);

        for (index, (label, panel)) in panels.iter().enumerate() {
            let index = index as u32;
            let (row, col) = (index / cols, index % cols);
            self.place_panel(&mut canvas, row, col, label, panel);
        }

        canvas
    }

    /// Render and write a comparison grid.
    pub fn render_to(
        &self,
        panels: &[(String, DynamicImage)],
        title: &str,
        path: &Path,
    ) -> Result<(), OperationError> {
        let canvas = self.render(panels, title);
        super::save_image(path, &DynamicImage::ImageRgb8(canvas))?;
        log::info!("Comparison plot saved to: {}", super::file_name(path));
        Ok(())
    }

    /// Side-by-side view of an image with its source points and the warped
    /// image with its destination points. Points are (x, y).
    pub fn render_overlay(
        &self,
        original: &DynamicImage,
        src_points: &[(f32, f32)],
        warped: &DynamicImage,
        dst_points: &[(f32, f32)],
        title: &str,
    ) -> RgbImage {
        let mut canvas = self.blank_canvas(1, 2);
        self.draw_title(&mut canvas, title);

        let left = self.place_panel(&mut canvas, 0, 0, "Original Image + Source Points", original);
        let mapped: Vec<(f32, f32)> = src_points.iter().map(|&p| left.map(p)).collect();
        draw_crosses(&mut canvas, &mapped, SOURCE_COLOR, CrossStyle::X);

        let right = self.place_panel(&mut canvas, 0, 1, "Warped Image + Destination Points", warped);
        let mapped: Vec<(f32, f32)> = dst_points.iter().map(|&p| right.map(p)).collect();
        draw_crosses(&mut canvas, &mapped, DESTINATION_COLOR, CrossStyle::Plus);

        canvas
    }

    fn blank_canvas(&self, rows: u32, cols: u32) -> RgbImage {
        let width = cols * (self.cell_size + MARGIN) + MARGIN;
        let height = TITLE_HEIGHT + rows * (LABEL_HEIGHT + self.cell_size + MARGIN) + MARGIN;
        RgbImage::from_pixel(width, height, BACKGROUND)
    }

    fn draw_title(&self, canvas: &mut RgbImage, title: &str) {
        let y = (TITLE_HEIGHT as f32 - TITLE_SCALE) as i32 / 2;
        self.draw_centered(canvas, title, 0, canvas.width(), y, TITLE_SCALE);
    }

    fn place_panel(
        &self,
        canvas: &mut RgbImage,
        row: u32,
        col: u32,
        label: &str,
        panel: &DynamicImage,
    ) -> PanelPlacement {
        let cell_x = MARGIN + col * (self.cell_size + MARGIN);
        let cell_y = TITLE_HEIGHT + row * (LABEL_HEIGHT + self.cell_size + MARGIN);

        self.draw_centered(canvas, label, cell_x, self.cell_size, cell_y as i32 + 2, LABEL_SCALE);

        let (fitted, scale) = fit_to_cell(panel, self.cell_size);
        let x = cell_x + (self.cell_size - fitted.width()) / 2;
        let y = cell_y + LABEL_HEIGHT + (self.cell_size - fitted.height()) / 2;
        imageops::overlay(canvas, &fitted, x as i64, y as i64);

        PanelPlacement { x, y, scale }
    }

    fn draw_centered(&self, canvas: &mut RgbImage, text: &str, x: u32, width: u32, y: i32, scale: f32) {
        let Some(font) = &self.font else {
            return;
        };
        let (text_width, _) = text_size(scale, font, text);
        let offset = width.saturating_sub(text_width) / 2;
        draw_text_mut(canvas, TEXT_COLOR, (x + offset) as i32, y, scale, font, text);
    }
}

/// Scale a panel to fit inside a square cell, keeping its aspect ratio.
/// Small images are enlarged with nearest-neighbour sampling so pixel
/// structure stays visible.
fn fit_to_cell(panel: &DynamicImage, cell: u32) -> (RgbImage, f32) {
    let rgb = panel.to_rgb8();
    let (w, h) = rgb.dimensions();
    if w == 0 || h == 0 {
        return (rgb, 1.0);
    }
    let scale = (cell as f32 / w as f32).min(cell as f32 / h as f32);
    let new_w = ((w as f32 * scale).round() as u32).clamp(1, cell);
    let new_h = ((h as f32 * scale).round() as u32).clamp(1, cell);
    let filter = if scale >= 1.0 {
        FilterType::Nearest
    } else {
        FilterType::Triangle
    };
    (imageops::resize(&rgb, new_w, new_h, filter), scale)
}
