//! The image gallery every module runs against: a fixed set of synthetic
//! sample images plus optional images from disk.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageReader, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;

use crate::error::OperationError;

pub const PERSONAL_IMAGE_KEY: &str = "personal";
pub const DEFAULT_PERSONAL_IMAGE: &str = "personal.jpeg";

/// Ordered mapping of image id → image. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    images: Vec<(String, DynamicImage)>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an image, replacing (in place) any image with the same id.
    pub fn insert(&mut self, id: impl Into<String>, image: DynamicImage) {
        let id = id.into();
        match self.images.iter_mut().find(|(k, _)| *k == id) {
            Some((_, slot)) => *slot = image,
            None => self.images.push((id, image)),
        }
    }

    pub fn with(mut self, id: impl Into<String>, image: DynamicImage) -> Self {
        self.insert(id, image);
        self
    }

    pub fn get(&self, id: &str) -> Option<&DynamicImage> {
        self.images.iter().find(|(k, _)| k == id).map(|(_, img)| img)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DynamicImage)> {
        self.images.iter().map(|(k, img)| (k.as_str(), img))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.images.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Where optional gallery images come from
#[derive(Debug, Clone)]
pub struct GallerySources {
    /// Directory whose PNG/JPEG files are all added (sorted by file name)
    pub gallery_dir: Option<PathBuf>,
    /// Single optional image added under [`PERSONAL_IMAGE_KEY`]
    pub personal_image: Option<PathBuf>,
}

impl Default for GallerySources {
    fn default() -> Self {
        Self {
            gallery_dir: None,
            personal_image: Some(PathBuf::from(DEFAULT_PERSONAL_IMAGE)),
        }
    }
}

/// Load the full gallery eagerly. Missing or unreadable optional images are
/// logged and left out; the built-in images are always present.
pub fn load_gallery(sources: &GallerySources) -> Gallery {
    log::info!("Loading images...");
    let mut gallery = builtin_gallery();

    if let Some(dir) = &sources.gallery_dir {
        match images_in_dir(dir) {
            Ok(paths) => {
                for path in paths {
                    let Some(id) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                        continue;
                    };
                    match load_image(&path) {
                        Ok(image) => gallery.insert(id, image),
                        Err(e) => log::error!("failed to load {}: {}", path.display(), e),
                    }
                }
            }
            Err(e) => log::warn!("cannot read gallery directory {}: {}", dir.display(), e),
        }
    }

    if let Some(path) = &sources.personal_image {
        match load_optional(path) {
            Ok(image) => gallery.insert(PERSONAL_IMAGE_KEY, image),
            Err(OperationError::MissingInput(path)) => {
                log::warn!("personal image '{}' not found", path.display());
            }
            Err(e) => log::error!("error loading personal image: {}", e),
        }
    }

    log::info!("Finished loading {} images.", gallery.len());
    gallery
}

/// Decode an image file
pub fn load_image(path: &Path) -> Result<DynamicImage, OperationError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

/// Like [`load_image`], but absence is reported as `MissingInput`.
pub fn load_optional(path: &Path) -> Result<DynamicImage, OperationError> {
    if !path.exists() {
        return Err(OperationError::MissingInput(path.to_path_buf()));
    }
    load_image(path)
}

fn images_in_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// The synthetic sample images, in their fixed order
pub fn builtin_gallery() -> Gallery {
    Gallery::new()
        .with("checkerboard", DynamicImage::ImageLuma8(checkerboard(200, 200, 25)))
        .with("discs", DynamicImage::ImageLuma8(discs()))
        .with("gradient", DynamicImage::ImageRgb8(gradient()))
        .with("shapes", DynamicImage::ImageRgb8(shapes()))
}

/// Black/white checkerboard with square cells of `cell` pixels; the
/// top-left cell is white.
pub fn checkerboard(width: u32, height: u32, cell: u32) -> GrayImage {
    let cell = cell.max(1);
    GrayImage::from_fn(width, height, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Bright discs of different sizes and brightness on a shaded background
fn discs() -> GrayImage {
    let (width, height) = (300u32, 200u32);
    let mut img = GrayImage::from_fn(width, height, |x, y| {
        Luma([(40 + (x * 30) / width + (y * 20) / height) as u8])
    });

    let discs: [((i32, i32), i32, u8); 8] = [
        ((45, 50), 22, 200),
        ((115, 45), 18, 170),
        ((185, 55), 25, 230),
        ((255, 50), 20, 150),
        ((50, 145), 24, 185),
        ((120, 150), 16, 210),
        ((190, 140), 21, 160),
        ((255, 150), 26, 240),
    ];
    for (center, radius, value) in discs {
        draw_filled_circle_mut(&mut img, center, radius, Luma([value]));
        // darker centre so each disc has internal structure
        draw_filled_circle_mut(&mut img, center, radius / 3, Luma([value.saturating_sub(60)]));
    }
    img
}

/// Smooth RGB gradient with a few solid patches
fn gradient() -> RgbImage {
    let size = 256u32;
    let mut img = RgbImage::from_fn(size, size, |x, y| {
        Rgb([(x * 255 / size) as u8, (y * 255 / size) as u8, 128])
    });
    draw_filled_rect_mut(&mut img, Rect::at(40, 40).of_size(60, 60), Rgb([250, 240, 20]));
    draw_filled_rect_mut(&mut img, Rect::at(150, 60).of_size(50, 90), Rgb([20, 30, 200]));
    draw_filled_circle_mut(&mut img, (90, 190), 30, Rgb([230, 230, 230]));
    img
}

/// Flat-colored geometric scene with plenty of corners
fn shapes() -> RgbImage {
    let size = 256u32;
    let mut img = RgbImage::from_pixel(size, size, Rgb([35, 60, 90]));
    draw_filled_rect_mut(&mut img, Rect::at(20, 20).of_size(80, 50), Rgb([220, 80, 60]));
    draw_filled_rect_mut(&mut img, Rect::at(140, 30).of_size(90, 90), Rgb([240, 200, 70]));
    draw_filled_rect_mut(&mut img, Rect::at(160, 50).of_size(40, 40), Rgb([40, 40, 40]));
    draw_filled_circle_mut(&mut img, (70, 170), 45, Rgb([90, 200, 120]));
    draw_polygon_mut(
        &mut img,
        &[Point::new(150, 230), Point::new(240, 230), Point::new(195, 150)],
        Rgb([250, 250, 250]),
    );
    img
}
