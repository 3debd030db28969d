use std::path::PathBuf;

use crate::gallery::{DEFAULT_PERSONAL_IMAGE, GallerySources};
use crate::output::ComparisonRenderer;
use crate::pipeline::PipelineContext;

pub const DEFAULT_OUTPUT_ROOT: &str = "output";

/// One of the four processing modules and where it writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Filtering,
    Edges,
    Features,
    Geometry,
}

impl Module {
    pub const ALL: [Module; 4] = [Module::Filtering, Module::Edges, Module::Features, Module::Geometry];

    pub fn subdir(self) -> &'static str {
        match self {
            Module::Filtering => "01_filtering",
            Module::Edges => "02_edge",
            Module::Features => "03_featurepoints",
            Module::Geometry => "04_geometry",
        }
    }
}

/// Settings of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub output_root: PathBuf,
    pub gallery_dir: Option<PathBuf>,
    pub personal_image: PathBuf,
    pub font_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            gallery_dir: None,
            personal_image: PathBuf::from(DEFAULT_PERSONAL_IMAGE),
            font_path: None,
        }
    }
}

impl RunConfig {
    pub fn module_root(&self, module: Module) -> PathBuf {
        self.output_root.join(module.subdir())
    }

    pub fn gallery_sources(&self) -> GallerySources {
        GallerySources {
            gallery_dir: self.gallery_dir.clone(),
            personal_image: Some(self.personal_image.clone()),
        }
    }

    pub fn renderer(&self) -> ComparisonRenderer {
        ComparisonRenderer::new(self.font_path.as_deref())
    }

    /// Pipeline context writing under `module`'s subdirectory
    pub fn context(&self, module: Module) -> PipelineContext {
        PipelineContext::new(self.module_root(module), self.renderer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modules_write_to_numbered_subdirectories() {
        let config = RunConfig {
            output_root: PathBuf::from("out"),
            ..RunConfig::default()
        };
        let dirs: Vec<PathBuf> = Module::ALL.iter().map(|m| config.module_root(*m)).collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("out/01_filtering"),
                PathBuf::from("out/02_edge"),
                PathBuf::from("out/03_featurepoints"),
                PathBuf::from("out/04_geometry"),
            ]
        );
    }
}
