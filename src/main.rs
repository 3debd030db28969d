use clap::{Parser, Subcommand};
use std::path::PathBuf;

use imgbatch::config::{DEFAULT_OUTPUT_ROOT, Module, RunConfig};
use imgbatch::gallery::{self, DEFAULT_PERSONAL_IMAGE, Gallery};
use imgbatch::pipeline::{BatchPipeline, RunSummary, SkippedOperation};
use imgbatch::{edges, features, filtering, geometry};

#[derive(Parser)]
#[command(name = "imgbatch")]
#[command(about = "Batch image filtering, edge, feature and geometry comparisons")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Root directory for all outputs
    #[arg(long, value_name = "DIR", default_value = DEFAULT_OUTPUT_ROOT)]
    output_dir: PathBuf,

    /// Directory of extra PNG/JPEG images to add to the gallery
    #[arg(long, value_name = "DIR")]
    gallery_dir: Option<PathBuf>,

    /// Optional personal image, added as "personal" when present
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PERSONAL_IMAGE)]
    personal_image: PathBuf,

    /// TrueType font for figure titles and labels
    #[arg(long, value_name = "PATH")]
    font: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Gaussian, median and Sobel filters
    Filtering,
    /// Sobel magnitude and Canny variants
    Edges,
    /// Harris, FAST, ORB and SIFT keypoints
    Features,
    /// Projective and affine warps of the checkerboard
    Geometry,
    /// Every module in order
    All,
}

impl Command {
    fn modules(self) -> Vec<Module> {
        match self {
            Command::Filtering => vec![Module::Filtering],
            Command::Edges => vec![Module::Edges],
            Command::Features => vec![Module::Features],
            Command::Geometry => vec![Module::Geometry],
            Command::All => Module::ALL.to_vec(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = RunConfig {
        output_root: args.output_dir,
        gallery_dir: args.gallery_dir,
        personal_image: args.personal_image,
        font_path: args.font,
    };

    let gallery = gallery::load_gallery(&config.gallery_sources());
    log::info!(
        "Gallery: {} image(s): {}",
        gallery.len(),
        gallery.ids().collect::<Vec<_>>().join(", ")
    );

    for module in args.command.unwrap_or(Command::All).modules() {
        run_module(&config, module, &gallery)?;
    }

    println!("\nAll outputs written under: {}", config.output_root.display());
    Ok(())
}

fn run_module(config: &RunConfig, module: Module, gallery: &Gallery) -> anyhow::Result<()> {
    let context = config.context(module);
    println!("\n=== {} ===", module.subdir());

    let summary = match module {
        Module::Filtering => BatchPipeline::new(context).run(&filtering::filter_table(), gallery)?,
        Module::Edges => BatchPipeline::new(context).run(&edges::edge_table(), gallery)?,
        Module::Features => BatchPipeline::new(context).run(&features::feature_table(), gallery)?,
        Module::Geometry => {
            match geometry::run_geometry(&context, gallery)? {
                Some(summary) => {
                    println!("Transforms applied: {}", summary.records.len());
                    for (name, estimate) in &summary.estimates {
                        println!("  {} ({})", name, estimate.kind);
                    }
                    print_skipped(&summary.skipped);
                    println!("Parameters: {}", summary.csv_path.display());
                }
                None => println!("No checkerboard image available, geometry skipped."),
            }
            return Ok(());
        }
    };

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Images processed: {}", summary.images.len());
    println!("Records logged: {}", summary.records.len());
    print_skipped(&summary.skipped);
    println!("Parameters: {}", summary.csv_path.display());
}

fn print_skipped(skipped: &[SkippedOperation]) {
    if skipped.is_empty() {
        return;
    }
    println!("Skipped: {}", skipped.len());
    for s in skipped {
        println!("  {} on {}: {}", s.operation, s.image, s.reason);
    }
}
