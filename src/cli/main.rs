//! Cutout compositing CLI tool
//!
//! File-level access to the compositing pipeline: background recoloring,
//! resolution limiting, mask overlays and segmentation sessions driven by
//! precomputed oracle output.

use super::config::{CliConfigBuilder, LimitArgs};
use crate::{
    compositor::Compositor,
    config::{ResizeFilter, DEFAULT_CONFIDENCE_THRESHOLD},
    mask::MaskReconstructor,
    oracle::PrecomputedOracle,
    services::LoggingObserver,
    session::SegmentationSession,
    tracing_config::{events, init_cli_tracing, spans},
    types::{CompositeColor, PixelBuffer, SegmentationResult},
    utils::{ColorParser, ResolutionLimiter},
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use instant::Instant;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

/// Subject cutout compositing tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "cutout-compose")]
pub struct Cli {
    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Place a foreground cutout over a background color
    Composite {
        /// Foreground image with transparency
        input: PathBuf,

        /// Preset name (see `palette`) or hex color (#RGB, #RRGGBB, #RRGGBBAA)
        #[arg(short, long, default_value = "white")]
        background: String,

        /// Output PNG [default: <input>_<background>.png]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Downscale an image to fit a resolution bound
    Limit {
        input: PathBuf,

        /// Maximum width in pixels [default: 1920]
        #[arg(long)]
        max_width: Option<u32>,

        /// Maximum height in pixels [default: 1080]
        #[arg(long)]
        max_height: Option<u32>,

        /// Resampling filter
        #[arg(long, value_enum, default_value_t = ResizeFilter::Bilinear)]
        filter: ResizeFilter,

        /// Output PNG [default: <input>_limited.png]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Paint subject masks (JSON array) onto a transparent overlay
    Overlay {
        /// JSON file holding an array of subject masks
        masks: PathBuf,

        /// Overlay width in pixels
        #[arg(long)]
        width: u32,

        /// Overlay height in pixels
        #[arg(long)]
        height: u32,

        /// Paint pixels whose confidence exceeds this value
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
        threshold: f32,

        /// Marker color [default: #ff00ff80]
        #[arg(long)]
        marker: Option<String>,

        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show a cutout over the transparency checkerboard
    Preview {
        input: PathBuf,

        /// Output PNG [default: <input>_preview.png]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a segmentation session on an image using precomputed oracle output
    Segment {
        /// Source image
        input: PathBuf,

        /// Subject masks (JSON array) produced for the limited source image
        #[arg(long, conflicts_with = "foreground", required_unless_present = "foreground")]
        masks: Option<PathBuf>,

        /// Foreground cutout produced for the limited source image
        #[arg(long)]
        foreground: Option<PathBuf>,

        /// Maximum width before segmentation [default: 1920]
        #[arg(long)]
        max_width: Option<u32>,

        /// Maximum height before segmentation [default: 1080]
        #[arg(long)]
        max_height: Option<u32>,

        /// Submit the image at full resolution
        #[arg(long)]
        no_limit: bool,

        /// Mask confidence threshold [default: 0.5]
        #[arg(long)]
        threshold: Option<f32>,

        /// Background placed under the result
        #[arg(short, long, default_value = "transparent")]
        background: String,

        /// Output PNG [default: <input>_segmented.png]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List preset background colors
    Palette,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    let start_time = Instant::now();
    run(cli.command).await?;
    events::performance_metric("command", start_time.elapsed().as_millis() as u64);

    Ok(())
}

/// Execute one parsed command
pub async fn run(command: Command) -> Result<()> {
    match command {
        Command::Composite {
            input,
            background,
            output,
        } => {
            let color = CliConfigBuilder::background(&background)?;
            let output = output.unwrap_or_else(|| {
                let suffix = CliConfigBuilder::background_suffix(&background);
                CliConfigBuilder::default_output_path(&input, &suffix)
            });
            composite_file(&input, color, &output)
        },
        Command::Limit {
            input,
            max_width,
            max_height,
            filter,
            output,
        } => {
            let limiter = CliConfigBuilder::limiter(LimitArgs {
                max_width,
                max_height,
                filter,
                no_limit: false,
            })?
            .unwrap_or_default();
            let output =
                output.unwrap_or_else(|| CliConfigBuilder::default_output_path(&input, "limited"));

            let _span = spans::file_processing(&input, "limit").entered();
            let image = load_image(&input)?;
            let (width, height) = image.dimensions();
            let limited = ResolutionLimiter::limit(image, &limiter)?;
            save_image(&limited, &output)?;
            info!(
                "{}x{} -> {}x{}: {}",
                width,
                height,
                limited.width(),
                limited.height(),
                output.display()
            );
            Ok(())
        },
        Command::Overlay {
            masks,
            width,
            height,
            threshold,
            marker,
            output,
        } => {
            let _span = spans::file_processing(&masks, "overlay").entered();
            let config = CliConfigBuilder::mask(Some(threshold), marker.as_deref())?;
            let reconstructor = MaskReconstructor::new(config)?;
            let subject_masks = CliConfigBuilder::load_masks(&masks)?;
            let overlay = reconstructor.reconstruct(&subject_masks, width, height)?;
            save_image(&overlay, &output)?;
            info!(
                "Painted {} mask(s) onto {}x{} overlay: {}",
                subject_masks.len(),
                width,
                height,
                output.display()
            );
            Ok(())
        },
        Command::Preview { input, output } => {
            let output =
                output.unwrap_or_else(|| CliConfigBuilder::default_output_path(&input, "preview"));
            let _span = spans::file_processing(&input, "preview").entered();
            let foreground = load_image(&input)?;
            let preview = Compositor::preview(&foreground)?;
            save_image(&preview, &output)?;
            info!("Preview written to {}", output.display());
            Ok(())
        },
        Command::Segment {
            input,
            masks,
            foreground,
            max_width,
            max_height,
            no_limit,
            threshold,
            background,
            output,
        } => {
            let config = CliConfigBuilder::session(
                LimitArgs {
                    max_width,
                    max_height,
                    filter: ResizeFilter::default(),
                    no_limit,
                },
                threshold,
                None,
            )?;
            let color = CliConfigBuilder::background(&background)?;
            let result = match (masks, foreground) {
                (Some(path), _) => {
                    SegmentationResult::SubjectMasks(CliConfigBuilder::load_masks(&path)?)
                },
                (None, Some(path)) => SegmentationResult::WholeImageForeground(load_image(&path)?),
                (None, None) => anyhow::bail!("Either --masks or --foreground is required"),
            };
            let output = output
                .unwrap_or_else(|| CliConfigBuilder::default_output_path(&input, "segmented"));

            let oracle = Arc::new(PrecomputedOracle::new(result));
            let session = SegmentationSession::with_config(oracle, config)?;
            session.add_observer(Arc::new(LoggingObserver::new(true)));

            let bitmap = session
                .process(load_image(&input)?)
                .instrument(spans::file_processing(&input, "segment"))
                .await
                .context("Segmentation failed")?;
            let composited = Compositor::composite_shared(bitmap, color).await?;
            save_image(&composited, &output)?;

            if let Some(timings) = session.last_timings() {
                events::performance_metric("segment", timings.total_ms);
            }
            events::progress(&format!("Saved {}", output.display()), "✅");
            Ok(())
        },
        Command::Palette => {
            for (name, color) in CompositeColor::palette() {
                match color {
                    CompositeColor::Transparent => println!("{:<10} transparent", name),
                    CompositeColor::Solid(rgba) => {
                        println!("{:<10} {}", name, ColorParser::to_hex(rgba));
                    },
                }
            }
            Ok(())
        },
    }
}

fn composite_file(input: &Path, color: CompositeColor, output: &Path) -> Result<()> {
    let _span = spans::file_processing(input, "composite").entered();
    let foreground = load_image(input)?;
    let _compose = spans::compositing(&color.to_string(), foreground.dimensions()).entered();

    let composited = Compositor::composite(&foreground, color)?;
    save_image(&composited, output)?;
    info!("Composited over {}: {}", color, output.display());
    Ok(())
}

fn load_image(path: &Path) -> Result<PixelBuffer> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    PixelBuffer::from_encoded_bytes(&bytes)
        .with_context(|| format!("Failed to decode {}", path.display()))
}

fn save_image(image: &PixelBuffer, path: &Path) -> Result<()> {
    image
        .save_png(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
