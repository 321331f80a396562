//! duosr CLI - two-stage super-resolution of a single image.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duosr::image::{self, CropRect};
use duosr::{Config, DeviceKind, Pipeline};

/// Upscale an image with a sub-pixel network, then refine it with a conditional U-Net.
#[derive(Parser, Debug)]
#[command(name = "duosr")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input image path.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory the result images are written to.
    #[arg(short, long, default_value = "out", value_name = "DIR")]
    out_dir: PathBuf,

    /// Crop rectangle applied before processing, clamped to the image.
    #[arg(long, value_name = "X,Y,W,H", allow_hyphen_values = true)]
    crop: Option<CropRect>,

    /// Noise level added before refinement (0.0-2.0).
    #[arg(short, long, default_value = "0.1", value_name = "FLOAT")]
    noise: f32,

    /// Random seed for reproducible noise.
    #[arg(long, value_name = "INT")]
    seed: Option<u64>,

    /// Compute device: cpu, cuda or cuda:N.
    #[arg(long, default_value = "cpu", value_name = "DEVICE")]
    device: DeviceKind,

    /// Directory containing espcn_final.safetensors and unet_final.safetensors.
    #[arg(long, value_name = "DIR")]
    models_dir: Option<PathBuf>,

    /// Stage 1 weights, overriding --models-dir.
    #[arg(long, value_name = "PATH")]
    upsampler: Option<PathBuf>,

    /// Stage 2 weights, overriding --models-dir.
    #[arg(long, value_name = "PATH")]
    refiner: Option<PathBuf>,

    /// Output image format extension (png, jpg, ...).
    #[arg(long, default_value = "png", value_name = "EXT")]
    format: String,

    /// Output JPEG quality (1-100).
    #[arg(short, long, default_value = "95", value_name = "INT")]
    quality: u8,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("duosr={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }
    if !(1..=100).contains(&args.quality) {
        anyhow::bail!("Quality must be between 1 and 100, got {}", args.quality);
    }

    let config = Config {
        noise_level: args.noise,
        device: args.device,
        seed: args.seed,
        models_dir: args.models_dir.clone(),
        upsampler_weights: args.upsampler.clone(),
        refiner_weights: args.refiner.clone(),
        ..Config::default()
    };

    let pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;

    let original = image::load_image(&args.input).context("Failed to read input image")?;
    let result = pipeline
        .run(&original, args.crop)
        .context("Failed to process image")?;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    let save = |img: &::image::RgbImage, stem: &str| -> Result<PathBuf> {
        let path = output_path(&args.out_dir, stem, &args.format);
        image::save_image(img, &path, args.quality)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        Ok(path)
    };

    save(&result.preview, "lr")?;
    save(&result.stage1, "sr80")?;
    let final_path = save(&result.stage2, "sr160")?;
    if args.crop.is_some() {
        save(&original, "original")?;
    }

    println!(
        "Successfully processed {} -> {}",
        args.input.display(),
        final_path.display()
    );

    Ok(())
}

fn output_path(dir: &Path, stem: &str, format: &str) -> PathBuf {
    dir.join(format!("{stem}.{}", format.trim_start_matches('.')))
}
