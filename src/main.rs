use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;

use edge_vectorizer_lib::config::{Config, Preset};
use edge_vectorizer_lib::errors::VectorizeError;
use edge_vectorizer_lib::pipeline::{plan_batch, process_batch_item, BatchItem};
use edge_vectorizer_lib::{
    get_image_files_in_dir, load_image, process_image, read_polylines, Annotations,
    OutputOptions, Parameters, ProcessOutcome,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Edge Vectorizer - raster images to DXF outlines")]
struct Args {
    /// Path to input image or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file (defaults are used if it does not exist)
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Parameter preset (overwrites config)
    #[clap(short, long)]
    preset: Option<PresetArg>,

    /// Export scale; millimetres per pixel are divided by it
    #[clap(long)]
    export_scale: Option<f64>,

    #[clap(long)]
    mm_per_pixel: Option<f64>,

    /// Maximum number of contours kept per image
    #[clap(long)]
    largest_n: Option<usize>,

    /// Simplification tolerance as a percentage of the image diagonal
    #[clap(long)]
    simplify_pct: Option<f64>,

    /// Gap-closing kernel side in pixels (0 disables)
    #[clap(long)]
    gap_threshold: Option<f64>,

    /// Treat dark lines on a light subject as edges (disable mask inversion)
    #[clap(long)]
    no_invert: bool,

    /// JSON annotations to merge before export
    #[clap(long)]
    annotations: Option<String>,

    /// Enable debug mode (save edge masks and log per-contour detail)
    #[clap(short, long)]
    debug: bool,

    /// Write the effective configuration to this path and exit
    #[clap(long)]
    write_config: Option<String>,

    /// Read every written file back and report its polyline count
    #[clap(long)]
    verify: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Default,
    HighDetail,
    LowNoise,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Default => Preset::Default,
            PresetArg::HighDetail => Preset::HighDetail,
            PresetArg::LowNoise => Preset::LowNoise,
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        log::info!("No config file at {}; using defaults", args.config);
        Config::default()
    };

    // Override config with command-line arguments
    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if let Some(output) = &args.output {
        config.output_base_dir = output.clone();
    }
    if let Some(preset) = args.preset {
        config.preset = Some(preset.into());
    }
    if let Some(scale) = args.export_scale {
        config.export_scale = scale;
    }
    if let Some(annotations) = &args.annotations {
        config.annotations_path = Some(annotations.clone());
    }
    if args.debug {
        config.save_debug_mask = true;
    }

    let mut params = config.effective_parameters()?;
    let overridden = apply_parameter_overrides(&mut params, args);
    if overridden {
        config.set_parameters(&params)?;
    }

    Ok(config)
}

fn apply_parameter_overrides(params: &mut Parameters, args: &Args) -> bool {
    let mut changed = false;
    if let Some(mm) = args.mm_per_pixel {
        params.mm_per_pixel = mm;
        changed = true;
    }
    if let Some(n) = args.largest_n {
        params.largest_n = n;
        changed = true;
    }
    if let Some(pct) = args.simplify_pct {
        params.simplify_pct = pct;
        changed = true;
    }
    if let Some(gap) = args.gap_threshold {
        params.gap_threshold = gap;
        changed = true;
    }
    if args.no_invert {
        params.invert = false;
        changed = true;
    }
    changed
}

fn verify_output(outcome: &ProcessOutcome) -> anyhow::Result<()> {
    if let ProcessOutcome::Exported(summary) = outcome {
        let polylines = read_polylines(&summary.path)
            .with_context(|| format!("Failed to read back {}", summary.path.display()))?;
        if polylines.len() != summary.polylines {
            bail!(
                "{}: expected {} polylines, found {}",
                summary.path.display(),
                summary.polylines,
                polylines.len()
            );
        }
        println!("Verified {} ({} polylines)", summary.path.display(), polylines.len());
    }
    Ok(())
}

fn report(path: &Path, outcome: &ProcessOutcome) {
    match outcome {
        ProcessOutcome::Exported(summary) => println!(
            "{} -> {} ({} polylines, {:.1}mm x {:.1}mm)",
            path.display(),
            summary.path.display(),
            summary.polylines,
            summary.width_mm,
            summary.height_mm
        ),
        ProcessOutcome::NoContours => println!("{}: no contours found, nothing exported", path.display()),
    }
}

fn run_one(
    path: &Path,
    params: &Parameters,
    options: &OutputOptions,
    annotations: Option<&Annotations>,
    verify: bool,
) -> anyhow::Result<()> {
    let input_image = load_image(path)?;
    let outcome = process_image(input_image, params, options, annotations)
        .with_context(|| format!("Failed to process {}", path.display()))?;
    report(path, &outcome);
    if verify {
        verify_output(&outcome)?;
    }
    Ok(())
}

fn run_batch_item(
    item: &BatchItem,
    params: &Parameters,
    options: &OutputOptions,
    verify: bool,
) -> anyhow::Result<()> {
    let outcome = process_batch_item(item, params, options)
        .with_context(|| format!("Failed to process {}", item.input.display()))?;
    report(&item.input, &outcome);
    if verify {
        verify_output(&outcome)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = load_config(&args)?;

    if let Some(path) = &args.write_config {
        config.save_to_file(path)?;
        println!("Wrote configuration to {}", path);
        return Ok(());
    }

    // Validate configuration
    config.validate()?;
    let params = config.effective_parameters()?;

    let annotations = match &config.annotations_path {
        Some(path) => Some(Annotations::from_file(path)?),
        None => None,
    };

    let start_time = Instant::now();

    let options = OutputOptions {
        output_dir: PathBuf::from(&config.output_base_dir),
        export_scale: config.export_scale,
        save_debug_mask: config.save_debug_mask,
    };
    fs::create_dir_all(&options.output_dir)?;

    let input_path = PathBuf::from(&config.input_path);

    if input_path.is_file() {
        println!("Processing single file: {}", input_path.display());
        run_one(&input_path, &params, &options, annotations.as_ref(), args.verify)?;
    } else if input_path.is_dir() {
        if annotations.is_some() {
            log::warn!("Annotations refer to a single extraction; ignoring them in directory mode");
        }

        println!("Processing directory: {}", input_path.display());
        let files = get_image_files_in_dir(&input_path)?;
        println!("Found {} image files", files.len());
        let plan = plan_batch(&input_path, &files, &options.output_dir);

        let process = |item: &BatchItem| {
            let result = run_batch_item(item, &params, &options, args.verify);
            if let Err(e) = &result {
                log::error!("{}: {:#}", item.input.display(), e);
            }
            result
        };

        let failures = if config.use_parallel {
            plan.par_iter().map(process).filter(|r| r.is_err()).count()
        } else {
            plan.iter().map(process).filter(|r| r.is_err()).count()
        };

        if failures > 0 {
            bail!("{} of {} images failed", failures, plan.len());
        }
    } else {
        return Err(VectorizeError::InvalidPath(input_path).into());
    }

    let elapsed = start_time.elapsed();
    println!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
