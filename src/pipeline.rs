// src/pipeline.rs - One image from pixels to a DXF file

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};

use crate::annotations::Annotations;
use crate::config::Parameters;
use crate::contours::Contour;
use crate::edge_mask::build_edge_mask;
use crate::errors::{VectorizeError, Result};
use crate::export::{effective_mm_per_pixel, export_polygons, ExportSummary};
use crate::extraction::extract_contours;
use crate::image_io::{load_image, save_mask, InputImage};

/// Intermediate results of one extraction run
#[derive(Debug, Clone)]
pub struct Extraction {
    pub mask: GrayImage,
    pub contours: Vec<Contour>,
    pub width: u32,
    pub height: u32,
}

/// Result of processing one input image
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    Exported(ExportSummary),
    /// Nothing survived extraction and annotation; no file was written
    NoContours,
}

/// Options that apply to writing results rather than to extraction
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub output_dir: PathBuf,
    pub export_scale: f64,
    pub save_debug_mask: bool,
}

/// Mask building and contour extraction for one image.
///
/// Every returned contour has at least three points.
pub fn run_pipeline(image: &DynamicImage, params: &Parameters) -> Result<Extraction> {
    let (width, height) = (image.width(), image.height());
    let mask = build_edge_mask(image, params)?;
    let found = extract_contours(&mask, params.largest_n, params.simplify_pct, params.gap_threshold)?;

    // Erasure indices address this list, so drop unexportable fragments here
    let total = found.len();
    let contours: Vec<Contour> = found.into_iter().filter(Contour::is_polygon).collect();
    if contours.len() < total {
        log::debug!("Dropped {} point/line fragment(s)", total - contours.len());
    }

    for (idx, contour) in contours.iter().enumerate() {
        log::debug!(
            "Contour {}: {} points, area {:.1}{}",
            idx,
            contour.len(),
            contour.area(),
            if contour.is_significant() { "" } else { " (small)" }
        );
    }

    Ok(Extraction { mask, contours, width, height })
}

/// `<stem>_<W'>x<H'>.dxf` with the dimensions scaled by `export_scale`
pub fn output_file_name(stem: &str, width: u32, height: u32, export_scale: f64) -> String {
    let scaled_width = (width as f64 * export_scale).floor() as u64;
    let scaled_height = (height as f64 * export_scale).floor() as u64;
    format!("{}_{}x{}.dxf", stem, scaled_width, scaled_height)
}

/// Debug mask location for an input stem
pub fn debug_mask_path(output_dir: &Path, stem: &str) -> PathBuf {
    output_dir.join("debug").join(format!("{}_mask.png", stem))
}

/// Process a single image: extract, apply annotations, export
pub fn process_image(
    input_image: InputImage,
    params: &Parameters,
    options: &OutputOptions,
    annotations: Option<&Annotations>,
) -> Result<ProcessOutcome> {
    let InputImage { image, path, filename } = input_image;

    // Reject a bad scale before doing any work
    let mm_per_pixel = effective_mm_per_pixel(params.mm_per_pixel, options.export_scale)?;

    let extraction = run_pipeline(&image, params)?;
    log::info!(
        "{}: {} contour(s) extracted from {}x{} image",
        path.display(),
        extraction.contours.len(),
        extraction.width,
        extraction.height
    );

    if options.save_debug_mask {
        let mask_path = debug_mask_path(&options.output_dir, &filename);
        save_mask(&extraction.mask, &mask_path)?;
        log::debug!("Saved edge mask to {}", mask_path.display());
    }

    let merged = match annotations {
        Some(annotations) => annotations.merge(&extraction.contours),
        None => extraction.contours,
    };

    if merged.is_empty() {
        log::warn!("{}: no contours to export; skipping", path.display());
        return Ok(ProcessOutcome::NoContours);
    }

    if !options.output_dir.is_dir() {
        return Err(VectorizeError::InvalidPath(options.output_dir.clone()));
    }

    let output_path = options.output_dir.join(output_file_name(
        &filename,
        extraction.width,
        extraction.height,
        options.export_scale,
    ));
    let summary = export_polygons(&merged, extraction.height, extraction.width, mm_per_pixel, output_path)?;

    Ok(ProcessOutcome::Exported(summary))
}

/// One image of a directory run and where its results go
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Stem used for the output file names; unique within `output_dir`
    pub stem: String,
}

/// Assign every input file an output directory and a stem.
///
/// The input's subdirectory below `input_root` is mirrored under
/// `output_root`. Files that would still share a stem in one output
/// directory (`a.png` next to `a.jpg`) get their extension appended, and a
/// numeric suffix if that is not enough.
pub fn plan_batch(input_root: &Path, files: &[PathBuf], output_root: &Path) -> Vec<BatchItem> {
    let placed: Vec<(PathBuf, PathBuf, String)> = files
        .iter()
        .map(|file| {
            let relative = file
                .parent()
                .and_then(|parent| parent.strip_prefix(input_root).ok())
                .unwrap_or_else(|| Path::new(""));
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            (file.clone(), output_root.join(relative), stem)
        })
        .collect();

    let mut stem_counts: HashMap<(PathBuf, String), usize> = HashMap::new();
    for (_, dir, stem) in &placed {
        *stem_counts.entry((dir.clone(), stem.clone())).or_insert(0) += 1;
    }

    let mut used: HashSet<(PathBuf, String)> = HashSet::new();
    placed
        .into_iter()
        .map(|(input, output_dir, stem)| {
            let mut base = stem.clone();
            if stem_counts.get(&(output_dir.clone(), stem.clone())).copied().unwrap_or(0) > 1 {
                if let Some(ext) = input.extension() {
                    base = format!("{}_{}", stem, ext.to_string_lossy());
                }
            }

            let mut name = base.clone();
            let mut n = 2;
            while !used.insert((output_dir.clone(), name.clone())) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            if name != stem {
                log::warn!(
                    "{} shares its name with another input; writing as {}",
                    input.display(),
                    name
                );
            }

            BatchItem { input, output_dir, stem: name }
        })
        .collect()
}

/// Load and process one planned batch item
pub fn process_batch_item(
    item: &BatchItem,
    params: &Parameters,
    options: &OutputOptions,
) -> Result<ProcessOutcome> {
    let mut input_image = load_image(&item.input)?;
    input_image.filename = item.stem.clone();

    fs::create_dir_all(&item.output_dir)?;
    let options = OutputOptions {
        output_dir: item.output_dir.clone(),
        ..options.clone()
    };
    process_image(input_image, params, &options, None)
}
