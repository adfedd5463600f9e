// src/lib.rs - Library interface for the edge vectorizer

pub mod annotations;
pub mod config;
pub mod contours;
pub mod edge_mask;
pub mod errors;
pub mod export;
pub mod extraction;
pub mod filters;
pub mod image_io;
pub mod image_utils;
pub mod morphology;
pub mod pipeline;

// Re-export commonly used types and functions
pub use errors::{ErrorKind, VectorizeError, Result};
pub use config::{Config, Parameters, Preset};
pub use image_io::{InputImage, load_image, get_image_files_in_dir};
pub use pipeline::{
    plan_batch, process_batch_item, process_image, run_pipeline, BatchItem, Extraction,
    OutputOptions, ProcessOutcome,
};

pub use edge_mask::build_edge_mask;
pub use extraction::{extract_contours, simplify_contour};
pub use contours::{Contour, PixelPoint};
pub use annotations::{merge_for_export, Annotations, ScenePoint, ShapeSpec};
pub use export::{
    effective_mm_per_pixel,
    export_polygons,
    read_polylines,
    CoordinateMapper,
    ExportSummary,
};
