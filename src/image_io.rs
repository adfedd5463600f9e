use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat};

use crate::errors::{VectorizeError, Result};

/// Extensions picked up when scanning a directory
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// A decoded input image with its metadata
pub struct InputImage {
    pub image: DynamicImage,
    pub path: PathBuf,
    pub filename: String,
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Get all supported image files under a directory (recursively, sorted)
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(VectorizeError::InvalidPath(dir_path.to_path_buf()));
    }
    if !dir_path.is_dir() {
        return Err(VectorizeError::Config(format!(
            "{} is not a directory",
            dir_path.display()
        )));
    }

    let mut files = Vec::new();
    collect_images(dir_path, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_images(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_images(&path, result)?;
        } else if path.is_file() && is_supported_image(&path) {
            result.push(path);
        }
    }
    Ok(())
}

/// Decode an image file; the format is taken from the file contents
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| VectorizeError::InvalidPath(path.to_path_buf()))?
        .to_string();

    if !path.is_file() {
        return Err(VectorizeError::InvalidPath(path.to_path_buf()));
    }

    let image = image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()?;

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        filename,
    })
}

/// Save a mask as PNG, creating parent directories as needed
pub fn save_mask<P: AsRef<Path>>(mask: &GrayImage, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    mask.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
