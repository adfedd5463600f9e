// DXF export: pixel contours -> closed LWPOLYLINE entities in millimetres

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use dxf::entities::{Entity, EntityCommon, EntityType, LwPolyline};
use dxf::enums::AcadVersion;
use dxf::{Color, Drawing, LwPolylineVertex};
use tempfile::NamedTempFile;

use crate::contours::{Contour, PixelPoint};
use crate::errors::{VectorizeError, Result};

/// Maps pixel coordinates (y down) to output units (y up)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    pub image_height: u32,
    pub mm_per_pixel: f64,
}

impl CoordinateMapper {
    pub fn new(image_height: u32, mm_per_pixel: f64) -> Result<Self> {
        check_scale(mm_per_pixel)?;
        Ok(Self { image_height, mm_per_pixel })
    }

    #[inline]
    pub fn map(&self, point: PixelPoint) -> (f64, f64) {
        (
            point.x as f64 * self.mm_per_pixel,
            (self.image_height as f64 - point.y as f64) * self.mm_per_pixel,
        )
    }

    /// Inverse of `map`, rounded back onto the pixel grid
    pub fn unmap(&self, x: f64, y: f64) -> PixelPoint {
        PixelPoint::new(
            (x / self.mm_per_pixel).round() as i32,
            (self.image_height as f64 - y / self.mm_per_pixel).round() as i32,
        )
    }
}

fn check_scale(mm_per_pixel: f64) -> Result<()> {
    if !mm_per_pixel.is_finite() || mm_per_pixel <= 0.0 {
        return Err(VectorizeError::InvalidInput(format!(
            "mm_per_pixel must be a positive number (got {})",
            mm_per_pixel
        )));
    }
    Ok(())
}

/// Output scale after applying a user export scale factor.
///
/// A factor of 2 halves the millimetres each pixel covers.
pub fn effective_mm_per_pixel(mm_per_pixel: f64, export_scale: f64) -> Result<f64> {
    check_scale(mm_per_pixel)?;
    if !export_scale.is_finite() || export_scale <= 0.0 {
        return Err(VectorizeError::InvalidInput(format!(
            "export scale must be a positive number (got {})",
            export_scale
        )));
    }
    Ok(mm_per_pixel / export_scale)
}

/// What a successful export wrote
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub polylines: usize,
    pub skipped: usize,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Temporary file next to the destination. On Unix it is created with the
/// mode a plain `fs::write` would give it (0o666 minus the umask) rather than
/// tempfile's owner-only default, and `persist` keeps that mode.
#[cfg(unix)]
fn create_staging_file(dir: &Path) -> Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    Ok(tempfile::Builder::new()
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(dir)?)
}

#[cfg(not(unix))]
fn create_staging_file(dir: &Path) -> Result<NamedTempFile> {
    Ok(NamedTempFile::new_in(dir)?)
}

fn build_drawing(contours: &[Contour], mapper: &CoordinateMapper) -> (Drawing, usize) {
    let mut drawing = Drawing::new();
    drawing.header.version = AcadVersion::R2010;

    let mut written = 0;
    for (idx, contour) in contours.iter().enumerate() {
        if !contour.is_polygon() {
            log::debug!("Skipping contour {} with {} point(s)", idx, contour.len());
            continue;
        }

        let mut polyline = LwPolyline::default();
        for point in &contour.points {
            let (x, y) = mapper.map(*point);
            polyline.vertices.push(LwPolylineVertex {
                x,
                y,
                ..Default::default()
            });
        }
        polyline.set_is_closed(true);

        let mut common = EntityCommon::default();
        common.layer = format!("CONTOUR-{}", idx);
        common.color = Color::from_index(7);

        drawing.add_entity(Entity {
            common,
            specific: EntityType::LwPolyline(polyline),
        });
        written += 1;
    }

    (drawing, written)
}

/// Write every contour with at least three vertices as a closed polyline.
///
/// The file appears at `path` only once it is complete: the drawing is
/// written to a temporary file in the same directory and renamed into place,
/// so a failed export never leaves a partial file behind.
pub fn export_polygons<P: AsRef<Path>>(
    contours: &[Contour],
    image_height: u32,
    image_width: u32,
    mm_per_pixel: f64,
    path: P,
) -> Result<ExportSummary> {
    let path = path.as_ref();
    let mapper = CoordinateMapper::new(image_height, mm_per_pixel)?;

    let (drawing, polylines) = build_drawing(contours, &mapper);
    let skipped = contours.len() - polylines;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = create_staging_file(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        drawing.save(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| VectorizeError::Io(e.error))?;

    let summary = ExportSummary {
        path: path.to_path_buf(),
        polylines,
        skipped,
        width_mm: image_width as f64 * mm_per_pixel,
        height_mm: image_height as f64 * mm_per_pixel,
    };
    log::info!(
        "Exported {} polyline(s) to {} ({:.1}mm x {:.1}mm)",
        summary.polylines,
        path.display(),
        summary.width_mm,
        summary.height_mm
    );
    Ok(summary)
}

/// Vertices of every LWPOLYLINE in a DXF file, in file order
pub fn read_polylines<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<(f64, f64)>>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let drawing = Drawing::load(&mut reader)?;

    Ok(drawing
        .entities()
        .filter_map(|entity| match &entity.specific {
            EntityType::LwPolyline(poly) => {
                Some(poly.vertices.iter().map(|v| (v.x, v.y)).collect())
            }
            _ => None,
        })
        .collect())
}
