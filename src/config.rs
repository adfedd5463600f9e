// src/config.rs - Parameter table, presets and the TOML run configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{VectorizeError, Result};

/// Tuning parameters for one pipeline run.
///
/// This is the single default table every entry point starts from; presets are
/// expressed as deltas against it (see [`Preset::apply`]).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Parameters {
    /// Bilateral neighbourhood diameter in pixels
    #[serde(default = "default_bilateral_diameter")]
    pub bilateral_diameter: u32,

    #[serde(default = "default_bilateral_sigma")]
    pub bilateral_sigma_color: f64,

    #[serde(default = "default_bilateral_sigma")]
    pub bilateral_sigma_space: f64,

    /// Forced odd before use
    #[serde(default = "default_gaussian_kernel_size")]
    pub gaussian_kernel_size: u32,

    #[serde(default = "default_canny_lower")]
    pub canny_lower: f64,

    #[serde(default = "default_canny_upper")]
    pub canny_upper: f64,

    /// Side of the square dilation kernel (floored, minimum 1)
    #[serde(default = "default_edge_thickness")]
    pub edge_thickness: f64,

    /// Side of the square closing kernel; 0 disables gap closing
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: f64,

    #[serde(default = "default_largest_n")]
    pub largest_n: usize,

    /// Douglas-Peucker tolerance as a percentage of the image diagonal
    #[serde(default = "default_simplify_pct")]
    pub simplify_pct: f64,

    #[serde(default = "default_mm_per_pixel")]
    pub mm_per_pixel: f64,

    /// Treat dark regions of the edge mask as the subject
    #[serde(default = "default_invert")]
    pub invert: bool,
}

fn default_bilateral_diameter() -> u32 {
    9
}

fn default_bilateral_sigma() -> f64 {
    75.0
}

fn default_gaussian_kernel_size() -> u32 {
    5
}

fn default_canny_lower() -> f64 {
    30.0
}

fn default_canny_upper() -> f64 {
    100.0
}

fn default_edge_thickness() -> f64 {
    3.0
}

fn default_gap_threshold() -> f64 {
    0.0
}

fn default_largest_n() -> usize {
    10
}

fn default_simplify_pct() -> f64 {
    0.0
}

fn default_mm_per_pixel() -> f64 {
    0.25
}

fn default_invert() -> bool {
    true
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            bilateral_diameter: default_bilateral_diameter(),
            bilateral_sigma_color: default_bilateral_sigma(),
            bilateral_sigma_space: default_bilateral_sigma(),
            gaussian_kernel_size: default_gaussian_kernel_size(),
            canny_lower: default_canny_lower(),
            canny_upper: default_canny_upper(),
            edge_thickness: default_edge_thickness(),
            gap_threshold: default_gap_threshold(),
            largest_n: default_largest_n(),
            simplify_pct: default_simplify_pct(),
            mm_per_pixel: default_mm_per_pixel(),
            invert: default_invert(),
        }
    }
}

/// Check that `value` lies in `[min, max]`, naming the field on failure
fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(VectorizeError::Config(format!(
            "{} must be between {} and {} (got {})",
            name, min, max, value
        )));
    }
    Ok(())
}

impl Parameters {
    /// Validate against the recommended ranges.
    ///
    /// The pipeline stages themselves accept anything they can compute with;
    /// this is the boundary check applied to user-supplied configuration.
    pub fn validate(&self) -> Result<()> {
        check_range("bilateral_diameter", self.bilateral_diameter as f64, 5.0, 15.0)?;
        check_range("bilateral_sigma_color", self.bilateral_sigma_color, 25.0, 150.0)?;
        check_range("bilateral_sigma_space", self.bilateral_sigma_space, 25.0, 150.0)?;
        check_range("gaussian_kernel_size", self.gaussian_kernel_size as f64, 3.0, 9.0)?;
        check_range("canny_lower", self.canny_lower, 10.0, 100.0)?;
        check_range("canny_upper", self.canny_upper, 30.0, 200.0)?;
        check_range("edge_thickness", self.edge_thickness, 1.0, 50.0)?;
        check_range("gap_threshold", self.gap_threshold, 0.0, 20.0)?;
        check_range("largest_n", self.largest_n as f64, 1.0, 50.0)?;
        check_range("simplify_pct", self.simplify_pct, 0.0, 2.0)?;
        check_range("mm_per_pixel", self.mm_per_pixel, 0.01, 2.0)?;

        if self.canny_upper < self.canny_lower {
            log::warn!(
                "canny_upper ({}) is below canny_lower ({}); fewer edges will be detected",
                self.canny_upper, self.canny_lower
            );
        }

        Ok(())
    }
}

/// Named parameter sets offered to users
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    Default,
    HighDetail,
    LowNoise,
}

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Default => "Default",
            Preset::HighDetail => "High Detail",
            Preset::LowNoise => "Low Noise",
        }
    }

    /// Apply this preset's deltas on top of `base`.
    ///
    /// Only the tuning values a preset owns are touched; `mm_per_pixel` and
    /// `invert` are left alone.
    pub fn apply(&self, base: &Parameters) -> Parameters {
        let mut params = base.clone();
        match self {
            Preset::Default => {
                let defaults = Parameters::default();
                params.bilateral_diameter = defaults.bilateral_diameter;
                params.bilateral_sigma_color = defaults.bilateral_sigma_color;
                params.bilateral_sigma_space = defaults.bilateral_sigma_space;
                params.gaussian_kernel_size = defaults.gaussian_kernel_size;
                params.canny_lower = defaults.canny_lower;
                params.canny_upper = defaults.canny_upper;
                params.edge_thickness = defaults.edge_thickness;
                params.gap_threshold = defaults.gap_threshold;
                params.largest_n = defaults.largest_n;
                params.simplify_pct = defaults.simplify_pct;
            }
            Preset::HighDetail => {
                params.bilateral_diameter = 6;
                params.bilateral_sigma_color = 60.0;
                params.bilateral_sigma_space = 60.0;
                params.gaussian_kernel_size = 3;
                params.canny_lower = 20.0;
                params.canny_upper = 60.0;
                params.edge_thickness = 1.5;
                params.gap_threshold = 3.0;
                params.largest_n = 15;
                params.simplify_pct = 0.3;
            }
            Preset::LowNoise => {
                params.bilateral_diameter = 12;
                params.bilateral_sigma_color = 120.0;
                params.bilateral_sigma_space = 120.0;
                params.gaussian_kernel_size = 7;
                params.canny_lower = 50.0;
                params.canny_upper = 150.0;
                params.edge_thickness = 3.0;
                params.gap_threshold = 6.0;
                params.largest_n = 10;
                params.simplify_pct = 0.6;
            }
        }
        params
    }
}

/// Run configuration loaded from TOML
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub input_path: String,
    pub output_base_dir: String,

    /// Preset applied before the explicit `[parameters]` table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,

    /// Divisor for mm_per_pixel; 2.0 halves the drawing in millimetres while
    /// the output file name reports the pixel size doubled
    #[serde(default = "default_export_scale")]
    pub export_scale: f64,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    /// JSON file with erased contours/points and manual shapes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations_path: Option<String>,

    #[serde(default)]
    pub save_debug_mask: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<toml::Table>,
}

fn default_export_scale() -> f64 {
    1.0
}

fn default_parallel() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            output_base_dir: "./output".to_string(),
            preset: None,
            export_scale: default_export_scale(),
            use_parallel: default_parallel(),
            annotations_path: None,
            save_debug_mask: false,
            parameters: None,
        }
    }
}

fn parameters_table(params: &Parameters) -> Result<toml::Table> {
    match toml::Value::try_from(params) {
        Ok(toml::Value::Table(table)) => Ok(table),
        Ok(_) => Err(VectorizeError::Config("parameters did not serialize to a table".to_string())),
        Err(e) => Err(VectorizeError::Config(format!("Failed to serialize parameters: {}", e))),
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            VectorizeError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| VectorizeError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Resolve the parameters for a run: defaults, then the preset, then
    /// whatever keys the `[parameters]` table sets explicitly.
    pub fn effective_parameters(&self) -> Result<Parameters> {
        let base = Parameters::default();
        let preset_applied = match self.preset {
            Some(preset) => preset.apply(&base),
            None => base,
        };

        let Some(table) = &self.parameters else {
            return Ok(preset_applied);
        };

        // Overlay explicit keys onto the preset so unspecified keys keep preset values
        let mut merged = parameters_table(&preset_applied)?;
        for (key, value) in table {
            merged.insert(key.clone(), value.clone());
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e| VectorizeError::Config(format!("Invalid [parameters] table: {}", e)))
    }

    /// Replace the `[parameters]` table with a full snapshot of `params`
    pub fn set_parameters(&mut self, params: &Parameters) -> Result<()> {
        self.parameters = Some(parameters_table(params)?);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(VectorizeError::InvalidPath(input_path));
        }

        if !self.export_scale.is_finite() || self.export_scale <= 0.0 {
            return Err(VectorizeError::Config(
                "export_scale must be > 0.0".to_string(),
            ));
        }

        if let Some(annotations) = &self.annotations_path {
            let path = PathBuf::from(annotations);
            if !path.is_file() {
                return Err(VectorizeError::InvalidPath(path));
            }
        }

        self.effective_parameters()?.validate()
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            VectorizeError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
