//! Pipeline configuration.

use std::path::{Path, PathBuf};

use clip_common::{ClipError, ClipResult};
use serde::{Deserialize, Serialize};
use vector_layer::LayerFormat;

use crate::buffer::DEFAULT_SEGMENTS;

fn default_buffer_radius() -> f64 {
    200.0
}

fn default_qgis_radius() -> Option<f64> {
    Some(100.0)
}

fn default_segments() -> usize {
    DEFAULT_SEGMENTS
}

fn default_partial_overlap_warning() -> f64 {
    0.5
}

/// RAS Mapper and QGIS both take the buffer as a shapefile.
pub fn default_buffer_format() -> LayerFormat {
    LayerFormat::Shapefile
}

/// Everything the pipeline needs, passed explicitly to its entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    /// Text file holding `lat, lon`
    pub site_file: PathBuf,

    /// Elevation GeoTIFF
    pub raster: PathBuf,

    /// Directory of GeoJSON boundary layers
    pub boundary_dir: PathBuf,

    /// Root output directory; the primary run writes here directly
    pub output_dir: PathBuf,

    /// Primary (HEC-RAS) buffer radius in meters
    #[serde(default = "default_buffer_radius")]
    pub buffer_radius_m: f64,

    /// Secondary (QGIS) buffer radius in meters; `None` disables the run
    #[serde(default = "default_qgis_radius")]
    pub qgis_radius_m: Option<f64>,

    /// Vertices of the buffer polygon
    #[serde(default = "default_segments")]
    pub segments: usize,

    /// Warn when retained raster area is below this fraction of the buffer
    #[serde(default = "default_partial_overlap_warning")]
    pub partial_overlap_warning: f64,

    /// Layer stems to process; empty means every layer in `boundary_dir`
    #[serde(default)]
    pub include: Vec<String>,

    /// Format of the written buffer layer; clipped layers keep their input format
    #[serde(default = "default_buffer_format")]
    pub buffer_format: LayerFormat,
}

impl ClipConfig {
    pub fn new(
        site_file: impl Into<PathBuf>,
        raster: impl Into<PathBuf>,
        boundary_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            site_file: site_file.into(),
            raster: raster.into(),
            boundary_dir: boundary_dir.into(),
            output_dir: output_dir.into(),
            buffer_radius_m: default_buffer_radius(),
            qgis_radius_m: default_qgis_radius(),
            segments: default_segments(),
            partial_overlap_warning: default_partial_overlap_warning(),
            include: Vec::new(),
            buffer_format: default_buffer_format(),
        }
    }

    /// Check numeric settings before any file is touched.
    pub fn validate(&self) -> ClipResult<()> {
        for radius in std::iter::once(self.buffer_radius_m).chain(self.qgis_radius_m) {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(ClipError::Config(format!(
                    "buffer radius must be a positive number of meters, got {}",
                    radius
                )));
            }
        }
        if self.segments < 8 {
            return Err(ClipError::Config(format!(
                "buffer needs at least 8 segments, got {}",
                self.segments
            )));
        }
        if !(0.0..=1.0).contains(&self.partial_overlap_warning) {
            return Err(ClipError::Config(format!(
                "partial_overlap_warning must be within [0, 1], got {}",
                self.partial_overlap_warning
            )));
        }
        Ok(())
    }

    /// Runs to perform, primary first.
    pub fn runs(&self) -> Vec<RunSpec> {
        let mut runs = vec![RunSpec {
            label: "hecras".to_string(),
            radius_m: self.buffer_radius_m,
            output_dir: self.output_dir.clone(),
            buffer_format: self.buffer_format,
        }];

        if let Some(radius) = self.qgis_radius_m {
            runs.push(RunSpec {
                label: "qgis".to_string(),
                radius_m: radius,
                output_dir: self.output_dir.join(format!("site_{}", RunSpec::suffix_for(radius))),
                buffer_format: self.buffer_format,
            });
        }

        runs
    }

    /// Directory of the secondary run, if configured.
    pub fn qgis_dir(&self) -> Option<PathBuf> {
        self.runs().into_iter().find(|r| r.label == "qgis").map(|r| r.output_dir)
    }

    /// Directory of the HEC-RAS package.
    pub fn hecras_dir(&self) -> PathBuf {
        self.output_dir.join("hecras")
    }
}

/// A single buffer radius and where its outputs go.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpec {
    pub label: String,
    pub radius_m: f64,
    pub output_dir: PathBuf,
    pub buffer_format: LayerFormat,
}

impl RunSpec {
    pub fn new(label: impl Into<String>, radius_m: f64, output_dir: impl AsRef<Path>) -> Self {
        Self {
            label: label.into(),
            radius_m,
            output_dir: output_dir.as_ref().to_path_buf(),
            buffer_format: default_buffer_format(),
        }
    }

    pub fn with_buffer_format(mut self, format: LayerFormat) -> Self {
        self.buffer_format = format;
        self
    }

    /// File suffix for this run, e.g. `200m`.
    pub fn suffix(&self) -> String {
        Self::suffix_for(self.radius_m)
    }

    /// Whole radii print without decimals; fractional ones keep them.
    pub fn suffix_for(radius_m: f64) -> String {
        if radius_m.fract() == 0.0 {
            format!("{}m", radius_m as i64)
        } else {
            format!("{}m", radius_m)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runs() {
        let config = ClipConfig::new("site.txt", "dem.tif", "shapes", "output");
        let runs = config.runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].label, "hecras");
        assert_eq!(runs[0].suffix(), "200m");
        assert_eq!(runs[0].output_dir, PathBuf::from("output"));
        assert_eq!(runs[1].suffix(), "100m");
        assert_eq!(runs[1].output_dir, PathBuf::from("output/site_100m"));
        assert_eq!(config.hecras_dir(), PathBuf::from("output/hecras"));
    }

    #[test]
    fn test_qgis_run_disabled() {
        let mut config = ClipConfig::new("s", "d", "b", "o");
        config.qgis_radius_m = None;
        assert_eq!(config.runs().len(), 1);
        assert!(config.qgis_dir().is_none());
    }

    #[test]
    fn test_suffix_formatting() {
        assert_eq!(RunSpec::suffix_for(200.0), "200m");
        assert_eq!(RunSpec::suffix_for(150.5), "150.5m");
    }

    #[test]
    fn test_validate() {
        let mut config = ClipConfig::new("s", "d", "b", "o");
        assert!(config.validate().is_ok());

        config.buffer_radius_m = -1.0;
        assert!(matches!(config.validate(), Err(ClipError::Config(_))));

        config.buffer_radius_m = 200.0;
        config.segments = 4;
        assert!(config.validate().is_err());

        config.segments = 64;
        config.partial_overlap_warning = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let config: ClipConfig = serde_json::from_value(serde_json::json!({
            "site_file": "site.txt",
            "raster": "dem.tif",
            "boundary_dir": "shapes",
            "output_dir": "out",
        }))
        .unwrap();
        assert_eq!(config.buffer_radius_m, 200.0);
        assert_eq!(config.qgis_radius_m, Some(100.0));
        assert_eq!(config.segments, DEFAULT_SEGMENTS);
        assert!(config.include.is_empty());
        assert_eq!(config.buffer_format, LayerFormat::Shapefile);

        let config: ClipConfig = serde_json::from_value(serde_json::json!({
            "site_file": "site.txt",
            "raster": "dem.tif",
            "boundary_dir": "shapes",
            "output_dir": "out",
            "buffer_format": "geojson",
        }))
        .unwrap();
        assert!(config.runs().iter().all(|r| r.buffer_format == LayerFormat::GeoJson));
    }
}
