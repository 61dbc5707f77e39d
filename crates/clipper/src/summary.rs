//! Per-run results returned by the pipeline.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Buffer,
    Raster,
    Vector,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputKind::Buffer => "buffer",
            OutputKind::Raster => "raster",
            OutputKind::Vector => "vector",
        };
        write!(f, "{}", name)
    }
}

/// One written output: which layer it came from, where it went and how
/// many features (or retained pixels, for rasters) it holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipOutput {
    pub layer: String,
    pub path: PathBuf,
    pub kind: OutputKind,
    pub count: usize,
}

impl ClipOutput {
    pub fn new(layer: impl Into<String>, path: impl Into<PathBuf>, kind: OutputKind, count: usize) -> Self {
        Self {
            layer: layer.into(),
            path: path.into(),
            kind,
            count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Everything one buffer run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub label: String,
    pub radius_m: f64,
    pub suffix: String,
    pub output_dir: PathBuf,
    /// Identifier of the CRS all outputs are written in
    pub crs: String,
    pub buffer: ClipOutput,
    pub dem: ClipOutput,
    /// Retained raster area over buffer area
    pub raster_coverage: f64,
    pub layers: Vec<ClipOutput>,
}

impl RunSummary {
    /// Clipped layers that kept at least one feature.
    pub fn non_empty_layers(&self) -> impl Iterator<Item = &ClipOutput> {
        self.layers.iter().filter(|l| !l.is_empty())
    }

    pub fn empty_layer_count(&self) -> usize {
        self.layers.iter().filter(|l| l.is_empty()).count()
    }

    /// Every output of the run, buffer and DEM first.
    pub fn outputs(&self) -> impl Iterator<Item = &ClipOutput> {
        [&self.buffer, &self.dem].into_iter().chain(self.layers.iter())
    }
}
