//! Output file layout for one buffer run.

use std::fs;
use std::path::{Path, PathBuf};

use clip_common::{ClipError, ClipResult};
use geo::Geometry;
use geotiff::{write_raster, RasterLayer};
use serde_json::{Map, Value};
use tracing::debug;
use vector_layer::{write_layer, LayerFeature, LayerFormat, VectorLayer};

use crate::buffer::SiteBuffer;
use crate::config::RunSpec;
use crate::summary::{ClipOutput, OutputKind};

/// File stem prefix of the buffer layer.
pub const BUFFER_LAYER_PREFIX: &str = "site_buffer";

/// File stem prefix of the clipped DEM.
pub const DEM_PREFIX: &str = "dem_clipped";

/// Fixed paths of a run's outputs:
///
/// - `site_buffer_<suffix>.shp` (or `.geojson`)
/// - `dem_clipped_<suffix>.tif`
/// - `<layer>_clipped_<suffix>.<ext>`, in the format the layer was read from
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    dir: PathBuf,
    suffix: String,
    buffer_format: LayerFormat,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
            buffer_format: LayerFormat::Shapefile,
        }
    }

    pub fn with_buffer_format(mut self, format: LayerFormat) -> Self {
        self.buffer_format = format;
        self
    }

    pub fn for_run(run: &RunSpec) -> Self {
        Self::new(run.output_dir.clone(), run.suffix()).with_buffer_format(run.buffer_format)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn buffer_name(&self) -> String {
        format!("{}_{}", BUFFER_LAYER_PREFIX, self.suffix)
    }

    pub fn buffer_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.buffer_name(), self.buffer_format.extension()))
    }

    pub fn dem_name(&self) -> String {
        format!("{}_{}", DEM_PREFIX, self.suffix)
    }

    pub fn dem_path(&self) -> PathBuf {
        self.dir.join(format!("{}.tif", self.dem_name()))
    }

    /// Name of the clipped counterpart of the layer with file stem `stem`.
    pub fn layer_name(&self, stem: &str) -> String {
        format!("{}_clipped_{}", stem, self.suffix)
    }

    pub fn layer_path(&self, stem: &str, format: LayerFormat) -> PathBuf {
        self.dir.join(format!("{}.{}", self.layer_name(stem), format.extension()))
    }

    /// Create the output directory if it does not exist.
    pub fn ensure_dir(&self) -> ClipResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            ClipError::Io(format!("cannot create output directory {}: {}", self.dir.display(), e))
        })
    }

    /// Write the buffer polygon as a single-feature layer.
    pub fn write_buffer(&self, buffer: &SiteBuffer) -> ClipResult<ClipOutput> {
        let mut properties = Map::new();
        properties.insert("radius_m".to_string(), Value::from(buffer.spec.radius_meters()));
        properties.insert("radius_crs".to_string(), Value::from(buffer.spec.radius_value));
        properties.insert("unit".to_string(), Value::from(buffer.spec.radius_unit.abbreviation()));

        let layer = VectorLayer::new(
            self.buffer_name(),
            buffer.crs().clone(),
            vec![LayerFeature::new(Geometry::Polygon(buffer.polygon.clone()), properties)],
        )
        .with_format(self.buffer_format);

        let path = self.buffer_path();
        write_layer(&layer, &path)?;
        Ok(ClipOutput::new(layer.name, path, OutputKind::Buffer, 1))
    }

    /// Write the clipped DEM. `retained` is the count reported for it.
    pub fn write_dem(&self, raster: &RasterLayer, retained: usize) -> ClipResult<ClipOutput> {
        let path = self.dem_path();
        write_raster(raster, &path)?;
        Ok(ClipOutput::new(self.dem_name(), path, OutputKind::Raster, retained))
    }

    /// Write a clipped vector layer under its own name, in its own format.
    pub fn write_layer(&self, layer: &VectorLayer) -> ClipResult<ClipOutput> {
        let path = self.dir.join(format!("{}.{}", layer.name, layer.format.extension()));
        write_layer(layer, &path)?;
        debug!(layer = %layer.name, path = %path.display(), "Wrote clipped layer");
        Ok(ClipOutput::new(layer.name.clone(), path, OutputKind::Vector, layer.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = OutputLayout::new("output/site_100m", "100m");
        assert_eq!(layout.buffer_path(), PathBuf::from("output/site_100m/site_buffer_100m.shp"));
        assert_eq!(layout.dem_path(), PathBuf::from("output/site_100m/dem_clipped_100m.tif"));
        assert_eq!(
            layout.layer_path("counties", LayerFormat::GeoJson),
            PathBuf::from("output/site_100m/counties_clipped_100m.geojson")
        );
        assert_eq!(
            layout.layer_path("roads", LayerFormat::Shapefile),
            PathBuf::from("output/site_100m/roads_clipped_100m.shp")
        );

        let geojson = layout.with_buffer_format(LayerFormat::GeoJson);
        assert_eq!(geojson.buffer_path(), PathBuf::from("output/site_100m/site_buffer_100m.geojson"));
    }

    #[test]
    fn test_for_run() {
        let layout = OutputLayout::for_run(&RunSpec::new("hecras", 200.0, "out").with_buffer_format(LayerFormat::GeoJson));
        assert_eq!(layout.suffix(), "200m");
        assert_eq!(layout.buffer_path(), PathBuf::from("out/site_buffer_200m.geojson"));
        assert_eq!(layout.dir(), Path::new("out"));
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(tmp.path().join("a/b"), "200m");
        layout.ensure_dir().unwrap();
        layout.ensure_dir().unwrap();
        assert!(tmp.path().join("a/b").is_dir());
    }
}
