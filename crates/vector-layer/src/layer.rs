//! In-memory vector layers and their on-disk formats.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clip_common::Crs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::convert::{from_geo, to_geo};
use crate::error::LayerError;
use crate::geojson::{Feature, FeatureCollection};
use crate::shp;

/// On-disk encoding of a layer, chosen by file extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerFormat {
    #[default]
    GeoJson,
    Shapefile,
}

impl LayerFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            LayerFormat::GeoJson => "geojson",
            LayerFormat::Shapefile => "shp",
        }
    }

    /// Format implied by the extension of `path`, if it is a layer file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Some(LayerFormat::GeoJson),
            "shp" => Some(LayerFormat::Shapefile),
            _ => None,
        }
    }
}

impl fmt::Display for LayerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerFormat::GeoJson => write!(f, "geojson"),
            LayerFormat::Shapefile => write!(f, "shapefile"),
        }
    }
}

impl FromStr for LayerFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geojson" | "json" => Ok(LayerFormat::GeoJson),
            "shapefile" | "shp" => Ok(LayerFormat::Shapefile),
            other => Err(format!("unknown layer format '{}', expected shapefile or geojson", other)),
        }
    }
}

/// A feature: optional geometry plus its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerFeature {
    pub id: Option<Value>,
    pub geometry: Option<geo::Geometry<f64>>,
    pub properties: Map<String, Value>,
}

impl LayerFeature {
    pub fn new(geometry: geo::Geometry<f64>, properties: Map<String, Value>) -> Self {
        Self {
            id: None,
            geometry: Some(geometry),
            properties,
        }
    }

    /// Same attributes and id, different geometry.
    pub fn with_geometry(&self, geometry: geo::Geometry<f64>) -> Self {
        Self {
            id: self.id.clone(),
            geometry: Some(geometry),
            properties: self.properties.clone(),
        }
    }
}

/// A named set of features in one CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    pub name: String,
    pub crs: Crs,
    pub features: Vec<LayerFeature>,
    /// Format the layer was read from, kept for its clipped counterpart
    pub format: LayerFormat,
}

impl VectorLayer {
    pub fn new(name: impl Into<String>, crs: Crs, features: Vec<LayerFeature>) -> Self {
        Self {
            name: name.into(),
            crs,
            features,
            format: LayerFormat::default(),
        }
    }

    pub fn with_format(mut self, format: LayerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Convert into a GeoJSON document carrying the named-CRS member.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .features
            .iter()
            .map(|f| Feature {
                type_: "Feature".to_string(),
                id: f.id.clone(),
                geometry: f.geometry.as_ref().map(from_geo),
                properties: Some(f.properties.clone()),
            })
            .collect();

        let crs_name = self.crs.urn().unwrap_or_else(|| self.crs.proj().to_string());
        FeatureCollection::new(features)
            .with_name(self.name.clone())
            .with_crs_name(crs_name)
    }

    /// Build a layer from a parsed GeoJSON document.
    ///
    /// The `crs` member is mandatory.
    pub fn from_feature_collection(name: &str, collection: FeatureCollection) -> Result<Self, LayerError> {
        let identifier = collection
            .crs
            .as_ref()
            .and_then(|c| c.identifier())
            .ok_or_else(|| LayerError::MissingCrs(name.to_string()))?;

        let crs = Crs::parse(&identifier).map_err(|e| LayerError::UnsupportedCrs {
            layer: name.to_string(),
            message: e.to_string(),
        })?;

        let features = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| {
                let geometry = feature
                    .geometry
                    .as_ref()
                    .map(to_geo)
                    .transpose()
                    .map_err(|message| LayerError::InvalidGeometry {
                        layer: name.to_string(),
                        message: format!("feature {}: {}", index, message),
                    })?;
                Ok(LayerFeature {
                    id: feature.id,
                    geometry,
                    properties: feature.properties.unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, LayerError>>()?;

        Ok(Self::new(name, crs, features))
    }
}

/// Read a shapefile or GeoJSON layer. The layer is named after the file stem.
pub fn read_layer<P: AsRef<Path>>(path: P) -> Result<VectorLayer, LayerError> {
    let path = path.as_ref();
    let name = layer_name(path);

    let layer = match LayerFormat::from_path(path) {
        Some(LayerFormat::Shapefile) => shp::read_shapefile(path, &name)?,
        _ => read_geojson(path, &name)?,
    };
    debug!(layer = %name, format = %layer.format, crs = %layer.crs, features = layer.len(), "Read vector layer");
    Ok(layer)
}

fn read_geojson(path: &Path, name: &str) -> Result<VectorLayer, LayerError> {
    let text = fs::read_to_string(path).map_err(|source| LayerError::Io {
        layer: name.to_string(),
        source,
    })?;
    let collection: FeatureCollection = serde_json::from_str(&text).map_err(|source| LayerError::Json {
        layer: name.to_string(),
        source,
    })?;
    VectorLayer::from_feature_collection(name, collection)
}

/// Write a layer, replacing any existing files.
///
/// The extension of `path` picks the format; an unrecognized one falls
/// back to the layer's own format.
pub fn write_layer<P: AsRef<Path>>(layer: &VectorLayer, path: P) -> Result<(), LayerError> {
    let path = path.as_ref();
    let format = LayerFormat::from_path(path).unwrap_or(layer.format);

    match format {
        LayerFormat::Shapefile => shp::write_shapefile(layer, path)?,
        LayerFormat::GeoJson => {
            let text =
                serde_json::to_string_pretty(&layer.to_feature_collection()).map_err(|source| LayerError::Json {
                    layer: layer.name.clone(),
                    source,
                })?;
            fs::write(path, text).map_err(|source| LayerError::Io {
                layer: layer.name.clone(),
                source,
            })?;
        }
    }

    debug!(layer = %layer.name, path = %path.display(), format = %format, features = layer.len(), "Wrote vector layer");
    Ok(())
}

/// Every file belonging to the layer at `path`: a shapefile brings its
/// sidecars, GeoJSON is a single file.
pub fn layer_files(path: &Path) -> Vec<PathBuf> {
    match LayerFormat::from_path(path) {
        Some(LayerFormat::Shapefile) => shp::shapefile_parts(path),
        _ => vec![path.to_path_buf()],
    }
}

/// File stem used as the layer name.
pub fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "layer".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Point};

    fn utm() -> Crs {
        Crs::from_proj("+proj=utm +zone=11 +datum=WGS84 +units=m +no_defs").unwrap()
    }

    #[test]
    fn test_missing_crs_rejected() {
        let err = VectorLayer::from_feature_collection("roads", FeatureCollection::new(vec![])).unwrap_err();
        assert!(matches!(err, LayerError::MissingCrs(ref name) if name == "roads"));
    }

    #[test]
    fn test_unknown_crs_rejected() {
        let fc = FeatureCollection::new(vec![]).with_crs_name("LOCAL:42");
        assert!(matches!(
            VectorLayer::from_feature_collection("x", fc),
            Err(LayerError::UnsupportedCrs { .. })
        ));
    }

    #[test]
    fn test_collection_round_trip_keeps_attributes() {
        let mut props = Map::new();
        props.insert("NAME".to_string(), Value::from("Ward 7"));
        let layer = VectorLayer::new(
            "wards",
            utm(),
            vec![
                LayerFeature::new(
                    polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)].into(),
                    props.clone(),
                ),
                LayerFeature::new(Point::new(3.0, 4.0).into(), Map::new()),
            ],
        );

        let fc = layer.to_feature_collection();
        assert_eq!(fc.name.as_deref(), Some("wards"));
        let restored = VectorLayer::from_feature_collection("wards", fc).unwrap();
        assert!(restored.crs.is_equivalent(&layer.crs));
        assert_eq!(restored.features, layer.features);
    }

    #[test]
    fn test_format_from_path_and_name() {
        assert_eq!(LayerFormat::from_path(Path::new("a/parcels.SHP")), Some(LayerFormat::Shapefile));
        assert_eq!(LayerFormat::from_path(Path::new("zones.json")), Some(LayerFormat::GeoJson));
        assert_eq!(LayerFormat::from_path(Path::new("notes.txt")), None);
        assert_eq!("shp".parse::<LayerFormat>(), Ok(LayerFormat::Shapefile));
        assert_eq!("GeoJSON".parse::<LayerFormat>(), Ok(LayerFormat::GeoJson));
        assert!("kml".parse::<LayerFormat>().is_err());
        assert_eq!(LayerFormat::Shapefile.to_string(), "shapefile");
    }

    #[test]
    fn test_with_geometry_keeps_id_and_properties() {
        let mut feature = LayerFeature::new(Point::new(0.0, 0.0).into(), Map::new());
        feature.id = Some(Value::from(7));
        let moved = feature.with_geometry(Point::new(1.0, 1.0).into());
        assert_eq!(moved.id, Some(Value::from(7)));
        assert_eq!(moved.geometry, Some(Point::new(1.0, 1.0).into()));
    }
}
