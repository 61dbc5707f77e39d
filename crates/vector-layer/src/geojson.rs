//! GeoJSON document types.
//!
//! Covers the subset used for boundary layers: FeatureCollection, Feature,
//! every RFC 7946 geometry type, and the pre-RFC named `crs` member that
//! QGIS and GDAL still write for projected data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A coordinate position. Only the first two values are used.
pub type Position = Vec<f64>;

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<CrsMember>,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            name: None,
            crs: None,
            features,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_crs_name(mut self, name: impl Into<String>) -> Self {
        self.crs = Some(CrsMember::named(name));
        self
    }
}

/// The `crs` member of a FeatureCollection.
///
/// Either `{"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::6340"}}`
/// or the older `{"type": "EPSG", "properties": {"code": 6340}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrsMember {
    #[serde(rename = "type")]
    pub type_: String,
    pub properties: CrsProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CrsProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

impl CrsMember {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            type_: "name".to_string(),
            properties: CrsProperties {
                name: Some(name.into()),
                code: None,
            },
        }
    }

    /// Identifier accepted by `Crs::parse`, if the member carries one.
    pub fn identifier(&self) -> Option<String> {
        match self.type_.to_ascii_lowercase().as_str() {
            "name" => self.properties.name.clone(),
            "epsg" => self.properties.code.map(|code| format!("EPSG:{}", code)),
            _ => None,
        }
    }
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Null geometries are allowed by GeoJSON.
    pub geometry: Option<Geometry>,

    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, properties: Map<String, Value>) -> Self {
        Self {
            type_: "Feature".to_string(),
            id: None,
            geometry,
            properties: Some(properties),
        }
    }
}

/// GeoJSON geometry objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    /// Rings: first is exterior, rest are holes.
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
            Geometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_crs_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::6340"}},
            "features": [
                {"type": "Feature", "properties": {"NAME": "Reach 1"},
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1, 5.0]]}}
            ]
        }"#;
        let fc: FeatureCollection = serde_json::from_str(text).unwrap();
        assert_eq!(
            fc.crs.and_then(|c| c.identifier()).as_deref(),
            Some("urn:ogc:def:crs:EPSG::6340")
        );
        assert_eq!(fc.features.len(), 1);
        assert!(matches!(fc.features[0].geometry, Some(Geometry::LineString { .. })));
    }

    #[test]
    fn test_legacy_epsg_member() {
        let member: CrsMember = serde_json::from_str(r#"{"type": "EPSG", "properties": {"code": 2229}}"#).unwrap();
        assert_eq!(member.identifier().as_deref(), Some("EPSG:2229"));
    }

    #[test]
    fn test_null_geometry() {
        let feature: Feature =
            serde_json::from_str(r#"{"type": "Feature", "geometry": null, "properties": null}"#).unwrap();
        assert!(feature.geometry.is_none());
        assert!(feature.properties.is_none());
    }

    #[test]
    fn test_serialize_omits_missing_crs() {
        let json = serde_json::to_value(FeatureCollection::new(vec![])).unwrap();
        assert!(json.get("crs").is_none());
        assert_eq!(json["type"], "FeatureCollection");
    }
}
