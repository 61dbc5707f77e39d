//! ESRI Shapefile layers.
//!
//! A layer is the `.shp` geometry file plus its `.shx` index, `.dbf`
//! attribute table and `.prj` CRS sidecar. The `.prj` is mandatory on read
//! and always written. Attributes map onto dBase fields by JSON type:
//! strings to character fields, numbers to numeric fields and booleans to
//! logical fields. Anything else is stored as its JSON text.

use std::collections::BTreeSet;
use std::fs;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use geo::{Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point};
use serde_json::{Map, Number, Value};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::record::EsriShape;
use shapefile::Shape;
use tracing::{debug, warn};

use crate::error::LayerError;
use crate::layer::{LayerFeature, LayerFormat, VectorLayer};

/// Sidecar extensions that travel with a `.shp`.
pub const SIDECAR_EXTENSIONS: &[&str] = &["shx", "dbf", "prj", "cpg"];

/// dBase names are limited to 10 characters plus a terminator.
const MAX_FIELD_NAME: usize = 10;
const MAX_CHARACTER_LENGTH: usize = 254;
const NUMERIC_LENGTH: u8 = 24;
const NUMERIC_DECIMALS: u8 = 8;
const INDEX_FIELD: &str = "FID";

/// Read a shapefile layer named `name`.
pub fn read_shapefile(path: &Path, name: &str) -> Result<VectorLayer, LayerError> {
    let crs = read_prj(path, name)?;

    let mut reader = shapefile::Reader::from_path(path).map_err(|e| shapefile_error(name, e))?;
    let mut features = Vec::new();
    for (index, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.map_err(|e| shapefile_error(name, e))?;
        let geometry = match shape {
            Shape::NullShape => None,
            shape => {
                let geometry = Geometry::<f64>::try_from(shape).map_err(|message| LayerError::InvalidGeometry {
                    layer: name.to_string(),
                    message: format!("record {}: {}", index, message),
                })?;
                Some(single_part(geometry))
            }
        };

        features.push(LayerFeature {
            id: None,
            geometry,
            properties: record_properties(record),
        });
    }

    Ok(VectorLayer::new(name, crs, features).with_format(LayerFormat::Shapefile))
}

/// Write `layer` as `<path>.shp` with its `.shx`, `.dbf` and `.prj`.
///
/// All geometries must belong to one family (points, lines or polygons).
/// Features without geometry have no shapefile record and are skipped.
pub fn write_shapefile(layer: &VectorLayer, path: &Path) -> Result<(), LayerError> {
    let prj = projection::crs_to_wkt(&layer.crs).map_err(|e| LayerError::UnsupportedCrs {
        layer: layer.name.clone(),
        message: e.to_string(),
    })?;

    let fields = TableFields::from_layer(layer);
    let mut writer =
        shapefile::Writer::from_path(path, fields.builder()?).map_err(|e| shapefile_error(&layer.name, e))?;

    let features: Vec<(&Geometry<f64>, Record)> = layer
        .features
        .iter()
        .enumerate()
        .filter_map(|(index, f)| {
            f.geometry
                .as_ref()
                .map(|geometry| (geometry, fields.record(index, &f.properties)))
        })
        .collect();
    let skipped = layer.len() - features.len();
    if skipped > 0 {
        warn!(layer = %layer.name, skipped, "Features without geometry are not written to shapefiles");
    }

    match ShapeFamily::of(layer, features.iter().map(|(g, _)| *g))? {
        ShapeFamily::Points => write_all(&mut writer, &layer.name, features, |g| match g {
            Geometry::Point(p) => Some(shapefile::Point::from(*p)),
            _ => None,
        })?,
        ShapeFamily::MultiPoints => write_all(&mut writer, &layer.name, features, |g| match g {
            Geometry::Point(p) => Some(shapefile::Multipoint::from(MultiPoint(vec![*p]))),
            Geometry::MultiPoint(mp) => Some(shapefile::Multipoint::from(mp.clone())),
            _ => None,
        })?,
        ShapeFamily::Lines => write_all(&mut writer, &layer.name, features, |g| match g {
            Geometry::Line(l) => Some(shapefile::Polyline::from(*l)),
            Geometry::LineString(ls) => Some(shapefile::Polyline::from(ls.clone())),
            Geometry::MultiLineString(mls) => Some(shapefile::Polyline::from(mls.clone())),
            _ => None,
        })?,
        ShapeFamily::Polygons => write_all(&mut writer, &layer.name, features, |g| {
            let polygons = match g {
                Geometry::Polygon(p) => MultiPolygon(vec![p.clone()]),
                Geometry::MultiPolygon(mp) => mp.clone(),
                Geometry::Rect(r) => MultiPolygon(vec![r.to_polygon()]),
                Geometry::Triangle(t) => MultiPolygon(vec![t.to_polygon()]),
                _ => return None,
            };
            Some(shapefile::Polygon::from(polygons))
        })?,
    }
    drop(writer);

    let prj_path = path.with_extension("prj");
    fs::write(&prj_path, prj).map_err(|source| LayerError::Io {
        layer: layer.name.clone(),
        source,
    })?;

    debug!(layer = %layer.name, fields = fields.columns.len(), "Wrote shapefile");
    Ok(())
}

/// Existing files making up the shapefile at `path`, `.shp` first.
pub fn shapefile_parts(path: &Path) -> Vec<PathBuf> {
    std::iter::once(path.to_path_buf())
        .chain(SIDECAR_EXTENSIONS.iter().map(|ext| path.with_extension(ext)))
        .filter(|p| p.is_file())
        .collect()
}

fn read_prj(path: &Path, name: &str) -> Result<clip_common::Crs, LayerError> {
    let prj_path = path.with_extension("prj");
    let wkt = match fs::read_to_string(&prj_path) {
        Ok(wkt) if !wkt.trim().is_empty() => wkt,
        Ok(_) => return Err(LayerError::MissingCrs(name.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(LayerError::MissingCrs(name.to_string())),
        Err(source) => {
            return Err(LayerError::Io {
                layer: name.to_string(),
                source,
            })
        }
    };

    projection::crs_from_wkt(wkt.trim()).map_err(|e| LayerError::UnsupportedCrs {
        layer: name.to_string(),
        message: e.to_string(),
    })
}

fn shapefile_error(layer: &str, err: shapefile::Error) -> LayerError {
    LayerError::Shapefile {
        layer: layer.to_string(),
        message: err.to_string(),
    }
}

/// Shapefile readers hand back multi-part types; unwrap the single-part case.
fn single_part(geometry: Geometry<f64>) -> Geometry<f64> {
    match geometry {
        Geometry::MultiPolygon(mut mp) if mp.0.len() == 1 => Geometry::Polygon(mp.0.remove(0)),
        Geometry::MultiLineString(mut mls) if mls.0.len() == 1 => Geometry::LineString(mls.0.remove(0)),
        other => other,
    }
}

fn record_properties(record: Record) -> Map<String, Value> {
    record
        .into_iter()
        .map(|(name, value)| (name, field_value(value)))
        .collect()
}

fn field_value(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(Some(text)) | FieldValue::Memo(text) => Value::String(text),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => number_value(n),
        FieldValue::Float(Some(n)) => number_value(f64::from(n)),
        FieldValue::Integer(n) => Value::from(n),
        FieldValue::Logical(Some(b)) => Value::Bool(b),
        FieldValue::Date(Some(date)) => {
            Value::String(format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day()))
        }
        _ => Value::Null,
    }
}

/// Whole numbers come back as integers so `3` survives a round trip as `3`.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeFamily {
    Points,
    MultiPoints,
    Lines,
    Polygons,
}

impl ShapeFamily {
    fn of<'a>(layer: &VectorLayer, geometries: impl Iterator<Item = &'a Geometry<f64>>) -> Result<Self, LayerError> {
        let mut family: Option<Self> = None;
        for geometry in geometries {
            let next = match geometry {
                Geometry::Point(_) => Self::Points,
                Geometry::MultiPoint(_) => Self::MultiPoints,
                Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => Self::Lines,
                Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
                    Self::Polygons
                }
                Geometry::GeometryCollection(_) => {
                    return Err(LayerError::InvalidGeometry {
                        layer: layer.name.clone(),
                        message: "geometry collections cannot be stored in a shapefile".to_string(),
                    })
                }
            };

            family = match (family, next) {
                (None, next) => Some(next),
                (Some(current), next) if current == next => Some(current),
                // a point layer with some multipoints is written as multipoints
                (Some(Self::Points | Self::MultiPoints), Self::Points | Self::MultiPoints) => Some(Self::MultiPoints),
                (Some(current), next) => {
                    return Err(LayerError::InvalidGeometry {
                        layer: layer.name.clone(),
                        message: format!("mixed geometry types ({:?} and {:?})", current, next),
                    })
                }
            };
        }
        Ok(family.unwrap_or(Self::Polygons))
    }
}

fn write_all<T, S, F>(
    writer: &mut shapefile::Writer<T>,
    layer: &str,
    features: Vec<(&Geometry<f64>, Record)>,
    convert: F,
) -> Result<(), LayerError>
where
    T: Write + Seek,
    S: EsriShape,
    F: Fn(&Geometry<f64>) -> Option<S>,
{
    for (index, (geometry, record)) in features.into_iter().enumerate() {
        let shape = convert(geometry).ok_or_else(|| LayerError::InvalidGeometry {
            layer: layer.to_string(),
            message: format!("feature {} does not match the layer's shape type", index),
        })?;
        writer
            .write_shape_and_record(&shape, &record)
            .map_err(|e| shapefile_error(layer, e))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    /// Feature index, for layers without attributes
    Index,
    Character(usize),
    Numeric { integer: bool },
    Logical,
}

#[derive(Debug, Clone)]
struct Column {
    property: String,
    field: String,
    kind: ColumnKind,
}

/// dBase table layout derived from the layer's properties.
#[derive(Debug, Clone)]
struct TableFields {
    columns: Vec<Column>,
}

impl TableFields {
    fn from_layer(layer: &VectorLayer) -> Self {
        let mut keys: Vec<&String> = Vec::new();
        for feature in &layer.features {
            for key in feature.properties.keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }

        let mut used = BTreeSet::new();
        let columns = keys
            .into_iter()
            .map(|key| {
                let values = layer.features.iter().filter_map(|f| f.properties.get(key));
                Column {
                    property: key.clone(),
                    field: unique_field_name(key, &mut used),
                    kind: column_kind(values),
                }
            })
            .collect::<Vec<_>>();

        // dBase tables need at least one field
        if columns.is_empty() {
            return Self {
                columns: vec![Column {
                    property: INDEX_FIELD.to_string(),
                    field: INDEX_FIELD.to_string(),
                    kind: ColumnKind::Index,
                }],
            };
        }
        Self { columns }
    }

    fn builder(&self) -> Result<TableWriterBuilder, LayerError> {
        let mut builder = TableWriterBuilder::new();
        for column in &self.columns {
            let name = FieldName::try_from(column.field.as_str()).map_err(|message| LayerError::Shapefile {
                layer: column.property.clone(),
                message: message.to_string(),
            })?;
            builder = match column.kind {
                ColumnKind::Character(length) => builder.add_character_field(name, length as u8),
                ColumnKind::Index => builder.add_numeric_field(name, 10, 0),
                ColumnKind::Numeric { integer: true } => builder.add_numeric_field(name, NUMERIC_LENGTH, 0),
                ColumnKind::Numeric { integer: false } => {
                    builder.add_numeric_field(name, NUMERIC_LENGTH, NUMERIC_DECIMALS)
                }
                ColumnKind::Logical => builder.add_logical_field(name),
            };
        }
        Ok(builder)
    }

    fn record(&self, index: usize, properties: &Map<String, Value>) -> Record {
        let mut record = Record::default();
        for column in &self.columns {
            let value = properties.get(&column.property).unwrap_or(&Value::Null);
            let field = match (column.kind, value) {
                (ColumnKind::Index, _) => FieldValue::Numeric(Some(index as f64)),
                (ColumnKind::Logical, Value::Bool(b)) => FieldValue::Logical(Some(*b)),
                (ColumnKind::Logical, _) => FieldValue::Logical(None),
                (ColumnKind::Numeric { .. }, Value::Number(n)) => FieldValue::Numeric(n.as_f64()),
                (ColumnKind::Numeric { .. }, _) => FieldValue::Numeric(None),
                (ColumnKind::Character(_), Value::Null) => FieldValue::Character(None),
                (ColumnKind::Character(_), value) => FieldValue::Character(Some(value_text(value))),
            };
            record.insert(column.field.clone(), field);
        }
        record
    }
}

fn column_kind<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    let mut longest = 1usize;
    for value in values {
        longest = longest.max(value_text(value).chars().count());
        let next = match value {
            Value::Null => continue,
            Value::Bool(_) => ColumnKind::Logical,
            Value::Number(n) => ColumnKind::Numeric { integer: n.is_i64() || n.is_u64() },
            _ => ColumnKind::Character(0),
        };
        kind = Some(match (kind, next) {
            (None, next) => next,
            (Some(ColumnKind::Numeric { integer: a }), ColumnKind::Numeric { integer: b }) => {
                ColumnKind::Numeric { integer: a && b }
            }
            (Some(current), next) if current == next => current,
            _ => ColumnKind::Character(0),
        });
    }

    match kind {
        Some(ColumnKind::Character(_)) | None => ColumnKind::Character(longest.min(MAX_CHARACTER_LENGTH)),
        Some(other) => other,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Truncate to the dBase limit and de-duplicate with a numeric suffix.
fn unique_field_name(property: &str, used: &mut BTreeSet<String>) -> String {
    let base: String = property
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_FIELD_NAME)
        .collect();
    let base = if base.is_empty() { "FIELD".to_string() } else { base };

    let mut candidate = base.clone();
    let mut n = 1;
    while used.contains(&candidate.to_ascii_uppercase()) {
        let suffix = format!("_{}", n);
        let keep = MAX_FIELD_NAME - suffix.len();
        candidate = format!("{}{}", &base[..base.len().min(keep)], suffix);
        n += 1;
    }
    used.insert(candidate.to_ascii_uppercase());
    candidate
}
