//! Vector layer clipping to a buffer polygon.

use clip_common::{ClipResult, Crs};
use geo::{
    BooleanOps, Coord, Geometry, GeometryCollection, LineString, MapCoords, MultiLineString, MultiPoint,
    MultiPolygon, Intersects, Point, Polygon,
};
use projection::{CoordTransformer, ProjectionError};
use tracing::{debug, info};
use vector_layer::{LayerFeature, VectorLayer};

use crate::buffer::SiteBuffer;

/// Reproject every feature of `layer` into `target`.
///
/// Returns the layer unchanged when both systems are equivalent.
pub fn reproject_layer(layer: &VectorLayer, target: &Crs) -> ClipResult<VectorLayer> {
    if layer.crs.is_equivalent(target) {
        return Ok(layer.clone());
    }

    debug!(layer = %layer.name, from = %layer.crs, to = %target, "Reprojecting vector layer");
    let transformer = CoordTransformer::new(&layer.crs, target)?;

    let features = layer
        .features
        .iter()
        .map(|feature| match &feature.geometry {
            Some(geometry) => Ok(feature.with_geometry(reproject_geometry(geometry, &transformer)?)),
            None => Ok(feature.clone()),
        })
        .collect::<Result<Vec<_>, ProjectionError>>()?;

    Ok(VectorLayer::new(layer.name.clone(), target.clone(), features).with_format(layer.format))
}

fn reproject_geometry(geometry: &Geometry<f64>, transformer: &CoordTransformer) -> Result<Geometry<f64>, ProjectionError> {
    geometry.try_map_coords(|c: Coord<f64>| {
        let (x, y) = transformer.transform(c.x, c.y)?;
        Ok(Coord { x, y })
    })
}

/// Clip `layer` to the buffer polygon, producing a layer named `output_name`
/// in the buffer's CRS.
///
/// Features entirely outside the buffer are dropped; attributes of the rest
/// are kept. An empty result is not an error.
pub fn clip_layer(layer: &VectorLayer, buffer: &SiteBuffer, output_name: &str) -> ClipResult<VectorLayer> {
    let projected = reproject_layer(layer, buffer.crs())?;

    let mut features: Vec<LayerFeature> = Vec::new();
    for feature in &projected.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        if let Some(clipped) = clip_geometry(geometry, &buffer.polygon) {
            features.push(feature.with_geometry(clipped));
        }
    }

    if features.is_empty() {
        info!(
            layer = %layer.name,
            source_features = layer.len(),
            "No features intersect the buffer, writing empty layer"
        );
    } else {
        debug!(
            layer = %layer.name,
            source_features = layer.len(),
            clipped_features = features.len(),
            "Clipped vector layer"
        );
    }

    Ok(VectorLayer::new(output_name, buffer.crs().clone(), features).with_format(layer.format))
}

/// Intersection of one geometry with the buffer, or `None` when nothing remains.
fn clip_geometry(geometry: &Geometry<f64>, buffer: &Polygon<f64>) -> Option<Geometry<f64>> {
    match geometry {
        Geometry::Point(p) => buffer.intersects(p).then_some(Geometry::Point(*p)),
        Geometry::MultiPoint(mp) => {
            let kept: Vec<Point<f64>> = mp.iter().filter(|p| buffer.intersects(*p)).copied().collect();
            points_result(kept)
        }
        Geometry::Line(line) => {
            let mls = MultiLineString::new(vec![LineString::new(vec![line.start, line.end])]);
            lines_result(buffer.clip(&mls, false))
        }
        Geometry::LineString(ls) => lines_result(buffer.clip(&MultiLineString::new(vec![ls.clone()]), false)),
        Geometry::MultiLineString(mls) => lines_result(buffer.clip(mls, false)),
        Geometry::Polygon(poly) => polygons_result(buffer.intersection(poly)),
        Geometry::MultiPolygon(mp) => polygons_result(buffer.intersection(mp)),
        Geometry::Rect(rect) => polygons_result(buffer.intersection(&rect.to_polygon())),
        Geometry::Triangle(tri) => polygons_result(buffer.intersection(&tri.to_polygon())),
        Geometry::GeometryCollection(gc) => {
            let parts: Vec<Geometry<f64>> = gc.iter().filter_map(|g| clip_geometry(g, buffer)).collect();
            match parts.len() {
                0 => None,
                1 => parts.into_iter().next(),
                _ => Some(Geometry::GeometryCollection(GeometryCollection(parts))),
            }
        }
    }
}

fn points_result(mut points: Vec<Point<f64>>) -> Option<Geometry<f64>> {
    match points.len() {
        0 => None,
        1 => points.pop().map(Geometry::Point),
        _ => Some(Geometry::MultiPoint(MultiPoint::new(points))),
    }
}

fn lines_result(mut lines: MultiLineString<f64>) -> Option<Geometry<f64>> {
    lines.0.retain(|ls| ls.0.len() >= 2);
    match lines.0.len() {
        0 => None,
        1 => lines.0.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(lines)),
    }
}

fn polygons_result(mut polygons: MultiPolygon<f64>) -> Option<Geometry<f64>> {
    polygons.0.retain(|p| p.exterior().0.len() >= 4);
    match polygons.0.len() {
        0 => None,
        1 => polygons.0.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(polygons)),
    }
}
