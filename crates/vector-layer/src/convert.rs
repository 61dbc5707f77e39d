//! Conversion between GeoJSON geometries and `geo` geometries.

use geo::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};

use crate::geojson::{Geometry, Position};

/// Convert a GeoJSON geometry into a `geo` geometry.
///
/// Positions must have at least two finite values; extra dimensions are dropped.
pub fn to_geo(geometry: &Geometry) -> Result<geo::Geometry<f64>, String> {
    Ok(match geometry {
        Geometry::Point { coordinates } => geo::Geometry::Point(Point::from(coord(coordinates)?)),
        Geometry::MultiPoint { coordinates } => geo::Geometry::MultiPoint(MultiPoint::new(
            coordinates
                .iter()
                .map(|p| coord(p).map(Point::from))
                .collect::<Result<_, _>>()?,
        )),
        Geometry::LineString { coordinates } => geo::Geometry::LineString(line_string(coordinates)?),
        Geometry::MultiLineString { coordinates } => geo::Geometry::MultiLineString(MultiLineString::new(
            coordinates.iter().map(|l| line_string(l)).collect::<Result<_, _>>()?,
        )),
        Geometry::Polygon { coordinates } => geo::Geometry::Polygon(polygon(coordinates)?),
        Geometry::MultiPolygon { coordinates } => geo::Geometry::MultiPolygon(MultiPolygon::new(
            coordinates.iter().map(|p| polygon(p)).collect::<Result<_, _>>()?,
        )),
        Geometry::GeometryCollection { geometries } => geo::Geometry::GeometryCollection(
            geo::GeometryCollection(geometries.iter().map(to_geo).collect::<Result<_, _>>()?),
        ),
    })
}

/// Convert a `geo` geometry into GeoJSON. Lines, rectangles and triangles
/// are written as LineString/Polygon.
pub fn from_geo(geometry: &geo::Geometry<f64>) -> Geometry {
    match geometry {
        geo::Geometry::Point(p) => Geometry::Point {
            coordinates: position(p.0),
        },
        geo::Geometry::Line(l) => Geometry::LineString {
            coordinates: vec![position(l.start), position(l.end)],
        },
        geo::Geometry::LineString(ls) => Geometry::LineString {
            coordinates: positions(ls),
        },
        geo::Geometry::Polygon(p) => Geometry::Polygon {
            coordinates: rings(p),
        },
        geo::Geometry::MultiPoint(mp) => Geometry::MultiPoint {
            coordinates: mp.iter().map(|p| position(p.0)).collect(),
        },
        geo::Geometry::MultiLineString(mls) => Geometry::MultiLineString {
            coordinates: mls.iter().map(positions).collect(),
        },
        geo::Geometry::MultiPolygon(mp) => Geometry::MultiPolygon {
            coordinates: mp.iter().map(rings).collect(),
        },
        geo::Geometry::GeometryCollection(gc) => Geometry::GeometryCollection {
            geometries: gc.iter().map(from_geo).collect(),
        },
        geo::Geometry::Rect(r) => Geometry::Polygon {
            coordinates: rings(&r.to_polygon()),
        },
        geo::Geometry::Triangle(t) => Geometry::Polygon {
            coordinates: rings(&t.to_polygon()),
        },
    }
}

fn coord(position: &Position) -> Result<Coord<f64>, String> {
    match position.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        [_, _, ..] => Err(format!("non-finite position {:?}", position)),
        _ => Err(format!("position needs at least 2 values, got {}", position.len())),
    }
}

fn line_string(positions: &[Position]) -> Result<LineString<f64>, String> {
    positions
        .iter()
        .map(coord)
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, String> {
    let mut rings = rings.iter();
    let exterior = match rings.next() {
        Some(ring) => line_string(ring)?,
        None => return Err("polygon has no exterior ring".to_string()),
    };
    let interiors = rings.map(|r| line_string(r)).collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn position(c: Coord<f64>) -> Position {
    vec![c.x, c.y]
}

fn positions(ls: &LineString<f64>) -> Vec<Position> {
    ls.coords().map(|c| position(*c)).collect()
}

fn rings(p: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .map(positions)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    #[test]
    fn test_polygon_with_hole() {
        let geometry = Geometry::Polygon {
            coordinates: vec![
                vec![vec![0.0, 0.0], vec![10.0, 0.0], vec![10.0, 10.0], vec![0.0, 10.0], vec![0.0, 0.0]],
                vec![vec![4.0, 4.0], vec![6.0, 4.0], vec![6.0, 6.0], vec![4.0, 6.0], vec![4.0, 4.0]],
            ],
        };
        let converted = to_geo(&geometry).unwrap();
        assert!((converted.unsigned_area() - 96.0).abs() < 1e-9);
        assert_eq!(from_geo(&converted), geometry);
    }

    #[test]
    fn test_third_dimension_dropped() {
        let geometry = Geometry::Point {
            coordinates: vec![1.0, 2.0, 3.0],
        };
        let converted = to_geo(&geometry).unwrap();
        assert_eq!(converted, geo::Geometry::Point(Point::new(1.0, 2.0)));
    }

    #[test]
    fn test_invalid_positions() {
        assert!(to_geo(&Geometry::Point { coordinates: vec![1.0] }).is_err());
        assert!(to_geo(&Geometry::LineString {
            coordinates: vec![vec![0.0, f64::NAN], vec![1.0, 1.0]]
        })
        .is_err());
        assert!(to_geo(&Geometry::Polygon { coordinates: vec![] }).is_err());
    }

    #[test]
    fn test_rect_written_as_polygon() {
        let rect = geo::Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 1.0 });
        assert!(matches!(
            from_geo(&geo::Geometry::Rect(rect)),
            Geometry::Polygon { .. }
        ));
    }
}
