//! Site buffer construction.
//!
//! The buffer is a regular polygon whose edges are tangent to the circle of
//! the requested radius, so the whole disc lies inside it. The polygon is
//! built in the target CRS after the radius has been converted into that
//! CRS's linear unit.

use std::f64::consts::PI;

use clip_common::{ClipError, ClipResult, Crs, LinearUnit, SiteCoordinate};
use geo::{Area, BoundingRect, Coord, LineString, Point, Polygon, Rect};
use projection::{reconcile_radius, CoordTransformer, UnitReconciliation};
use tracing::{debug, info};

/// Vertices of the buffer polygon unless configured otherwise.
pub const DEFAULT_SEGMENTS: usize = 64;

/// A radius expressed in the native unit of the CRS it will be drawn in.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferSpec {
    pub radius_value: f64,
    pub radius_unit: LinearUnit,
    pub center: Point<f64>,
    pub target_crs: Crs,
}

impl BufferSpec {
    /// The radius back in meters.
    pub fn radius_meters(&self) -> f64 {
        self.radius_unit.to_meters(self.radius_value)
    }
}

/// A buffer polygon and how it was derived.
#[derive(Debug, Clone)]
pub struct SiteBuffer {
    pub spec: BufferSpec,
    pub polygon: Polygon<f64>,
    pub reconciliation: UnitReconciliation,
    pub site: SiteCoordinate,
}

impl SiteBuffer {
    pub fn crs(&self) -> &Crs {
        &self.spec.target_crs
    }

    /// Polygon area in square CRS units.
    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }

    /// Polygon area converted to square meters.
    pub fn area_square_meters(&self) -> f64 {
        self.area() * self.spec.radius_unit.meters_per_unit().powi(2)
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.polygon.bounding_rect()
    }
}

/// Build the buffer of `radius_m` meters around `site`, drawn in `crs`.
pub fn build_buffer(site: &SiteCoordinate, crs: &Crs, radius_m: f64, segments: usize) -> ClipResult<SiteBuffer> {
    if segments < 3 {
        return Err(ClipError::Config(format!(
            "a buffer polygon needs at least 3 segments, got {}",
            segments
        )));
    }

    let reconciliation = reconcile_radius(crs, radius_m)?;

    let transformer = CoordTransformer::from_wgs84(crs)?;
    let (lon, lat) = site.lon_lat();
    let (x, y) = transformer.transform(lon, lat)?;
    debug!(site = %site, crs = %crs, x, y, "Projected site coordinate");

    let spec = BufferSpec {
        radius_value: reconciliation.radius_crs_units,
        radius_unit: reconciliation.unit,
        center: Point::new(x, y),
        target_crs: crs.clone(),
    };
    let polygon = circumscribed_polygon(spec.center, spec.radius_value, segments);

    info!(
        radius_m,
        radius_crs_units = spec.radius_value,
        unit = %spec.radius_unit,
        crs = %crs,
        segments,
        "Built site buffer"
    );

    Ok(SiteBuffer {
        spec,
        polygon,
        reconciliation,
        site: *site,
    })
}

/// Regular `n`-gon whose inscribed circle has radius `r`.
///
/// Vertex radius is `r / cos(π/n)`; area is `n·r²·tan(π/n)`.
pub fn circumscribed_polygon(center: Point<f64>, r: f64, n: usize) -> Polygon<f64> {
    let n = n.max(3);
    let vertex_radius = r / (PI / n as f64).cos();
    let mut coords: Vec<Coord<f64>> = (0..n)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / n as f64;
            Coord {
                x: center.x() + vertex_radius * angle.cos(),
                y: center.y() + vertex_radius * angle.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);

    Polygon::new(LineString::new(coords), vec![])
}
