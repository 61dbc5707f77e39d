//! Point transforms between two CRS definitions.
//!
//! `proj4rs` works in radians for geographic systems, so degree/radian
//! conversion happens here and callers always see degrees for lon/lat.

use std::fmt;

use clip_common::Crs;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use tracing::debug;

use crate::error::ProjectionError;

/// Reusable transformer between a source and a target CRS.
pub struct CoordTransformer {
    source: Proj,
    target: Proj,
    source_crs: Crs,
    target_crs: Crs,
    /// True if source uses degrees (needs radian conversion)
    source_is_geographic: bool,
    /// True if target uses degrees (needs radian conversion)
    target_is_geographic: bool,
    identity: bool,
}

impl fmt::Debug for CoordTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordTransformer")
            .field("source", &self.source_crs.identifier())
            .field("target", &self.target_crs.identifier())
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl CoordTransformer {
    /// Create a transformer between two CRS definitions.
    ///
    /// Fails if either definition cannot be initialized, e.g. when it refers
    /// to a datum grid that is not available.
    pub fn new(source_crs: &Crs, target_crs: &Crs) -> Result<Self, ProjectionError> {
        let source = init_proj(source_crs)?;
        let target = init_proj(target_crs)?;
        let identity = source_crs.is_equivalent(target_crs);

        if identity {
            debug!(crs = %source_crs, "Source and target CRS are equivalent, using identity transform");
        }

        Ok(Self {
            source,
            target,
            source_is_geographic: source_crs.is_geographic(),
            target_is_geographic: target_crs.is_geographic(),
            source_crs: source_crs.clone(),
            target_crs: target_crs.clone(),
            identity,
        })
    }

    /// Transformer from WGS84 lon/lat into `target_crs`.
    pub fn from_wgs84(target_crs: &Crs) -> Result<Self, ProjectionError> {
        Self::new(&Crs::wgs84(), target_crs)
    }

    pub fn source_crs(&self) -> &Crs {
        &self.source_crs
    }

    pub fn target_crs(&self) -> &Crs {
        &self.target_crs
    }

    /// True when both ends describe the same system and coordinates pass through.
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Transform a single (x, y) pair. Geographic coordinates are (lon, lat) in degrees.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if self.identity {
            return Ok((x, y));
        }

        let (in_x, in_y) = if self.source_is_geographic {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };

        let mut point = (in_x, in_y, 0.0);
        transform(&self.source, &self.target, &mut point)
            .map_err(|e| self.failure(x, y, format!("{:?}", e)))?;

        let (out_x, out_y) = if self.target_is_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(self.failure(x, y, "non-finite result".to_string()));
        }

        Ok((out_x, out_y))
    }

    /// Transform a batch of coordinates, failing on the first error.
    pub fn transform_all(&self, points: &[(f64, f64)]) -> Result<Vec<(f64, f64)>, ProjectionError> {
        points.iter().map(|&(x, y)| self.transform(x, y)).collect()
    }

    fn failure(&self, x: f64, y: f64, message: String) -> ProjectionError {
        ProjectionError::TransformFailed {
            source_crs: self.source_crs.identifier(),
            target_crs: self.target_crs.identifier(),
            x,
            y,
            message,
        }
    }
}

fn init_proj(crs: &Crs) -> Result<Proj, ProjectionError> {
    Proj::from_proj_string(crs.proj()).map_err(|e| ProjectionError::InvalidProjection {
        crs: crs.identifier(),
        message: format!("{:?}", e),
    })
}
