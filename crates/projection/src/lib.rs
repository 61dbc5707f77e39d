//! Coordinate reference system transformations.
//!
//! Point transforms are delegated to `proj4rs` (pure Rust, no libproj);
//! unit handling reads the CRS's own metadata so that buffer distances
//! are always expressed in the native unit of the target system.

pub mod error;
pub mod transform;
pub mod units;
pub mod wkt;

pub use error::ProjectionError;
pub use transform::CoordTransformer;
pub use units::{linear_unit, reconcile_radius, UnitReconciliation, UnitSource};
pub use wkt::{crs_from_wkt, crs_to_wkt};
