//! Common types shared across the site-clip workspace.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod site;
pub mod units;

pub use bbox::BoundingBox;
pub use crs::{Crs, UnitDeclaration};
pub use error::{ClipError, ClipResult};
pub use site::{read_site_coordinate, SiteCoordinate};
pub use units::LinearUnit;
