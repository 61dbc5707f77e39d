//! Boundary vector layers.
//!
//! Layers are ESRI shapefiles with a `.prj` sidecar, or GeoJSON
//! FeatureCollections that declare their CRS through the named-CRS `crs`
//! member. In memory, geometries are `geo` types so the clipper can use its
//! boolean operations directly.

pub mod convert;
pub mod discover;
pub mod error;
pub mod geojson;
pub mod layer;
pub mod shp;

pub use discover::list_layers;
pub use error::LayerError;
pub use layer::{layer_files, read_layer, write_layer, LayerFeature, LayerFormat, VectorLayer};
