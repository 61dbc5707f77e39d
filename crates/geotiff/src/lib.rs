//! Single-band GeoTIFF I/O.
//!
//! Reads and writes north-up rasters georeferenced through the
//! ModelPixelScale/ModelTiepoint tags, with the CRS and linear unit taken
//! from the GeoKey directory and nodata from the GDAL_NODATA tag.
//! PixelIsPoint rasters are shifted to corner registration on read.
//! Pixel values are held as `f64` in memory; the on-disk sample format
//! is remembered so a clipped raster is written back in the same type.

pub mod error;
pub mod geokeys;
pub mod raster;
pub mod reader;
pub mod writer;

pub use error::GeoTiffError;
pub use geokeys::GeoKeyDirectory;
pub use raster::{GeoTransform, RasterLayer, SampleFormat};
pub use reader::{read_raster, read_raster_from_buffer};
pub use writer::{write_raster, write_raster_to_buffer};

/// GeoDoubleParamsTag, as a GeoKey storage location
pub const TAG_GEO_DOUBLE_PARAMS: u16 = 34736;
/// GeoAsciiParamsTag, as a GeoKey storage location
pub const TAG_GEO_ASCII_PARAMS: u16 = 34737;
