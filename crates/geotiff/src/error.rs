use clip_common::ClipError;
use thiserror::Error;

/// Errors raised while decoding or encoding a GeoTIFF.
#[derive(Debug, Error)]
pub enum GeoTiffError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF decode error: {0}")]
    Decode(String),

    #[error("TIFF encode error: {0}")]
    Encode(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Raster has no georeferencing: {0}")]
    MissingGeoreference(String),

    #[error("Invalid GeoKey directory: {0}")]
    InvalidGeoKeys(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Raster size mismatch: expected {expected} samples, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

impl From<GeoTiffError> for ClipError {
    fn from(err: GeoTiffError) -> Self {
        match err {
            GeoTiffError::Io(e) => ClipError::Io(e.to_string()),
            GeoTiffError::UnsupportedCrs(msg) => ClipError::Reprojection(msg),
            other => ClipError::InvalidRaster(other.to_string()),
        }
    }
}
