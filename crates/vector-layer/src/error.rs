use clip_common::ClipError;
use thiserror::Error;

/// Errors raised while reading, writing or discovering vector layers.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("I/O error on layer '{layer}': {source}")]
    Io {
        layer: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Layer '{layer}' is not valid GeoJSON: {source}")]
    Json {
        layer: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Layer '{0}' declares no CRS")]
    MissingCrs(String),

    #[error("Layer '{layer}' declares unsupported CRS: {message}")]
    UnsupportedCrs { layer: String, message: String },

    #[error("Layer '{layer}' is not a readable shapefile: {message}")]
    Shapefile { layer: String, message: String },

    #[error("Invalid geometry in layer '{layer}': {message}")]
    InvalidGeometry { layer: String, message: String },

    #[error("Cannot list layers in {path}: {message}")]
    Directory { path: String, message: String },
}

impl From<LayerError> for ClipError {
    fn from(err: LayerError) -> Self {
        match err {
            LayerError::Io { .. } | LayerError::Directory { .. } => ClipError::Io(err.to_string()),
            LayerError::MissingCrs(layer) => ClipError::MissingCrs(format!("vector layer '{}'", layer)),
            LayerError::UnsupportedCrs { .. } => ClipError::Reprojection(err.to_string()),
            LayerError::Json { .. } | LayerError::Shapefile { .. } | LayerError::InvalidGeometry { .. } => {
                ClipError::InvalidVector(err.to_string())
            }
        }
    }
}
