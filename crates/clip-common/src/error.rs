//! Error types for site-clip.

use thiserror::Error;

/// Result type alias using ClipError.
pub type ClipResult<T> = Result<T, ClipError>;

/// Primary error type for the clipping pipeline.
///
/// Every variant is fatal for a run: the pipeline surfaces it and halts.
/// An empty vector clip is not an error and never produces one of these.
#[derive(Debug, Error)]
pub enum ClipError {
    // === Input Errors ===
    #[error("Malformed coordinate input: {0}")]
    Parse(String),

    #[error("Coordinate out of range: {0}")]
    Range(String),

    #[error("No CRS defined for {0}")]
    MissingCrs(String),

    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    #[error("Invalid vector layer: {0}")]
    InvalidVector(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // === Geometry Errors ===
    #[error("Cannot reconcile linear unit: {0}")]
    UnitReconciliation(String),

    #[error("Reprojection failed: {0}")]
    Reprojection(String),

    #[error("Buffer does not overlap raster '{raster}': {detail}")]
    EmptyRasterOverlap { raster: String, detail: String },

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(String),
}

impl ClipError {
    /// Stable short name for this error, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ClipError::Parse(_) => "parse",
            ClipError::Range(_) => "range",
            ClipError::MissingCrs(_) => "missing_crs",
            ClipError::InvalidRaster(_) => "invalid_raster",
            ClipError::InvalidVector(_) => "invalid_vector",
            ClipError::Config(_) => "config",
            ClipError::UnitReconciliation(_) => "unit_reconciliation",
            ClipError::Reprojection(_) => "reprojection",
            ClipError::EmptyRasterOverlap { .. } => "empty_raster_overlap",
            ClipError::Io(_) => "io",
        }
    }

    /// Whether the error stems from operator-supplied input rather than
    /// from the environment.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, ClipError::Io(_))
    }
}

impl From<std::io::Error> for ClipError {
    fn from(err: std::io::Error) -> Self {
        ClipError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClipError {
    fn from(err: serde_json::Error) -> Self {
        ClipError::InvalidVector(format!("JSON error: {}", err))
    }
}
