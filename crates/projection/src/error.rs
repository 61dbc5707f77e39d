use clip_common::ClipError;
use thiserror::Error;

/// Errors raised while transforming coordinates or reconciling units.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Invalid projection '{crs}': {message}")]
    InvalidProjection { crs: String, message: String },

    #[error("Transform {source_crs} -> {target_crs} failed at ({x}, {y}): {message}")]
    TransformFailed {
        source_crs: String,
        target_crs: String,
        x: f64,
        y: f64,
        message: String,
    },

    #[error("CRS {crs} uses angular unit '{unit}'; a projected CRS with a linear unit is required")]
    AngularUnit { crs: String, unit: String },

    #[error("CRS {crs} declares unrecognized linear unit '{unit}'")]
    UnrecognizedUnit { crs: String, unit: String },

    #[error("Buffer radius must be a positive finite distance, got {0}")]
    InvalidRadius(f64),
}

impl From<ProjectionError> for ClipError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::AngularUnit { .. } | ProjectionError::UnrecognizedUnit { .. } => {
                ClipError::UnitReconciliation(err.to_string())
            }
            ProjectionError::InvalidRadius(_) => ClipError::Config(err.to_string()),
            ProjectionError::InvalidProjection { .. } | ProjectionError::TransformFailed { .. } => {
                ClipError::Reprojection(err.to_string())
            }
        }
    }
}
