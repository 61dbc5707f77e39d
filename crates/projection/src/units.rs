//! Linear unit reconciliation.
//!
//! A buffer distance is given in real-world meters, but geometry is built in
//! the raster's native coordinates. The unit is read from the CRS metadata in
//! this order: unit declared by the data source, the outermost `UNIT` of the
//! EPSG definition WKT, then the PROJ `+units` / `+to_meter` parameters.
//! A projected CRS with none of these falls back to meters (PROJ's own
//! default) with a warning; anything present but unclassifiable is an error.

use clip_common::{Crs, LinearUnit, UnitDeclaration};
use tracing::{debug, warn};

use crate::error::ProjectionError;
use crate::wkt;

/// Where the linear unit of a CRS was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSource {
    Declared,
    Wkt,
    Proj,
    Default,
}

/// Result of converting a real-world radius into CRS units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitReconciliation {
    pub unit: LinearUnit,
    pub source: UnitSource,
    pub radius_meters: f64,
    pub radius_crs_units: f64,
}

impl UnitReconciliation {
    pub fn meters_per_unit(&self) -> f64 {
        self.unit.meters_per_unit()
    }
}

/// Determine the linear unit of a projected CRS.
pub fn linear_unit(crs: &Crs) -> Result<(LinearUnit, UnitSource), ProjectionError> {
    if crs.is_geographic() {
        return Err(ProjectionError::AngularUnit {
            crs: crs.identifier(),
            unit: "degree".to_string(),
        });
    }

    if let Some(declared) = crs.declared_unit() {
        return from_declaration(crs, declared).map(|u| (u, UnitSource::Declared));
    }

    if let Some(definition) = crs.definition_wkt() {
        if let Some(root) = wkt::root_keyword(definition) {
            let root = root.to_ascii_uppercase();
            if root == "GEOGCS" || root == "GEOGCRS" || root == "GEODCRS" {
                return Err(ProjectionError::AngularUnit {
                    crs: crs.identifier(),
                    unit: "degree".to_string(),
                });
            }
        }
        if let Some(unit) = wkt::outermost_unit(definition) {
            return from_wkt_unit(crs, &unit).map(|u| (u, UnitSource::Wkt));
        }
    }

    if let Some(unit) = from_proj(crs)? {
        return Ok((unit, UnitSource::Proj));
    }

    warn!(crs = %crs, "CRS declares no linear unit, assuming meters");
    Ok((LinearUnit::Meters, UnitSource::Default))
}

/// Convert a radius in meters into the native linear unit of `crs`.
pub fn reconcile_radius(crs: &Crs, radius_meters: f64) -> Result<UnitReconciliation, ProjectionError> {
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(ProjectionError::InvalidRadius(radius_meters));
    }

    let (unit, source) = linear_unit(crs)?;
    let radius_crs_units = unit.from_meters(radius_meters);

    debug!(
        crs = %crs,
        unit = %unit,
        source = ?source,
        radius_meters,
        radius_crs_units,
        "Reconciled buffer radius"
    );

    Ok(UnitReconciliation {
        unit,
        source,
        radius_meters,
        radius_crs_units,
    })
}

fn from_declaration(crs: &Crs, declared: UnitDeclaration) -> Result<LinearUnit, ProjectionError> {
    match declared {
        UnitDeclaration::EpsgCode(code) => LinearUnit::from_epsg_code(code).ok_or_else(|| {
            // EPSG 9101..9199 are angular units (radian, degree, grad, ...)
            if (9101..9200).contains(&code) {
                ProjectionError::AngularUnit {
                    crs: crs.identifier(),
                    unit: format!("EPSG:{}", code),
                }
            } else {
                ProjectionError::UnrecognizedUnit {
                    crs: crs.identifier(),
                    unit: format!("EPSG:{}", code),
                }
            }
        }),
        UnitDeclaration::Factor(factor) => {
            LinearUnit::from_factor(factor).ok_or_else(|| ProjectionError::UnrecognizedUnit {
                crs: crs.identifier(),
                unit: format!("{} m per unit", factor),
            })
        }
    }
}

fn from_wkt_unit(crs: &Crs, unit: &wkt::WktUnit) -> Result<LinearUnit, ProjectionError> {
    let name = unit.name.to_ascii_lowercase();
    if name.contains("degree") || name.contains("radian") || name.contains("grad") {
        return Err(ProjectionError::AngularUnit {
            crs: crs.identifier(),
            unit: unit.name.clone(),
        });
    }

    if let Some(linear) = LinearUnit::from_factor(unit.factor) {
        return Ok(linear);
    }

    // Some definitions round the survey foot; fall back to the name.
    let by_name = match name.as_str() {
        "metre" | "meter" => Some(LinearUnit::Meters),
        "us survey foot" | "foot_us" | "us_survey_foot" => Some(LinearUnit::UsSurveyFeet),
        "foot" | "international foot" | "foot_international" => Some(LinearUnit::InternationalFeet),
        _ => None,
    };

    by_name.ok_or_else(|| ProjectionError::UnrecognizedUnit {
        crs: crs.identifier(),
        unit: format!("{} ({} m)", unit.name, unit.factor),
    })
}

fn from_proj(crs: &Crs) -> Result<Option<LinearUnit>, ProjectionError> {
    if let Some(to_meter) = crs.proj_param("to_meter") {
        let factor: f64 = to_meter.parse().map_err(|_| ProjectionError::UnrecognizedUnit {
            crs: crs.identifier(),
            unit: format!("+to_meter={}", to_meter),
        })?;
        return LinearUnit::from_factor(factor)
            .map(Some)
            .ok_or_else(|| ProjectionError::UnrecognizedUnit {
                crs: crs.identifier(),
                unit: format!("+to_meter={}", to_meter),
            });
    }

    match crs.proj_param("units") {
        None => Ok(None),
        Some("m") => Ok(Some(LinearUnit::Meters)),
        Some("ft") => Ok(Some(LinearUnit::InternationalFeet)),
        Some("us-ft") => Ok(Some(LinearUnit::UsSurveyFeet)),
        Some(other) => Err(ProjectionError::UnrecognizedUnit {
            crs: crs.identifier(),
            unit: other.to_string(),
        }),
    }
}
