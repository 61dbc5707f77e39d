//! Linear units of projected coordinate reference systems.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Meters per US survey foot (exactly 1200/3937).
pub const US_SURVEY_FOOT_METERS: f64 = 1200.0 / 3937.0;

/// Meters per international foot.
pub const INTERNATIONAL_FOOT_METERS: f64 = 0.3048;

/// Linear unit of a projected CRS axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearUnit {
    /// EPSG:9001
    Meters,
    /// EPSG:9002
    InternationalFeet,
    /// EPSG:9003
    UsSurveyFeet,
}

impl LinearUnit {
    /// Conversion factor from one unit to meters.
    pub fn meters_per_unit(&self) -> f64 {
        match self {
            LinearUnit::Meters => 1.0,
            LinearUnit::InternationalFeet => INTERNATIONAL_FOOT_METERS,
            LinearUnit::UsSurveyFeet => US_SURVEY_FOOT_METERS,
        }
    }

    /// Express a distance given in meters in this unit.
    pub fn from_meters(&self, meters: f64) -> f64 {
        meters / self.meters_per_unit()
    }

    /// Express a distance given in this unit in meters.
    pub fn to_meters(&self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    /// EPSG unit-of-measure code.
    pub fn epsg_code(&self) -> u16 {
        match self {
            LinearUnit::Meters => 9001,
            LinearUnit::InternationalFeet => 9002,
            LinearUnit::UsSurveyFeet => 9003,
        }
    }

    /// Look up a unit from its EPSG unit-of-measure code.
    pub fn from_epsg_code(code: u16) -> Option<Self> {
        match code {
            9001 => Some(LinearUnit::Meters),
            9002 => Some(LinearUnit::InternationalFeet),
            9003 => Some(LinearUnit::UsSurveyFeet),
            _ => None,
        }
    }

    /// Match a meters-per-unit factor against the known units.
    ///
    /// The two foot definitions differ by 2 ppm, so the comparison is relative
    /// at 1e-9 rather than a loose absolute tolerance.
    pub fn from_factor(meters_per_unit: f64) -> Option<Self> {
        [
            LinearUnit::Meters,
            LinearUnit::InternationalFeet,
            LinearUnit::UsSurveyFeet,
        ]
        .into_iter()
        .find(|unit| {
            let known = unit.meters_per_unit();
            ((meters_per_unit - known) / known).abs() < 1e-9
        })
    }

    /// Short abbreviation used in logs and file metadata.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            LinearUnit::Meters => "m",
            LinearUnit::InternationalFeet => "ft",
            LinearUnit::UsSurveyFeet => "us-ft",
        }
    }
}

impl fmt::Display for LinearUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinearUnit::Meters => "metre",
            LinearUnit::InternationalFeet => "foot",
            LinearUnit::UsSurveyFeet => "US survey foot",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survey_foot_conversion() {
        let ft = LinearUnit::UsSurveyFeet.from_meters(200.0);
        assert!((ft - 656.1666666).abs() < 1e-3);
    }

    #[test]
    fn test_international_foot_conversion() {
        let ft = LinearUnit::InternationalFeet.from_meters(200.0);
        assert!((ft - 656.1679790).abs() < 1e-3);
    }

    #[test]
    fn test_factor_distinguishes_foot_definitions() {
        assert_eq!(
            LinearUnit::from_factor(0.3048006096012192),
            Some(LinearUnit::UsSurveyFeet)
        );
        assert_eq!(LinearUnit::from_factor(0.3048), Some(LinearUnit::InternationalFeet));
        assert_eq!(LinearUnit::from_factor(1.0), Some(LinearUnit::Meters));
        assert_eq!(LinearUnit::from_factor(1000.0), None);
    }

    #[test]
    fn test_epsg_codes_round_trip() {
        for unit in [
            LinearUnit::Meters,
            LinearUnit::InternationalFeet,
            LinearUnit::UsSurveyFeet,
        ] {
            assert_eq!(LinearUnit::from_epsg_code(unit.epsg_code()), Some(unit));
        }
        assert_eq!(LinearUnit::from_epsg_code(9102), None);
    }
}
