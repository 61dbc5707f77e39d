//! Site coordinate input.
//!
//! The coordinate file is plain text whose first non-empty line holds
//! `lat, lon` in WGS84 decimal degrees. Anything after that line is ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{ClipError, ClipResult};

/// A WGS84 site location. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteCoordinate {
    latitude: f64,
    longitude: f64,
}

impl SiteCoordinate {
    /// Create a coordinate, validating geodetic bounds.
    pub fn new(latitude: f64, longitude: f64) -> ClipResult<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ClipError::Range(format!(
                "non-finite coordinate ({}, {})",
                latitude, longitude
            )));
        }
        if latitude.abs() > 90.0 {
            return Err(ClipError::Range(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if longitude.abs() > 180.0 {
            return Err(ClipError::Range(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse the first non-empty line of `text` as "lat, lon".
    pub fn parse(text: &str) -> ClipResult<Self> {
        let line = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| ClipError::Parse("coordinate input is empty".to_string()))?;

        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(ClipError::Parse(format!(
                "expected 'lat, lon', got: '{}'",
                line
            )));
        }

        let latitude: f64 = parts[0]
            .parse()
            .map_err(|_| ClipError::Parse(format!("invalid latitude '{}'", parts[0])))?;
        let longitude: f64 = parts[1]
            .parse()
            .map_err(|_| ClipError::Parse(format!("invalid longitude '{}'", parts[1])))?;

        Self::new(latitude, longitude)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// (x, y) order as used by geographic transforms: (lon, lat).
    pub fn lon_lat(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }
}

impl fmt::Display for SiteCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Read the site coordinate from a file.
pub fn read_site_coordinate(path: impl AsRef<Path>) -> ClipResult<SiteCoordinate> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        ClipError::Io(format!("cannot read coordinate file {}: {}", path.display(), e))
    })?;
    SiteCoordinate::parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let site = SiteCoordinate::parse("34.0522, -118.2437\n").unwrap();
        assert_eq!(site.latitude(), 34.0522);
        assert_eq!(site.longitude(), -118.2437);
    }

    #[test]
    fn test_parse_skips_leading_blank_lines() {
        let site = SiteCoordinate::parse("\n   \n 10.5 ,20.25 \nignored").unwrap();
        assert_eq!(site.lon_lat(), (20.25, 10.5));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            SiteCoordinate::parse("91.0, 0.0"),
            Err(ClipError::Range(_))
        ));
        assert!(matches!(
            SiteCoordinate::new(0.0, -180.5),
            Err(ClipError::Range(_))
        ));
        assert!(matches!(
            SiteCoordinate::new(f64::NAN, 0.0),
            Err(ClipError::Range(_))
        ));
    }
}
