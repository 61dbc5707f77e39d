//! Coordinate Reference System handles.
//!
//! A [`Crs`] always carries a PROJ definition string so it can be handed to
//! the transformer directly. EPSG codes are resolved through the bundled
//! `crs-definitions` table; nothing is looked up at runtime.

use std::fmt;

use crate::error::{ClipError, ClipResult};

/// PROJ definition of WGS84 geographic coordinates.
pub const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// EPSG code of WGS84 geographic coordinates.
pub const EPSG_WGS84: u32 = 4326;

/// Unit metadata declared by the data source itself, ahead of whatever the
/// CRS definition says.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitDeclaration {
    /// EPSG unit-of-measure code (GeoTIFF `ProjLinearUnitsGeoKey`).
    EpsgCode(u16),
    /// User-defined unit given as meters per unit (GeoTIFF `ProjLinearUnitSizeGeoKey`).
    Factor(f64),
}

/// A resolved coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    epsg: Option<u32>,
    proj: String,
    declared_unit: Option<UnitDeclaration>,
}

impl Crs {
    /// Resolve a CRS from an EPSG code.
    pub fn from_epsg(code: u32) -> ClipResult<Self> {
        if code == EPSG_WGS84 {
            return Ok(Self::wgs84());
        }

        let def = u16::try_from(code)
            .ok()
            .and_then(crs_definitions::from_code)
            .ok_or_else(|| {
                ClipError::Reprojection(format!("EPSG:{} has no known definition", code))
            })?;

        Ok(Self {
            epsg: Some(code),
            proj: def.proj4.trim().to_string(),
            declared_unit: None,
        })
    }

    /// Build a CRS from a PROJ definition string such as `+proj=utm +zone=11`.
    pub fn from_proj(definition: &str) -> ClipResult<Self> {
        let definition = definition.trim();
        if !definition.split_whitespace().any(|t| t.starts_with("+proj=")) {
            return Err(ClipError::Reprojection(format!(
                "not a PROJ definition: '{}'",
                definition
            )));
        }

        Ok(Self {
            epsg: None,
            proj: definition.to_string(),
            declared_unit: None,
        })
    }

    /// WGS84 geographic coordinates (EPSG:4326).
    pub fn wgs84() -> Self {
        Self {
            epsg: Some(EPSG_WGS84),
            proj: WGS84_PROJ.to_string(),
            declared_unit: None,
        }
    }

    /// Parse a CRS identifier.
    ///
    /// Accepts formats like:
    /// - "EPSG:6340"
    /// - "urn:ogc:def:crs:EPSG::6340"
    /// - "urn:ogc:def:crs:OGC:1.3:CRS84" or "CRS:84"
    /// - a PROJ string starting with "+proj="
    pub fn parse(identifier: &str) -> ClipResult<Self> {
        let trimmed = identifier.trim();
        if trimmed.starts_with('+') {
            return Self::from_proj(trimmed);
        }

        let normalized = trimmed.to_uppercase();
        if normalized == "CRS:84"
            || normalized == "OGC:CRS84"
            || (normalized.starts_with("URN:OGC:DEF:CRS:OGC:") && normalized.ends_with("CRS84"))
        {
            return Ok(Self::wgs84());
        }

        let code = if let Some(rest) = normalized.strip_prefix("EPSG:") {
            rest
        } else if normalized.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            // urn:ogc:def:crs:EPSG:<version>:<code>; the version may be empty
            normalized.rsplit(':').next().unwrap_or_default()
        } else {
            return Err(ClipError::Reprojection(format!(
                "unsupported CRS identifier: '{}'",
                identifier
            )));
        };

        let code: u32 = code.parse().map_err(|_| {
            ClipError::Reprojection(format!("invalid EPSG code in '{}'", identifier))
        })?;
        Self::from_epsg(code)
    }

    /// Attach unit metadata declared by the data source.
    pub fn with_declared_unit(mut self, unit: UnitDeclaration) -> Self {
        self.declared_unit = Some(unit);
        self
    }

    /// EPSG code, if known.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// PROJ definition string.
    pub fn proj(&self) -> &str {
        &self.proj
    }

    /// Unit metadata declared by the data source, if any.
    pub fn declared_unit(&self) -> Option<UnitDeclaration> {
        self.declared_unit
    }

    /// WKT of the EPSG definition, if the CRS came from a known code.
    pub fn definition_wkt(&self) -> Option<&'static str> {
        let code = u16::try_from(self.epsg?).ok()?;
        crs_definitions::from_code(code)
            .map(|def| def.wkt)
            .filter(|wkt| !wkt.trim().is_empty())
    }

    /// Value of a `+key=value` parameter in the PROJ definition.
    pub fn proj_param(&self, key: &str) -> Option<&str> {
        self.proj.split_whitespace().find_map(|token| {
            let (k, v) = token.trim_start_matches('+').split_once('=')?;
            (k == key).then_some(v)
        })
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(
            self.proj_param("proj"),
            Some("longlat" | "latlong" | "lonlat" | "latlon")
        )
    }

    /// Check if two CRS definitions describe the same system.
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        normalized_tokens(&self.proj) == normalized_tokens(&other.proj)
    }

    /// Short identifier: "EPSG:<code>" when known, otherwise the PROJ string.
    pub fn identifier(&self) -> String {
        match self.epsg {
            Some(code) => format!("EPSG:{}", code),
            None => self.proj.clone(),
        }
    }

    /// OGC URN for the named-CRS member of GeoJSON documents.
    pub fn urn(&self) -> Option<String> {
        self.epsg.map(|code| format!("urn:ogc:def:crs:EPSG::{}", code))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

fn normalized_tokens(definition: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = definition
        .split_whitespace()
        .filter(|t| *t != "+no_defs" && *t != "+type=crs")
        .collect();
    tokens.sort_unstable();
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identifiers() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap().epsg(), Some(4326));
        assert_eq!(Crs::parse("epsg:32611").unwrap().epsg(), Some(32611));
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:EPSG::32611").unwrap().epsg(),
            Some(32611)
        );
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap().epsg(),
            Some(4326)
        );
        assert!(Crs::parse("EPSG:abc").is_err());
        assert!(Crs::parse("LOCAL:1").is_err());
    }

    #[test]
    fn test_proj_params() {
        let crs = Crs::from_proj("+proj=utm +zone=11 +ellps=GRS80 +units=m +no_defs").unwrap();
        assert_eq!(crs.proj_param("proj"), Some("utm"));
        assert_eq!(crs.proj_param("zone"), Some("11"));
        assert_eq!(crs.proj_param("units"), Some("m"));
        assert_eq!(crs.proj_param("datum"), None);
        assert!(!crs.is_geographic());
        assert!(Crs::wgs84().is_geographic());
    }

    #[test]
    fn test_equivalence_ignores_token_order() {
        let a = Crs::from_proj("+proj=utm +zone=11 +units=m +no_defs").unwrap();
        let b = Crs::from_proj("+zone=11 +proj=utm +units=m").unwrap();
        let c = Crs::from_proj("+proj=utm +zone=12 +units=m").unwrap();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn test_from_proj_rejects_garbage() {
        assert!(Crs::from_proj("not a crs").is_err());
    }
}
