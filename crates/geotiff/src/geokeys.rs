//! GeoKey directory decoding and encoding.
//!
//! The directory is a flat `u16` array: a 4-entry header
//! `[version, revision, minor, key_count]` followed by one
//! `[key_id, tag_location, count, value_or_offset]` quad per key.
//! A location of 0 stores the value inline; otherwise it names the
//! double- or ASCII-params tag holding the value.

use std::collections::BTreeMap;

use clip_common::{Crs, LinearUnit, UnitDeclaration};
use tracing::debug;

use crate::error::GeoTiffError;
use crate::{TAG_GEO_ASCII_PARAMS, TAG_GEO_DOUBLE_PARAMS};

pub const GT_MODEL_TYPE: u16 = 1024;
pub const GT_RASTER_TYPE: u16 = 1025;
pub const GT_CITATION: u16 = 1026;
pub const GEOGRAPHIC_TYPE: u16 = 2048;
pub const PROJECTED_CS_TYPE: u16 = 3072;
pub const PROJ_LINEAR_UNITS: u16 = 3076;
pub const PROJ_LINEAR_UNIT_SIZE: u16 = 3077;

pub const MODEL_TYPE_PROJECTED: u16 = 1;
pub const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
pub const RASTER_PIXEL_IS_AREA: u16 = 1;
pub const RASTER_PIXEL_IS_POINT: u16 = 2;
pub const USER_DEFINED: u16 = 32767;

/// Value of a single GeoKey.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoKeyValue {
    Short(u16),
    Double(Vec<f64>),
    Ascii(String),
}

/// Decoded GeoKey directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoKeyDirectory {
    keys: BTreeMap<u16, GeoKeyValue>,
}

impl GeoKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the directory plus its optional double and ASCII parameter tags.
    pub fn parse(
        directory: &[u16],
        doubles: Option<&[f64]>,
        ascii: Option<&str>,
    ) -> Result<Self, GeoTiffError> {
        if directory.len() < 4 {
            return Err(GeoTiffError::InvalidGeoKeys(format!(
                "header needs 4 entries, found {}",
                directory.len()
            )));
        }

        let key_count = directory[3] as usize;
        let needed = 4 + key_count * 4;
        if directory.len() < needed {
            return Err(GeoTiffError::InvalidGeoKeys(format!(
                "{} keys declared but directory has {} entries",
                key_count,
                directory.len()
            )));
        }

        let mut keys = BTreeMap::new();
        for entry in directory[4..needed].chunks_exact(4) {
            let (key_id, location, count, value) = (entry[0], entry[1], entry[2] as usize, entry[3] as usize);

            let decoded = match location {
                0 => GeoKeyValue::Short(entry[3]),
                TAG_GEO_DOUBLE_PARAMS => {
                    let params = doubles.unwrap_or_default();
                    let slice = params.get(value..value + count).ok_or_else(|| {
                        GeoTiffError::InvalidGeoKeys(format!("key {} points past double params", key_id))
                    })?;
                    GeoKeyValue::Double(slice.to_vec())
                }
                TAG_GEO_ASCII_PARAMS => {
                    let params = ascii.unwrap_or_default();
                    let text = params.get(value..value + count).ok_or_else(|| {
                        GeoTiffError::InvalidGeoKeys(format!("key {} points past ASCII params", key_id))
                    })?;
                    GeoKeyValue::Ascii(text.trim_end_matches(['|', '\0']).to_string())
                }
                other => {
                    debug!(key_id, location = other, "Skipping GeoKey stored in unknown tag");
                    continue;
                }
            };
            keys.insert(key_id, decoded);
        }

        Ok(Self { keys })
    }

    pub fn get(&self, key: u16) -> Option<&GeoKeyValue> {
        self.keys.get(&key)
    }

    pub fn short(&self, key: u16) -> Option<u16> {
        match self.keys.get(&key)? {
            GeoKeyValue::Short(v) => Some(*v),
            _ => None,
        }
    }

    pub fn double(&self, key: u16) -> Option<f64> {
        match self.keys.get(&key)? {
            GeoKeyValue::Double(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn ascii(&self, key: u16) -> Option<&str> {
        match self.keys.get(&key)? {
            GeoKeyValue::Ascii(s) => Some(s),
            _ => None,
        }
    }

    pub fn set(&mut self, key: u16, value: GeoKeyValue) {
        self.keys.insert(key, value);
    }

    /// Unit declared by `ProjLinearUnitsGeoKey`, or by
    /// `ProjLinearUnitSizeGeoKey` when the former is user-defined.
    pub fn linear_unit(&self) -> Option<UnitDeclaration> {
        match self.short(PROJ_LINEAR_UNITS) {
            Some(USER_DEFINED) | None => self.double(PROJ_LINEAR_UNIT_SIZE).map(UnitDeclaration::Factor),
            Some(code) => Some(UnitDeclaration::EpsgCode(code)),
        }
    }

    /// Resolve the CRS described by the directory.
    ///
    /// A user-defined projected system is accepted when its citation holds
    /// a PROJ definition, which is what [`GeoKeyDirectory::from_crs`] writes.
    pub fn crs(&self) -> Result<Option<Crs>, GeoTiffError> {
        let code = match self.short(PROJECTED_CS_TYPE) {
            Some(code) if code != USER_DEFINED && code != 0 => Some(code),
            _ => match self.short(GEOGRAPHIC_TYPE) {
                Some(code) if code != USER_DEFINED && code != 0 => Some(code),
                _ => None,
            },
        };

        let crs = match code {
            Some(code) => Some(
                Crs::from_epsg(u32::from(code)).map_err(|e| GeoTiffError::UnsupportedCrs(e.to_string()))?,
            ),
            None => match self.ascii(GT_CITATION) {
                Some(citation) if citation.trim_start().starts_with("+proj=") => Some(
                    Crs::from_proj(citation).map_err(|e| GeoTiffError::UnsupportedCrs(e.to_string()))?,
                ),
                _ => None,
            },
        };

        Ok(crs.map(|crs| match self.linear_unit() {
            Some(unit) => crs.with_declared_unit(unit),
            None => crs,
        }))
    }

    /// Build the directory for a raster in `crs`.
    pub fn from_crs(crs: &Crs) -> Self {
        let mut dir = Self::new();
        let geographic = crs.is_geographic();
        dir.set(
            GT_MODEL_TYPE,
            GeoKeyValue::Short(if geographic { MODEL_TYPE_GEOGRAPHIC } else { MODEL_TYPE_PROJECTED }),
        );
        dir.set(GT_RASTER_TYPE, GeoKeyValue::Short(RASTER_PIXEL_IS_AREA));

        let code = crs.epsg().and_then(|c| u16::try_from(c).ok());
        let type_key = if geographic { GEOGRAPHIC_TYPE } else { PROJECTED_CS_TYPE };
        match code {
            Some(code) => dir.set(type_key, GeoKeyValue::Short(code)),
            None => {
                dir.set(type_key, GeoKeyValue::Short(USER_DEFINED));
                dir.set(GT_CITATION, GeoKeyValue::Ascii(crs.proj().to_string()));
            }
        }

        match crs.declared_unit() {
            Some(UnitDeclaration::EpsgCode(code)) => dir.set(PROJ_LINEAR_UNITS, GeoKeyValue::Short(code)),
            Some(UnitDeclaration::Factor(factor)) => match LinearUnit::from_factor(factor) {
                Some(unit) => dir.set(PROJ_LINEAR_UNITS, GeoKeyValue::Short(unit.epsg_code())),
                None => {
                    dir.set(PROJ_LINEAR_UNITS, GeoKeyValue::Short(USER_DEFINED));
                    dir.set(PROJ_LINEAR_UNIT_SIZE, GeoKeyValue::Double(vec![factor]));
                }
            },
            None => {}
        }

        dir
    }

    /// Encode as (directory, double params, ASCII params).
    pub fn encode(&self) -> (Vec<u16>, Vec<f64>, String) {
        let mut directory = vec![1, 1, 0, self.keys.len() as u16];
        let mut doubles = Vec::new();
        let mut ascii = String::new();

        for (&key, value) in &self.keys {
            match value {
                GeoKeyValue::Short(v) => directory.extend_from_slice(&[key, 0, 1, *v]),
                GeoKeyValue::Double(values) => {
                    directory.extend_from_slice(&[
                        key,
                        TAG_GEO_DOUBLE_PARAMS,
                        values.len() as u16,
                        doubles.len() as u16,
                    ]);
                    doubles.extend_from_slice(values);
                }
                GeoKeyValue::Ascii(text) => {
                    let offset = ascii.len() as u16;
                    ascii.push_str(text);
                    ascii.push('|');
                    directory.extend_from_slice(&[
                        key,
                        TAG_GEO_ASCII_PARAMS,
                        (text.len() + 1) as u16,
                        offset,
                    ]);
                }
            }
        }

        (directory, doubles, ascii)
    }
}
