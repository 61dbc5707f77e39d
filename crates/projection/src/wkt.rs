//! WKT inspection.
//!
//! Unit reconciliation only needs the root keyword and the nodes directly
//! beneath it. Nested nodes (datum, spheroid, the geographic base of a
//! projected CRS) are skipped, so the `UNIT` found there is the axis unit
//! of the outermost system.
//!
//! Shapefile `.prj` sidecars carry WKT1 instead of an EPSG code, so
//! [`crs_from_wkt`] also parses the full node tree and rebuilds a PROJ
//! definition for the common projections.

use clip_common::{Crs, UnitDeclaration};

use crate::error::ProjectionError;

/// A `UNIT["name", factor]` node.
#[derive(Debug, Clone, PartialEq)]
pub struct WktUnit {
    pub name: String,
    pub factor: f64,
}

/// Keyword of the outermost node, e.g. `PROJCS` or `GEOGCS`.
pub fn root_keyword(wkt: &str) -> Option<&str> {
    let open = wkt.find(['[', '('])?;
    let keyword = wkt[..open].trim();
    (!keyword.is_empty()).then_some(keyword)
}

/// (keyword, content) of every node directly under the root.
pub fn top_level_nodes(wkt: &str) -> Vec<(&str, &str)> {
    let mut nodes = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut keyword_start = 0usize;
    let mut open: Option<(usize, usize)> = None;

    for (i, c) in wkt.char_indices() {
        if c == '"' {
            in_quote = !in_quote;
            continue;
        }
        if in_quote {
            continue;
        }
        match c {
            '[' | '(' => {
                depth += 1;
                if depth == 1 {
                    keyword_start = i + 1;
                } else if depth == 2 {
                    open = Some((keyword_start, i));
                }
            }
            ']' | ')' => {
                if depth == 2 {
                    if let Some((kw, bracket)) = open.take() {
                        nodes.push((wkt[kw..bracket].trim(), &wkt[bracket + 1..i]));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            ',' if depth == 1 => keyword_start = i + 1,
            _ => {}
        }
    }

    nodes
}

/// The last `UNIT`/`LENGTHUNIT`/`ANGLEUNIT` node directly under the root.
pub fn outermost_unit(wkt: &str) -> Option<WktUnit> {
    top_level_nodes(wkt)
        .into_iter()
        .filter(|(kw, _)| {
            let kw = kw.to_ascii_uppercase();
            kw == "UNIT" || kw == "LENGTHUNIT" || kw == "ANGLEUNIT"
        })
        .last()
        .and_then(|(_, content)| parse_unit(content))
}

fn parse_unit(content: &str) -> Option<WktUnit> {
    let mut parts = content.splitn(3, ',');
    let name = parts.next()?.trim().trim_matches('"').to_string();
    let factor = parts.next()?.trim().parse::<f64>().ok()?;
    Some(WktUnit { name, factor })
}

/// A parsed WKT node: `KEYWORD[value, value, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub values: Vec<WktValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Text(String),
    Number(f64),
    /// Bare enumeration such as `EAST` in `AXIS["X",EAST]`
    Word(String),
    Node(WktNode),
}

impl WktNode {
    /// Parse a complete WKT string. Trailing text after the root is ignored.
    pub fn parse(wkt: &str) -> Option<Self> {
        let mut cursor = Cursor { bytes: wkt.as_bytes(), text: wkt, pos: 0 };
        cursor.node()
    }

    /// First child node named `keyword`, compared case-insensitively.
    pub fn child(&self, keyword: &str) -> Option<&WktNode> {
        self.children(keyword).next()
    }

    pub fn children<'a, 'k>(&'a self, keyword: &'k str) -> impl Iterator<Item = &'a WktNode> + use<'a, 'k> {
        self.values.iter().filter_map(move |v| match v {
            WktValue::Node(node) if node.keyword.eq_ignore_ascii_case(keyword) => Some(node),
            _ => None,
        })
    }

    /// The leading quoted name, e.g. `"NAD83"` in `GEOGCS["NAD83",...]`.
    pub fn name(&self) -> Option<&str> {
        match self.values.first() {
            Some(WktValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// The `index`-th numeric value, skipping names and child nodes.
    /// Quoted numbers count, as some writers quote authority codes.
    pub fn number(&self, index: usize) -> Option<f64> {
        self.values
            .iter()
            .filter_map(|v| match v {
                WktValue::Number(n) => Some(*n),
                WktValue::Text(t) => t.trim().parse().ok(),
                _ => None,
            })
            .nth(index)
    }

    /// EPSG code from a direct `AUTHORITY["EPSG", code]` child.
    pub fn epsg_code(&self) -> Option<u32> {
        let authority = self.child("AUTHORITY").or_else(|| self.child("ID"))?;
        if !authority.name()?.eq_ignore_ascii_case("EPSG") {
            return None;
        }
        let code = authority.number(0)?;
        (code.fract() == 0.0 && code > 0.0).then_some(code as u32)
    }

    /// Value of the first `PARAMETER` whose lower-cased name is in `names`.
    fn parameter(&self, names: &[&str]) -> Option<f64> {
        self.children("PARAMETER").find_map(|p| {
            let name = p.name()?.to_ascii_lowercase();
            if names.contains(&name.as_str()) {
                p.number(0)
            } else {
                None
            }
        })
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn word(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .map(|b| b.is_ascii_alphanumeric() || b == b'_')
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn node(&mut self) -> Option<WktNode> {
        self.skip_ws();
        let keyword = self.word().to_string();
        if keyword.is_empty() {
            return None;
        }
        self.skip_ws();
        if !matches!(self.peek(), Some(b'[' | b'(')) {
            return None;
        }
        self.pos += 1;
        let values = self.values()?;
        Some(WktNode { keyword, values })
    }

    fn values(&mut self) -> Option<Vec<WktValue>> {
        let mut values = Vec::new();
        loop {
            self.skip_ws();
            match self.peek()? {
                b']' | b')' => {
                    self.pos += 1;
                    return Some(values);
                }
                b',' => self.pos += 1,
                b'"' => values.push(WktValue::Text(self.quoted()?)),
                b'-' | b'+' | b'.' | b'0'..=b'9' => values.push(WktValue::Number(self.number()?)),
                _ => {
                    let start = self.pos;
                    let word = self.word();
                    if word.is_empty() {
                        return None;
                    }
                    self.skip_ws();
                    if matches!(self.peek(), Some(b'[' | b'(')) {
                        self.pos = start;
                        values.push(WktValue::Node(self.node()?));
                    } else {
                        values.push(WktValue::Word(word.to_string()));
                    }
                }
            }
        }
    }

    /// Quoted text; a doubled quote stands for a literal one.
    fn quoted(&mut self) -> Option<String> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            let rest = &self.text[self.pos..];
            let end = rest.find('"')?;
            out.push_str(&rest[..end]);
            self.pos += end + 1;
            if self.peek() == Some(b'"') {
                out.push('"');
                self.pos += 1;
            } else {
                return Some(out);
            }
        }
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        while self
            .peek()
            .map(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        self.text[start..self.pos].parse().ok()
    }
}

/// Resolve a WKT1 definition, as found in a shapefile `.prj`, into a [`Crs`].
///
/// A root `AUTHORITY["EPSG", code]` wins when the code is known. Otherwise
/// geographic systems and Transverse Mercator, Lambert Conformal Conic,
/// Albers and Mercator projections are rebuilt as PROJ strings, with the
/// outermost `UNIT` attached as the declared linear unit.
pub fn crs_from_wkt(wkt: &str) -> Result<Crs, ProjectionError> {
    let root = WktNode::parse(wkt).ok_or_else(|| invalid(wkt, "not a WKT definition".to_string()))?;
    let label = root.name().unwrap_or(&root.keyword).to_string();

    if let Some(code) = root.epsg_code() {
        if let Ok(crs) = Crs::from_epsg(code) {
            return Ok(crs);
        }
    }

    let keyword = root.keyword.to_ascii_uppercase();
    let (definition, unit) = match keyword.as_str() {
        "GEOGCS" => (format!("+proj=longlat {}", datum_params(&root, &label)?), None),
        "PROJCS" => {
            let (definition, factor) = projected_params(&root, &label)?;
            (definition, Some(factor))
        }
        other => return Err(invalid(&label, format!("unsupported WKT root '{}'", other))),
    };

    let crs = Crs::from_proj(&format!("{} +no_defs", definition)).map_err(|e| invalid(&label, e.to_string()))?;
    Ok(match unit {
        Some(factor) => crs.with_declared_unit(UnitDeclaration::Factor(factor)),
        None => crs,
    })
}

fn invalid(crs: &str, message: String) -> ProjectionError {
    ProjectionError::InvalidProjection {
        crs: crs.to_string(),
        message,
    }
}

/// Ellipsoid and datum shift of a `GEOGCS` node.
fn datum_params(geogcs: &WktNode, label: &str) -> Result<String, ProjectionError> {
    let datum = geogcs
        .child("DATUM")
        .ok_or_else(|| invalid(label, "GEOGCS has no DATUM".to_string()))?;
    let datum_name = datum
        .name()
        .unwrap_or_default()
        .to_ascii_lowercase()
        .replace(' ', "_");
    let datum_name = datum_name.strip_prefix("d_").unwrap_or(&datum_name);

    let mut params = if matches!(datum_name, "wgs_1984" | "world_geodetic_system_1984" | "wgs84") {
        "+datum=WGS84".to_string()
    } else {
        let spheroid = datum
            .child("SPHEROID")
            .or_else(|| datum.child("ELLIPSOID"))
            .ok_or_else(|| invalid(label, "DATUM has no SPHEROID".to_string()))?;
        let a = spheroid
            .number(0)
            .ok_or_else(|| invalid(label, "SPHEROID has no semi-major axis".to_string()))?;
        let rf = spheroid.number(1).unwrap_or(0.0);
        let mut params = if rf == 0.0 {
            format!("+R={}", a)
        } else {
            format!("+a={} +rf={}", a, rf)
        };

        if let Some(shift) = datum.child("TOWGS84") {
            let values: Vec<String> = (0..7).filter_map(|i| shift.number(i)).map(|v| v.to_string()).collect();
            params.push_str(&format!(" +towgs84={}", values.join(",")));
        } else if matches!(datum_name, "north_american_1983" | "north_american_datum_1983") {
            params.push_str(" +towgs84=0,0,0,0,0,0,0");
        }
        params
    };

    if let Some(pm) = geogcs.child("PRIMEM").and_then(|p| p.number(0)) {
        if pm != 0.0 {
            params.push_str(&format!(" +pm={}", pm));
        }
    }
    Ok(params)
}

/// PROJ parameters of a `PROJCS` node and its meters-per-unit factor.
fn projected_params(projcs: &WktNode, label: &str) -> Result<(String, f64), ProjectionError> {
    let geogcs = projcs
        .child("GEOGCS")
        .ok_or_else(|| invalid(label, "PROJCS has no GEOGCS".to_string()))?;
    let method = projcs
        .child("PROJECTION")
        .and_then(|p| p.name())
        .ok_or_else(|| invalid(label, "PROJCS has no PROJECTION".to_string()))?
        .to_ascii_lowercase();

    let factor = projcs.child("UNIT").and_then(|u| u.number(0)).unwrap_or(1.0);
    let p = |names: &[&str]| projcs.parameter(names);
    let lat_0 = p(&["latitude_of_origin", "latitude_of_center"]).unwrap_or(0.0);
    let lon_0 = p(&["central_meridian", "longitude_of_center", "longitude_of_origin"]).unwrap_or(0.0);
    let k = p(&["scale_factor"]).unwrap_or(1.0);
    let sp1 = p(&["standard_parallel_1"]);
    let sp2 = p(&["standard_parallel_2"]);

    let projection = match method.as_str() {
        "transverse_mercator" => format!("+proj=tmerc +lat_0={} +lon_0={} +k={}", lat_0, lon_0, k),
        "lambert_conformal_conic_1sp" => {
            format!("+proj=lcc +lat_1={} +lat_0={} +lon_0={} +k={}", lat_0, lat_0, lon_0, k)
        }
        "lambert_conformal_conic_2sp" | "lambert_conformal_conic" => match sp1 {
            Some(lat_1) => format!(
                "+proj=lcc +lat_1={} +lat_2={} +lat_0={} +lon_0={}",
                lat_1,
                sp2.unwrap_or(lat_1),
                lat_0,
                lon_0
            ),
            None => format!("+proj=lcc +lat_1={} +lat_0={} +lon_0={} +k={}", lat_0, lat_0, lon_0, k),
        },
        "albers_conic_equal_area" | "albers" => {
            let lat_1 = sp1.ok_or_else(|| invalid(label, "Albers needs standard_parallel_1".to_string()))?;
            format!(
                "+proj=aea +lat_1={} +lat_2={} +lat_0={} +lon_0={}",
                lat_1,
                sp2.unwrap_or(lat_1),
                lat_0,
                lon_0
            )
        }
        "mercator_1sp" | "mercator_2sp" | "mercator" => match sp1 {
            Some(lat_ts) => format!("+proj=merc +lat_ts={} +lon_0={}", lat_ts, lon_0),
            None => format!("+proj=merc +lon_0={} +k={}", lon_0, k),
        },
        other => return Err(invalid(label, format!("unsupported projection '{}'", other))),
    };

    // false origin is given in CRS units, PROJ wants meters
    let x_0 = p(&["false_easting"]).unwrap_or(0.0) * factor;
    let y_0 = p(&["false_northing"]).unwrap_or(0.0) * factor;

    let definition = format!(
        "{} +x_0={} +y_0={} {} {}",
        projection,
        x_0,
        y_0,
        datum_params(geogcs, label)?,
        units_param(factor)
    );
    Ok((definition, factor))
}

/// WKT1 for a CRS, as written to a shapefile `.prj`.
///
/// EPSG codes use their bundled definition. Other systems are rebuilt from
/// the PROJ parameters that [`crs_from_wkt`] reads back.
pub fn crs_to_wkt(crs: &Crs) -> Result<String, ProjectionError> {
    if let Some(wkt) = crs.definition_wkt() {
        return Ok(wkt.to_string());
    }

    let label = crs.identifier();
    let number = |key: &str| -> Result<Option<f64>, ProjectionError> {
        crs.proj_param(key)
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| invalid(&label, format!("+{}={} is not a number", key, v)))
            })
            .transpose()
    };

    let geogcs = geogcs_wkt(crs, &label)?;
    if crs.is_geographic() {
        return Ok(geogcs);
    }

    let (unit_name, factor) = match (crs.proj_param("units"), number("to_meter")?) {
        (_, Some(factor)) => ("unknown", factor),
        (None | Some("m"), None) => ("metre", 1.0),
        (Some("us-ft"), None) => ("US survey foot", 1200.0 / 3937.0),
        (Some("ft"), None) => ("foot", 0.3048),
        (Some(other), None) => return Err(invalid(&label, format!("unsupported unit '{}'", other))),
    };

    let lat_0 = number("lat_0")?.unwrap_or(0.0);
    let lon_0 = number("lon_0")?.unwrap_or(0.0);
    let k = match number("k_0")? {
        Some(k) => k,
        None => number("k")?.unwrap_or(1.0),
    };
    let mut x_0 = number("x_0")?.unwrap_or(0.0);
    let mut y_0 = number("y_0")?.unwrap_or(0.0);

    let (method, mut params) = match crs.proj_param("proj").unwrap_or_default() {
        "utm" => {
            let zone = number("zone")?
                .filter(|z| (1.0..=60.0).contains(z))
                .ok_or_else(|| invalid(&label, "UTM needs +zone=1..60".to_string()))?;
            x_0 = 500_000.0;
            if crs.proj().split_whitespace().any(|t| t == "+south") {
                y_0 = 10_000_000.0;
            }
            (
                "Transverse_Mercator",
                vec![
                    ("latitude_of_origin", 0.0),
                    ("central_meridian", zone * 6.0 - 183.0),
                    ("scale_factor", 0.9996),
                ],
            )
        }
        "tmerc" => (
            "Transverse_Mercator",
            vec![("latitude_of_origin", lat_0), ("central_meridian", lon_0), ("scale_factor", k)],
        ),
        "lcc" => {
            let lat_1 = number("lat_1")?.unwrap_or(lat_0);
            match number("lat_2")? {
                Some(lat_2) => (
                    "Lambert_Conformal_Conic_2SP",
                    vec![
                        ("standard_parallel_1", lat_1),
                        ("standard_parallel_2", lat_2),
                        ("latitude_of_origin", lat_0),
                        ("central_meridian", lon_0),
                    ],
                ),
                None => (
                    "Lambert_Conformal_Conic_1SP",
                    vec![("latitude_of_origin", lat_1), ("central_meridian", lon_0), ("scale_factor", k)],
                ),
            }
        }
        "aea" => {
            let lat_1 = number("lat_1")?.unwrap_or(lat_0);
            (
                "Albers_Conic_Equal_Area",
                vec![
                    ("standard_parallel_1", lat_1),
                    ("standard_parallel_2", number("lat_2")?.unwrap_or(lat_1)),
                    ("latitude_of_center", lat_0),
                    ("longitude_of_center", lon_0),
                ],
            )
        }
        "merc" => match number("lat_ts")? {
            Some(lat_ts) => ("Mercator_2SP", vec![("standard_parallel_1", lat_ts), ("central_meridian", lon_0)]),
            None => ("Mercator_1SP", vec![("central_meridian", lon_0), ("scale_factor", k)]),
        },
        other => return Err(invalid(&label, format!("projection '{}' has no WKT form", other))),
    };
    params.push(("false_easting", x_0 / factor));
    params.push(("false_northing", y_0 / factor));

    let params: Vec<String> = params
        .iter()
        .map(|(name, value)| format!("PARAMETER[\"{}\",{}]", name, value))
        .collect();
    Ok(format!(
        "PROJCS[\"{}\",{},PROJECTION[\"{}\"],{},UNIT[\"{}\",{}]]",
        label,
        geogcs,
        method,
        params.join(","),
        unit_name,
        factor
    ))
}

fn geogcs_wkt(crs: &Crs, label: &str) -> Result<String, ProjectionError> {
    let number = |key: &str| crs.proj_param(key).and_then(|v| v.parse::<f64>().ok());
    let named = |datum: &str, spheroid: &str, a: f64, rf: f64| {
        (datum.to_string(), format!("SPHEROID[\"{}\",{},{}]", spheroid, a, rf))
    };

    let (datum, spheroid) = match (crs.proj_param("datum"), crs.proj_param("ellps")) {
        (Some("WGS84"), _) => named("WGS_1984", "WGS_1984", 6_378_137.0, 298.257223563),
        (Some("NAD83"), _) => named("North_American_Datum_1983", "GRS_1980", 6_378_137.0, 298.257222101),
        (_, Some("GRS80")) => named("unknown", "GRS_1980", 6_378_137.0, 298.257222101),
        (_, Some("WGS84")) => named("unknown", "WGS_1984", 6_378_137.0, 298.257223563),
        (_, Some("clrk66")) => named("unknown", "Clarke_1866", 6_378_206.4, 294.978_698_2),
        _ => match (number("a"), number("rf"), number("b"), number("R")) {
            (Some(a), Some(rf), _, _) => named("unknown", "unknown", a, rf),
            (Some(a), None, Some(b), _) if a > b => named("unknown", "unknown", a, a / (a - b)),
            (_, _, _, Some(r)) => named("unknown", "sphere", r, 0.0),
            _ => return Err(invalid(label, "no ellipsoid in PROJ definition".to_string())),
        },
    };

    let shift = crs
        .proj_param("towgs84")
        .map(|v| format!(",TOWGS84[{}]", v))
        .unwrap_or_default();
    let primem = number("pm").unwrap_or(0.0);
    Ok(format!(
        "GEOGCS[\"{}\",DATUM[\"{}\",{}{}],PRIMEM[\"Greenwich\",{}],UNIT[\"degree\",0.0174532925199433]]",
        label, datum, spheroid, shift, primem
    ))
}

fn units_param(factor: f64) -> String {
    const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;
    if (factor - 1.0).abs() < 1e-12 {
        "+units=m".to_string()
    } else if (factor - US_SURVEY_FOOT).abs() < 1e-12 {
        "+units=us-ft".to_string()
    } else if (factor - 0.3048).abs() < 1e-12 {
        "+units=ft".to_string()
    } else {
        format!("+to_meter={}", factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::crs::CA_ZONE5_FTUS_ESRI_WKT as ESRI_CA_ZONE5_FEET;

    const CA_ZONE5_FTUS: &str = r#"PROJCS["NAD83 / California zone 5 (ftUS)",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic_2SP"],PARAMETER["latitude_of_origin",33.5],PARAMETER["central_meridian",-118],UNIT["US survey foot",0.3048006096012192],AXIS["Easting",EAST],AXIS["Northing",NORTH]]"#;

    #[test]
    fn test_root_keyword() {
        assert_eq!(root_keyword(CA_ZONE5_FTUS), Some("PROJCS"));
        assert_eq!(root_keyword("no brackets"), None);
    }

    #[test]
    fn test_outermost_unit_skips_geographic_base() {
        let unit = outermost_unit(CA_ZONE5_FTUS).unwrap();
        assert_eq!(unit.name, "US survey foot");
        assert!((unit.factor - 0.3048006096012192).abs() < 1e-15);
    }

    #[test]
    fn test_geographic_unit() {
        let wkt = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#;
        let unit = outermost_unit(wkt).unwrap();
        assert_eq!(unit.name, "degree");
    }

    #[test]
    fn test_top_level_nodes() {
        let nodes = top_level_nodes(r#"PROJCS["x",GEOGCS["g",UNIT["degree",1]],UNIT["metre",1]]"#);
        let keywords: Vec<&str> = nodes.iter().map(|(k, _)| *k).collect();
        assert_eq!(keywords, vec!["GEOGCS", "UNIT"]);
    }

    #[test]
    fn test_node_tree() {
        let node = WktNode::parse(r#"LOCAL_CS["say ""hi""",AXIS["X",EAST],UNIT["metre",1,AUTHORITY["EPSG","9001"]]]"#).unwrap();
        assert_eq!(node.keyword, "LOCAL_CS");
        assert_eq!(node.name(), Some(r#"say "hi""#));
        assert_eq!(
            node.child("axis").unwrap().values,
            vec![WktValue::Text("X".to_string()), WktValue::Word("EAST".to_string())]
        );
        let unit = node.child("UNIT").unwrap();
        assert_eq!(unit.number(0), Some(1.0));
        assert_eq!(unit.epsg_code(), Some(9001));
        assert!(WktNode::parse("PROJCS[\"unterminated\"").is_none());
    }

    #[test]
    fn test_crs_from_wkt_prefers_authority() {
        let epsg = Crs::from_epsg(2229).unwrap();
        let crs = crs_from_wkt(epsg.definition_wkt().unwrap()).unwrap();
        assert_eq!(crs.epsg(), Some(2229));
    }

    #[test]
    fn test_esri_state_plane_matches_epsg() {
        let crs = crs_from_wkt(ESRI_CA_ZONE5_FEET).unwrap();
        assert_eq!(crs.epsg(), None);
        assert_eq!(crs.proj_param("proj"), Some("lcc"));
        assert_eq!(crs.proj_param("units"), Some("us-ft"));
        assert_eq!(crs.declared_unit(), Some(UnitDeclaration::Factor(0.3048006096012192)));
        let x_0: f64 = crs.proj_param("x_0").unwrap().parse().unwrap();
        assert!((x_0 - 2_000_000.0).abs() < 1e-3);

        let from_prj = crate::CoordTransformer::from_wgs84(&crs).unwrap();
        let from_epsg = crate::CoordTransformer::from_wgs84(&Crs::from_epsg(2229).unwrap()).unwrap();
        let (ax, ay) = from_prj.transform(-118.2437, 34.0522).unwrap();
        let (bx, by) = from_epsg.transform(-118.2437, 34.0522).unwrap();
        assert!((ax - bx).abs() < 1e-2, "{} vs {}", ax, bx);
        assert!((ay - by).abs() < 1e-2, "{} vs {}", ay, by);
    }

    #[test]
    fn test_esri_geographic() {
        let wkt = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        let crs = crs_from_wkt(wkt).unwrap();
        assert!(crs.is_geographic());
        assert!(crs.is_equivalent(&Crs::wgs84()));
    }

    #[test]
    fn test_unsupported_projection() {
        let wkt = ESRI_CA_ZONE5_FEET.replace("Lambert_Conformal_Conic", "Krovak");
        assert!(matches!(
            crs_from_wkt(&wkt),
            Err(ProjectionError::InvalidProjection { ref message, .. }) if message.contains("krovak")
        ));
        assert!(crs_from_wkt("not wkt").is_err());
    }

    #[test]
    fn test_prj_round_trip_for_proj_only_crs() {
        for definition in [
            "+proj=lcc +lat_1=35.46666666666667 +lat_2=34.03333333333333 +lat_0=33.5 +lon_0=-118 +x_0=2000000.0001016 +y_0=500000.0001016001 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=us-ft +no_defs",
            "+proj=utm +zone=11 +datum=WGS84 +units=m +no_defs",
        ] {
            let crs = Crs::from_proj(definition).unwrap();
            let wkt = crs_to_wkt(&crs).unwrap();
            assert_eq!(root_keyword(&wkt), Some("PROJCS"));
            let restored = crs_from_wkt(&wkt).unwrap();

            let (ax, ay) = crate::CoordTransformer::from_wgs84(&crs).unwrap().transform(-118.2437, 34.0522).unwrap();
            let (bx, by) = crate::CoordTransformer::from_wgs84(&restored).unwrap().transform(-118.2437, 34.0522).unwrap();
            assert!((ax - bx).abs() < 1e-3 && (ay - by).abs() < 1e-3, "{}: ({}, {}) vs ({}, {})", definition, ax, ay, bx, by);
        }
    }

    #[test]
    fn test_epsg_crs_writes_bundled_wkt() {
        let crs = Crs::from_epsg(32611).unwrap();
        assert_eq!(crs_to_wkt(&crs).unwrap(), crs.definition_wkt().unwrap());
        let odd = Crs::from_proj("+proj=robin +lon_0=0 +datum=WGS84").unwrap();
        assert!(crs_to_wkt(&odd).is_err());
    }
}
