//! QGIS project generation and checking.
//!
//! The project is a plain `.qgs` XML document that references the run's
//! outputs by file name, so the run directory can be moved as a whole.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clip_common::{ClipError, Crs};
use clipper::{ClipOutput, OutputKind, RunSummary};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use tracing::{debug, info};

const QGIS_VERSION: &str = "3.28.0-Firenze";

/// `authid` used when the CRS has no EPSG code.
const USER_AUTHID: &str = "USER:100000";

/// Path of the project file for a run: `<dir>/site_<suffix>.qgs`.
pub fn project_path(dir: &Path, suffix: &str) -> PathBuf {
    dir.join(format!("site_{}.qgs", suffix))
}

/// Write a QGIS project for `run` holding the clipped DEM, the buffer and
/// every clipped layer that kept at least one feature.
pub fn write_qgis_project(run: &RunSummary) -> Result<PathBuf> {
    let raster = geotiff::read_raster(&run.dem.path)?;
    let crs = raster
        .crs()
        .ok_or_else(|| ClipError::MissingCrs(format!("raster {}", run.dem.path.display())))?;

    let mut layers: Vec<&ClipOutput> = vec![&run.dem, &run.buffer];
    layers.extend(run.non_empty_layers());

    let title = format!("site_{}", run.suffix);
    let xml = project_xml(&title, crs, &layers)?;

    let path = project_path(&run.output_dir, &run.suffix);
    fs::write(&path, xml).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), layers = layers.len(), crs = %crs, "Wrote QGIS project");
    Ok(path)
}

fn authid(crs: &Crs) -> String {
    match crs.epsg() {
        Some(code) => format!("EPSG:{}", code),
        None => USER_AUTHID.to_string(),
    }
}

fn layer_id(output: &ClipOutput) -> String {
    format!("{}_layer", output.layer)
}

fn datasource(output: &ClipOutput) -> String {
    output
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| output.path.display().to_string())
}

fn project_xml(title: &str, crs: &Crs, layers: &[&ClipOutput]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.write_event(Event::Start(
        BytesStart::new("qgis").with_attributes([("projectname", title), ("version", QGIS_VERSION)]),
    ))?;
    writer.create_element("title").write_text_content(BytesText::new(title))?;

    writer.write_event(Event::Start(BytesStart::new("projectCrs")))?;
    write_spatialrefsys(&mut writer, crs)?;
    writer.write_event(Event::End(BytesEnd::new("projectCrs")))?;

    writer.write_event(Event::Start(BytesStart::new("layer-tree-group")))?;
    for layer in layers {
        let id = layer_id(layer);
        let source = datasource(layer);
        writer
            .create_element("layer-tree-layer")
            .with_attributes([
                ("id", id.as_str()),
                ("name", layer.layer.as_str()),
                ("source", source.as_str()),
                ("providerKey", provider(layer.kind)),
                ("checked", "Qt::Checked"),
                ("expanded", "1"),
            ])
            .write_empty()?;
    }
    writer.write_event(Event::End(BytesEnd::new("layer-tree-group")))?;

    writer.write_event(Event::Start(BytesStart::new("projectlayers")))?;
    for layer in layers {
        let layer_type = if layer.kind == OutputKind::Raster { "raster" } else { "vector" };
        writer.write_event(Event::Start(BytesStart::new("maplayer").with_attributes([("type", layer_type)])))?;
        writer.create_element("id").write_text_content(BytesText::new(&layer_id(layer)))?;
        writer.create_element("datasource").write_text_content(BytesText::new(&datasource(layer)))?;
        writer.create_element("layername").write_text_content(BytesText::new(&layer.layer))?;
        writer.create_element("provider").write_text_content(BytesText::new(provider(layer.kind)))?;
        writer.write_event(Event::Start(BytesStart::new("srs")))?;
        write_spatialrefsys(&mut writer, crs)?;
        writer.write_event(Event::End(BytesEnd::new("srs")))?;
        writer.write_event(Event::End(BytesEnd::new("maplayer")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("projectlayers")))?;

    writer.write_event(Event::End(BytesEnd::new("qgis")))?;
    Ok(writer.into_inner().into_inner())
}

fn provider(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::Raster => "gdal",
        OutputKind::Buffer | OutputKind::Vector => "ogr",
    }
}

fn write_spatialrefsys<W: std::io::Write>(writer: &mut Writer<W>, crs: &Crs) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("spatialrefsys")))?;
    if let Some(wkt) = crs.definition_wkt() {
        writer.create_element("wkt").write_text_content(BytesText::new(wkt.trim()))?;
    }
    writer.create_element("proj4").write_text_content(BytesText::new(crs.proj()))?;
    writer.create_element("authid").write_text_content(BytesText::new(&authid(crs)))?;
    writer.create_element("description").write_text_content(BytesText::new(&crs.identifier()))?;
    writer.write_event(Event::End(BytesEnd::new("spatialrefsys")))?;
    Ok(())
}

/// Result of reading a project back.
#[derive(Debug, Clone, Serialize)]
pub struct QgisProjectReport {
    pub path: PathBuf,
    pub valid: bool,
    /// `authid` of the project CRS
    pub authid: Option<String>,
    pub datasources: Vec<String>,
    /// Datasources that do not exist next to the project
    pub missing: Vec<String>,
}

/// Check that every `<datasource>` exists relative to the project and the
/// project CRS carries an `authid`.
pub fn validate_qgis_project(path: &Path) -> Result<QgisProjectReport> {
    let xml = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut reader = Reader::from_str(&xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut authid = None;
    let mut datasources = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape()?.trim().to_string();
                match stack.last().map(String::as_str) {
                    Some("datasource") => datasources.push(text),
                    Some("authid") if stack.iter().any(|s| s == "projectCrs") => authid = Some(text),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Error at position {} in {}: {}",
                    reader.buffer_position(),
                    path.display(),
                    e
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    let missing: Vec<String> = datasources.iter().filter(|d| !base.join(d).exists()).cloned().collect();
    let authid = authid.filter(|a| !a.is_empty());
    debug!(path = %path.display(), datasources = datasources.len(), missing = missing.len(), "Checked QGIS project");

    Ok(QgisProjectReport {
        path: path.to_path_buf(),
        valid: authid.is_some() && missing.is_empty() && !datasources.is_empty(),
        authid,
        datasources,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(dir: &Path, name: &str, ext: &str, kind: OutputKind, count: usize) -> ClipOutput {
        let path = dir.join(format!("{}.{}", name, ext));
        fs::write(&path, b"x").unwrap();
        ClipOutput::new(name, path, kind, count)
    }

    #[test]
    fn test_project_xml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let dem = output(dir.path(), "dem_clipped_100m", "tif", OutputKind::Raster, 10);
        let buffer = output(dir.path(), "site_buffer_100m", "geojson", OutputKind::Buffer, 1);
        let crs = Crs::from_epsg(32611).unwrap();

        let xml = project_xml("site_100m", &crs, &[&dem, &buffer]).unwrap();
        let path = dir.path().join("site_100m.qgs");
        fs::write(&path, &xml).unwrap();

        let text = String::from_utf8(xml).unwrap();
        assert!(text.contains("<maplayer type=\"raster\">"));
        assert!(text.contains("<datasource>site_buffer_100m.geojson</datasource>"));

        let report = validate_qgis_project(&path).unwrap();
        assert!(report.valid);
        assert_eq!(report.authid.as_deref(), Some("EPSG:32611"));
        assert_eq!(report.datasources.len(), 2);
    }

    #[test]
    fn test_missing_datasource_detected() {
        let dir = tempfile::tempdir().unwrap();
        let dem = output(dir.path(), "dem_clipped_100m", "tif", OutputKind::Raster, 10);
        let gone = ClipOutput::new("gone", dir.path().join("gone.geojson"), OutputKind::Vector, 3);
        let crs = Crs::from_proj("+proj=utm +zone=11 +datum=WGS84 +units=m +no_defs").unwrap();

        let path = dir.path().join("p.qgs");
        fs::write(&path, project_xml("p", &crs, &[&dem, &gone]).unwrap()).unwrap();

        let report = validate_qgis_project(&path).unwrap();
        assert!(!report.valid);
        assert_eq!(report.authid.as_deref(), Some(USER_AUTHID));
        assert_eq!(report.missing, vec!["gone.geojson"]);
    }
}
