//! Console reports.

use std::path::Path;

use anyhow::Result;
use clipper::{OutputLayout, RunSpec, RunSummary};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::qgis::QgisProjectReport;
use crate::validation::{
    validate_buffer, validate_clipped_layers, validate_dem_output, BufferReport, DemAssetReport, DemOutputReport,
    LayerAssetReport, LayerCounts, SiteAssetReport,
};

/// Output checks for one run directory.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub label: String,
    pub suffix: String,
    pub dem: DemOutputReport,
    pub buffer: BufferReport,
    pub layers: LayerCounts,
}

impl RunReport {
    pub fn is_valid(&self) -> bool {
        self.dem.valid && self.buffer.valid
    }
}

/// Re-read the outputs of `run` and check them.
pub fn validate_run_outputs(run: &RunSpec) -> Result<RunReport> {
    let layout = OutputLayout::for_run(run);
    Ok(RunReport {
        label: run.label.clone(),
        suffix: layout.suffix().to_string(),
        dem: validate_dem_output(&layout.dem_path())?,
        buffer: validate_buffer(&layout.buffer_path(), run.radius_m)?,
        layers: validate_clipped_layers(layout.dir(), layout.suffix())?,
    })
}

fn status(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "FAIL"
    }
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

/// Per-run, per-output summary of a pipeline run.
pub fn format_run_summaries(summaries: &[RunSummary]) -> String {
    let mut table = table(vec!["Run", "Output", "Kind", "Count", "Path"]);

    for run in summaries {
        for output in run.outputs() {
            let count = if output.is_empty() {
                "0 (empty)".to_string()
            } else {
                output.count.to_string()
            };
            table.add_row(vec![
                format!("{} ({})", run.label, run.suffix),
                output.layer.clone(),
                output.kind.to_string(),
                count,
                output.path.display().to_string(),
            ]);
        }
        table.add_row(vec![
            String::new(),
            "raster coverage".to_string(),
            String::new(),
            format!("{:.1}%", run.raster_coverage * 100.0),
            String::new(),
        ]);
    }

    table.to_string()
}

/// Input asset checks.
pub fn format_asset_report(dem: &DemAssetReport, site: &SiteAssetReport, layers: &LayerAssetReport) -> String {
    let mut table = table(vec!["Check", "Status", "Detail"]);

    let dem_detail = match &dem.error {
        Some(error) => error.clone(),
        None => format!(
            "{} {}x{}, has data: {}",
            dem.crs.as_deref().unwrap_or("-"),
            dem.width,
            dem.height,
            dem.has_data
        ),
    };
    table.add_row(vec![
        format!("DEM {}", file_label(&dem.path)),
        status(dem.valid).to_string(),
        dem_detail,
    ]);

    let (site_status, site_detail) = match (&site.error, site.site, site.inside_raster) {
        (Some(error), _, _) => ("FAIL", error.clone()),
        (None, Some(coord), Some(false)) => ("WARN", format!("{} lies outside the DEM extent", coord)),
        (None, Some(coord), Some(true)) => ("OK", format!("{} inside the DEM extent", coord)),
        (None, Some(coord), None) => ("OK", coord.to_string()),
        (None, None, _) => (status(site.valid), String::new()),
    };
    table.add_row(vec![
        format!("Site {}", file_label(&site.path)),
        site_status.to_string(),
        site_detail,
    ]);

    table.add_row(vec![
        format!("Layers {}", layers.dir.display()),
        status(layers.valid).to_string(),
        format!("{} found, {} with CRS", layers.count, layers.with_crs),
    ]);
    for name in &layers.missing_crs {
        table.add_row(vec![format!("  {}", name), "FAIL".to_string(), "no CRS".to_string()]);
    }
    for (name, reason) in &layers.unreadable {
        table.add_row(vec![format!("  {}", name), "FAIL".to_string(), reason.clone()]);
    }

    table.to_string()
}

/// Output checks, plus the QGIS project when one was checked.
pub fn format_output_report(runs: &[RunReport], project: Option<&QgisProjectReport>) -> String {
    let mut table = table(vec!["Run", "Check", "Status", "Detail"]);

    for run in runs {
        let label = format!("{} ({})", run.label, run.suffix);
        table.add_row(vec![
            label.clone(),
            "DEM".to_string(),
            status(run.dem.valid).to_string(),
            format!(
                "{}x{} px, extent {:.2} x {:.2}, {} bytes",
                run.dem.width, run.dem.height, run.dem.extent.0, run.dem.extent.1, run.dem.size_bytes
            ),
        ]);
        table.add_row(vec![
            label.clone(),
            "Buffer".to_string(),
            status(run.buffer.valid).to_string(),
            format!(
                "radius {:.2} m (expected {} m, diff {:.2} m)",
                run.buffer.actual_radius_m, run.buffer.expected_radius_m, run.buffer.radius_diff
            ),
        ]);
        table.add_row(vec![
            label,
            "Layers".to_string(),
            "-".to_string(),
            format!(
                "{} with data, {} empty, {} total",
                run.layers.with_data, run.layers.empty, run.layers.total
            ),
        ]);
    }

    if let Some(project) = project {
        let detail = if project.missing.is_empty() {
            format!(
                "{} datasources, CRS {}",
                project.datasources.len(),
                project.authid.as_deref().unwrap_or("missing")
            )
        } else {
            format!("missing: {}", project.missing.join(", "))
        };
        table.add_row(vec![
            "qgis".to_string(),
            file_label(&project.path),
            status(project.valid).to_string(),
            detail,
        ]);
    }

    table.to_string()
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
