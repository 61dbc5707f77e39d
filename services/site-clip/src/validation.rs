//! Pre-flight checks on inputs and post-run checks on outputs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clip_common::{read_site_coordinate, BoundingBox, ClipError, SiteCoordinate};
use geo::{BoundingRect, Geometry};
use geotiff::{read_raster, RasterLayer};
use projection::{linear_unit, CoordTransformer};
use serde::Serialize;
use tracing::{info, warn};
use vector_layer::{list_layers, read_layer, LayerError};

/// Tolerance on the radius recovered from a written buffer, in meters.
pub const BUFFER_RADIUS_TOLERANCE_M: f64 = 5.0;

// ============================================================================
// Input assets
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DemAssetReport {
    pub path: PathBuf,
    pub valid: bool,
    pub error: Option<String>,
    pub crs: Option<String>,
    pub width: usize,
    pub height: usize,
    pub bounds: Option<BoundingBox>,
    pub has_data: bool,
}

impl DemAssetReport {
    fn invalid(path: &Path, error: String) -> Self {
        Self {
            path: path.to_path_buf(),
            valid: false,
            error: Some(error),
            crs: None,
            width: 0,
            height: 0,
            bounds: None,
            has_data: false,
        }
    }
}

/// Check that the DEM exists, decodes, has a CRS and carries data.
pub fn validate_asset_dem(path: &Path) -> DemAssetReport {
    if !path.exists() {
        return DemAssetReport::invalid(path, format!("DEM not found: {}", path.display()));
    }

    let raster = match read_raster(path) {
        Ok(r) => r,
        Err(e) => return DemAssetReport::invalid(path, e.to_string()),
    };

    let Some(crs) = raster.crs() else {
        let mut report = DemAssetReport::invalid(path, "DEM has no CRS".to_string());
        report.width = raster.width();
        report.height = raster.height();
        return report;
    };

    DemAssetReport {
        path: path.to_path_buf(),
        valid: true,
        error: None,
        crs: Some(crs.identifier()),
        width: raster.width(),
        height: raster.height(),
        bounds: Some(raster.bounds()),
        has_data: has_positive_sample(&raster),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerAssetReport {
    pub dir: PathBuf,
    pub valid: bool,
    pub count: usize,
    pub with_crs: usize,
    pub missing_crs: Vec<String>,
    /// (file name, reason) for layers that could not be read
    pub unreadable: Vec<(String, String)>,
}

/// Check that every boundary layer parses and declares a CRS.
pub fn validate_asset_layers(dir: &Path, include: &[String]) -> LayerAssetReport {
    let mut report = LayerAssetReport {
        dir: dir.to_path_buf(),
        valid: false,
        count: 0,
        with_crs: 0,
        missing_crs: Vec::new(),
        unreadable: Vec::new(),
    };

    let paths = match list_layers(dir, include) {
        Ok(paths) => paths,
        Err(e) => {
            report.unreadable.push((dir.display().to_string(), e.to_string()));
            return report;
        }
    };

    report.count = paths.len();
    for path in &paths {
        let name = file_name(path);
        match read_layer(path) {
            Ok(_) => report.with_crs += 1,
            Err(LayerError::MissingCrs(_)) => report.missing_crs.push(name),
            Err(e) => report.unreadable.push((name, e.to_string())),
        }
    }

    report.valid = report.missing_crs.is_empty() && report.unreadable.is_empty();
    report
}

/// Whether the site falls inside the raster extent once projected.
///
/// A site outside is only logged; the raster clipper decides whether the
/// overlap is usable.
pub fn check_site_in_raster(site: &SiteCoordinate, raster: &RasterLayer) -> Result<bool> {
    let crs = raster
        .crs()
        .ok_or_else(|| ClipError::MissingCrs("elevation raster".to_string()))?;
    let (lon, lat) = site.lon_lat();
    let (x, y) = CoordTransformer::from_wgs84(crs)?.transform(lon, lat)?;

    let bounds = raster.bounds();
    let inside = bounds.contains_point(x, y);
    if inside {
        info!(site = %site, x, y, "Site lies inside the raster extent");
    } else {
        warn!(
            site = %site,
            x,
            y,
            min_x = bounds.min_x,
            min_y = bounds.min_y,
            max_x = bounds.max_x,
            max_y = bounds.max_y,
            "Site lies outside the raster extent"
        );
    }
    Ok(inside)
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteAssetReport {
    pub path: PathBuf,
    pub valid: bool,
    pub error: Option<String>,
    pub site: Option<SiteCoordinate>,
    /// `None` when the raster could not be used for the check
    pub inside_raster: Option<bool>,
}

/// Read the site file and place the site against the DEM extent.
///
/// Only an unreadable site makes the report invalid.
pub fn validate_asset_site(site_file: &Path, raster_path: &Path) -> SiteAssetReport {
    let mut report = SiteAssetReport {
        path: site_file.to_path_buf(),
        valid: false,
        error: None,
        site: None,
        inside_raster: None,
    };

    let site = match read_site_coordinate(site_file) {
        Ok(site) => site,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };
    report.valid = true;
    report.site = Some(site);

    match read_raster(raster_path).map_err(anyhow::Error::from).and_then(|r| check_site_in_raster(&site, &r)) {
        Ok(inside) => report.inside_raster = Some(inside),
        Err(e) => warn!(error = %e, "Skipping site-in-raster check"),
    }
    report
}

// ============================================================================
// Outputs
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DemOutputReport {
    pub path: PathBuf,
    pub valid: bool,
    pub width: usize,
    pub height: usize,
    /// Extent (width, height) in CRS units
    pub extent: (f64, f64),
    pub has_data: bool,
    pub size_bytes: u64,
}

/// Check a clipped DEM: non-empty file with at least one positive sample.
pub fn validate_dem_output(path: &Path) -> Result<DemOutputReport> {
    let size_bytes = fs::metadata(path)
        .with_context(|| format!("Clipped DEM not found: {}", path.display()))?
        .len();
    let raster = read_raster(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let bounds = raster.bounds();
    let has_data = has_positive_sample(&raster);

    Ok(DemOutputReport {
        path: path.to_path_buf(),
        valid: has_data && size_bytes > 0,
        width: raster.width(),
        height: raster.height(),
        extent: (round2(bounds.width()), round2(bounds.height())),
        has_data,
        size_bytes,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct BufferReport {
    pub path: PathBuf,
    pub valid: bool,
    pub expected_radius_m: f64,
    pub actual_radius_m: f64,
    pub radius_diff: f64,
    pub crs: String,
}

/// Recover the radius of a written buffer from its bounding-box half-width
/// and compare it with `expected_radius_m`.
pub fn validate_buffer(path: &Path, expected_radius_m: f64) -> Result<BufferReport> {
    let layer = read_layer(path).with_context(|| format!("Failed to read buffer {}", path.display()))?;

    let polygon = match layer.features.first().and_then(|f| f.geometry.as_ref()) {
        Some(Geometry::Polygon(p)) => p,
        _ => anyhow::bail!("Buffer {} does not hold a polygon feature", path.display()),
    };
    let rect = polygon
        .bounding_rect()
        .with_context(|| format!("Buffer {} is empty", path.display()))?;

    let (unit, _) = linear_unit(&layer.crs)?;
    let actual_radius_m = unit.to_meters(rect.width() / 2.0);
    let radius_diff = (actual_radius_m - expected_radius_m).abs();

    Ok(BufferReport {
        path: path.to_path_buf(),
        valid: layer.len() == 1 && radius_diff < BUFFER_RADIUS_TOLERANCE_M,
        expected_radius_m,
        actual_radius_m: round2(actual_radius_m),
        radius_diff: round2(radius_diff),
        crs: layer.crs.identifier(),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayerCounts {
    pub with_data: usize,
    pub empty: usize,
    pub total: usize,
}

/// Count `*_clipped_<suffix>` layers in `dir` with and without features.
pub fn validate_clipped_layers(dir: &Path, suffix: &str) -> Result<LayerCounts> {
    let marker = format!("_clipped_{}", suffix);
    let mut counts = LayerCounts::default();

    for path in list_layers(dir, &[])? {
        if !vector_layer_stem(&path).ends_with(&marker) {
            continue;
        }
        let layer = read_layer(&path)?;
        counts.total += 1;
        if layer.is_empty() {
            counts.empty += 1;
        } else {
            counts.with_data += 1;
        }
    }

    Ok(counts)
}

fn has_positive_sample(raster: &RasterLayer) -> bool {
    raster.data().iter().any(|v| !raster.is_nodata(*v) && *v > 0.0)
}

fn vector_layer_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_utils::fixtures::crs;
    use test_utils::{feature_collection, point_feature, write_geojson, SyntheticDem};

    #[test]
    fn test_site_checked_against_dem() {
        let dir = tempfile::tempdir().unwrap();
        let utm = clip_common::Crs::from_epsg(crs::UTM_11N as u32).unwrap();
        let center = CoordTransformer::from_wgs84(&utm).unwrap().transform(-117.0, 34.0).unwrap();
        let dem = SyntheticDem::centered(center, 100, 1.0, crs::UTM_11N).write_f32(&dir.path().join("dem.tif"));

        let near = test_utils::write_site_file(&dir.path().join("near.txt"), 34.0, -117.0);
        let report = validate_asset_site(&near, &dem);
        assert!(report.valid);
        assert_eq!(report.inside_raster, Some(true));

        let far = test_utils::write_site_file(&dir.path().join("far.txt"), 35.0, -117.0);
        let report = validate_asset_site(&far, &dem);
        assert!(report.valid);
        assert_eq!(report.inside_raster, Some(false));
    }

    #[test]
    fn test_unreadable_site() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coordinate.txt");
        fs::write(&path, "not a coordinate").unwrap();
        let report = validate_asset_site(&path, &dir.path().join("absent.tif"));
        assert!(!report.valid);
        assert!(report.inside_raster.is_none());
        assert!(report.error.is_some());
    }

    #[test]
    fn test_missing_dem() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_asset_dem(&dir.path().join("absent.tif"));
        assert!(!report.valid);
        assert!(report.error.unwrap().contains("not found"));
    }

    #[test]
    fn test_dem_without_crs_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = SyntheticDem::centered((500_000.0, 3_762_000.0), 10, 1.0, crs::UTM_11N)
            .without_crs()
            .write_f32(&dir.path().join("bare.tif"));
        let report = validate_asset_dem(&path);
        assert!(!report.valid);
        assert_eq!(report.error.as_deref(), Some("DEM has no CRS"));
        assert_eq!(report.width, 10);
    }

    #[test]
    fn test_valid_dem() {
        let dir = tempfile::tempdir().unwrap();
        let path = SyntheticDem::centered((500_000.0, 3_762_000.0), 10, 1.0, crs::UTM_11N)
            .write_f32(&dir.path().join("dem.tif"));
        let report = validate_asset_dem(&path);
        assert!(report.valid);
        assert!(report.has_data);
        assert_eq!(report.crs.as_deref(), Some("EPSG:32611"));
    }

    #[test]
    fn test_layers_missing_crs() {
        let dir = tempfile::tempdir().unwrap();
        write_geojson(
            &dir.path().join("good.geojson"),
            &feature_collection(Some(crs::UTM_11N_URN), vec![point_feature((0.0, 0.0), json!({}))]),
        );
        write_geojson(
            &dir.path().join("bad.geojson"),
            &feature_collection(None, vec![point_feature((0.0, 0.0), json!({}))]),
        );
        fs::write(dir.path().join("broken.geojson"), "{ not json").unwrap();

        let report = validate_asset_layers(dir.path(), &[]);
        assert!(!report.valid);
        assert_eq!(report.count, 3);
        assert_eq!(report.with_crs, 1);
        assert_eq!(report.missing_crs, vec!["bad.geojson"]);
        assert_eq!(report.unreadable.len(), 1);
    }

    #[test]
    fn test_missing_layer_dir() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_asset_layers(&dir.path().join("nope"), &[]);
        assert!(!report.valid);
        assert_eq!(report.count, 0);
    }
}
