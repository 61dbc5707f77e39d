//! Pipeline outputs packaged for HEC-RAS and QGIS, then checked.

use std::fs;
use std::path::Path;

use clip_common::Crs;
use clipper::{run_pipeline, ClipConfig};
use projection::CoordTransformer;
use serde_json::json;
use site_clip::hecras::{export_hecras, README_FILE};
use site_clip::qgis::{project_path, validate_qgis_project, write_qgis_project};
use site_clip::report::{format_output_report, validate_run_outputs};
use site_clip::validation::{check_site_in_raster, validate_asset_dem, validate_asset_layers};
use test_utils::fixtures::{crs, site};
use test_utils::{feature_collection, point_feature, polygon_feature, square_ring, write_geojson, write_site_file, SyntheticDem};

fn setup(root: &Path) -> ClipConfig {
    let (lat, lon) = site::ZONE_11_MERIDIAN;
    let utm = Crs::from_epsg(crs::UTM_11N as u32).unwrap();
    let center = CoordTransformer::from_wgs84(&utm).unwrap().transform(lon, lat).unwrap();

    let site_file = write_site_file(&root.join("coordinate.txt"), lat, lon);
    let dem = SyntheticDem::centered(center, 1000, 1.0, crs::UTM_11N).write_f32(&root.join("assets/dem.tif"));
    let boundaries = root.join("assets/boundaries");
    write_geojson(
        &boundaries.join("parcels.geojson"),
        &feature_collection(
            Some(crs::UTM_11N_URN),
            vec![polygon_feature(&square_ring(center, 30.0), json!({ "PARCEL": "B-2" }))],
        ),
    );
    write_geojson(
        &boundaries.join("gauges.geojson"),
        &feature_collection(
            Some(crs::UTM_11N_URN),
            vec![point_feature((center.0 + 3000.0, center.1), json!({}))],
        ),
    );

    ClipConfig::new(site_file, dem, boundaries, root.join("output"))
}

#[test]
fn test_asset_validation_passes_for_good_inputs() {
    let tmp = tempfile::tempdir().unwrap();
    let config = setup(tmp.path());

    let dem = validate_asset_dem(&config.raster);
    assert!(dem.valid && dem.has_data);
    let layers = validate_asset_layers(&config.boundary_dir, &[]);
    assert!(layers.valid);
    assert_eq!(layers.count, 2);

    let inputs = clipper::load_inputs(&config).unwrap();
    assert!(check_site_in_raster(&inputs.site, &inputs.raster).unwrap());
}

#[test]
fn test_hecras_and_qgis_packages() {
    let tmp = tempfile::tempdir().unwrap();
    let config = setup(tmp.path());
    let summaries = run_pipeline(&config).unwrap();

    let package = export_hecras(&summaries[0], &config.hecras_dir()).unwrap();
    for file in package.files() {
        assert!(file.is_file(), "{} missing", file.display());
    }
    assert_eq!(package.buffer, config.hecras_dir().join("site_buffer.shp"));
    for ext in ["shp", "shx", "dbf", "prj"] {
        assert!(config.hecras_dir().join(format!("site_buffer.{}", ext)).is_file());
    }
    let buffer = vector_layer::read_layer(&package.buffer).unwrap();
    assert_eq!(buffer.crs.epsg(), Some(32611));
    let readme = fs::read_to_string(config.hecras_dir().join(README_FILE)).unwrap();
    assert!(readme.contains("Buffer: 200 m radius"));
    assert!(readme.contains("Add site_buffer.shp as a reference layer"));
    let prj = fs::read_to_string(&package.projection).unwrap();
    assert!(prj.contains("UTM zone 11N"));

    let qgis_run = summaries.iter().find(|s| s.label == "qgis").unwrap();
    let project = write_qgis_project(qgis_run).unwrap();
    assert_eq!(project, config.output_dir.join("site_100m/site_100m.qgs"));
    let qgis_spec = config.runs().into_iter().find(|r| r.label == "qgis").unwrap();
    assert_eq!(project_path(&qgis_spec.output_dir, &qgis_spec.suffix()), project);

    let check = validate_qgis_project(&project).unwrap();
    assert!(check.valid);
    assert_eq!(check.authid.as_deref(), Some("EPSG:32611"));
    // DEM, buffer and the parcels layer; the empty gauges layer is left out
    assert_eq!(check.datasources.len(), 3);
    assert!(!check.datasources.iter().any(|d| d.starts_with("gauges")));
}

#[test]
fn test_output_report_recovers_radius() {
    let tmp = tempfile::tempdir().unwrap();
    let config = setup(tmp.path());
    run_pipeline(&config).unwrap();

    let reports: Vec<_> = config.runs().iter().map(|r| validate_run_outputs(r).unwrap()).collect();
    assert_eq!(reports.len(), 2);

    let primary = &reports[0];
    assert!(primary.is_valid());
    assert!((primary.buffer.actual_radius_m - 200.0).abs() < 5.0);
    assert_eq!(primary.layers.with_data, 1);
    assert_eq!(primary.layers.empty, 1);
    assert!(primary.dem.has_data);

    let text = format_output_report(&reports, None);
    assert!(text.contains("hecras (200m)"));
    assert!(text.contains("1 with data, 1 empty"));
}

#[test]
fn test_report_fails_before_any_run() {
    let tmp = tempfile::tempdir().unwrap();
    let config = setup(tmp.path());
    assert!(validate_run_outputs(&config.runs()[0]).is_err());
}
