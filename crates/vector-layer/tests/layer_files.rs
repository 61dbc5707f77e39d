//! Layers written by the shared generators, read back through the public API.

use serde_json::json;
use test_utils::{
    feature_collection, fixtures, line_feature, point_feature, polygon_feature, square_ring, temp_test_dir,
    write_geojson,
};
use vector_layer::{layer_files, list_layers, read_layer, write_layer, LayerError, LayerFormat};

#[test]
fn test_read_generated_layer() {
    let dir = temp_test_dir();
    let doc = feature_collection(
        Some(fixtures::crs::UTM_11N_URN),
        vec![
            polygon_feature(&square_ring((500_000.0, 3_762_000.0), 50.0), json!({"NAME": "Parcel"})),
            line_feature(&[(499_900.0, 3_762_000.0), (500_100.0, 3_762_000.0)], json!({"ID": 3})),
            point_feature((500_000.0, 3_762_000.0), json!({})),
        ],
    );
    let path = write_geojson(&dir.path().join("parcels.geojson"), &doc);

    let layer = read_layer(&path).unwrap();
    assert_eq!(layer.name, "parcels");
    assert_eq!(layer.crs.epsg(), Some(32611));
    assert_eq!(layer.len(), 3);
    assert_eq!(layer.features[0].properties["NAME"], "Parcel");
}

#[test]
fn test_crs84_layer() {
    let dir = temp_test_dir();
    let doc = feature_collection(
        Some(fixtures::crs::CRS84_URN),
        vec![point_feature((-118.2437, 34.0522), json!({}))],
    );
    let layer = read_layer(write_geojson(&dir.path().join("sites.geojson"), &doc)).unwrap();
    assert!(layer.crs.is_geographic());
}

#[test]
fn test_layer_without_crs_fails() {
    let dir = temp_test_dir();
    let doc = feature_collection(None, vec![point_feature((0.0, 0.0), json!({}))]);
    let err = read_layer(write_geojson(&dir.path().join("bare.geojson"), &doc)).unwrap_err();
    assert!(matches!(err, LayerError::MissingCrs(_)));

    let clip_err: clip_common::ClipError = err.into();
    assert_eq!(clip_err.kind(), "missing_crs");
}

#[test]
fn test_malformed_json() {
    let dir = temp_test_dir();
    let path = dir.path().join("broken.geojson");
    std::fs::write(&path, "{\"type\": \"FeatureCollection\", ").unwrap();
    assert!(matches!(read_layer(&path), Err(LayerError::Json { .. })));
}

#[test]
fn test_empty_layer_written_and_listed() {
    let dir = temp_test_dir();
    let source = read_layer(write_geojson(
        &dir.path().join("in/roads.geojson"),
        &feature_collection(Some(fixtures::crs::UTM_11N_URN), vec![]),
    ))
    .unwrap();
    assert!(source.is_empty());

    let out = dir.path().join("roads_clipped_200m.geojson");
    write_layer(&source, &out).unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["features"], json!([]));
    assert_eq!(value["crs"]["properties"]["name"], fixtures::crs::UTM_11N_URN);

    let listed = list_layers(dir.path(), &[]).unwrap();
    assert_eq!(listed, vec![out]);
}

#[test]
fn test_geojson_converted_to_shapefile() {
    let dir = temp_test_dir();
    let doc = feature_collection(
        Some(fixtures::crs::UTM_11N_URN),
        vec![
            polygon_feature(&square_ring((500_000.0, 3_762_000.0), 50.0), json!({"NAME": "North", "ACRES": 2.47})),
            polygon_feature(&square_ring((500_200.0, 3_762_000.0), 25.0), json!({"NAME": "South", "ACRES": 0.62})),
        ],
    );
    let source = read_layer(write_geojson(&dir.path().join("in/parcels.geojson"), &doc)).unwrap();

    let out = dir.path().join("parcels.shp");
    write_layer(&source, &out).unwrap();
    let files: Vec<String> = layer_files(&out)
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["parcels.shp", "parcels.shx", "parcels.dbf", "parcels.prj"]);

    let layer = read_layer(&out).unwrap();
    assert_eq!(layer.format, LayerFormat::Shapefile);
    assert_eq!(layer.name, "parcels");
    assert!(layer.crs.is_equivalent(&source.crs));
    assert_eq!(layer.len(), 2);
    assert_eq!(layer.features[1].properties["NAME"], "South");
    assert_eq!(layer.features[1].properties["ACRES"], json!(0.62));

    let listed = list_layers(dir.path(), &[]).unwrap();
    assert_eq!(listed, vec![out]);
}

#[test]
fn test_shapefile_with_esri_prj() {
    let dir = temp_test_dir();
    let source = read_layer(write_geojson(
        &dir.path().join("gauges.geojson"),
        &feature_collection(
            Some(fixtures::crs::UTM_11N_URN),
            vec![point_feature((6_487_000.0, 1_841_000.0), json!({"ID": 1}))],
        ),
    ))
    .unwrap();
    let out = dir.path().join("gauges.shp");
    write_layer(&source, &out).unwrap();

    // ESRI exports carry no AUTHORITY node
    std::fs::write(out.with_extension("prj"), fixtures::crs::CA_ZONE5_FTUS_ESRI_WKT).unwrap();
    let layer = read_layer(&out).unwrap();
    assert_eq!(layer.crs.epsg(), None);
    assert_eq!(layer.crs.proj_param("proj"), Some("lcc"));
    assert_eq!(layer.crs.proj_param("units"), Some("us-ft"));
}

#[test]
fn test_shapefile_without_prj_fails() {
    let dir = temp_test_dir();
    let source = read_layer(write_geojson(
        &dir.path().join("county.geojson"),
        &feature_collection(
            Some(fixtures::crs::UTM_11N_URN),
            vec![polygon_feature(&square_ring((500_000.0, 3_762_000.0), 10.0), json!({}))],
        ),
    ))
    .unwrap();
    let out = dir.path().join("county.shp");
    write_layer(&source, &out).unwrap();
    std::fs::remove_file(out.with_extension("prj")).unwrap();

    let err = read_layer(&out).unwrap_err();
    assert!(matches!(err, LayerError::MissingCrs(ref name) if name == "county"));
    let clip_err: clip_common::ClipError = err.into();
    assert_eq!(clip_err.kind(), "missing_crs");
}

#[test]
fn test_truncated_shapefile() {
    let dir = temp_test_dir();
    let path = dir.path().join("broken.shp");
    std::fs::write(&path, b"not a shapefile").unwrap();
    std::fs::write(path.with_extension("dbf"), b"").unwrap();
    std::fs::write(path.with_extension("prj"), fixtures::crs::CA_ZONE5_FTUS_ESRI_WKT).unwrap();
    assert!(matches!(read_layer(&path), Err(LayerError::Shapefile { .. })));
}
