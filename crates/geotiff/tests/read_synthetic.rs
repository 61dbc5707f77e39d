//! Reads DEMs produced by the shared generators, the way a real survey
//! export would arrive on disk.

use clip_common::UnitDeclaration;
use geotiff::{read_raster, write_raster, SampleFormat};
use test_utils::{assert_approx_eq, fixtures, temp_test_dir, SyntheticDem};

#[test]
fn test_reads_float_dem_with_crs_and_unit() {
    let dir = temp_test_dir();
    let dem = SyntheticDem::centered((500_000.0, 3_762_000.0), 50, 2.0, fixtures::crs::UTM_11N)
        .with_linear_unit(fixtures::unit_codes::METRE)
        .with_nodata(-9999.0);
    let path = dem.write_f32(&dir.path().join("dem.tif"));

    let raster = read_raster(&path).unwrap();
    assert_eq!((raster.width(), raster.height()), (50, 50));
    assert_eq!(raster.sample_format(), SampleFormat::F32);
    assert_eq!(raster.nodata(), Some(-9999.0));

    let crs = raster.crs().expect("CRS should be read from GeoKeys");
    assert_eq!(crs.epsg(), Some(32611));
    assert_eq!(crs.declared_unit(), Some(UnitDeclaration::EpsgCode(9001)));

    let bounds = raster.bounds();
    let (min_x, min_y, max_x, max_y) = dem.bounds();
    assert_approx_eq!(bounds.min_x, min_x, 1e-9);
    assert_approx_eq!(bounds.min_y, min_y, 1e-9);
    assert_approx_eq!(bounds.max_x, max_x, 1e-9);
    assert_approx_eq!(bounds.max_y, max_y, 1e-9);

    assert_eq!(raster.get(0, 0), Some(100.0));
    assert_eq!(raster.get(1, 0), Some(100.5));
}

#[test]
fn test_missing_geokeys_yields_no_crs() {
    let dir = temp_test_dir();
    let path = SyntheticDem::centered((0.0, 0.0), 10, 1.0, fixtures::crs::UTM_11N)
        .without_crs()
        .write_f32(&dir.path().join("bare.tif"));

    let raster = read_raster(&path).unwrap();
    assert!(raster.crs().is_none());
}

#[test]
fn test_uint16_round_trip_through_file() {
    let dir = temp_test_dir();
    let path = SyntheticDem::centered((500_000.0, 3_762_000.0), 8, 1.0, fixtures::crs::UTM_11N)
        .write_u16(&dir.path().join("dem16.tif"));

    let raster = read_raster(&path).unwrap();
    assert_eq!(raster.sample_format(), SampleFormat::U16);

    let window = raster.window(2, 2, 4, 4);
    let out = dir.path().join("window.tif");
    write_raster(&window, &out).unwrap();

    let reread = read_raster(&out).unwrap();
    assert_eq!(reread.sample_format(), SampleFormat::U16);
    assert_eq!(reread.data(), window.data());
    assert_eq!(reread.transform(), window.transform());
}

#[test]
fn test_not_a_tiff() {
    let dir = temp_test_dir();
    let path = dir.path().join("dem.tif");
    std::fs::write(&path, b"definitely not a tiff").unwrap();
    let err = read_raster(&path).unwrap_err();
    assert!(matches!(err, geotiff::GeoTiffError::Decode(_)));
}

#[test]
fn test_pixel_is_point_moves_origin_to_corner() {
    let dir = temp_test_dir();
    let dem = SyntheticDem::centered((500_100.0, 3_699_900.0), 20, 10.0, fixtures::crs::UTM_11N).pixel_is_point();
    let path = dem.write_f32(&dir.path().join("point.tif"));

    let raster = read_raster(&path).unwrap();
    let (x, y) = raster.transform().pixel_center(0, 0);
    assert_approx_eq!(x, 500_005.0, 1e-9);
    assert_approx_eq!(y, 3_699_995.0, 1e-9);
    assert_approx_eq!(raster.transform().origin_x, 500_000.0, 1e-9);
    assert_approx_eq!(raster.transform().origin_y, 3_700_000.0, 1e-9);

    // written back with area registration, the corner stays put
    let out = dir.path().join("area.tif");
    write_raster(&raster, &out).unwrap();
    assert_eq!(read_raster(&out).unwrap().transform(), raster.transform());
}
