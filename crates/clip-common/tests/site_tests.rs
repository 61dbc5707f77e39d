//! Tests for reading site coordinates.

use std::io::Write;

use clip_common::{read_site_coordinate, ClipError, SiteCoordinate};

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_parse_round_trips_formatted_values() {
    let samples = [
        (0.0, 0.0),
        (34.0522, -118.2437),
        (-33.8688, 151.2093),
        (90.0, 180.0),
        (-90.0, -180.0),
        (12.345678901234, -98.765432109876),
    ];

    for (lat, lon) in samples {
        let site = SiteCoordinate::new(lat, lon).unwrap();
        let reparsed = SiteCoordinate::parse(&site.to_string()).unwrap();
        assert_eq!(reparsed.latitude(), lat);
        assert_eq!(reparsed.longitude(), lon);
    }
}

#[test]
fn test_parse_is_idempotent() {
    let first = SiteCoordinate::parse("  37.7749 ,  -122.4194  ").unwrap();
    let second = SiteCoordinate::parse(&first.to_string()).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Parse errors
// ============================================================================

#[test]
fn test_single_field_is_parse_error() {
    let result = SiteCoordinate::parse("34.05");
    assert!(matches!(result, Err(ClipError::Parse(_))));
}

#[test]
fn test_three_fields_is_parse_error() {
    let result = SiteCoordinate::parse("34.05, -118.24, 12.0");
    assert!(matches!(result, Err(ClipError::Parse(_))));
}

#[test]
fn test_non_numeric_is_parse_error() {
    let result = SiteCoordinate::parse("north, west");
    assert!(matches!(result, Err(ClipError::Parse(_))));
}

#[test]
fn test_empty_input_is_parse_error() {
    assert!(matches!(SiteCoordinate::parse(""), Err(ClipError::Parse(_))));
    assert!(matches!(
        SiteCoordinate::parse("\n \n\t\n"),
        Err(ClipError::Parse(_))
    ));
}

#[test]
fn test_semicolon_separator_is_parse_error() {
    let result = SiteCoordinate::parse("34.05; -118.24");
    assert!(matches!(result, Err(ClipError::Parse(_))));
}

// ============================================================================
// Range errors
// ============================================================================

#[test]
fn test_latitude_out_of_range() {
    assert!(matches!(
        SiteCoordinate::parse("-90.0001, 10"),
        Err(ClipError::Range(_))
    ));
}

#[test]
fn test_longitude_out_of_range() {
    assert!(matches!(
        SiteCoordinate::parse("10, 180.0001"),
        Err(ClipError::Range(_))
    ));
}

#[test]
fn test_swapped_order_is_caught_when_out_of_range() {
    // lon, lat written in the wrong order: -118 is not a valid latitude
    assert!(matches!(
        SiteCoordinate::parse("-118.2437, 34.0522"),
        Err(ClipError::Range(_))
    ));
}

// ============================================================================
// File input
// ============================================================================

#[test]
fn test_read_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "34.0522, -118.2437").unwrap();
    writeln!(file, "this line is ignored").unwrap();

    let site = read_site_coordinate(file.path()).unwrap();
    test_utils::assert_coords_approx_eq!(
        (site.latitude(), site.longitude()),
        (34.0522, -118.2437),
        1e-12
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_site_coordinate(dir.path().join("missing.txt"));
    assert!(matches!(result, Err(ClipError::Io(_))));
}
