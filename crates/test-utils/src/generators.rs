//! Test data generators for synthetic DEMs, boundary layers and site files.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite. Files are written with the
//! `tiff` crate and `serde_json` directly so the generators do not depend
//! on the crates under test.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tiff::encoder::colortype::{Gray16, Gray32Float};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

/// Creates an elevation grid with predictable values.
///
/// Each cell value is `100 + col * 0.5 + row * 0.25`, so every pixel is
/// strictly positive and its position can be recovered from its value.
///
/// # Example
///
/// ```
/// use test_utils::create_elevation_grid;
///
/// let grid = create_elevation_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[0], 100.0);
/// assert_eq!(grid[1], 100.5);
/// assert_eq!(grid[10], 100.25);
/// ```
pub fn create_elevation_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(100.0 + col as f32 * 0.5 + row as f32 * 0.25);
        }
    }
    data
}

/// Description of a synthetic single-band GeoTIFF DEM.
#[derive(Debug, Clone)]
pub struct SyntheticDem {
    pub width: usize,
    pub height: usize,
    /// Upper-left corner (x, y) in CRS units
    pub origin: (f64, f64),
    pub pixel_size: f64,
    /// Written to `ProjectedCSTypeGeoKey`; `None` writes no GeoKeys at all.
    pub epsg: Option<u16>,
    /// Written to `ProjLinearUnitsGeoKey` when set.
    pub linear_unit: Option<u16>,
    /// Written as the GDAL_NODATA tag when set.
    pub nodata: Option<f64>,
    /// Register the tiepoint on the centre of the first pixel
    /// (`GTRasterTypeGeoKey` = PixelIsPoint).
    pub pixel_is_point: bool,
}

impl SyntheticDem {
    /// A square DEM of `size` pixels centred on `center`.
    pub fn centered(center: (f64, f64), size: usize, pixel_size: f64, epsg: u16) -> Self {
        let half = size as f64 * pixel_size / 2.0;
        Self {
            width: size,
            height: size,
            origin: (center.0 - half, center.1 + half),
            pixel_size,
            epsg: Some(epsg),
            linear_unit: None,
            nodata: None,
            pixel_is_point: false,
        }
    }

    pub fn without_crs(mut self) -> Self {
        self.epsg = None;
        self
    }

    pub fn with_linear_unit(mut self, code: u16) -> Self {
        self.linear_unit = Some(code);
        self
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn pixel_is_point(mut self) -> Self {
        self.pixel_is_point = true;
        self
    }

    /// Extent as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.origin.0,
            self.origin.1 - self.height as f64 * self.pixel_size,
            self.origin.0 + self.width as f64 * self.pixel_size,
            self.origin.1,
        )
    }

    /// Write the DEM as float32 samples from [`create_elevation_grid`].
    pub fn write_f32(&self, path: &Path) -> PathBuf {
        let data = create_elevation_grid(self.width, self.height);
        self.write_with(path, |encoder, dem| {
            let mut image = encoder
                .new_image::<Gray32Float>(dem.width as u32, dem.height as u32)
                .expect("Failed to create TIFF image");
            dem.write_tags(image.encoder());
            image.write_data(&data).expect("Failed to write TIFF data");
        })
    }

    /// Write the DEM as uint16 samples (elevations truncated).
    pub fn write_u16(&self, path: &Path) -> PathBuf {
        let data: Vec<u16> = create_elevation_grid(self.width, self.height)
            .into_iter()
            .map(|v| v as u16)
            .collect();
        self.write_with(path, |encoder, dem| {
            let mut image = encoder
                .new_image::<Gray16>(dem.width as u32, dem.height as u32)
                .expect("Failed to create TIFF image");
            dem.write_tags(image.encoder());
            image.write_data(&data).expect("Failed to write TIFF data");
        })
    }

    fn write_with<F>(&self, path: &Path, write: F) -> PathBuf
    where
        F: FnOnce(&mut TiffEncoder<&mut fs::File>, &Self),
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create DEM directory");
        }
        let mut file = fs::File::create(path).expect("Failed to create DEM file");
        let mut encoder = TiffEncoder::new(&mut file).expect("Failed to create TIFF encoder");
        write(&mut encoder, self);
        path.to_path_buf()
    }

    fn write_tags<W: std::io::Write + std::io::Seek>(&self, dir: &mut tiff::encoder::DirectoryEncoder<'_, W, tiff::encoder::TiffKindStandard>) {
        let scale = [self.pixel_size, self.pixel_size, 0.0];
        let (raster_type, shift) = if self.pixel_is_point { (2, self.pixel_size / 2.0) } else { (1, 0.0) };
        let tiepoint = [0.0, 0.0, 0.0, self.origin.0 + shift, self.origin.1 - shift, 0.0];
        dir.write_tag(Tag::ModelPixelScaleTag, &scale[..]).expect("scale tag");
        dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..]).expect("tiepoint tag");

        if let Some(epsg) = self.epsg {
            let mut keys: Vec<u16> = vec![1024, 0, 1, 1, 1025, 0, 1, raster_type, 3072, 0, 1, epsg];
            if let Some(unit) = self.linear_unit {
                keys.extend_from_slice(&[3076, 0, 1, unit]);
            }
            let mut directory = vec![1, 1, 0, (keys.len() / 4) as u16];
            directory.extend(keys);
            dir.write_tag(Tag::GeoKeyDirectoryTag, &directory[..]).expect("geokey tag");
        }

        if let Some(nodata) = self.nodata {
            dir.write_tag(Tag::GdalNodata, nodata.to_string().as_str())
                .expect("nodata tag");
        }
    }
}

/// A closed square ring centred on `center` with half-width `half`.
pub fn square_ring(center: (f64, f64), half: f64) -> Vec<(f64, f64)> {
    let (x, y) = center;
    vec![
        (x - half, y - half),
        (x + half, y - half),
        (x + half, y + half),
        (x - half, y + half),
        (x - half, y - half),
    ]
}

fn positions(coords: &[(f64, f64)]) -> Value {
    Value::Array(coords.iter().map(|(x, y)| json!([x, y])).collect())
}

/// GeoJSON polygon feature with a single exterior ring.
pub fn polygon_feature(ring: &[(f64, f64)], properties: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Polygon", "coordinates": [positions(ring)] },
        "properties": properties,
    })
}

/// GeoJSON LineString feature.
pub fn line_feature(coords: &[(f64, f64)], properties: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "LineString", "coordinates": positions(coords) },
        "properties": properties,
    })
}

/// GeoJSON Point feature.
pub fn point_feature(point: (f64, f64), properties: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [point.0, point.1] },
        "properties": properties,
    })
}

/// FeatureCollection with an optional named-CRS member.
pub fn feature_collection(crs_name: Option<&str>, features: Vec<Value>) -> Value {
    let mut collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    if let Some(name) = crs_name {
        collection["crs"] = json!({ "type": "name", "properties": { "name": name } });
    }
    collection
}

/// Write a GeoJSON document, creating parent directories.
pub fn write_geojson(path: &Path, document: &Value) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create layer directory");
    }
    let text = serde_json::to_string_pretty(document).expect("Failed to serialize GeoJSON");
    fs::write(path, text).expect("Failed to write GeoJSON");
    path.to_path_buf()
}

/// Write a coordinate file with a single `lat, lon` line.
pub fn write_site_file(path: &Path, lat: f64, lon: f64) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create site directory");
    }
    fs::write(path, format!("{}, {}\n", lat, lon)).expect("Failed to write site file");
    path.to_path_buf()
}
