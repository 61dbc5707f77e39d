//! In-memory raster representation.

use clip_common::{BoundingBox, Crs};

use crate::error::GeoTiffError;

/// On-disk sample type of a raster band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    U16,
    I16,
    I32,
    F32,
    F64,
}

impl SampleFormat {
    /// Sentinel used for pixels outside a clip when the source has no nodata.
    pub fn default_nodata(&self) -> f64 {
        match self {
            SampleFormat::U8 | SampleFormat::U16 => 0.0,
            _ => -9999.0,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SampleFormat::F32 | SampleFormat::F64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::U8 => "uint8",
            SampleFormat::U16 => "uint16",
            SampleFormat::I16 => "int16",
            SampleFormat::I32 => "int32",
            SampleFormat::F32 => "float32",
            SampleFormat::F64 => "float64",
        }
    }
}

/// Affine transform of a north-up raster.
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is negative for the usual top-down row order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Coordinates of the center of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Coordinates of a fractional pixel position; (0, 0) is the upper-left corner.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Fractional pixel position of a coordinate; use `.floor()` for indices.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Extent covered by a raster of the given dimensions.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let (x0, y0) = self.pixel_to_geo(0.0, 0.0);
        let (x1, y1) = self.pixel_to_geo(width as f64, height as f64);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Transform of the sub-window whose upper-left pixel is (col, row).
    pub fn offset(&self, col: usize, row: usize) -> Self {
        let (origin_x, origin_y) = self.pixel_to_geo(col as f64, row as f64);
        Self::new(origin_x, origin_y, self.pixel_width, self.pixel_height)
    }

    /// Area of one pixel in squared CRS units.
    pub fn pixel_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }
}

/// A single-band raster with georeferencing.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    width: usize,
    height: usize,
    /// Row-major pixel values
    data: Vec<f64>,
    sample_format: SampleFormat,
    transform: GeoTransform,
    crs: Option<Crs>,
    nodata: Option<f64>,
}

impl RasterLayer {
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f64>,
        sample_format: SampleFormat,
        transform: GeoTransform,
    ) -> Result<Self, GeoTiffError> {
        let expected = width * height;
        if data.len() != expected {
            return Err(GeoTiffError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
            sample_format,
            transform,
            crs: None,
            nodata: None,
        })
    }

    pub fn with_crs(mut self, crs: Option<Crs>) -> Self {
        self.crs = crs;
        self
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Check whether a value is the nodata sentinel (NaN always counts).
    pub fn is_nodata(&self, value: f64) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.nodata {
            Some(nd) if nd.is_nan() => false,
            Some(nd) => value == nd,
            None => false,
        }
    }

    /// Number of pixels holding a data value.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !self.is_nodata(**v)).count()
    }

    /// Copy a rectangular window. The window is clamped to the raster.
    pub fn window(&self, col: usize, row: usize, width: usize, height: usize) -> RasterLayer {
        let col = col.min(self.width);
        let row = row.min(self.height);
        let width = width.min(self.width - col);
        let height = height.min(self.height - row);

        let mut data = Vec::with_capacity(width * height);
        for r in row..row + height {
            let start = r * self.width + col;
            data.extend_from_slice(&self.data[start..start + width]);
        }

        RasterLayer {
            width,
            height,
            data,
            sample_format: self.sample_format,
            transform: self.transform.offset(col, row),
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    /// Mutable access to the pixel values, used when masking.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RasterLayer {
        let data: Vec<f64> = (0..12).map(f64::from).collect();
        RasterLayer::new(4, 3, data, SampleFormat::F32, GeoTransform::new(100.0, 30.0, 10.0, -10.0)).unwrap()
    }

    #[test]
    fn test_pixel_round_trip() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);
        let (x, y) = gt.pixel_center(5, 10);
        assert_eq!((x, y), (155.0, 95.0));
        let (col, row) = gt.geo_to_pixel(x, y);
        assert!((col - 5.5).abs() < 1e-12);
        assert!((row - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_bounds() {
        let bounds = sample().bounds();
        assert_eq!(bounds, BoundingBox::new(100.0, 0.0, 140.0, 30.0));
    }

    #[test]
    fn test_window_adjusts_origin() {
        let raster = sample();
        let window = raster.window(1, 1, 2, 2);
        assert_eq!(window.width(), 2);
        assert_eq!(window.height(), 2);
        assert_eq!(window.data(), &[5.0, 6.0, 9.0, 10.0]);
        assert_eq!(window.transform().origin_x, 110.0);
        assert_eq!(window.transform().origin_y, 20.0);
    }

    #[test]
    fn test_window_is_clamped() {
        let window = sample().window(3, 2, 10, 10);
        assert_eq!((window.width(), window.height()), (1, 1));
        assert_eq!(window.data(), &[11.0]);
    }

    #[test]
    fn test_size_mismatch() {
        let err = RasterLayer::new(2, 2, vec![0.0; 3], SampleFormat::U8, GeoTransform::new(0.0, 0.0, 1.0, -1.0));
        assert!(matches!(err, Err(GeoTiffError::SizeMismatch { expected: 4, actual: 3 })));
    }

    #[test]
    fn test_nodata() {
        let raster = sample().with_nodata(Some(0.0));
        assert!(raster.is_nodata(0.0));
        assert!(raster.is_nodata(f64::NAN));
        assert!(!raster.is_nodata(1.0));
        assert_eq!(raster.valid_count(), 11);
    }
}
