//! Raster clipping to a buffer polygon.

use clip_common::{ClipError, ClipResult};
use geo::{Area, BoundingRect, Contains, Point, Polygon};
use geotiff::RasterLayer;
use tracing::{debug, warn};

/// A clipped raster and how much of the buffer it covers.
#[derive(Debug, Clone)]
pub struct RasterClip {
    pub raster: RasterLayer,
    /// (col, row, width, height) of the window in the source raster
    pub window: (usize, usize, usize, usize),
    /// Pixels whose centre lies inside the buffer
    pub retained_pixels: usize,
    /// Retained pixel area over buffer area
    pub coverage: f64,
}

/// Crop `raster` to the bounding box of `polygon` and mask pixels whose
/// centre falls outside it.
///
/// Fails with `EmptyRasterOverlap` when the window is empty or no pixel
/// centre lies inside the polygon. Coverage below `partial_overlap_warning`
/// is logged but accepted.
pub fn clip_raster(raster: &RasterLayer, polygon: &Polygon<f64>, partial_overlap_warning: f64) -> ClipResult<RasterClip> {
    let rect = polygon.bounding_rect().ok_or_else(|| ClipError::EmptyRasterOverlap {
        raster: describe(raster),
        detail: "buffer polygon is empty".to_string(),
    })?;

    let gt = raster.transform();
    let (c0, r0) = gt.geo_to_pixel(rect.min().x, rect.max().y);
    let (c1, r1) = gt.geo_to_pixel(rect.max().x, rect.min().y);

    let col_start = clamp_index(c0.min(c1).floor(), raster.width());
    let col_end = clamp_index(c0.max(c1).ceil(), raster.width());
    let row_start = clamp_index(r0.min(r1).floor(), raster.height());
    let row_end = clamp_index(r0.max(r1).ceil(), raster.height());

    if col_start >= col_end || row_start >= row_end {
        let bounds = raster.bounds();
        return Err(ClipError::EmptyRasterOverlap {
            raster: describe(raster),
            detail: format!(
                "buffer extent ({:.2}, {:.2}, {:.2}, {:.2}) lies outside raster extent ({:.2}, {:.2}, {:.2}, {:.2})",
                rect.min().x,
                rect.min().y,
                rect.max().x,
                rect.max().y,
                bounds.min_x,
                bounds.min_y,
                bounds.max_x,
                bounds.max_y
            ),
        });
    }

    let nodata = raster
        .nodata()
        .unwrap_or_else(|| raster.sample_format().default_nodata());

    let mut window = raster
        .window(col_start, row_start, col_end - col_start, row_end - row_start)
        .with_nodata(Some(nodata));
    let (width, height, wgt) = (window.width(), window.height(), *window.transform());

    let mut retained = 0usize;
    let data = window.data_mut();
    for row in 0..height {
        for col in 0..width {
            let (x, y) = wgt.pixel_center(col, row);
            if polygon.contains(&Point::new(x, y)) {
                retained += 1;
            } else {
                data[row * width + col] = nodata;
            }
        }
    }

    if retained == 0 {
        return Err(ClipError::EmptyRasterOverlap {
            raster: describe(raster),
            detail: "no pixel centre falls inside the buffer".to_string(),
        });
    }

    let buffer_area = polygon.unsigned_area();
    let coverage = if buffer_area > 0.0 {
        (retained as f64 * wgt.pixel_area() / buffer_area).min(1.0)
    } else {
        0.0
    };

    if coverage < partial_overlap_warning {
        warn!(
            raster = %describe(raster),
            coverage = format!("{:.1}%", coverage * 100.0),
            retained_pixels = retained,
            "Buffer only partially overlaps the raster"
        );
    }

    debug!(
        col = col_start,
        row = row_start,
        width,
        height,
        retained_pixels = retained,
        nodata,
        "Clipped raster window"
    );

    Ok(RasterClip {
        raster: window,
        window: (col_start, row_start, width, height),
        retained_pixels: retained,
        coverage,
    })
}

fn clamp_index(value: f64, max: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= max as f64 {
        max
    } else {
        value as usize
    }
}

fn describe(raster: &RasterLayer) -> String {
    format!(
        "{}x{} {}",
        raster.width(),
        raster.height(),
        raster.crs().map(|c| c.identifier()).unwrap_or_else(|| "no CRS".to_string())
    )
}
