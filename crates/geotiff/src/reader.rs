//! GeoTIFF decoding.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::error::GeoTiffError;
use crate::geokeys::{GeoKeyDirectory, GT_RASTER_TYPE, RASTER_PIXEL_IS_POINT};
use crate::raster::{GeoTransform, RasterLayer, SampleFormat};

/// Read the first band of a GeoTIFF file.
pub fn read_raster<P: AsRef<Path>>(path: P) -> Result<RasterLayer, GeoTiffError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let raster = decode_raster(BufReader::new(file))?;

    debug!(
        path = %path.display(),
        width = raster.width(),
        height = raster.height(),
        sample_format = raster.sample_format().name(),
        crs = ?raster.crs().map(|c| c.identifier()),
        nodata = ?raster.nodata(),
        "Read raster"
    );

    Ok(raster)
}

/// Read a GeoTIFF held in memory.
pub fn read_raster_from_buffer(data: &[u8]) -> Result<RasterLayer, GeoTiffError> {
    decode_raster(Cursor::new(data))
}

fn decode_raster<R: Read + Seek>(reader: R) -> Result<RasterLayer, GeoTiffError> {
    let mut decoder = Decoder::new(reader)
        .map_err(|e| GeoTiffError::Decode(e.to_string()))?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| GeoTiffError::Decode(format!("cannot read dimensions: {}", e)))?;
    let (width, height) = (width as usize, height as usize);

    let samples_per_pixel = decoder
        .find_tag_unsigned::<u16>(Tag::SamplesPerPixel)
        .map_err(|e| GeoTiffError::Decode(format!("tag SamplesPerPixel: {}", e)))?
        .unwrap_or(1);
    if samples_per_pixel != 1 {
        return Err(GeoTiffError::UnsupportedSampleFormat(format!(
            "{} samples per pixel, only single-band rasters are supported",
            samples_per_pixel
        )));
    }

    let geokeys = read_geokeys(&mut decoder)?;
    let mut transform = read_geotransform(&mut decoder)?;
    // PixelIsPoint tiepoints name the centre of the first pixel
    if geokeys.as_ref().and_then(|dir| dir.short(GT_RASTER_TYPE)) == Some(RASTER_PIXEL_IS_POINT) {
        let (origin_x, origin_y) = transform.pixel_to_geo(-0.5, -0.5);
        transform = GeoTransform::new(origin_x, origin_y, transform.pixel_width, transform.pixel_height);
    }
    let nodata = read_nodata(&mut decoder)?;

    let image = decoder
        .read_image()
        .map_err(|e| GeoTiffError::Decode(format!("cannot read image data: {}", e)))?;

    let (sample_format, data) = match image {
        DecodingResult::U8(buf) => (SampleFormat::U8, widen(buf)),
        DecodingResult::U16(buf) => (SampleFormat::U16, widen(buf)),
        DecodingResult::I16(buf) => (SampleFormat::I16, widen(buf)),
        DecodingResult::I32(buf) => (SampleFormat::I32, widen(buf)),
        DecodingResult::F32(buf) => (SampleFormat::F32, widen(buf)),
        DecodingResult::F64(buf) => (SampleFormat::F64, buf),
        _ => {
            return Err(GeoTiffError::UnsupportedSampleFormat(
                "expected uint8, uint16, int16, int32, float32 or float64 samples".to_string(),
            ))
        }
    };

    let crs = match geokeys {
        Some(dir) => dir.crs()?,
        None => None,
    };

    Ok(RasterLayer::new(width, height, data, sample_format, transform)?
        .with_crs(crs)
        .with_nodata(nodata))
}

fn widen<T: Copy + Into<f64>>(buf: Vec<T>) -> Vec<f64> {
    buf.into_iter().map(Into::into).collect()
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform, GeoTiffError> {
    let scale = find_f64_vec(decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = find_f64_vec(decoder, Tag::ModelTiepointTag)?;

    match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) if scale.len() >= 2 && tiepoint.len() >= 6 => {
            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            if scale[0] <= 0.0 || scale[1] <= 0.0 {
                return Err(GeoTiffError::MissingGeoreference(format!(
                    "non-positive pixel scale {:?}",
                    scale
                )));
            }
            Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
        }
        _ => read_model_transformation(decoder),
    }
}

/// Fallback for files georeferenced with a 4x4 row-major ModelTransformation matrix.
fn read_model_transformation<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform, GeoTiffError> {
    let matrix = find_f64_vec(decoder, Tag::ModelTransformationTag)?.ok_or_else(|| {
        GeoTiffError::MissingGeoreference(
            "ModelPixelScale + ModelTiepoint or ModelTransformation tags are required".to_string(),
        )
    })?;

    if matrix.len() < 16 {
        return Err(GeoTiffError::MissingGeoreference(format!(
            "ModelTransformation has {} values, expected 16",
            matrix.len()
        )));
    }
    if matrix[1] != 0.0 || matrix[4] != 0.0 {
        return Err(GeoTiffError::MissingGeoreference(
            "rotated rasters are not supported".to_string(),
        ));
    }

    Ok(GeoTransform::new(matrix[3], matrix[7], matrix[0], matrix[5]))
}

fn read_geokeys<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoKeyDirectory>, GeoTiffError> {
    let Some(directory) = find_u16_vec(decoder, Tag::GeoKeyDirectoryTag)? else {
        return Ok(None);
    };
    let doubles = find_f64_vec(decoder, Tag::GeoDoubleParamsTag)?;
    let ascii = find_ascii(decoder, Tag::GeoAsciiParamsTag)?;

    GeoKeyDirectory::parse(&directory, doubles.as_deref(), ascii.as_deref()).map(Some)
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>, GeoTiffError> {
    let Some(text) = find_ascii(decoder, Tag::GdalNodata)? else {
        return Ok(None);
    };

    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    match text.parse::<f64>() {
        Ok(value) => Ok(Some(value)),
        Err(_) if text.eq_ignore_ascii_case("nan") => Ok(Some(f64::NAN)),
        Err(_) => {
            warn!(value = text, "Ignoring unparseable GDAL_NODATA tag");
            Ok(None)
        }
    }
}

fn find_u16_vec<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<Vec<u16>>, GeoTiffError> {
    decoder
        .find_tag_unsigned_vec::<u16>(tag)
        .map_err(|e| GeoTiffError::Decode(format!("tag {:?}: {}", tag, e)))
}

fn find_f64_vec<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<Vec<f64>>, GeoTiffError> {
    decoder
        .find_tag(tag)
        .and_then(|v| v.map(|v| v.into_f64_vec()).transpose())
        .map_err(|e| GeoTiffError::Decode(format!("tag {:?}: {}", tag, e)))
}

fn find_ascii<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<String>, GeoTiffError> {
    decoder
        .find_tag(tag)
        .and_then(|v| v.map(|v| v.into_string()).transpose())
        .map_err(|e| GeoTiffError::Decode(format!("tag {:?}: {}", tag, e)))
}
