//! GeoTIFF encoding.

use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

use num_traits::{NumCast, Zero};
use tiff::encoder::colortype::{ColorType, Gray16, Gray32Float, Gray64Float, Gray8, GrayI16, GrayI32};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::GeoTiffError;
use crate::geokeys::GeoKeyDirectory;
use crate::raster::{RasterLayer, SampleFormat};

/// Write a raster to a GeoTIFF file, replacing any existing file.
///
/// The sample format, georeferencing, CRS keys and nodata value of the
/// raster are all carried into the file.
pub fn write_raster<P: AsRef<Path>>(raster: &RasterLayer, path: P) -> Result<(), GeoTiffError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    encode_raster(raster, &mut writer)?;
    writer.flush()?;

    debug!(
        path = %path.display(),
        width = raster.width(),
        height = raster.height(),
        sample_format = raster.sample_format().name(),
        "Wrote raster"
    );
    Ok(())
}

/// Encode a raster into an in-memory GeoTIFF.
pub fn write_raster_to_buffer(raster: &RasterLayer) -> Result<Vec<u8>, GeoTiffError> {
    let mut buf = Vec::new();
    encode_raster(raster, &mut Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_raster<W: Write + Seek>(raster: &RasterLayer, writer: W) -> Result<(), GeoTiffError> {
    let mut encoder = TiffEncoder::new(writer).map_err(|e| GeoTiffError::Encode(e.to_string()))?;

    match raster.sample_format() {
        SampleFormat::U8 => encode_image::<Gray8, _>(&mut encoder, raster, &narrow::<u8>(raster)),
        SampleFormat::U16 => encode_image::<Gray16, _>(&mut encoder, raster, &narrow::<u16>(raster)),
        SampleFormat::I16 => encode_image::<GrayI16, _>(&mut encoder, raster, &narrow::<i16>(raster)),
        SampleFormat::I32 => encode_image::<GrayI32, _>(&mut encoder, raster, &narrow::<i32>(raster)),
        SampleFormat::F32 => encode_image::<Gray32Float, _>(&mut encoder, raster, &narrow::<f32>(raster)),
        SampleFormat::F64 => encode_image::<Gray64Float, _>(&mut encoder, raster, raster.data()),
    }
}

/// Convert pixel values back to the on-disk type. Values that do not fit
/// (including NaN for integer formats) become the nodata sentinel.
fn narrow<T: NumCast + Zero + Copy>(raster: &RasterLayer) -> Vec<T> {
    let fallback_value = raster.nodata().unwrap_or_else(|| raster.sample_format().default_nodata());
    let fallback: Option<T> = NumCast::from(fallback_value);

    raster
        .data()
        .iter()
        .map(|&v| NumCast::from(v).or(fallback).unwrap_or_else(T::zero))
        .collect()
}

fn encode_image<C, W>(encoder: &mut TiffEncoder<W>, raster: &RasterLayer, data: &[C::Inner]) -> Result<(), GeoTiffError>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let mut image = encoder
        .new_image::<C>(raster.width() as u32, raster.height() as u32)
        .map_err(|e| GeoTiffError::Encode(format!("cannot create image: {}", e)))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];

    let dir = image.encoder();
    dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(|e| GeoTiffError::Encode(format!("cannot write pixel scale: {}", e)))?;
    dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(|e| GeoTiffError::Encode(format!("cannot write tiepoint: {}", e)))?;

    if let Some(crs) = raster.crs() {
        let (keys, doubles, ascii) = GeoKeyDirectory::from_crs(crs).encode();
        dir.write_tag(Tag::GeoKeyDirectoryTag, &keys[..])
            .map_err(|e| GeoTiffError::Encode(format!("cannot write GeoKey directory: {}", e)))?;
        if !doubles.is_empty() {
            dir.write_tag(Tag::GeoDoubleParamsTag, &doubles[..])
                .map_err(|e| GeoTiffError::Encode(format!("cannot write GeoKey doubles: {}", e)))?;
        }
        if !ascii.is_empty() {
            dir.write_tag(Tag::GeoAsciiParamsTag, ascii.as_str())
                .map_err(|e| GeoTiffError::Encode(format!("cannot write GeoKey ASCII: {}", e)))?;
        }
    }

    if let Some(nodata) = raster.nodata() {
        let text = if nodata.is_nan() { "nan".to_string() } else { nodata.to_string() };
        dir.write_tag(Tag::GdalNodata, text.as_str())
            .map_err(|e| GeoTiffError::Encode(format!("cannot write nodata: {}", e)))?;
    }

    image
        .write_data(data)
        .map_err(|e| GeoTiffError::Encode(format!("cannot write image data: {}", e)))
}
