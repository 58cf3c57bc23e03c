//! GeoTIFF writing.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use geoudf_core_common::{BandArray, RasterWrite};
use ndarray::ArrayView2;
use tiff::encoder::colortype::{
    ColorType, Gray8, Gray16, Gray32, Gray32Float, Gray64, Gray64Float, GrayI8, GrayI16,
    GrayI32, GrayI64,
};
use tiff::encoder::{Compression, DeflateLevel, TiffEncoder, TiffValue};

use crate::error::GeoTiffError;
use crate::georef::GeoTags;

/// Compression method for GeoTIFF output
#[derive(Debug, Clone, Copy, Default)]
pub enum GeoTiffCompression {
    /// No compression - fastest but largest files
    #[default]
    None,
    /// LZW compression - good balance of speed and size
    Lzw,
    /// Deflate (zlib) compression - better compression, slower
    Deflate,
}

impl GeoTiffCompression {
    fn to_tiff(self) -> Compression {
        match self {
            GeoTiffCompression::None => Compression::Uncompressed,
            GeoTiffCompression::Lzw => Compression::Lzw,
            GeoTiffCompression::Deflate => Compression::Deflate(DeflateLevel::Fast),
        }
    }
}

/// Writes `raster` to `path`, one directory per band.
///
/// # Errors
///
/// Returns an error when there are no bands, when bands disagree in shape or
/// are empty, or when the file cannot be created or encoded.
pub fn write_geotiff(
    path: &Path,
    raster: &RasterWrite<'_>,
    compression: GeoTiffCompression,
) -> Result<(), GeoTiffError> {
    let first = raster
        .bands
        .first()
        .ok_or_else(|| GeoTiffError::InvalidData("raster has no bands".to_string()))?;
    let (rows, cols) = first.dim();
    if rows == 0 || cols == 0 {
        return Err(GeoTiffError::InvalidData(
            "raster has zero dimensions".to_string(),
        ));
    }
    if let Some(position) = raster.bands.iter().position(|b| b.dim() != (rows, cols)) {
        return Err(GeoTiffError::InvalidData(format!(
            "band {} is {:?}, expected {:?}",
            position + 1,
            raster.bands[position].dim(),
            (rows, cols)
        )));
    }

    let file = File::create(path)?;
    let mut encoder =
        TiffEncoder::new(BufWriter::new(file))?.with_compression(compression.to_tiff());
    let tags = GeoTags::new(raster.geo_transform, raster.projection);

    for band in raster.bands {
        match band {
            BandArray::UInt8(a) => write_band::<_, Gray8>(&mut encoder, a.view(), &tags)?,
            BandArray::UInt16(a) => write_band::<_, Gray16>(&mut encoder, a.view(), &tags)?,
            BandArray::UInt32(a) => write_band::<_, Gray32>(&mut encoder, a.view(), &tags)?,
            BandArray::UInt64(a) => write_band::<_, Gray64>(&mut encoder, a.view(), &tags)?,
            BandArray::Int8(a) => write_band::<_, GrayI8>(&mut encoder, a.view(), &tags)?,
            BandArray::Int16(a) => write_band::<_, GrayI16>(&mut encoder, a.view(), &tags)?,
            BandArray::Int32(a) => write_band::<_, GrayI32>(&mut encoder, a.view(), &tags)?,
            BandArray::Int64(a) => write_band::<_, GrayI64>(&mut encoder, a.view(), &tags)?,
            BandArray::Float32(a) => write_band::<_, Gray32Float>(&mut encoder, a.view(), &tags)?,
            BandArray::Float64(a) => write_band::<_, Gray64Float>(&mut encoder, a.view(), &tags)?,
        }
    }

    Ok(())
}

fn write_band<W, C>(
    encoder: &mut TiffEncoder<W>,
    band: ArrayView2<'_, C::Inner>,
    tags: &GeoTags,
) -> Result<(), GeoTiffError>
where
    W: Write + Seek,
    C: ColorType,
    C::Inner: Copy,
    [C::Inner]: TiffValue,
{
    let (rows, cols) = band.dim();
    let width = u32::try_from(cols)
        .map_err(|_| GeoTiffError::InvalidData(format!("{cols} columns exceed TIFF limits")))?;
    let height = u32::try_from(rows)
        .map_err(|_| GeoTiffError::InvalidData(format!("{rows} rows exceed TIFF limits")))?;

    let mut image = encoder.new_image::<C>(width, height)?;
    tags.write(image.encoder())?;

    // Row-major regardless of the array's memory layout
    let samples: Vec<C::Inner> = band.iter().copied().collect();
    image.write_data(&samples)?;
    Ok(())
}
