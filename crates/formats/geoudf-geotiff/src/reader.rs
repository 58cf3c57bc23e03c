//! GeoTIFF reading.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use geoudf_core_common::{BandArray, GeoTransform, RasterDataset, SampleType};
use log::debug;
use ndarray::Array2;
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

use crate::error::GeoTiffError;
use crate::georef::{read_geo_transform, read_projection};

/// An opened GeoTIFF file.
///
/// Opening reads the first directory's metadata and counts the directories;
/// the file handle is closed again before [`GeoTiffDataset::open`] returns.
/// Each [`read_band`](RasterDataset::read_band) call reopens the file and
/// decodes a single directory.
#[derive(Debug, Clone)]
pub struct GeoTiffDataset {
    path: PathBuf,
    band_count: usize,
    sample_type: SampleType,
    rows: usize,
    cols: usize,
    geo_transform: GeoTransform,
    projection: String,
}

impl GeoTiffDataset {
    /// Opens `path` and reads its metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not a TIFF, or if its first image is not
    /// a single-sample grayscale image of a supported sample type.
    pub fn open(path: &Path) -> Result<Self, GeoTiffError> {
        let mut decoder = open_decoder(path)?;

        let (width, height) = decoder.dimensions()?;
        let sample_type = probe_sample_type(&mut decoder)?;
        let geo_transform = read_geo_transform(&mut decoder)?;
        let projection = read_projection(&mut decoder)?;

        let mut band_count = 1;
        while decoder.more_images() {
            decoder.next_image()?;
            band_count += 1;
        }

        debug!(
            "Opened {}: {band_count} band(s), {width}x{height}, {sample_type}",
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            band_count,
            sample_type,
            rows: height as usize,
            cols: width as usize,
            geo_transform,
            projection,
        })
    }

    fn decode_band(&self, index: usize) -> Result<BandArray, GeoTiffError> {
        if index >= self.band_count {
            return Err(GeoTiffError::BandOutOfRange {
                index,
                count: self.band_count,
            });
        }

        let mut decoder = open_decoder(&self.path)?;
        for _ in 0..index {
            decoder.next_image()?;
        }

        let (width, height) = decoder.dimensions()?;
        if (height as usize, width as usize) != (self.rows, self.cols) {
            return Err(GeoTiffError::InvalidData(format!(
                "band {} is {width}x{height}, expected {}x{}",
                index + 1,
                self.cols,
                self.rows
            )));
        }
        probe_sample_type(&mut decoder)?;

        let shape = (self.rows, self.cols);
        let band = match decoder.read_image()? {
            DecodingResult::U8(samples) => BandArray::UInt8(to_array(shape, samples)?),
            DecodingResult::U16(samples) => BandArray::UInt16(to_array(shape, samples)?),
            DecodingResult::U32(samples) => BandArray::UInt32(to_array(shape, samples)?),
            DecodingResult::U64(samples) => BandArray::UInt64(to_array(shape, samples)?),
            DecodingResult::I8(samples) => BandArray::Int8(to_array(shape, samples)?),
            DecodingResult::I16(samples) => BandArray::Int16(to_array(shape, samples)?),
            DecodingResult::I32(samples) => BandArray::Int32(to_array(shape, samples)?),
            DecodingResult::I64(samples) => BandArray::Int64(to_array(shape, samples)?),
            DecodingResult::F32(samples) => BandArray::Float32(to_array(shape, samples)?),
            DecodingResult::F64(samples) => BandArray::Float64(to_array(shape, samples)?),
            #[allow(unreachable_patterns)]
            _ => {
                return Err(GeoTiffError::Unsupported(format!(
                    "sample encoding of band {}",
                    index + 1
                )));
            },
        };
        Ok(band)
    }
}

impl RasterDataset for GeoTiffDataset {
    fn band_count(&self) -> usize {
        self.band_count
    }

    fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    fn size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn geo_transform(&self) -> GeoTransform {
        self.geo_transform
    }

    fn projection(&self) -> &str {
        &self.projection
    }

    fn read_band(&mut self, index: usize) -> anyhow::Result<BandArray> {
        Ok(self.decode_band(index)?)
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, GeoTiffError> {
    let file = File::open(path)?;
    let decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());
    Ok(decoder)
}

/// Derives the sample type from tags only; no strip or tile is decoded.
fn probe_sample_type<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<SampleType, GeoTiffError> {
    let bits = match decoder.colortype()? {
        ColorType::Gray(bits) => bits,
        other => {
            return Err(GeoTiffError::Unsupported(format!(
                "color type {other:?}; only single-sample bands are supported"
            )));
        },
    };

    // 1 = unsigned integer (the default), 2 = signed integer, 3 = IEEE float
    let format = decoder
        .find_tag_unsigned::<u16>(Tag::SampleFormat)?
        .unwrap_or(1);

    let sample_type = match (format, bits) {
        (1, 8) => SampleType::UInt8,
        (1, 16) => SampleType::UInt16,
        (1, 32) => SampleType::UInt32,
        (1, 64) => SampleType::UInt64,
        (2, 8) => SampleType::Int8,
        (2, 16) => SampleType::Int16,
        (2, 32) => SampleType::Int32,
        (2, 64) => SampleType::Int64,
        (3, 32) => SampleType::Float32,
        (3, 64) => SampleType::Float64,
        _ => {
            return Err(GeoTiffError::Unsupported(format!(
                "{bits}-bit samples with sample format {format}"
            )));
        },
    };
    Ok(sample_type)
}

fn to_array<T>(shape: (usize, usize), samples: Vec<T>) -> Result<Array2<T>, GeoTiffError> {
    Array2::from_shape_vec(shape, samples)
        .map_err(|e| {
            GeoTiffError::InvalidData(format!("decoded samples do not fit {shape:?}: {e}"))
        })
}
