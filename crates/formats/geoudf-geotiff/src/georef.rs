//! GeoTIFF georeferencing tags.

use std::io::{Read, Seek, Write};

use geoudf_core_common::GeoTransform;
use tiff::TiffResult;
use tiff::decoder::Decoder;
use tiff::decoder::ifd::Value;
use tiff::encoder::{DirectoryEncoder, TiffKind};
use tiff::tags::Tag;

// GeoKey IDs
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GT_CITATION_GEO_KEY: u16 = 1026;

// GeoKey values
const RASTER_PIXEL_IS_AREA: u16 = 1;

// TIFF tag id of GeoAsciiParams, referenced from inside the key directory
const GEO_ASCII_PARAMS: u16 = 34737;

/// Georeferencing written alongside every band.
#[derive(Debug, Clone)]
pub(crate) struct GeoTags {
    geo_transform: GeoTransform,
    projection: String,
}

impl GeoTags {
    pub(crate) fn new(geo_transform: GeoTransform, projection: &str) -> Self {
        Self {
            geo_transform,
            projection: projection.to_string(),
        }
    }

    pub(crate) fn write<W: Write + Seek, K: TiffKind>(
        &self,
        dir: &mut DirectoryEncoder<'_, W, K>,
    ) -> TiffResult<()> {
        let gt = &self.geo_transform.0;

        if self.geo_transform.is_rotated() {
            // Row-major 4x4 model transformation matrix
            let matrix = [
                gt[1], gt[2], 0.0, gt[0], //
                gt[4], gt[5], 0.0, gt[3], //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ];
            dir.write_tag(Tag::ModelTransformationTag, matrix.as_slice())?;
        } else {
            // ModelPixelScale: [ScaleX, ScaleY, ScaleZ]
            let pixel_scale = [gt[1], -gt[5], 0.0];
            dir.write_tag(Tag::ModelPixelScaleTag, pixel_scale.as_slice())?;

            // ModelTiepoint: pixel (0, 0) to the upper-left corner
            let tiepoint = [0.0, 0.0, 0.0, gt[0], gt[3], 0.0];
            dir.write_tag(Tag::ModelTiepointTag, tiepoint.as_slice())?;
        }

        let geokeys = self.build_geokey_directory();
        dir.write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())?;

        if !self.projection.is_empty() {
            // GeoAsciiParams entries are pipe-terminated
            let ascii_params = format!("{}|", self.projection);
            dir.write_tag(Tag::GeoAsciiParamsTag, ascii_params.as_str())?;
        }

        Ok(())
    }

    fn build_geokey_directory(&self) -> Vec<u16> {
        // [KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys,
        //  KeyID1, TIFFTagLocation1, Count1, Value_Offset1, ...]
        let mut keys = vec![1, 1, 0, 1];
        keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);

        if !self.projection.is_empty() {
            let count = u16::try_from(self.projection.len() + 1).unwrap_or(u16::MAX);
            keys.extend_from_slice(&[GT_CITATION_GEO_KEY, GEO_ASCII_PARAMS, count, 0]);
            keys[3] = 2;
        }

        keys
    }
}

/// Reads the geotransform of the current image.
///
/// Falls back to [`GeoTransform::IDENTITY`] when the image carries no
/// georeferencing tags.
pub(crate) fn read_geo_transform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
) -> TiffResult<GeoTransform> {
    if let Some(value) = decoder.find_tag(Tag::ModelTransformationTag)? {
        let m = value.into_f64_vec()?;
        if m.len() >= 8 {
            return Ok(GeoTransform([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .map(Value::into_f64_vec)
        .transpose()?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .map(Value::into_f64_vec)
        .transpose()?;

    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
            Ok(GeoTransform([
                x - i * scale[0],
                scale[0],
                0.0,
                y + j * scale[1],
                0.0,
                -scale[1],
            ]))
        },
        _ => Ok(GeoTransform::IDENTITY),
    }
}

/// Reads the projection descriptor stored in `GeoAsciiParams`, or `""`.
pub(crate) fn read_projection<R: Read + Seek>(decoder: &mut Decoder<R>) -> TiffResult<String> {
    let text = match decoder.find_tag(Tag::GeoAsciiParamsTag)? {
        Some(Value::Ascii(text)) => text,
        Some(Value::List(items)) => {
            let bytes: Vec<u8> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Byte(byte) => Some(byte),
                    _ => None,
                })
                .collect();
            String::from_utf8_lossy(&bytes).into_owned()
        },
        _ => String::new(),
    };

    Ok(text.trim_end_matches(['\0', '|']).to_string())
}
