//! Serialization of the data context after execution.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use geoudf_core_common::{BandArray, RasterFormat, RasterWrite, SampleType, VectorFormat};
use log::{debug, info};

use crate::context::UdfDataContext;
use crate::error::{ConfigError, IoError, IoErrorExt, Result};
use crate::tile::RasterCollectionTile;

/// Sample type of written rasters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputPrecision {
    /// `Float64` when the first raster tile is `Float64`, otherwise `Float32`
    #[default]
    MatchInput,
    Float32,
    Float64,
}

impl OutputPrecision {
    pub const ALL: [Self; 3] = [Self::MatchInput, Self::Float32, Self::Float64];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MatchInput => "match-input",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Sample type written for a tile of `input` samples.
    #[must_use]
    pub fn output_type(&self, input: SampleType) -> SampleType {
        match self {
            Self::MatchInput if input == SampleType::Float64 => SampleType::Float64,
            Self::MatchInput | Self::Float32 => SampleType::Float32,
            Self::Float64 => SampleType::Float64,
        }
    }
}

impl fmt::Display for OutputPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputPrecision {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::InvalidOption {
                option: "output-precision".to_string(),
                message: format!("'{s}' is not one of match-input, float32, float64"),
            })
    }
}

/// Writes the raster and feature tiles of a context to an output directory.
///
/// Rasters are written per slice: `{first-tile-id}_{slice}.{ext}` holds one
/// band per raster tile, in tile order. All bands of a file share the sample
/// type the precision policy picks for the first tile. Feature tiles are
/// written as `{id}.{ext}`.
#[derive(Clone)]
pub struct ResultWriter {
    raster_format: Arc<dyn RasterFormat>,
    vector_format: Arc<dyn VectorFormat>,
    output_dir: PathBuf,
    precision: OutputPrecision,
}

impl ResultWriter {
    #[must_use]
    pub fn new(
        raster_format: Arc<dyn RasterFormat>,
        vector_format: Arc<dyn VectorFormat>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            raster_format,
            vector_format,
            output_dir: output_dir.into(),
            precision: OutputPrecision::default(),
        }
    }

    #[must_use]
    pub fn with_precision(mut self, precision: OutputPrecision) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every tile of `context` and returns the written paths.
    ///
    /// Files written before a failure are left on disk.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Write`] if the output directory cannot be created, a
    /// raster tile does not match the first tile's slice count or size, or a
    /// file cannot be written.
    pub fn write(&self, context: &UdfDataContext) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir).with_write_context("directory", &self.output_dir)?;

        let mut written = self.write_rasters(context)?;

        for tile in &context.feature_tiles {
            let path = self
                .output_dir
                .join(format!("{}.{}", tile.id, self.vector_format.extension()));
            self.vector_format
                .write(&path, &tile.data)
                .with_write_context(self.vector_format.name(), &path)?;
            debug!("Wrote {} feature(s) to {}", tile.len(), path.display());
            written.push(path);
        }

        info!(
            "Wrote {} file(s) to {}",
            written.len(),
            self.output_dir.display()
        );
        Ok(written)
    }

    fn write_rasters(&self, context: &UdfDataContext) -> Result<Vec<PathBuf>> {
        let Some(first) = context.raster_tiles.first() else {
            debug!("No raster tiles to write");
            return Ok(Vec::new());
        };

        let slices = first.slice_count();
        let size = first.size();
        let geo_transform = first.extent.to_geo_transform();
        // A raster file has one sample type, chosen from the first tile.
        let output_type = self.precision.output_type(first.sample_type());

        let mut written = Vec::with_capacity(slices);
        for slice in 0..slices {
            let path = self.output_dir.join(format!(
                "{}_{slice}.{}",
                first.id,
                self.raster_format.extension()
            ));

            let bands = context
                .raster_tiles
                .iter()
                .map(|tile| self.band_at(tile, slice, slices, size, output_type, &path))
                .collect::<Result<Vec<_>>>()?;

            self.raster_format
                .write(
                    &path,
                    &RasterWrite {
                        bands: &bands,
                        geo_transform,
                        projection: &context.projection,
                    },
                )
                .with_write_context(self.raster_format.name(), &path)?;
            debug!("Wrote slice {slice} ({} band(s)) to {}", bands.len(), path.display());
            written.push(path);
        }
        Ok(written)
    }

    fn band_at(
        &self,
        tile: &RasterCollectionTile,
        slice: usize,
        slices: usize,
        size: (usize, usize),
        output_type: SampleType,
        path: &Path,
    ) -> Result<BandArray> {
        let mismatch = |reason: String| IoError::Write {
            format: self.raster_format.name().to_string(),
            path: path.to_path_buf(),
            source: reason.into(),
        };

        if tile.slice_count() != slices {
            return Err(mismatch(format!(
                "tile '{}' has {} slice(s), expected {slices}",
                tile.id,
                tile.slice_count()
            ))
            .into());
        }
        if tile.size() != size {
            return Err(mismatch(format!(
                "tile '{}' is {:?}, expected {size:?}",
                tile.id,
                tile.size()
            ))
            .into());
        }

        let band = tile
            .data
            .slice(slice)
            .ok_or_else(|| mismatch(format!("tile '{}' has no slice {slice}", tile.id)))?;
        Ok(match output_type {
            SampleType::Float64 => band.to_float64(),
            _ => band.to_float32(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::Result as AnyResult;
    use arrow_array::RecordBatch;
    use geoudf_core_common::{CubeArray, GeoTransform, RasterDataset};
    use tempfile::TempDir;

    use super::*;
    use crate::error::UdfError;
    use crate::extent::SpatialExtent;

    /// Records writes instead of touching the file system.
    #[derive(Default)]
    struct Recorder {
        rasters: Mutex<Vec<(PathBuf, Vec<SampleType>, GeoTransform, String)>>,
    }

    impl RasterFormat for Recorder {
        fn name(&self) -> &'static str {
            "Rec"
        }

        fn extension(&self) -> &'static str {
            "rec"
        }

        fn open(&self, _path: &Path) -> AnyResult<Box<dyn RasterDataset>> {
            anyhow::bail!("write only")
        }

        fn write(&self, path: &Path, raster: &RasterWrite<'_>) -> AnyResult<()> {
            if let Ok(mut rasters) = self.rasters.lock() {
                rasters.push((
                    path.to_path_buf(),
                    raster.bands.iter().map(BandArray::sample_type).collect(),
                    raster.geo_transform,
                    raster.projection.to_string(),
                ));
            }
            Ok(())
        }
    }

    struct NullVector;

    impl VectorFormat for NullVector {
        fn name(&self) -> &'static str {
            "Null"
        }

        fn extension(&self) -> &'static str {
            "null"
        }

        fn read(&self, _path: &Path) -> AnyResult<RecordBatch> {
            anyhow::bail!("write only")
        }

        fn write(&self, _path: &Path, _table: &RecordBatch) -> AnyResult<()> {
            Ok(())
        }
    }

    fn tile(
        id: &str,
        sample_type: SampleType,
        shape: (usize, usize, usize),
    ) -> RasterCollectionTile {
        RasterCollectionTile::new(
            id,
            CubeArray::zeros(sample_type, shape),
            SpatialExtent::from_geo_transform(
                &GeoTransform([100.0, 10.0, 0.0, 500.0, 0.0, -10.0]),
                shape.1,
                shape.2,
            ),
        )
    }

    #[test]
    fn test_precision_policy() {
        let p = OutputPrecision::MatchInput;
        assert_eq!(p.output_type(SampleType::UInt16), SampleType::Float32);
        assert_eq!(p.output_type(SampleType::Float64), SampleType::Float64);
        assert_eq!(
            OutputPrecision::Float32.output_type(SampleType::Float64),
            SampleType::Float32
        );
        assert_eq!(
            OutputPrecision::Float64.output_type(SampleType::UInt8),
            SampleType::Float64
        );
    }

    #[test]
    fn test_precision_parse() {
        assert_eq!("match-input".parse::<OutputPrecision>().unwrap(), OutputPrecision::MatchInput);
        assert_eq!("Float64".parse::<OutputPrecision>().unwrap(), OutputPrecision::Float64);
        assert!(matches!(
            "double".parse::<OutputPrecision>(),
            Err(ConfigError::InvalidOption { .. })
        ));
        assert_eq!(OutputPrecision::Float32.to_string(), "float32");
    }

    #[test]
    fn test_one_file_per_slice_named_after_first_tile() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let writer = ResultWriter::new(recorder.clone(), Arc::new(NullVector), dir.path());
        let context = UdfDataContext::new(
            "EPSG:32633",
            vec![
                tile("RED", SampleType::UInt16, (3, 4, 5)),
                tile("NIR", SampleType::Float64, (3, 4, 5)),
            ],
            vec![],
        );

        let written = writer.write(&context).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["RED_0.rec", "RED_1.rec", "RED_2.rec"]);

        let rasters = recorder.rasters.lock().unwrap();
        assert_eq!(rasters.len(), 3);
        let (_, types, geo_transform, projection) = &rasters[0];
        assert_eq!(types, &vec![SampleType::Float32, SampleType::Float32]);
        assert_eq!(*geo_transform, GeoTransform([100.0, 10.0, 0.0, 500.0, 0.0, -10.0]));
        assert_eq!(projection, "EPSG:32633");
    }

    #[test]
    fn test_first_tile_decides_sample_type_of_every_band() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let writer = ResultWriter::new(recorder.clone(), Arc::new(NullVector), dir.path());
        let context = UdfDataContext::new(
            "",
            vec![
                tile("NDVI", SampleType::Float64, (2, 4, 5)),
                tile("RED", SampleType::UInt16, (2, 4, 5)),
                tile("MASK", SampleType::UInt8, (2, 4, 5)),
            ],
            vec![],
        );

        writer.write(&context).unwrap();

        let rasters = recorder.rasters.lock().unwrap();
        assert_eq!(rasters.len(), 2);
        for (_, types, _, _) in rasters.iter() {
            assert_eq!(types, &vec![SampleType::Float64; 3]);
        }
    }

    #[test]
    fn test_forced_precision_applies_to_every_band() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let writer = ResultWriter::new(recorder.clone(), Arc::new(NullVector), dir.path())
            .with_precision(OutputPrecision::Float32);
        let context = UdfDataContext::new(
            "",
            vec![
                tile("NDVI", SampleType::Float64, (1, 4, 5)),
                tile("RED", SampleType::Int16, (1, 4, 5)),
            ],
            vec![],
        );

        writer.write(&context).unwrap();

        let rasters = recorder.rasters.lock().unwrap();
        assert_eq!(rasters[0].1, vec![SampleType::Float32; 2]);
    }

    #[test]
    fn test_mismatched_tile_is_write_error() {
        let dir = TempDir::new().unwrap();
        let writer =
            ResultWriter::new(Arc::new(Recorder::default()), Arc::new(NullVector), dir.path());
        let context = UdfDataContext::new(
            "",
            vec![
                tile("RED", SampleType::Float32, (2, 4, 5)),
                tile("NDVI", SampleType::Float32, (1, 4, 5)),
            ],
            vec![],
        );

        let err = writer.write(&context).unwrap_err();
        assert!(matches!(err, UdfError::Io(IoError::Write { .. })));
        assert!(err.to_string().contains("NDVI"));
    }

    #[test]
    fn test_creates_output_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let writer = ResultWriter::new(Arc::new(Recorder::default()), Arc::new(NullVector), &nested)
            .with_precision(OutputPrecision::Float64);

        let written = writer.write(&UdfDataContext::default()).unwrap();
        assert!(written.is_empty());
        assert!(nested.is_dir());
    }
}
