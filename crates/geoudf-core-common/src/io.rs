//! I/O traits for reading and writing geospatial data.
//!
//! This module defines the codec traits that format implementations must
//! provide. The core pipeline only ever talks to these traits, so the concrete
//! file formats stay swappable.

use std::path::Path;

use anyhow::Result;
use arrow_array::RecordBatch;

use crate::geo_transform::GeoTransform;
use crate::raster::{BandArray, SampleType};

/// An opened raster source.
///
/// Opening a dataset reads its metadata only; band samples are decoded on
/// demand by [`RasterDataset::read_band`]. Dropping the dataset releases any
/// file handle it holds.
pub trait RasterDataset {
    /// Number of bands in the source.
    fn band_count(&self) -> usize;

    /// Sample type of band 1, probed without decoding pixel data.
    fn sample_type(&self) -> SampleType;

    /// Raster size as `(rows, columns)`.
    fn size(&self) -> (usize, usize);

    /// Affine georeferencing of the raster.
    fn geo_transform(&self) -> GeoTransform;

    /// Projection descriptor, empty when the source has none.
    fn projection(&self) -> &str;

    /// Reads the full 2-D array of the zero-based band `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the band does not exist or cannot be decoded.
    fn read_band(&mut self, index: usize) -> Result<BandArray>;
}

/// Everything needed to write one raster file.
#[derive(Debug, Clone, Copy)]
pub struct RasterWrite<'a> {
    /// Band data, one entry per output band, all of one shape.
    pub bands: &'a [BandArray],
    /// Georeferencing shared by every band.
    pub geo_transform: GeoTransform,
    /// Projection descriptor shared by every band.
    pub projection: &'a str,
}

/// Trait for raster file formats.
pub trait RasterFormat: Send + Sync {
    /// Short driver name (e.g. `"GTiff"`).
    fn name(&self) -> &'static str;

    /// File extension used for outputs, without the leading dot.
    fn extension(&self) -> &'static str;

    /// Opens a raster source for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its metadata parsed.
    fn open(&self, path: &Path) -> Result<Box<dyn RasterDataset>>;

    /// Writes a multi-band raster file, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or encoded.
    fn write(&self, path: &Path, raster: &RasterWrite<'_>) -> Result<()>;
}

/// Trait for vector file formats operating on whole attribute tables.
pub trait VectorFormat: Send + Sync {
    /// Short driver name (e.g. `"GeoJSON"`).
    fn name(&self) -> &'static str;

    /// File extension used for outputs, without the leading dot.
    fn extension(&self) -> &'static str;

    /// Reads the whole table, geometry column included.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    fn read(&self, path: &Path) -> Result<RecordBatch>;

    /// Writes the whole table, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or the table serialized.
    fn write(&self, path: &Path, table: &RecordBatch) -> Result<()>;
}
