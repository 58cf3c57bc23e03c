//! GeoTIFF raster codec for `geoudf`.
//!
//! Bands are stored one per image file directory (IFD), each a single-sample
//! grayscale image in any of the sample types of
//! [`SampleType`](geoudf_core_common::SampleType). Georeferencing uses the
//! standard GeoTIFF tags; the projection descriptor travels verbatim in
//! `GeoAsciiParams`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use geoudf_core_common::RasterFormat;
//! use geoudf_geotiff::GeoTiffFormat;
//!
//! let format = GeoTiffFormat::default();
//! let mut dataset = format.open(Path::new("scene.tif"))?;
//! println!("{} band(s) of {}", dataset.band_count(), dataset.sample_type());
//! let band = dataset.read_band(0)?;
//! println!("{:?}", band.dim());
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::path::Path;

use geoudf_core_common::{RasterDataset, RasterFormat, RasterWrite};

mod error;
mod georef;
mod reader;
mod writer;

pub use error::GeoTiffError;
pub use reader::GeoTiffDataset;
pub use writer::{GeoTiffCompression, write_geotiff};

/// The `GTiff` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffFormat {
    compression: GeoTiffCompression,
}

impl GeoTiffFormat {
    /// Creates a format with uncompressed output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression method used when writing
    #[must_use]
    pub fn with_compression(mut self, compression: GeoTiffCompression) -> Self {
        self.compression = compression;
        self
    }
}

impl RasterFormat for GeoTiffFormat {
    fn name(&self) -> &'static str {
        "GTiff"
    }

    fn extension(&self) -> &'static str {
        "tif"
    }

    fn open(&self, path: &Path) -> anyhow::Result<Box<dyn RasterDataset>> {
        Ok(Box::new(GeoTiffDataset::open(path)?))
    }

    fn write(&self, path: &Path, raster: &RasterWrite<'_>) -> anyhow::Result<()> {
        write_geotiff(path, raster, self.compression)?;
        Ok(())
    }
}
