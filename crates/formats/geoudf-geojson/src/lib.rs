//! GeoJSON codec for `geoudf`.
//!
//! Features are exchanged as a single Arrow [`RecordBatch`]: one nullable
//! column per property plus a trailing WKT geometry column tagged with the
//! `geoarrow.wkt` extension name.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use geoudf_core_common::VectorFormat;
//! use geoudf_geojson::GeoJsonFormat;
//!
//! let format = GeoJsonFormat::default();
//! let batch = format.read(Path::new("parcels.geojson"))?;
//! format.write(Path::new("parcels_out.geojson"), &batch)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod error;
pub mod parser;
pub mod table;
pub mod writer;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use arrow_array::RecordBatch;
use geoudf_core_common::VectorFormat;
use log::debug;

pub use error::GeoJsonError;
pub use parser::{FeatureRecord, parse_geojson_bytes};
pub use table::{
    FEATURE_ID_COLUMN, FEATURE_ID_METADATA_KEY, JSON_METADATA_KEY, records_to_batch,
};
pub use writer::{
    GeoJsonWriterOptions, batches_to_feature_collection, write_geojson, write_geojson_to_bytes,
};

/// Reads a GeoJSON file into a record batch.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid GeoJSON.
pub fn read_geojson_file(path: &Path) -> Result<RecordBatch, GeoJsonError> {
    let bytes = std::fs::read(path)?;
    let records = parse_geojson_bytes(&bytes, path.display().to_string())?;
    debug!("Parsed {} feature(s) from {}", records.len(), path.display());
    records_to_batch(&records)
}

/// Writes a record batch to a GeoJSON file, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or the batch cannot be
/// converted.
pub fn write_geojson_file(
    path: &Path,
    batch: &RecordBatch,
    options: &GeoJsonWriterOptions,
) -> Result<(), GeoJsonError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_geojson(&mut writer, std::slice::from_ref(batch), options)?;
    writer.flush()?;
    Ok(())
}

/// GeoJSON implementation of [`VectorFormat`].
#[derive(Debug, Clone, Default)]
pub struct GeoJsonFormat {
    writer_options: GeoJsonWriterOptions,
}

impl GeoJsonFormat {
    /// Create a format with default writer options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set writer options
    #[must_use]
    pub fn with_writer_options(mut self, options: GeoJsonWriterOptions) -> Self {
        self.writer_options = options;
        self
    }
}

impl VectorFormat for GeoJsonFormat {
    fn name(&self) -> &'static str {
        "GeoJSON"
    }

    fn extension(&self) -> &'static str {
        "geojson"
    }

    fn read(&self, path: &Path) -> anyhow::Result<RecordBatch> {
        Ok(read_geojson_file(path)?)
    }

    fn write(&self, path: &Path, batch: &RecordBatch) -> anyhow::Result<()> {
        Ok(write_geojson_file(path, batch, &self.writer_options)?)
    }
}
