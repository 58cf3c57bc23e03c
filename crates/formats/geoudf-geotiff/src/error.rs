use thiserror::Error;

/// Error type for GeoTIFF reading and writing
#[derive(Debug, Error)]
pub enum GeoTiffError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// The file uses a layout this codec does not handle
    #[error("Unsupported raster layout: {0}")]
    Unsupported(String),

    /// Invalid raster data
    #[error("Invalid raster data: {0}")]
    InvalidData(String),

    /// Requested band does not exist
    #[error("Band {index} out of range; the file has {count} band(s)")]
    BandOutOfRange {
        /// Zero-based band requested
        index: usize,
        /// Number of bands in the file
        count: usize,
    },
}
