//! Configuration of a single UDF run.

use std::path::PathBuf;

use crate::drivers::{Driver, DriverKind, find_driver};
use crate::error::{DriverError, Result, driver_not_found};
use crate::writer::OutputPrecision;

/// Default raster driver short name.
pub const DEFAULT_RASTER_DRIVER: &str = "GTiff";

/// Default vector driver short name.
pub const DEFAULT_VECTOR_DRIVER: &str = "GeoJSON";

/// Inputs, outputs and codec choices of one run.
///
/// # Examples
///
/// ```
/// use geoudf_core::config::RunConfig;
/// use geoudf_core::writer::OutputPrecision;
///
/// let config = RunConfig::new()
///     .with_raster_files(["t0.tif", "t1.tif"])
///     .with_band_names(["RED", "NIR"])
///     .with_output_dir("/tmp/out")
///     .with_output_precision(OutputPrecision::Float64);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Single-time raster sources, in time order
    pub raster_files: Vec<PathBuf>,
    pub vector_files: Vec<PathBuf>,
    /// One name per band of the raster sources
    pub band_names: Vec<String>,
    pub output_dir: PathBuf,
    pub output_precision: OutputPrecision,
    pub raster_driver: String,
    pub vector_driver: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            raster_files: Vec::new(),
            vector_files: Vec::new(),
            band_names: Vec::new(),
            output_dir: default_output_dir(),
            output_precision: OutputPrecision::default(),
            raster_driver: DEFAULT_RASTER_DRIVER.to_string(),
            vector_driver: DEFAULT_VECTOR_DRIVER.to_string(),
        }
    }
}

/// `geoudf_output` under the system temporary directory.
#[must_use]
pub fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("geoudf_output")
}

impl RunConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_raster_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.raster_files = files.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_vector_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.vector_files = files.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_band_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.band_names = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_output_precision(mut self, precision: OutputPrecision) -> Self {
        self.output_precision = precision;
        self
    }

    #[must_use]
    pub fn with_raster_driver(mut self, name: impl Into<String>) -> Self {
        self.raster_driver = name.into();
        self
    }

    #[must_use]
    pub fn with_vector_driver(mut self, name: impl Into<String>) -> Self {
        self.vector_driver = name.into();
        self
    }

    /// Checks the configuration before any file is touched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoSources`](crate::error::ConfigError::NoSources)
    /// when there is nothing to read, and a [`DriverError`] when a driver is
    /// unknown, of the wrong kind, or cannot both read and write.
    pub fn validate(&self) -> Result<()> {
        if self.raster_files.is_empty() && self.vector_files.is_empty() {
            return Err(crate::error::ConfigError::NoSources.into());
        }
        check_driver(&self.raster_driver, DriverKind::Raster)?;
        check_driver(&self.vector_driver, DriverKind::Vector)?;
        Ok(())
    }
}

fn check_driver(name: &str, kind: DriverKind) -> Result<Driver> {
    let driver = find_driver(name).ok_or_else(|| driver_not_found(name))?;
    let unsupported = |operation: &str| DriverError::OperationNotSupported {
        driver: driver.short_name.to_string(),
        operation: operation.to_string(),
    };

    if driver.kind != kind {
        return Err(unsupported(&format!("{} data", kind.as_str().to_lowercase())).into());
    }
    if !driver.capabilities.read.is_supported() {
        return Err(unsupported("reading").into());
    }
    if !driver.capabilities.write.is_supported() {
        return Err(unsupported("writing").into());
    }
    Ok(driver)
}
