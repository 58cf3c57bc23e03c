//! Custom error types for `geoudf` operations.
//!
//! This module provides structured error handling using `thiserror`. Codec
//! crates report failures through `anyhow`; those are wrapped here with the
//! file and format they concern so the CLI can explain what went wrong.
//!
//! Every error is fatal to the run that raised it. Nothing is retried.

use std::path::PathBuf;
use std::time::Duration;

use geoudf_core_common::SampleType;
use thiserror::Error;

use crate::extent::SpatialExtent;

/// Boxed error carried as the source of wrapped failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for `geoudf` operations.
///
/// This is the root error type that encompasses all domain-specific errors.
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum UdfError {
    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sources disagree on band layout or sample type
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Sources disagree on georeferencing
    #[error(transparent)]
    Geometry(#[from] GeometryMismatchError),

    /// I/O errors (file read/write, path issues)
    #[error(transparent)]
    Io(#[from] IoError),

    /// The user transformation failed
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Driver-related errors (not found, unsupported operations)
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Configuration errors.
///
/// These errors occur when options or configuration are invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither raster nor vector sources were given
    #[error("No input sources: at least one raster or vector file is required")]
    NoSources,

    /// Declared band names do not match the bands found in the sources
    #[error("{declared} band name(s) declared but the raster sources have {detected} band(s)")]
    BandNameMismatch {
        /// Number of declared band names
        declared: usize,
        /// Number of bands detected in the sources
        detected: usize,
    },

    /// Required option is missing
    #[error("Missing required option: {option}")]
    MissingRequired {
        /// The missing option name
        option: String,
    },

    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },
}

/// Raster sources that cannot be stacked together.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Sources report different band counts
    #[error("Raster sources have different band counts: {counts:?}")]
    BandCountMismatch {
        /// Band count of every source, in input order
        counts: Vec<usize>,
    },

    /// Sources report different sample types
    #[error("Raster sources have different sample types: {types:?}")]
    SampleTypeMismatch {
        /// Sample type of band 1 of every source, in input order
        types: Vec<SampleType>,
    },
}

/// A raster source whose georeferencing differs from the first source.
#[derive(Debug, Error)]
pub enum GeometryMismatchError {
    /// Extent differs
    #[error("Extent of '{path}' differs from the first source: expected {expected}, found {found}")]
    Extent {
        /// The offending source
        path: PathBuf,
        /// Extent of the first source
        expected: Box<SpatialExtent>,
        /// Extent of the offending source
        found: Box<SpatialExtent>,
    },

    /// Row or column count differs
    #[error(
        "Size of '{path}' differs from the first source: expected {expected:?}, found {found:?}"
    )]
    Dimensions {
        /// The offending source
        path: PathBuf,
        /// `(rows, columns)` of the first source
        expected: (usize, usize),
        /// `(rows, columns)` of the offending source
        found: (usize, usize),
    },

    /// Projection string differs
    #[error("Projection of '{path}' differs from the first source")]
    Projection {
        /// The offending source
        path: PathBuf,
        /// Projection of the first source
        expected: String,
        /// Projection of the offending source
        found: String,
    },
}

/// I/O related errors.
///
/// These errors occur during file operations, including reading sources,
/// writing outputs and path validation.
#[derive(Debug, Error)]
pub enum IoError {
    /// Failed to read a source
    #[error("Failed to read {format} file '{path}': {source}")]
    Read {
        /// The format being read (e.g., "GTiff", "`GeoJSON`")
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: BoxError,
    },

    /// Failed to write an output
    #[error("Failed to write {format} file '{path}': {source}")]
    Write {
        /// The format being written
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: BoxError,
    },

    /// Path is invalid
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path
        path: PathBuf,
        /// Why the path is invalid
        reason: String,
    },
}

/// Failures of the user transformation.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The transformation returned an error
    #[error("Transformation '{transform}' failed: {source}")]
    Failed {
        /// Transformation name
        transform: String,
        /// The error it returned
        #[source]
        source: BoxError,
    },

    /// The transformation panicked
    #[error("Transformation '{transform}' panicked: {message}")]
    Panicked {
        /// Transformation name
        transform: String,
        /// Panic payload, when it was a string
        message: String,
    },

    /// The interpreter could not be started
    #[error("Failed to start interpreter '{interpreter}': {source}")]
    Spawn {
        /// Interpreter program
        interpreter: String,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// The interpreter exited unsuccessfully
    #[error("Transformation '{transform}' exited with {status} after {elapsed:?}{}", format_stderr(.stderr))]
    ProcessExit {
        /// Transformation name
        transform: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
        /// Time until exit
        elapsed: Duration,
    },

    /// The exchange directory could not be written or read back
    #[error("Context exchange failed: {message}")]
    Exchange {
        /// What went wrong
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<BoxError>,
    },
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Driver-related errors.
///
/// These errors occur when looking up format drivers, such as when a driver
/// is not found or doesn't support an operation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Driver was not found in the registry
    #[error("Driver '{name}' not found. Available drivers: {available}")]
    NotFound {
        /// The requested driver name
        name: String,
        /// Comma-separated list of available drivers
        available: String,
    },

    /// Driver does not support the requested operation
    #[error("Driver '{driver}' does not support {operation}")]
    OperationNotSupported {
        /// The driver name
        driver: String,
        /// The operation that's not supported (e.g., "reading", "writing")
        operation: String,
    },
}

/// Type alias for Results using `UdfError`.
pub type Result<T> = std::result::Result<T, UdfError>;

impl UdfError {
    /// Get a user-friendly error message.
    ///
    /// This formats the error in a way that's helpful for end users,
    /// including context and actionable information.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Validation(e) => format!("Validation error: {e}"),
            Self::Geometry(e) => format!("Geometry mismatch: {e}"),
            Self::Io(e) => e.user_message(),
            Self::Execution(e) => format!("UDF execution error: {e}"),
            Self::Driver(e) => e.user_message(),
        }
    }

    /// Get recovery suggestions if available.
    ///
    /// Returns helpful suggestions on how to fix or work around the error.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.recovery_suggestion(),
            Self::Validation(_) | Self::Geometry(_) => Some(
                "All raster sources of one run must share band layout, sample type, extent and projection."
                    .to_string(),
            ),
            Self::Io(e) => e.recovery_suggestion(),
            Self::Execution(e) => e.recovery_suggestion(),
            Self::Driver(e) => e.recovery_suggestion(),
        }
    }
}

impl ConfigError {
    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::NoSources => {
                Some("Pass --raster-files and/or --vector-files.".to_string())
            },
            Self::BandNameMismatch { .. } => Some(
                "Pass exactly one name per band with --band-names, e.g. --band-names RED,NIR."
                    .to_string(),
            ),
            Self::MissingRequired { option } => Some(format!("Pass --{option}.")),
            Self::InvalidOption { .. } => None,
        }
    }
}

impl IoError {
    fn user_message(&self) -> String {
        match self {
            Self::Read { format, path, source } => {
                format!("Failed to read {format} file {}: {source}", path.display())
            },
            Self::Write { format, path, source } => {
                format!("Failed to write {format} file {}: {source}", path.display())
            },
            Self::InvalidPath { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Read { .. } => {
                Some("Check that the file path is correct and the file exists.".to_string())
            },
            Self::Write { .. } => {
                Some("Check that the output directory is writable.".to_string())
            },
            Self::InvalidPath { .. } => {
                Some("Ensure the path is valid and properly formatted.".to_string())
            },
        }
    }
}

impl ExecutionError {
    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Spawn { .. } => {
                Some("Check that the interpreter is installed and on PATH.".to_string())
            },
            Self::ProcessExit { .. } => Some(
                "The UDF script failed; run it by hand against the exchange layout to debug it."
                    .to_string(),
            ),
            Self::Exchange { .. } => Some(
                "The UDF must keep context.json valid and reference files that exist.".to_string(),
            ),
            Self::Failed { .. } | Self::Panicked { .. } => None,
        }
    }
}

impl DriverError {
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { name, available } => {
                format!(
                    "Driver '{name}' not found.\n\nAvailable drivers:\n{}",
                    available
                        .split(", ")
                        .map(|d| format!("  - {d}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                )
            },
            Self::OperationNotSupported { driver, operation } => {
                format!("The '{driver}' driver does not support {operation}.")
            },
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => {
                Some("Run 'geoudf drivers' to see all available drivers.".to_string())
            },
            Self::OperationNotSupported { .. } => {
                Some("Try using a different driver that supports this operation.".to_string())
            },
        }
    }
}

/// Extension trait for adding I/O context to errors.
///
/// This trait provides convenient methods to wrap errors with file and format
/// context, creating more informative error messages. It accepts both
/// standard errors and the `anyhow::Error`s returned by the codec traits.
pub trait IoErrorExt<T> {
    /// Add read context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Read`] if the underlying operation fails.
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;

    /// Add write context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Write`] if the underlying operation fails.
    fn with_write_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> IoErrorExt<T> for std::result::Result<T, E>
where
    E: Into<BoxError>,
{
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            UdfError::Io(IoError::Read {
                format: format.to_string(),
                path: path.into(),
                source: e.into(),
            })
        })
    }

    fn with_write_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            UdfError::Io(IoError::Write {
                format: format.to_string(),
                path: path.into(),
                source: e.into(),
            })
        })
    }
}

/// Helper to create `DriverError::NotFound` with available drivers.
#[must_use]
pub fn driver_not_found(name: &str) -> DriverError {
    use crate::drivers::get_driver_names;

    let available = get_driver_names().join(", ");
    DriverError::NotFound {
        name: name.to_string(),
        available,
    }
}
