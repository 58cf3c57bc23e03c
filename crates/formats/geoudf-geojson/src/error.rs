use arrow_schema::ArrowError;
use thiserror::Error;

/// Error type for GeoJSON reading and writing
#[derive(Debug, Error)]
pub enum GeoJsonError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error while building or reading a table
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Input is not valid GeoJSON
    #[error("{message}{}", format_location(.line, .context))]
    Parse {
        /// What went wrong
        message: String,
        /// One-based line of a newline-delimited sequence
        line: Option<u64>,
        /// Source description, typically the file path
        context: String,
    },

    /// A geometry could not be converted
    #[error("Invalid geometry: {0}")]
    Geometry(String),

    /// The table cannot be written as GeoJSON
    #[error("Unsupported table layout: {0}")]
    Schema(String),
}

fn format_location(line: &Option<u64>, context: &str) -> String {
    match line {
        Some(line) => format!(" ({context}, line {line})"),
        None if context.is_empty() => String::new(),
        None => format!(" ({context})"),
    }
}
