//! End-to-end orchestration of a UDF run.

use std::path::PathBuf;

use log::info;

use crate::config::RunConfig;
use crate::context::UdfDataContext;
use crate::drivers::{raster_format, vector_format};
use crate::error::Result;
use crate::executor::{ExecutionStatus, UdfExecutor, UdfTransform};
use crate::raster_builder::RasterTileBuilder;
use crate::vector_builder::VectorTileBuilder;
use crate::writer::ResultWriter;

/// Outcome of a successful [`run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: ExecutionStatus,
    /// Output files in the order they were written
    pub written: Vec<PathBuf>,
}

/// Builds the data context from the configured sources, applies `transform`
/// and writes the result.
///
/// Validation, tile building and execution all happen before the first output
/// file is created, so a failure in any of them leaves the output directory
/// untouched.
///
/// # Errors
///
/// Returns the first error raised by configuration validation, driver
/// resolution, tile building, execution or writing.
pub fn run(config: &RunConfig, transform: &dyn UdfTransform) -> Result<RunSummary> {
    config.validate()?;
    let raster = raster_format(&config.raster_driver)?;
    let vector = vector_format(&config.vector_driver)?;

    let rasters =
        RasterTileBuilder::new(raster.clone()).build(&config.raster_files, &config.band_names)?;
    let features = VectorTileBuilder::new(vector.clone()).build(&config.vector_files)?;

    let mut context = UdfDataContext::new(rasters.projection, rasters.tiles, features);
    info!(
        "Context ready: {} raster tile(s), {} feature tile(s)",
        context.raster_tiles.len(),
        context.feature_tiles.len()
    );

    let status = UdfExecutor::new().execute(transform, &mut context)?;

    let written = ResultWriter::new(raster, vector, &config.output_dir)
        .with_precision(config.output_precision)
        .write(&context)?;

    Ok(RunSummary { status, written })
}
