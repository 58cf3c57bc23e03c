//! `geoudf-core` is the core library of `geoudf`: it runs a user-defined
//! transformation over a bundle of co-registered raster and vector datasets
//! and writes the transformed result back to disk.
//!
//! This crate includes:
//! - **Tile building**: [`raster_builder`] stacks single-time rasters into one
//!   3-D array per band after checking that the sources agree on layout, sample
//!   type and georeferencing; [`vector_builder`] wraps vector sources as
//!   attribute tables.
//! - **Execution**: [`executor`] applies a [`UdfTransform`] to the
//!   [`UdfDataContext`]; [`script`] runs transformation scripts in a child
//!   process.
//! - **Output**: [`writer`] serializes the context as it stands after execution.
//! - **Driver Registry**: a static registry of formats and their capabilities.
//!
//! [`pipeline::run`] ties these together from a [`RunConfig`].

pub mod config;
pub mod context;
pub mod drivers;
pub mod error;
pub mod executor;
pub mod extent;
pub mod operations;
pub mod pipeline;
pub mod raster_builder;
pub mod script;
pub mod tile;
pub mod types;
pub mod utils;
pub mod vector_builder;
pub mod writer;

pub use config::RunConfig;
pub use context::UdfDataContext;
pub use error::{Result, UdfError};
pub use executor::{ExecutionStatus, FnTransform, UdfExecutor, UdfTransform};
pub use extent::SpatialExtent;
pub use pipeline::{RunSummary, run};
pub use script::{ExchangeFormats, ProcessTransform};
pub use tile::{FeatureCollectionTile, RasterCollectionTile};
pub use writer::{OutputPrecision, ResultWriter};

// Re-exported so transformations can be written against this crate alone
pub use geoudf_core_common::{BandArray, CubeArray, GeoTransform, SampleType};
