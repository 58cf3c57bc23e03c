//! Common types and traits shared across `geoudf` crates.
//!
//! This crate provides the abstractions shared between `geoudf-core` and the
//! format implementation crates, preventing circular dependencies:
//!
//! - [`raster`]: typed 2-D/3-D sample arrays and their sample types.
//! - [`geo_transform`]: the six-coefficient affine georeferencing transform.
//! - [`io`]: the codec traits format crates implement.
//! - [`drivers`]: driver descriptors and capability flags.
//! - [`vector`]: conventions for the geometry column of attribute tables.

pub mod drivers;
pub mod geo_transform;
pub mod io;
pub mod raster;
pub mod vector;

// Re-export commonly used types
pub use drivers::{Driver, DriverCapabilities, DriverKind, SupportStatus};
pub use geo_transform::GeoTransform;
pub use io::{RasterDataset, RasterFormat, RasterWrite, VectorFormat};
pub use raster::{BandArray, CubeArray, RasterBuffer, RasterBufferError, SampleType};
pub use vector::{GEOMETRY_COLUMN, geometry_columns, wkt_geometry_field};
