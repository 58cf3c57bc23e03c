//! Data types describing datasets for the `info` command.

use geoudf_core_common::SampleType;

use crate::extent::SpatialExtent;

/// Information about a dataset.
#[derive(Debug, Clone)]
pub struct DatasetInfo {
    /// Path to the dataset
    pub dataset: String,
    /// Driver name
    pub driver: String,
    /// Driver long name
    pub driver_long_name: String,
    pub details: DatasetDetails,
}

/// Kind-specific part of [`DatasetInfo`].
#[derive(Debug, Clone)]
pub enum DatasetDetails {
    Raster(RasterInfo),
    Vector(VectorInfo),
}

/// Metadata of a raster source; no pixel data is read to produce it.
#[derive(Debug, Clone)]
pub struct RasterInfo {
    pub band_count: usize,
    /// Sample type of band 1
    pub sample_type: SampleType,
    pub rows: usize,
    pub cols: usize,
    pub extent: SpatialExtent,
    /// Empty when the source carries no projection
    pub projection: String,
}

/// Schema of a vector source.
#[derive(Debug, Clone)]
pub struct VectorInfo {
    pub feature_count: usize,
    pub geometry_columns: Vec<GeometryColumnInfo>,
    /// Attribute fields, geometry columns excluded
    pub fields: Vec<FieldInfo>,
}

/// Information about a geometry column.
#[derive(Debug, Clone)]
pub struct GeometryColumnInfo {
    /// Column name
    pub name: String,
    /// Storage type description
    pub data_type: String,
    /// Extension name (e.g., "geoarrow.wkt")
    pub extension: Option<String>,
}

/// Information about a field/column.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Data type
    pub data_type: String,
    /// Whether the field is nullable
    pub nullable: bool,
}
