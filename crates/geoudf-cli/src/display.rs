//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting dataset information and run results in a human-readable
//! format.

use tabled::{Table, Tabled};

use geoudf_core::RunSummary;
use geoudf_core::drivers::Driver;
use geoudf_core::types::{DatasetDetails, DatasetInfo, RasterInfo, VectorInfo};

/// Table row representation for displaying a single metadata property.
#[derive(Tabled)]
pub struct PropertyRow {
    #[tabled(rename = "Property")]
    pub property: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl PropertyRow {
    fn new(property: &str, value: impl ToString) -> Self {
        Self {
            property: property.to_string(),
            value: value.to_string(),
        }
    }
}

/// Table row representation for displaying geometry column information.
#[derive(Tabled)]
pub struct GeometryRow {
    /// Name of the geometry column.
    #[tabled(rename = "Column")]
    pub name: String,
    /// Storage type of the geometry values.
    #[tabled(rename = "Type")]
    pub data_type: String,
    /// `GeoArrow` extension name for the geometry encoding.
    #[tabled(rename = "Extension")]
    pub extension: String,
}

/// Table row representation for displaying field/column information.
#[derive(Tabled)]
pub struct FieldRow {
    /// Name of the field.
    #[tabled(rename = "Field")]
    pub name: String,
    /// Data type of the field.
    #[tabled(rename = "Type")]
    pub data_type: String,
    /// Whether the field can contain null values.
    #[tabled(rename = "Nullable")]
    pub nullable: String,
}

/// Table row representation for displaying driver information.
#[derive(Tabled)]
pub struct DriverRow {
    /// Short identifier for the driver (e.g., `GTiff`, `GeoJSON`).
    #[tabled(rename = "Short Name")]
    pub short_name: String,
    /// Full descriptive name of the driver format.
    #[tabled(rename = "Long Name")]
    pub long_name: String,
    /// Raster or vector.
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Info")]
    pub info: String,
    #[tabled(rename = "Read")]
    pub read: String,
    #[tabled(rename = "Write")]
    pub write: String,
}

impl From<&Driver> for DriverRow {
    fn from(d: &Driver) -> Self {
        Self {
            short_name: d.short_name.to_string(),
            long_name: d.long_name.to_string(),
            kind: d.kind.as_str().to_string(),
            info: d.capabilities.info.as_str().to_string(),
            read: d.capabilities.read.as_str().to_string(),
            write: d.capabilities.write.as_str().to_string(),
        }
    }
}

/// Renders the driver registry as a table.
pub fn drivers_table(drivers: &[Driver]) -> String {
    Table::new(drivers.iter().map(DriverRow::from)).to_string()
}

/// Display dataset information in formatted tables.
pub fn display_dataset_info(info: &DatasetInfo) {
    println!("\nDataset: {}", info.dataset);
    println!("Driver: {} ({})", info.driver, info.driver_long_name);

    match &info.details {
        DatasetDetails::Raster(raster) => display_raster_info(raster),
        DatasetDetails::Vector(vector) => display_vector_info(vector),
    }
}

fn display_raster_info(raster: &RasterInfo) {
    println!("\n=== Raster ===");

    let projection = if raster.projection.is_empty() {
        "N/A"
    } else {
        raster.projection.as_str()
    };
    let rows = vec![
        PropertyRow::new("Bands", raster.band_count),
        PropertyRow::new("Sample Type", raster.sample_type.as_str()),
        PropertyRow::new("Size", format!("{} x {}", raster.cols, raster.rows)),
        PropertyRow::new("Extent", raster.extent),
        PropertyRow::new(
            "Resolution",
            format!("{} x {}", raster.extent.width, raster.extent.height),
        ),
        PropertyRow::new("Projection", projection),
    ];
    println!("{}", Table::new(rows));
}

fn display_vector_info(vector: &VectorInfo) {
    println!("Features: {}", vector.feature_count);

    if !vector.geometry_columns.is_empty() {
        println!("\n=== Geometry Columns ===");

        let geo_rows: Vec<GeometryRow> = vector
            .geometry_columns
            .iter()
            .map(|g| GeometryRow {
                name: g.name.clone(),
                data_type: g.data_type.clone(),
                extension: g.extension.clone().unwrap_or_else(|| "N/A".to_string()),
            })
            .collect();
        println!("{}", Table::new(geo_rows));
    }

    if !vector.fields.is_empty() {
        println!("\n=== Fields ===");

        let field_rows: Vec<FieldRow> = vector
            .fields
            .iter()
            .map(|f| FieldRow {
                name: f.name.clone(),
                data_type: f.data_type.clone(),
                nullable: if f.nullable { "Yes" } else { "No" }.to_string(),
            })
            .collect();
        println!("{}", Table::new(field_rows));
    }
}

/// Prints the outcome of a run and the files it wrote.
pub fn display_run_summary(summary: &RunSummary) {
    let status = &summary.status;
    println!(
        "Transformation '{}' finished in {:.2?} ({} raster tile(s), {} feature tile(s){})",
        status.transform,
        status.elapsed,
        status.raster_tiles,
        status.feature_tiles,
        if status.modified { ", modified" } else { "" }
    );

    if summary.written.is_empty() {
        println!("No files written.");
        return;
    }
    println!("Wrote {} file(s):", summary.written.len());
    for path in &summary.written {
        println!("  {}", path.display());
    }
}
