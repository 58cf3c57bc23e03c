//! Dataset inspection.
//!
//! This module backs the `info` command: it resolves a driver for a dataset
//! and reports its metadata through the codec traits.

use std::path::Path;

use log::info;

use crate::drivers::{
    Driver, DriverKind, find_driver, find_driver_for_path, raster_format, vector_format,
};
use crate::error::{ConfigError, DriverError, IoErrorExt, Result, driver_not_found};
use crate::extent::SpatialExtent;
use crate::types::{DatasetDetails, DatasetInfo, RasterInfo, VectorInfo};
use crate::utils::{field_info, geometry_column_info};

/// Describes the dataset at `path`.
///
/// When `driver` is `None` the driver is inferred from the file extension.
/// Rasters are described from their metadata only; vectors are read in full
/// to count features.
///
/// # Errors
///
/// This function will return an error if:
/// - The driver is unknown, cannot be inferred, or does not support info.
/// - The dataset cannot be opened or read.
pub fn describe_dataset(path: &Path, driver: Option<&str>) -> Result<DatasetInfo> {
    let driver = resolve_driver(path, driver)?;
    info!(
        "Describing {} with driver {}",
        path.display(),
        driver.short_name
    );

    let details = match driver.kind {
        DriverKind::Raster => {
            let format = raster_format(driver.short_name)?;
            let dataset = format.open(path).with_read_context(format.name(), path)?;
            let (rows, cols) = dataset.size();
            DatasetDetails::Raster(RasterInfo {
                band_count: dataset.band_count(),
                sample_type: dataset.sample_type(),
                rows,
                cols,
                extent: SpatialExtent::from_geo_transform(&dataset.geo_transform(), rows, cols),
                projection: dataset.projection().to_string(),
            })
        },
        DriverKind::Vector => {
            let format = vector_format(driver.short_name)?;
            let batch = format.read(path).with_read_context(format.name(), path)?;
            let schema = batch.schema();
            let geometry_columns: Vec<_> = schema
                .fields()
                .iter()
                .filter_map(|f| geometry_column_info(f))
                .collect();
            let fields = schema
                .fields()
                .iter()
                .filter(|f| geometry_column_info(f).is_none())
                .map(|f| field_info(f))
                .collect();
            DatasetDetails::Vector(VectorInfo {
                feature_count: batch.num_rows(),
                geometry_columns,
                fields,
            })
        },
    };

    Ok(DatasetInfo {
        dataset: path.display().to_string(),
        driver: driver.short_name.to_string(),
        driver_long_name: driver.long_name.to_string(),
        details,
    })
}

fn resolve_driver(path: &Path, name: Option<&str>) -> Result<Driver> {
    let driver = match name {
        Some(name) => find_driver(name).ok_or_else(|| driver_not_found(name))?,
        None => find_driver_for_path(path).ok_or_else(|| ConfigError::InvalidOption {
            option: "driver".to_string(),
            message: format!(
                "cannot infer a driver from '{}'; pass --driver",
                path.display()
            ),
        })?,
    };

    if !driver.capabilities.info.is_supported() {
        return Err(DriverError::OperationNotSupported {
            driver: driver.short_name.to_string(),
            operation: "info".to_string(),
        }
        .into());
    }
    Ok(driver)
}
