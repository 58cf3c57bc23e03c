//! Driver registry for geospatial data format support and capabilities.
//!
//! This module provides a static registry of the raster and vector formats
//! `geoudf` knows about, with their current support status (supported,
//! planned, or not supported) for each operation (info, read, write). Drivers
//! that are supported for reading and writing resolve to codec instances with
//! [`raster_format`] and [`vector_format`].
//!
//! # Examples
//!
//! ```
//! use geoudf_core::drivers::{find_driver, get_available_drivers};
//!
//! // Find a specific driver
//! let gtiff = find_driver("GTiff").expect("GTiff driver should exist");
//! assert!(gtiff.capabilities.read.is_supported());
//!
//! // List all drivers with supported operations
//! for driver in get_available_drivers() {
//!     println!("{}: {}", driver.short_name, driver.long_name);
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use geoudf_core_common::{RasterFormat, VectorFormat};
use geoudf_geojson::GeoJsonFormat;
use geoudf_geotiff::GeoTiffFormat;

use crate::error::{DriverError, Result, driver_not_found};

pub use geoudf_core_common::{Driver, DriverCapabilities, DriverKind, SupportStatus};

/// Returns the complete list of registered drivers.
///
/// Drivers are grouped by kind, rasters first. Use [`find_driver`] for a
/// single lookup.
#[must_use]
pub fn get_drivers() -> Vec<Driver> {
    use DriverKind::{Raster, Vector};
    use SupportStatus::{NotSupported, Planned, Supported};

    vec![
        Driver::new("GTiff", "GeoTIFF", Raster, "tif", Supported, Supported, Supported),
        Driver::new(
            "COG",
            "Cloud Optimized GeoTIFF",
            Raster,
            "tif",
            Planned,
            Planned,
            Planned,
        ),
        Driver::new(
            "netCDF",
            "Network Common Data Format",
            Raster,
            "nc",
            Planned,
            Planned,
            NotSupported,
        ),
        Driver::new("GeoJSON", "GeoJSON", Vector, "geojson", Supported, Supported, Supported),
        Driver::new(
            "GeoJSONSeq",
            "GeoJSON Sequence",
            Vector,
            "geojsonl",
            Planned,
            Planned,
            Planned,
        ),
        Driver::new(
            "FlatGeobuf",
            "FlatGeobuf",
            Vector,
            "fgb",
            Planned,
            Planned,
            Planned,
        ),
        Driver::new("GPKG", "GeoPackage", Vector, "gpkg", Planned, Planned, Planned),
        Driver::new(
            "Parquet",
            "(Geo)Parquet",
            Vector,
            "parquet",
            Planned,
            Planned,
            Planned,
        ),
        Driver::new(
            "ESRI Shapefile",
            "ESRI Shapefile / DBF",
            Vector,
            "shp",
            Planned,
            Planned,
            NotSupported,
        ),
    ]
}

/// Returns drivers that have at least one fully supported operation.
#[must_use]
pub fn get_available_drivers() -> Vec<Driver> {
    get_drivers()
        .into_iter()
        .filter(|d| d.capabilities.has_supported_operation())
        .collect()
}

/// Finds a driver by its short name, ignoring ASCII case.
///
/// # Examples
///
/// ```
/// use geoudf_core::drivers::find_driver;
///
/// let driver = find_driver("geojson").expect("GeoJSON should exist");
/// assert_eq!(driver.short_name, "GeoJSON");
///
/// assert!(find_driver("InvalidDriver").is_none());
/// ```
#[must_use]
pub fn find_driver(name: &str) -> Option<Driver> {
    get_drivers()
        .into_iter()
        .find(|d| d.short_name.eq_ignore_ascii_case(name))
}

/// Finds the supported driver whose extension matches `path`.
///
/// `.tiff` is accepted for GeoTIFF and `.json` for GeoJSON.
#[must_use]
pub fn find_driver_for_path(path: &Path) -> Option<Driver> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let extension = match extension.as_str() {
        "tiff" => "tif",
        "json" => "geojson",
        other => other,
    };
    get_available_drivers()
        .into_iter()
        .find(|d| d.extension == extension)
}

/// Lists all drivers that support specific capabilities.
///
/// If a capability parameter is `false`, that operation is not required; if
/// `true`, the driver must fully support it.
///
/// # Examples
///
/// ```
/// use geoudf_core::drivers::list_drivers_with_capability;
///
/// let read_write = list_drivers_with_capability(true, true, false);
/// assert!(read_write.iter().any(|d| d.short_name == "GTiff"));
/// ```
#[must_use]
pub fn list_drivers_with_capability(read: bool, write: bool, info: bool) -> Vec<Driver> {
    get_drivers()
        .into_iter()
        .filter(|d| {
            let read_ok = !read || d.capabilities.read.is_supported();
            let write_ok = !write || d.capabilities.write.is_supported();
            let info_ok = !info || d.capabilities.info.is_supported();
            read_ok && write_ok && info_ok
        })
        .collect()
}

/// Returns all driver short names in alphabetically sorted order.
#[must_use]
pub fn get_driver_names() -> Vec<&'static str> {
    let mut names: Vec<_> = get_drivers().iter().map(|d| d.short_name).collect();
    names.sort_unstable();
    names
}

fn require(name: &str, kind: DriverKind) -> Result<Driver> {
    let driver = find_driver(name).ok_or_else(|| driver_not_found(name))?;
    if driver.kind != kind {
        return Err(DriverError::OperationNotSupported {
            driver: driver.short_name.to_string(),
            operation: format!("{} data", kind.as_str().to_lowercase()),
        }
        .into());
    }
    Ok(driver)
}

/// Resolves a raster driver name to its codec.
///
/// # Errors
///
/// Returns [`DriverError::NotFound`] for unknown names and
/// [`DriverError::OperationNotSupported`] for vector drivers or drivers
/// without a codec yet.
pub fn raster_format(name: &str) -> Result<Arc<dyn RasterFormat>> {
    let driver = require(name, DriverKind::Raster)?;
    match driver.short_name {
        "GTiff" => Ok(Arc::new(GeoTiffFormat::new())),
        other => Err(DriverError::OperationNotSupported {
            driver: other.to_string(),
            operation: "reading".to_string(),
        }
        .into()),
    }
}

/// Resolves a vector driver name to its codec.
///
/// # Errors
///
/// Returns [`DriverError::NotFound`] for unknown names and
/// [`DriverError::OperationNotSupported`] for raster drivers or drivers
/// without a codec yet.
pub fn vector_format(name: &str) -> Result<Arc<dyn VectorFormat>> {
    let driver = require(name, DriverKind::Vector)?;
    match driver.short_name {
        "GeoJSON" => Ok(Arc::new(GeoJsonFormat::new())),
        other => Err(DriverError::OperationNotSupported {
            driver: other.to_string(),
            operation: "reading".to_string(),
        }
        .into()),
    }
}
