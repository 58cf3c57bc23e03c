//! Geometry column conventions for vector attribute tables.
//!
//! Vector codecs exchange features as Arrow record batches. Geometries are
//! carried as WKT strings in a `Utf8` column tagged with the `geoarrow.wkt`
//! extension name, so any consumer can find them without knowing the codec.

use std::collections::HashMap;

use arrow_schema::{DataType, Field, Schema};

/// Name of the geometry column produced by the vector codecs.
pub const GEOMETRY_COLUMN: &str = "geometry";

/// Arrow metadata key holding an extension type name.
pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";

/// Extension name of WKT-encoded geometry columns.
pub const WKT_EXTENSION_NAME: &str = "geoarrow.wkt";

/// Builds a nullable WKT geometry field named `name`.
#[must_use]
pub fn wkt_geometry_field(name: &str) -> Field {
    Field::new(name, DataType::Utf8, true).with_metadata(HashMap::from([(
        EXTENSION_NAME_KEY.to_string(),
        WKT_EXTENSION_NAME.to_string(),
    )]))
}

/// Returns `true` when `field` holds WKT geometries.
#[must_use]
pub fn is_wkt_geometry(field: &Field) -> bool {
    field
        .metadata()
        .get(EXTENSION_NAME_KEY)
        .is_some_and(|name| name == WKT_EXTENSION_NAME)
}

/// Names of every geometry column in `schema`, in schema order.
#[must_use]
pub fn geometry_columns(schema: &Schema) -> Vec<&str> {
    schema
        .fields()
        .iter()
        .filter(|field| is_wkt_geometry(field))
        .map(|field| field.name().as_str())
        .collect()
}
