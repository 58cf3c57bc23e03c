//! Helpers for presenting Arrow schemas to users.

use arrow_schema::{DataType, Field};
use geoudf_core_common::vector::{EXTENSION_NAME_KEY, is_wkt_geometry};
use geoudf_geojson::JSON_METADATA_KEY;

use crate::types::{FieldInfo, GeometryColumnInfo};

/// Extension trait for formatting Arrow [`DataType`] into human-readable strings.
///
/// # Examples
///
/// ```
/// use arrow_schema::DataType;
/// use geoudf_core::utils::ArrowDataTypeExt;
///
/// assert_eq!(DataType::Int64.format(), "Int64");
/// assert_eq!(DataType::Utf8.format(), "String");
/// ```
pub trait ArrowDataTypeExt {
    /// Format the data type into a human-readable string.
    fn format(&self) -> String;
}

impl ArrowDataTypeExt for DataType {
    fn format(&self) -> String {
        let label = match self {
            DataType::Utf8 => "String",
            DataType::LargeUtf8 => "LargeString",
            DataType::Utf8View => "StringView",
            DataType::List(_) => "List",
            DataType::LargeList(_) => "LargeList",
            DataType::Struct(_) => "Struct",
            DataType::Map(_, _) => "Map",
            DataType::Timestamp(unit, tz) => {
                let tz = tz.as_deref().unwrap_or("");
                return format!("Timestamp({unit:?}, {tz})");
            },
            // Primitive names already read well
            other => return format!("{other:?}"),
        };
        label.to_string()
    }
}

/// Describes an attribute field, labelling JSON-encoded text as `JSON`.
#[must_use]
pub fn field_info(field: &Field) -> FieldInfo {
    let data_type = if field.metadata().contains_key(JSON_METADATA_KEY) {
        "JSON".to_string()
    } else {
        field.data_type().format()
    };
    FieldInfo {
        name: field.name().clone(),
        data_type,
        nullable: field.is_nullable(),
    }
}

/// Describes a geometry column, or returns `None` for attribute fields.
#[must_use]
pub fn geometry_column_info(field: &Field) -> Option<GeometryColumnInfo> {
    is_wkt_geometry(field).then(|| GeometryColumnInfo {
        name: field.name().clone(),
        data_type: field.data_type().format(),
        extension: field.metadata().get(EXTENSION_NAME_KEY).cloned(),
    })
}
