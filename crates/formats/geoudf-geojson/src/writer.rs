//! GeoJSON writer converting Arrow record batches to a `FeatureCollection`

use std::io::Write as IoWrite;

use arrow_array::cast::AsArray;
use arrow_array::types::{Float64Type, Int64Type, UInt64Type};
use arrow_array::{Array, ArrayRef, RecordBatch};
use arrow_cast::cast;
use arrow_cast::display::{ArrayFormatter, FormatOptions};
use arrow_schema::{DataType, Field};
use geo_types::Geometry;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use geoudf_core_common::vector::is_wkt_geometry;
use wkt::TryFromWkt;

use crate::error::GeoJsonError;
use crate::table::{FEATURE_ID_METADATA_KEY, JSON_METADATA_KEY};

/// Options for GeoJSON writing
#[derive(Debug, Clone, Default)]
pub struct GeoJsonWriterOptions {
    /// Indent the output (default: false)
    pub pretty: bool,
}

impl GeoJsonWriterOptions {
    /// Create new writer options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to indent the output
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// How one column is turned into feature properties.
enum PropertyColumn {
    Boolean(ArrayRef),
    Integer(ArrayRef),
    Unsigned(ArrayRef),
    Float(ArrayRef),
    Json(ArrayRef),
    Formatted(Vec<Option<String>>),
}

impl PropertyColumn {
    fn new(field: &Field, array: &ArrayRef) -> Result<Self, GeoJsonError> {
        let column = match field.data_type() {
            DataType::Boolean => Self::Boolean(array.clone()),
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32 => Self::Integer(cast(array, &DataType::Int64)?),
            DataType::UInt64 => Self::Unsigned(array.clone()),
            DataType::Float16 | DataType::Float32 | DataType::Float64 => {
                Self::Float(cast(array, &DataType::Float64)?)
            },
            DataType::Utf8 if field.metadata().contains_key(JSON_METADATA_KEY) => {
                Self::Json(array.clone())
            },
            _ => {
                let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
                Self::Formatted(
                    (0..array.len())
                        .map(|row| (!array.is_null(row)).then(|| formatter.value(row).to_string()))
                        .collect(),
                )
            },
        };
        Ok(column)
    }

    fn value(&self, row: usize) -> JsonValue {
        match self {
            Self::Formatted(values) => {
                values[row].clone().map_or(JsonValue::Null, JsonValue::String)
            },
            Self::Boolean(a)
            | Self::Integer(a)
            | Self::Unsigned(a)
            | Self::Float(a)
            | Self::Json(a)
                if a.is_null(row) =>
            {
                JsonValue::Null
            },
            Self::Boolean(a) => JsonValue::Bool(a.as_boolean().value(row)),
            Self::Integer(a) => JsonValue::from(a.as_primitive::<Int64Type>().value(row)),
            Self::Unsigned(a) => JsonValue::from(a.as_primitive::<UInt64Type>().value(row)),
            Self::Float(a) => {
                serde_json::Number::from_f64(a.as_primitive::<Float64Type>().value(row))
                    .map_or(JsonValue::Null, JsonValue::Number)
            },
            Self::Json(a) => {
                let text = a.as_string::<i32>().value(row);
                serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.to_string()))
            },
        }
    }
}

/// Converts record batches into one feature collection.
///
/// The first WKT geometry column (see
/// [`wkt_geometry_field`](geoudf_core_common::wkt_geometry_field)) becomes the
/// feature geometry and the first column flagged with
/// [`FEATURE_ID_METADATA_KEY`] becomes the feature `id`. Every other column
/// becomes a property.
///
/// # Errors
///
/// Returns an error if a geometry cannot be parsed as WKT or a column cannot
/// be converted.
pub fn batches_to_feature_collection(
    batches: &[RecordBatch],
) -> Result<FeatureCollection, GeoJsonError> {
    let mut features = Vec::new();

    for batch in batches {
        let schema = batch.schema();
        let geometry_index = schema.fields().iter().position(|f| is_wkt_geometry(f));
        if let Some(index) = geometry_index
            && schema.field(index).data_type() != &DataType::Utf8
        {
            return Err(GeoJsonError::Schema(format!(
                "geometry column '{}' must be Utf8",
                schema.field(index).name()
            )));
        }

        let id_index = schema
            .fields()
            .iter()
            .position(|f| f.metadata().contains_key(FEATURE_ID_METADATA_KEY));
        let ids = id_index
            .map(|index| PropertyColumn::new(schema.field(index), batch.column(index)))
            .transpose()?;

        let mut properties = Vec::with_capacity(batch.num_columns());
        for (index, field) in schema.fields().iter().enumerate() {
            if Some(index) == geometry_index || Some(index) == id_index {
                continue;
            }
            properties.push((
                field.name().clone(),
                PropertyColumn::new(field, batch.column(index))?,
            ));
        }

        let geometries = geometry_index.map(|index| batch.column(index).as_string::<i32>());

        for row in 0..batch.num_rows() {
            let mut object = JsonObject::new();
            for (name, column) in &properties {
                object.insert(name.clone(), column.value(row));
            }

            let geometry = match geometries {
                Some(array) if !array.is_null(row) => Some(parse_wkt(array.value(row))?),
                _ => None,
            };

            features.push(Feature {
                bbox: None,
                geometry: geometry.map(|g| geojson::Geometry::new(geojson::Value::from(&g))),
                id: ids.as_ref().and_then(|column| value_to_id(column.value(row))),
                properties: Some(object),
                foreign_members: None,
            });
        }
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn value_to_id(value: JsonValue) -> Option<Id> {
    match value {
        JsonValue::Null => None,
        JsonValue::Number(n) => Some(Id::Number(n)),
        JsonValue::String(s) => Some(Id::String(s)),
        other => Some(Id::String(other.to_string())),
    }
}

fn parse_wkt(text: &str) -> Result<Geometry<f64>, GeoJsonError> {
    Geometry::<f64>::try_from_wkt_str(text)
        .map_err(|e| GeoJsonError::Geometry(format!("'{text}': {e}")))
}

/// Write record batches as a GeoJSON `FeatureCollection`
///
/// # Errors
///
/// Returns an error if conversion or writing to the output fails
pub fn write_geojson<W: IoWrite>(
    writer: &mut W,
    batches: &[RecordBatch],
    options: &GeoJsonWriterOptions,
) -> Result<(), GeoJsonError> {
    let collection = batches_to_feature_collection(batches)?;
    if options.pretty {
        serde_json::to_writer_pretty(&mut *writer, &collection)?;
    } else {
        serde_json::to_writer(&mut *writer, &collection)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

/// Write record batches to GeoJSON bytes
///
/// # Errors
///
/// Returns an error if conversion fails
pub fn write_geojson_to_bytes(
    batches: &[RecordBatch],
    options: &GeoJsonWriterOptions,
) -> Result<Vec<u8>, GeoJsonError> {
    let mut buffer = Vec::new();
    write_geojson(&mut buffer, batches, options)?;
    Ok(buffer)
}
