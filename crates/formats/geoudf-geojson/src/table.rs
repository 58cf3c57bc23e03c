//! Conversion of feature records into Arrow record batches.
//!
//! Each property becomes one nullable column, in first-seen order across the
//! features. Column types are inferred from every value of the column:
//!
//! | values                          | Arrow type |
//! |---------------------------------|------------|
//! | booleans only                   | `Boolean`  |
//! | integers only                   | `Int64`    |
//! | integers and floats             | `Float64`  |
//! | any mix containing strings      | `Utf8`     |
//! | any object or array             | `Utf8` (JSON text, flagged) |
//!
//! Nulls and missing keys never influence the type. Geometries go into a
//! trailing WKT column named [`GEOMETRY_COLUMN`]. When any feature carries an
//! `id` member, the ids go into a leading [`FEATURE_ID_COLUMN`] typed by the
//! same rules and flagged with [`FEATURE_ID_METADATA_KEY`].

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::builder::{BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch, RecordBatchOptions};
use arrow_schema::{DataType, Field, Schema};
use geojson::JsonValue;
use geojson::feature::Id;
use geoudf_core_common::{GEOMETRY_COLUMN, wkt_geometry_field};
use log::warn;
use wkt::ToWkt;

use crate::error::GeoJsonError;
use crate::parser::FeatureRecord;

/// Field metadata key marking `Utf8` columns that hold serialized JSON.
pub const JSON_METADATA_KEY: &str = "geoudf:json";

/// Name of the column holding feature `id` members.
pub const FEATURE_ID_COLUMN: &str = "fid";

/// Field metadata key marking the column written back as feature `id`s.
pub const FEATURE_ID_METADATA_KEY: &str = "geoudf:feature_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Null,
    Boolean,
    Integer,
    Float,
    Text,
    Json,
}

impl ColumnKind {
    fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(_) => Self::Boolean,
            JsonValue::Number(n) if n.is_i64() => Self::Integer,
            JsonValue::Number(_) => Self::Float,
            JsonValue::String(_) => Self::Text,
            JsonValue::Array(_) | JsonValue::Object(_) => Self::Json,
        }
    }

    fn merge(self, other: Self) -> Self {
        use ColumnKind::{Boolean, Float, Integer, Json, Null, Text};
        match (self, other) {
            (Null, kind) | (kind, Null) => kind,
            (Json, _) | (_, Json) => Json,
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            (Boolean | Integer | Float | Text, _) => Text,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            Self::Boolean => DataType::Boolean,
            Self::Integer => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Null | Self::Text | Self::Json => DataType::Utf8,
        }
    }
}

/// Builds a record batch from parsed features.
///
/// # Errors
///
/// Returns an error if the columns cannot be assembled into a batch.
pub fn records_to_batch(records: &[FeatureRecord]) -> Result<RecordBatch, GeoJsonError> {
    let ids: Vec<Option<JsonValue>> = records
        .iter()
        .map(|record| record.id.as_ref().map(id_to_value))
        .collect();
    let has_ids = ids.iter().any(Option::is_some);
    let columns = infer_columns(records, has_ids);

    let mut fields = Vec::with_capacity(columns.len() + 2);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len() + 2);

    if has_ids {
        let kind = ids
            .iter()
            .flatten()
            .fold(ColumnKind::Null, |kind, id| kind.merge(ColumnKind::of(id)));
        let field = Field::new(FEATURE_ID_COLUMN, kind.data_type(), true).with_metadata(
            HashMap::from([(FEATURE_ID_METADATA_KEY.to_string(), "true".to_string())]),
        );
        fields.push(field);
        arrays.push(build_column(ids.iter().map(Option::as_ref), records.len(), kind));
    }

    for (name, kind) in &columns {
        let mut field = Field::new(name, kind.data_type(), true);
        if *kind == ColumnKind::Json {
            field = field.with_metadata(HashMap::from([(
                JSON_METADATA_KEY.to_string(),
                "true".to_string(),
            )]));
        }
        fields.push(field);
        let values = records.iter().map(|record| record.properties.get(name));
        arrays.push(build_column(values, records.len(), *kind));
    }

    fields.push(wkt_geometry_field(GEOMETRY_COLUMN));
    arrays.push(build_geometry_column(records));

    let options = RecordBatchOptions::new().with_row_count(Some(records.len()));
    let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
    Ok(batch)
}

fn id_to_value(id: &Id) -> JsonValue {
    match id {
        Id::String(s) => JsonValue::String(s.clone()),
        Id::Number(n) => JsonValue::Number(n.clone()),
    }
}

fn infer_columns(records: &[FeatureRecord], has_ids: bool) -> Vec<(String, ColumnKind)> {
    let mut columns: Vec<(String, ColumnKind)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut warned: Vec<&str> = Vec::new();

    for record in records {
        for (key, value) in &record.properties {
            let reserved = match key.as_str() {
                GEOMETRY_COLUMN => Some("geometry"),
                FEATURE_ID_COLUMN if has_ids => Some("feature id"),
                _ => None,
            };
            if let Some(column) = reserved {
                if !warned.contains(&key.as_str()) {
                    warn!(
                        "Ignoring property '{key}': the name is reserved for the {column} column"
                    );
                    warned.push(key.as_str());
                }
                continue;
            }

            let kind = ColumnKind::of(value);
            match positions.get(key) {
                Some(&index) => columns[index].1 = columns[index].1.merge(kind),
                None => {
                    positions.insert(key.clone(), columns.len());
                    columns.push((key.clone(), kind));
                },
            }
        }
    }

    columns
}

fn build_column<'a>(
    values: impl Iterator<Item = Option<&'a JsonValue>>,
    len: usize,
    kind: ColumnKind,
) -> ArrayRef {
    let values = values.map(|value| value.filter(|v| !v.is_null()));

    match kind {
        ColumnKind::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(len);
            for value in values {
                builder.append_option(value.and_then(JsonValue::as_bool));
            }
            Arc::new(builder.finish())
        },
        ColumnKind::Integer => {
            let mut builder = Int64Builder::with_capacity(len);
            for value in values {
                builder.append_option(value.and_then(JsonValue::as_i64));
            }
            Arc::new(builder.finish())
        },
        ColumnKind::Float => {
            let mut builder = Float64Builder::with_capacity(len);
            for value in values {
                builder.append_option(value.and_then(JsonValue::as_f64));
            }
            Arc::new(builder.finish())
        },
        ColumnKind::Null | ColumnKind::Text | ColumnKind::Json => {
            let mut builder = StringBuilder::new();
            for value in values {
                builder.append_option(value.map(|v| value_to_text(v, kind)));
            }
            Arc::new(builder.finish())
        },
    }
}

fn value_to_text(value: &JsonValue, kind: ColumnKind) -> String {
    match value {
        JsonValue::String(s) if kind != ColumnKind::Json => s.clone(),
        other => other.to_string(),
    }
}

fn build_geometry_column(records: &[FeatureRecord]) -> ArrayRef {
    let mut builder = StringBuilder::new();
    for record in records {
        builder.append_option(record.geometry.as_ref().map(|g| g.wkt_string()));
    }
    Arc::new(builder.finish())
}
