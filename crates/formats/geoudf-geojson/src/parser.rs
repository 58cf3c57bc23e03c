//! `GeoJSON` parsing into feature records.

use std::fmt;

use geo_types::Geometry;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry as GeoJsonGeometry, JsonObject};

use crate::error::GeoJsonError;

/// Parsed `GeoJSON` feature with materialized properties and geometry.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    /// Feature-level `id` member, if any
    pub id: Option<Id>,
    pub properties: JsonObject,
    pub geometry: Option<Geometry<f64>>,
}

/// Parse raw bytes into a vector of `FeatureRecord`s.
///
/// Accepts a `FeatureCollection`, a single `Feature`, a bare geometry, or a
/// newline-delimited sequence of any of those.
///
/// # Errors
///
/// Returns [`GeoJsonError::Parse`] when the bytes are neither a `GeoJSON`
/// document nor a sequence, and [`GeoJsonError::Geometry`] when a geometry
/// cannot be converted.
pub fn parse_geojson_bytes(
    bytes: &[u8],
    context: impl Into<String>,
) -> Result<Vec<FeatureRecord>, GeoJsonError> {
    let context = context.into();
    let reader = std::io::Cursor::new(bytes);

    match GeoJson::from_reader(reader) {
        Ok(geojson) => geojson_to_records(geojson),
        Err(primary_err) => {
            let primary_err_message = primary_err.to_string();
            match parse_geojson_sequence(bytes, &context) {
                Ok(records) => Ok(records),
                Err(sequence_err) => {
                    Err(combine_errors(&primary_err_message, &sequence_err, context))
                },
            }
        },
    }
}

fn geojson_to_records(geojson: GeoJson) -> Result<Vec<FeatureRecord>, GeoJsonError> {
    match geojson {
        GeoJson::FeatureCollection(collection) => feature_collection_to_records(collection),
        GeoJson::Feature(feature) => Ok(vec![feature_to_record(feature)?]),
        GeoJson::Geometry(geometry) => Ok(vec![FeatureRecord {
            id: None,
            properties: JsonObject::new(),
            geometry: Some(convert_geometry(geometry)?),
        }]),
    }
}

fn feature_collection_to_records(
    collection: FeatureCollection,
) -> Result<Vec<FeatureRecord>, GeoJsonError> {
    collection
        .features
        .into_iter()
        .map(feature_to_record)
        .collect()
}

fn feature_to_record(feature: Feature) -> Result<FeatureRecord, GeoJsonError> {
    let geometry = feature.geometry.map(convert_geometry).transpose()?;
    let properties = feature.properties.unwrap_or_default();

    Ok(FeatureRecord {
        id: feature.id,
        properties,
        geometry,
    })
}

fn convert_geometry(geometry: GeoJsonGeometry) -> Result<Geometry<f64>, GeoJsonError> {
    geometry
        .try_into()
        .map_err(|err: geojson::Error| GeoJsonError::Geometry(err.to_string()))
}

fn parse_geojson_sequence(
    bytes: &[u8],
    context: &str,
) -> Result<Vec<FeatureRecord>, GeoJsonError> {
    let mut records = Vec::new();
    for (line_idx, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_number = (line_idx + 1) as u64;
        let line = match std::str::from_utf8(raw_line) {
            Ok(line) => line.trim(),
            Err(err) => {
                return Err(GeoJsonError::Parse {
                    message: format!("GeoJSON line is not valid UTF-8: {err}"),
                    line: Some(line_number),
                    context: context.to_string(),
                });
            },
        };

        if line.is_empty() {
            continue;
        }

        let geojson = line
            .parse::<GeoJson>()
            .map_err(|err| GeoJsonError::Parse {
                message: format!("Failed to parse GeoJSON feature: {err}"),
                line: Some(line_number),
                context: context.to_string(),
            })?;

        records.append(&mut geojson_to_records(geojson)?);
    }

    if records.is_empty() {
        Err(GeoJsonError::Parse {
            message: "No GeoJSON features found".to_string(),
            line: None,
            context: context.to_string(),
        })
    } else {
        Ok(records)
    }
}

fn combine_errors(
    collection_err: &str,
    sequence_err: &GeoJsonError,
    context: String,
) -> GeoJsonError {
    let message = format!(
        "Failed to parse GeoJSON as FeatureCollection ({collection_err}); \
         also failed to parse as GeoJSON sequence: {sequence_err}"
    );
    GeoJsonError::Parse {
        message,
        line: None,
        context,
    }
}

impl fmt::Display for FeatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let geom = if self.geometry.is_some() {
            "Some(Geometry)"
        } else {
            "None"
        };
        write!(
            f,
            "FeatureRecord(properties={} keys, geometry={geom})",
            self.properties.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_feature_collection() {
        let data = br#"{
  "type": "FeatureCollection",
  "features": [
    {"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":{"name":"A"}},
    {"type":"Feature","geometry":null,"properties":{"value":42}}
  ]
}"#;

        let records = parse_geojson_bytes(data, "test").expect("parse");
        assert_eq!(records.len(), 2);
        assert!(records[0].geometry.is_some());
        assert_eq!(records[0].properties.get("name").unwrap(), "A");
        assert!(records[1].geometry.is_none());
        assert_eq!(records[1].properties.get("value").unwrap(), 42);
    }

    #[test]
    fn parse_keeps_feature_ids() {
        let data = br#"{"type":"FeatureCollection","features":[
            {"type":"Feature","id":"well-7","geometry":null,"properties":{}},
            {"type":"Feature","id":12,"geometry":null,"properties":{}},
            {"type":"Feature","geometry":null,"properties":{}}
        ]}"#;

        let records = parse_geojson_bytes(data, "test").expect("parse");
        assert_eq!(records[0].id, Some(Id::String("well-7".to_string())));
        assert_eq!(records[1].id, Some(Id::Number(12.into())));
        assert_eq!(records[2].id, None);
    }

    #[test]
    fn parse_empty_feature_collection() {
        let data = br#"{"type":"FeatureCollection","features":[]}"#;

        let records = parse_geojson_bytes(data, "test").expect("parse");
        assert!(records.is_empty());
    }

    #[test]
    fn parse_single_feature_without_properties() {
        let data = br#"{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]}}"#;

        let records = parse_geojson_bytes(data, "test").expect("parse");
        assert_eq!(records.len(), 1);
        assert!(records[0].geometry.is_some());
        assert!(records[0].properties.is_empty());
    }

    #[test]
    fn parse_single_geometry() {
        let data = br#"{"type":"Point","coordinates":[7.0,8.0]}"#;

        let records = parse_geojson_bytes(data, "test").expect("parse");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].geometry,
            Some(Geometry::Point(geo_types::Point::new(7.0, 8.0)))
        );
        assert!(records[0].properties.is_empty());
    }

    #[test]
    fn parse_sequence_with_empty_lines() {
        let data = br#"{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},"properties":{"id":1}}

{"type":"Feature","geometry":{"type":"Point","coordinates":[1,1]},"properties":{"id":2}}
"#;

        let records = parse_geojson_bytes(data, "seq").expect("sequence");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].properties.get("id").unwrap(), 2);
    }

    #[test]
    fn parse_empty_sequence_fails() {
        let err = parse_geojson_bytes(b"\n\n\n", "empty").unwrap_err();
        assert!(err.to_string().contains("No GeoJSON features found"));
    }

    #[test]
    fn parse_invalid_utf8_in_sequence() {
        let mut data = Vec::from(&b"{"[..]);
        data.push(0xFF);
        data.extend_from_slice(b"}");

        let err = parse_geojson_bytes(&data, "bad_utf8").unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn parse_invalid_geojson_sequence_line() {
        let data = br#"{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},"properties":{"id":1}}
not valid json"#;

        let err = parse_geojson_bytes(data, "bad_json").unwrap_err();
        assert!(err.to_string().contains("Failed to parse GeoJSON feature"));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn parse_invalid_json_combines_errors() {
        let err = parse_geojson_bytes(b"not valid json at all", "invalid").unwrap_err();
        match err {
            GeoJsonError::Parse {
                message, context, ..
            } => {
                assert!(message.contains("Failed to parse GeoJSON as FeatureCollection"));
                assert!(message.contains("also failed to parse as GeoJSON sequence"));
                assert_eq!(context, "invalid");
            },
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn display_feature_record() {
        let record = FeatureRecord {
            id: None,
            properties: JsonObject::new(),
            geometry: None,
        };
        assert_eq!(
            record.to_string(),
            "FeatureRecord(properties=0 keys, geometry=None)"
        );
    }
}
