//! JSON Schema validation of snapshot files (feature `schemaval`).

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::{IoError, IoResult};

/// Draft 2020-12 schema for the snapshot wire format.
const SNAPSHOT_SCHEMA: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["districts"],
  "additionalProperties": false,
  "properties": {
    "districts": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["province", "district_number", "form_type"],
        "additionalProperties": false,
        "properties": {
          "province": { "type": "string" },
          "district_number": { "type": "integer" },
          "form_type": { "enum": ["constituency", "party_list"] },
          "primary": { "$ref": "#/$defs/source_body" },
          "official": { "$ref": "#/$defs/source_body" },
          "volunteer": { "$ref": "#/$defs/source_body" },
          "independent": { "$ref": "#/$defs/source_body" }
        }
      }
    },
    "party_names": {
      "type": "object",
      "propertyNames": { "pattern": "^[0-9]+$" },
      "additionalProperties": { "type": "string" }
    }
  },
  "$defs": {
    "source_body": {
      "type": ["object", "null"],
      "additionalProperties": false,
      "properties": {
        "valid_votes": { "type": ["integer", "null"], "minimum": 0 },
        "invalid_votes": { "type": ["integer", "null"], "minimum": 0 },
        "blank_votes": { "type": ["integer", "null"], "minimum": 0 },
        "votes": {
          "type": "object",
          "propertyNames": { "pattern": "^[0-9]+$" },
          "additionalProperties": { "type": "integer", "minimum": 0 }
        },
        "weak_flag": { "type": "boolean" },
        "station_count": { "type": ["integer", "null"], "minimum": 0 }
      }
    }
  }
}"##;

/// Validate a parsed snapshot document against the embedded schema.
///
/// Reports the first violation with its instance path.
pub fn validate_snapshot(doc: &Value) -> IoResult<()> {
    let schema: Value = serde_json::from_str(SNAPSHOT_SCHEMA)
        .map_err(|e| IoError::Schema(format!("embedded schema is not valid JSON: {e}")))?;
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft202012)
        .compile(&schema)
        .map_err(|e| IoError::Schema(format!("embedded schema failed to compile: {e}")))?;

    if let Err(mut errors) = compiled.validate(doc) {
        if let Some(first) = errors.next() {
            return Err(IoError::Schema(format!(
                "{} at {}",
                first, first.instance_path
            )));
        }
    }
    Ok(())
}
