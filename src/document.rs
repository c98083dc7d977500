//! Loading of the flat input document.
//!
//! The input is a JSON object of metadata keys to values, usually already flat
//! (`"Detectors.Detector-1.DetectorName": "Falcon"`). Nested objects and arrays are flattened
//! with `.`-joined keys so that nested exports can be fed in as well.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::error::{ConversionError, ConversionResult};
use crate::types::FlatDocument;

/// Read and flatten the input document at `path`.
pub fn load_document_from_path(path: impl AsRef<Path>) -> ConversionResult<FlatDocument> {
    let text = fs::read_to_string(path)?;
    load_document_from_str(&text)
}

/// Parse and flatten an input document from JSON text.
///
/// ```
/// use oscem_converter::document::load_document_from_str;
///
/// let doc = load_document_from_str(r#"{"HT": "300000", "Stage": {"x": 1.5, "tilted": false}}"#)?;
/// assert_eq!(doc["HT"], "300000");
/// assert_eq!(doc["Stage.x"], "1.5");
/// assert_eq!(doc["Stage.tilted"], "false");
/// # Ok::<(), oscem_converter::ConversionError>(())
/// ```
pub fn load_document_from_str(input: &str) -> ConversionResult<FlatDocument> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConversionError::InvalidInput {
            message: "json input is empty".to_string(),
        });
    }

    match serde_json::from_str::<JsonValue>(trimmed)? {
        JsonValue::Object(map) => Ok(flatten(&map)),
        other => Err(ConversionError::InvalidInput {
            message: format!("json input must be an object, got {}", kind(&other)),
        }),
    }
}

/// Flatten a JSON object into dot-path keys.
pub fn flatten(map: &Map<String, JsonValue>) -> FlatDocument {
    let mut out = FlatDocument::new();
    for (key, value) in map {
        flatten_into(key.clone(), value, &mut out);
    }
    out
}

fn flatten_into(prefix: String, value: &JsonValue, out: &mut FlatDocument) {
    match value {
        JsonValue::Null => {}
        JsonValue::String(s) => {
            out.insert(prefix, s.clone());
        }
        JsonValue::Bool(_) | JsonValue::Number(_) => {
            out.insert(prefix, value.to_string());
        }
        JsonValue::Object(map) => {
            for (key, child) in map {
                flatten_into(format!("{prefix}.{key}"), child, out);
            }
        }
        JsonValue::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(format!("{prefix}.{index}"), child, out);
            }
        }
    }
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
