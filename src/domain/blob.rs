//! Helpers for client-submitted attribute blobs and URL segments.
//!
//! Blobs are stored as submitted; the only structural requirement is that the
//! top level is a JSON object.

use serde_json::Value;
use slug::slugify;

use super::entities::DataBlob;
use super::error::DomainError;

/// Accept any JSON object as an attribute blob.
pub fn data_blob(value: Value) -> Result<DataBlob, DomainError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DomainError::validation(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validate a value that becomes a single URL path segment.
pub fn path_segment(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("`{field}` must not be empty")));
    }
    if trimmed.contains('/') {
        return Err(DomainError::validation(format!(
            "`{field}` must not contain `/`"
        )));
    }
    Ok(trimmed.to_string())
}

/// Dataset short name: the explicit `short_name`, else a slug of
/// `display_name`.
pub fn dataset_short_name(data: &DataBlob) -> Result<String, DomainError> {
    if let Some(name) = data.get("short_name").and_then(Value::as_str) {
        return path_segment("short_name", name);
    }

    let display = data
        .get("display_name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let derived = slugify(display);
    if derived.is_empty() {
        return Err(DomainError::validation(
            "dataset requires `short_name` or a `display_name` to derive it from",
        ));
    }
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn objects_are_accepted_as_is() {
        let blob = data_blob(json!({"name": "Bench", "nested": {"a": [1, 2]}})).expect("object");
        assert_eq!(blob["nested"], json!({"a": [1, 2]}));
    }

    #[test]
    fn non_objects_are_rejected() {
        let err = data_blob(json!([1, 2])).expect_err("array");
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn short_name_prefers_explicit_value() {
        let blob = data_blob(json!({"short_name": "trees", "display_name": "Street Trees"}))
            .expect("object");
        assert_eq!(dataset_short_name(&blob).expect("name"), "trees");
    }

    #[test]
    fn short_name_falls_back_to_display_name_slug() {
        let blob = data_blob(json!({"display_name": "Street Trees 2024"})).expect("object");
        assert_eq!(dataset_short_name(&blob).expect("name"), "street-trees-2024");
    }

    #[test]
    fn short_name_rejects_slashes_and_missing_names() {
        let blob = data_blob(json!({"short_name": "a/b"})).expect("object");
        assert!(dataset_short_name(&blob).is_err());
        let blob = data_blob(json!({})).expect("object");
        assert!(dataset_short_name(&blob).is_err());
    }
}
