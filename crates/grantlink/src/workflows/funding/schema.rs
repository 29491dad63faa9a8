//! Parsing and normalization of funder-defined application field lists.
//!
//! Form builders ship the field list either as a JSON array or as a string
//! holding serialized JSON, so both shapes are accepted here. The output keeps
//! the input order; duplicate labels are passed through unchanged because
//! existing opportunities rely on that behavior.

use serde_json::Value;

use super::domain::{FieldDefinition, FieldKind};

/// Validation errors raised while parsing a candidate field list.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("integrated application fields must be an array of objects")]
    InvalidFieldList,
    #[error("every integrated application field needs a non-empty label")]
    InvalidFieldLabel,
    #[error("unknown field type '{0}'")]
    UnknownFieldKind(String),
    #[error("invalid JSON for integrated application fields: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Parse a raw field-list payload into a normalized, ordered schema.
pub fn parse_field_schema(raw: &Value) -> Result<Vec<FieldDefinition>, SchemaError> {
    let elements = match raw {
        Value::Array(elements) => elements,
        Value::String(serialized) => {
            let parsed: Value = serde_json::from_str(serialized)?;
            return match parsed {
                Value::Array(_) => parse_field_schema(&parsed),
                _ => Err(SchemaError::InvalidFieldList),
            };
        }
        _ => return Err(SchemaError::InvalidFieldList),
    };

    let mut fields = Vec::with_capacity(elements.len());
    for element in elements {
        let object = element.as_object().ok_or(SchemaError::InvalidFieldList)?;

        let label = object
            .get("label")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .ok_or(SchemaError::InvalidFieldLabel)?;

        let kind = match object.get("type") {
            None | Some(Value::Null) => FieldKind::default(),
            Some(Value::String(kind)) if kind.is_empty() => FieldKind::default(),
            Some(Value::String(kind)) => FieldKind::parse(kind)
                .ok_or_else(|| SchemaError::UnknownFieldKind(kind.clone()))?,
            Some(other) => return Err(SchemaError::UnknownFieldKind(other.to_string())),
        };

        let required = object
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        fields.push(FieldDefinition {
            label: label.to_string(),
            kind,
            required,
        });
    }

    Ok(fields)
}

/// Resolve the schema stored on an opportunity after a form update.
///
/// Disabling the integrated application clears the stored schema even when a
/// field payload rides along in the same request.
pub fn resolve_schema_update(
    accepts_integrated_app: bool,
    raw_fields: Option<&Value>,
) -> Result<Option<Vec<FieldDefinition>>, SchemaError> {
    if !accepts_integrated_app {
        return Ok(None);
    }

    match raw_fields {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => parse_field_schema(raw).map(Some),
    }
}
