use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::CatalogError;

/// Fields that form clients may send as a JSON-encoded string instead of
/// structured JSON.
pub const ENCODED_FIELDS: [&str; 3] = ["tags", "ingredients", "steps"];

/// How one of the list fields arrived on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RawField {
    Absent,
    Encoded(String),
    Structured(Value),
}

impl RawField {
    // null and "" both mean the field was not supplied
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => RawField::Absent,
            Some(Value::String(s)) if s.is_empty() => RawField::Absent,
            Some(Value::String(s)) => RawField::Encoded(s),
            Some(v) => RawField::Structured(v),
        }
    }

    /// Decode into structured JSON. `Absent` stays `None`.
    pub fn into_structured(self, field: &'static str) -> Result<Option<Value>, CatalogError> {
        match self {
            RawField::Absent => Ok(None),
            RawField::Structured(v) => Ok(Some(v)),
            RawField::Encoded(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|source| CatalogError::MalformedEncodedField { field, source }),
        }
    }

    /// Decode straight into a typed value.
    pub fn decode<T: DeserializeOwned>(self, field: &'static str) -> Result<Option<T>, CatalogError> {
        match self.into_structured(field)? {
            None => Ok(None),
            Some(v) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| CatalogError::validation(field, e.to_string())),
        }
    }
}

/// Rewrite encoded list fields of a JSON object body into structured JSON.
///
/// Other keys pass through untouched; absent fields are left out.
pub fn normalize(body: Value) -> Result<Value, CatalogError> {
    let Value::Object(mut map) = body else {
        return Err(CatalogError::validation("body", "expected a JSON object"));
    };
    normalize_map(&mut map)?;
    Ok(Value::Object(map))
}

fn normalize_map(map: &mut Map<String, Value>) -> Result<(), CatalogError> {
    for field in ENCODED_FIELDS {
        let raw = RawField::from_value(map.remove(field));
        if let Some(value) = raw.into_structured(field)? {
            map.insert(field.to_string(), value);
        }
    }
    Ok(())
}
