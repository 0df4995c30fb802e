//! Tagged view of whatever a remote procedure handed back.
//!
//! Remote procedures return scalars, arrays and objects through one untyped
//! channel. Callers pick the shape they expect with the `expect_*` helpers
//! and get a `DecodeMismatch` instead of an untyped value leaking further.

use serde_json::{Map, Number, Value};

use crate::error::{AirScriptError, Result};

/// Single JSON scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Number(n) => Value::Number(n),
            Scalar::Text(s) => Value::String(s),
        }
    }
}

/// Decoded remote value. JSON `null` maps to `Absent`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RemoteValue {
    #[default]
    Absent,
    Scalar(Scalar),
    Sequence(Vec<Value>),
    Mapping(Map<String, Value>),
}

impl RemoteValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => RemoteValue::Absent,
            Value::Bool(b) => RemoteValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => RemoteValue::Scalar(Scalar::Number(n)),
            Value::String(s) => RemoteValue::Scalar(Scalar::Text(s)),
            Value::Array(items) => RemoteValue::Sequence(items),
            Value::Object(map) => RemoteValue::Mapping(map),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            RemoteValue::Absent => Value::Null,
            RemoteValue::Scalar(s) => s.into_json(),
            RemoteValue::Sequence(items) => Value::Array(items),
            RemoteValue::Mapping(map) => Value::Object(map),
        }
    }

    /// Short name of the variant, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteValue::Absent => "absent",
            RemoteValue::Scalar(_) => "scalar",
            RemoteValue::Sequence(_) => "sequence",
            RemoteValue::Mapping(_) => "mapping",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, RemoteValue::Absent)
    }

    pub fn expect_mapping(self, operation: &str) -> Result<Map<String, Value>> {
        match self {
            RemoteValue::Mapping(map) => Ok(map),
            other => Err(AirScriptError::mismatch(operation, "mapping", other.kind())),
        }
    }

    pub fn expect_sequence(self, operation: &str) -> Result<Vec<Value>> {
        match self {
            RemoteValue::Sequence(items) => Ok(items),
            other => Err(AirScriptError::mismatch(operation, "sequence", other.kind())),
        }
    }

    pub fn expect_scalar(self, operation: &str) -> Result<Scalar> {
        match self {
            RemoteValue::Scalar(s) => Ok(s),
            other => Err(AirScriptError::mismatch(operation, "scalar", other.kind())),
        }
    }
}

impl From<Value> for RemoteValue {
    fn from(value: Value) -> Self {
        RemoteValue::from_json(value)
    }
}

/// JSON type name of a raw value, for mismatch errors on projected fields.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "absent",
        Value::Bool(_) | Value::Number(_) | Value::String(_) => "scalar",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_variants() {
        assert_eq!(RemoteValue::from_json(Value::Null), RemoteValue::Absent);
        assert_eq!(
            RemoteValue::from_json(json!("hi")),
            RemoteValue::Scalar(Scalar::Text("hi".into()))
        );
        assert_eq!(RemoteValue::from_json(json!([1, 2])).kind(), "sequence");
        assert_eq!(RemoteValue::from_json(json!({"ok": true})).kind(), "mapping");
    }

    #[test]
    fn test_json_roundtrip_preserves_value() {
        let original = json!({"cells": [{"address": "$A$1"}], "count": 1});
        let back = RemoteValue::from_json(original.clone()).into_json();
        assert_eq!(back, original);
    }

    #[test]
    fn test_expect_mapping_mismatch() {
        let err = RemoteValue::from_json(json!([1]))
            .expect_mapping("getWorksheetCount")
            .unwrap_err();
        match err {
            AirScriptError::DecodeMismatch { operation, expected, actual } => {
                assert_eq!(operation, "getWorksheetCount");
                assert_eq!(expected, "mapping");
                assert_eq!(actual, "sequence");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_expect_scalar() {
        let s = RemoteValue::from_json(json!(12.5)).expect_scalar("getCellValue").unwrap();
        assert_eq!(s.as_f64(), Some(12.5));
        assert!(RemoteValue::Absent.expect_scalar("getCellValue").is_err());
    }
}
