//! Response decoding for `sync_task`.
//!
//! The endpoint answers `{"data": {"result": "<string>"}}` where `result` is
//! itself a JSON document (or the sentinel `"[Undefined]"`). Decoding is two
//! stages so each failure mode can be tested on its own:
//!
//! 1. [`decode_envelope`]: response body → [`Envelope`]. A body that is not
//!    JSON is an error.
//! 2. [`decode_inner_payload`]: `result` string → [`Unwrapped`]. A string
//!    that is not JSON is *not* an error; it comes back as
//!    [`Unwrapped::Fallback`] because some procedures return plain text.
//!
//! By convention the script wraps its return value in a one-element array;
//! stage 2 reduces that array to its first element. A multi-element array
//! loses its tail. That is what the script convention implies, but it is
//! observed behaviour rather than a documented guarantee.

use serde_json::Value;

use crate::error::{AirScriptError, Result};
use crate::value::{json_kind, RemoteValue};

/// What the script runtime puts in `result` when the script returned nothing.
pub const UNDEFINED_SENTINEL: &str = "[Undefined]";

/// Outer response document, kept whole so it can be handed back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    raw: Value,
}

impl Envelope {
    pub fn from_json(raw: Value) -> Self {
        Self { raw }
    }

    /// The inner `data.result` string, if present and a string.
    pub fn result(&self) -> Option<&str> {
        self.raw.get("data")?.get("result")?.as_str()
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }
}

/// Outcome of unwrapping an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Unwrapped {
    /// `result` parsed as JSON and was reduced to its logical value.
    Decoded(RemoteValue),
    /// `result` was present but not JSON; the raw text, verbatim.
    Fallback(String),
    /// No usable value (`result` missing, empty, or the undefined sentinel).
    /// Carries the untouched envelope for diagnostics.
    NoValue(Envelope),
}

impl Unwrapped {
    /// Collapse to a [`RemoteValue`]: fallback text becomes a text scalar and
    /// "no value" becomes `Absent`.
    pub fn into_value(self) -> RemoteValue {
        match self {
            Unwrapped::Decoded(v) => v,
            Unwrapped::Fallback(s) => RemoteValue::Scalar(crate::value::Scalar::Text(s)),
            Unwrapped::NoValue(_) => RemoteValue::Absent,
        }
    }

    /// Best JSON rendering: the decoded value, the raw text, or the raw envelope.
    pub fn into_json(self) -> Value {
        match self {
            Unwrapped::Decoded(v) => v.into_json(),
            Unwrapped::Fallback(s) => Value::String(s),
            Unwrapped::NoValue(env) => env.into_raw(),
        }
    }
}

/// Stage 1: parse the HTTP body into an [`Envelope`].
pub fn decode_envelope(body: &[u8]) -> Result<Envelope> {
    serde_json::from_slice::<Value>(body)
        .map(Envelope::from_json)
        .map_err(|e| AirScriptError::Envelope(e.to_string()))
}

/// Stage 2: parse the inner `result` string.
///
/// A JSON array is reduced to its first element. An empty array, or any
/// other JSON document, decodes to `Absent`.
pub fn decode_inner_payload(result: &str) -> Unwrapped {
    match serde_json::from_str::<Value>(result) {
        Ok(Value::Array(items)) => {
            if items.len() > 1 {
                log::debug!("result array has {} elements, keeping the first", items.len());
            }
            let first = items.into_iter().next().unwrap_or(Value::Null);
            Unwrapped::Decoded(RemoteValue::from_json(first))
        }
        Ok(other) => {
            log::debug!("result is {} rather than an array, no value", json_kind(&other));
            Unwrapped::Decoded(RemoteValue::Absent)
        }
        Err(e) => {
            log::debug!("result is not JSON ({}), returning it verbatim", e);
            Unwrapped::Fallback(result.to_string())
        }
    }
}

/// Unwrap a decoded envelope into the procedure's logical return value.
pub fn unwrap_envelope(envelope: Envelope) -> Unwrapped {
    match envelope.result() {
        None | Some("") | Some(UNDEFINED_SENTINEL) => Unwrapped::NoValue(envelope),
        Some(result) => decode_inner_payload(result),
    }
}

/// If `value` is a non-empty sequence, return its first element; otherwise
/// return it unchanged.
///
/// Some procedures come back still array-wrapped after stage 2.
pub fn unwrap_singleton(value: RemoteValue) -> RemoteValue {
    match value {
        RemoteValue::Sequence(items) if !items.is_empty() => {
            let first = items.into_iter().next().unwrap_or(Value::Null);
            RemoteValue::from_json(first)
        }
        other => other,
    }
}
