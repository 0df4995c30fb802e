//! Error type shared by every layer of the client.

use thiserror::Error;

/// Result alias using [`AirScriptError`].
pub type Result<T> = std::result::Result<T, AirScriptError>;

/// Errors surfaced by the AirScript client.
///
/// Address and data-shape errors are raised before any network I/O.
/// Transport errors carry whatever the HTTP layer could tell us.
#[derive(Debug, Error)]
pub enum AirScriptError {
    /// Network or HTTP failure (connection refused, timeout, non-2xx status).
    #[error("transport error{}: {cause}", status_suffix(.status))]
    Transport {
        cause: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// Malformed cell, column or range address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Zero-row or zero-column data block handed to a range helper.
    #[error("empty data: {0}")]
    EmptyData(String),

    /// Argument rejected before the call (empty function name, zero count).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The decoded payload did not have the shape the operation expects.
    #[error("{operation}: expected {expected}, got {actual}")]
    DecodeMismatch {
        operation: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The remote script ran but reported `success: false`.
    #[error("{operation} failed on the remote side: {message}")]
    Remote { operation: String, message: String },

    /// A 2xx response whose body is not a JSON envelope.
    #[error("malformed response envelope: {0}")]
    Envelope(String),

    /// Required client settings are missing.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Reading or writing the config file failed.
    #[error("config error: {0}")]
    Config(String),
}

impl AirScriptError {
    /// HTTP status of a transport failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            AirScriptError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Response body of a transport failure, if one was read.
    pub fn body(&self) -> Option<&str> {
        match self {
            AirScriptError::Transport { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn mismatch(operation: &str, expected: &'static str, actual: &'static str) -> Self {
        AirScriptError::DecodeMismatch {
            operation: operation.to_string(),
            expected,
            actual,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}
