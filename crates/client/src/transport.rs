//! HTTP seam.
//!
//! The dispatcher only needs "POST this JSON with this token, give me the
//! status and body". [`HttpTransport`] does that with a blocking reqwest
//! client (no Tokio runtime required); tests swap in a fake.
//! Retries are not done here or in the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::{AirScriptError, Result};

/// Header carrying the script token.
pub const TOKEN_HEADER: &str = "AirScript-Token";

const USER_AGENT: &str = concat!("airsheet/", env!("CARGO_PKG_VERSION"));

/// One outgoing `sync_task` call.
#[derive(Debug, Clone, Copy)]
pub struct TransportRequest<'a> {
    pub url: &'a str,
    pub token: &'a str,
    pub body: &'a Value,
    pub timeout: Duration,
}

/// Raw HTTP answer. Status is not interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs one blocking request/response round trip.
///
/// Implementations return `AirScriptError::Transport` when no response was
/// obtained (connect failure, timeout, body read error).
pub trait Transport: Send + Sync {
    fn post_json(&self, request: &TransportRequest<'_>) -> Result<TransportResponse>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post_json(&self, request: &TransportRequest<'_>) -> Result<TransportResponse> {
        (**self).post_json(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post_json(&self, request: &TransportRequest<'_>) -> Result<TransportResponse> {
        (**self).post_json(request)
    }
}

/// Blocking reqwest transport.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");
        Self { http }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, request: &TransportRequest<'_>) -> Result<TransportResponse> {
        let response = self
            .http
            .post(request.url)
            .header(TOKEN_HEADER, request.token)
            .json(request.body)
            .timeout(request.timeout)
            .send()
            .map_err(|e| request_error(e, request.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| AirScriptError::Transport {
                cause: format!("failed to read response body: {}", e),
                status: Some(status),
                body: None,
            })?
            .to_vec();

        Ok(TransportResponse { status, body })
    }
}

fn request_error(e: reqwest::Error, timeout: Duration) -> AirScriptError {
    let cause = if e.is_timeout() {
        format!("request timed out after {}s", timeout.as_secs())
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    };
    AirScriptError::Transport {
        cause,
        status: e.status().map(|s| s.as_u16()),
        body: None,
    }
}
