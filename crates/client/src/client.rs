//! Remote call dispatch.
//!
//! Every spreadsheet operation is one POST to
//! `/api/v3/ide/file/{file_id}/script/{script_id}/sync_task` with body
//! `{"Context": {"argv": {"function": <name>, ...params}, "active_sheet"?: <sheet>}}`.
//! The response envelope is decoded by [`crate::envelope`].

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{load_config, ClientConfig};
use crate::envelope::{decode_envelope, unwrap_envelope, Unwrapped};
use crate::error::{AirScriptError, Result};
use crate::transport::{HttpTransport, Transport, TransportRequest};

/// Per-call request payload. Built fresh for each invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallContext {
    /// `function` plus the procedure's arguments
    pub argv: Map<String, Value>,
    /// Target sheet; omitted means the sheet active on the remote side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_sheet: Option<String>,
}

impl CallContext {
    pub fn new(function: &str, sheet_name: Option<&str>, params: Map<String, Value>) -> Result<Self> {
        if function.trim().is_empty() {
            return Err(AirScriptError::InvalidArgument("function name is empty".into()));
        }

        let mut argv = Map::new();
        argv.insert("function".into(), Value::String(function.to_string()));
        for (key, value) in params {
            if key == "function" {
                log::warn!("ignoring `function` parameter passed to {}", function);
                continue;
            }
            argv.insert(key, value);
        }

        Ok(Self {
            argv,
            active_sheet: sheet_name.filter(|s| !s.is_empty()).map(String::from),
        })
    }

    pub fn function(&self) -> &str {
        self.argv.get("function").and_then(Value::as_str).unwrap_or_default()
    }

    /// `{"Context": <self>}`
    pub fn to_request_body(&self) -> Result<Value> {
        #[derive(Serialize)]
        struct SyncTaskBody<'a> {
            #[serde(rename = "Context")]
            context: &'a CallContext,
        }

        serde_json::to_value(SyncTaskBody { context: self })
            .map_err(|e| AirScriptError::InvalidArgument(format!("cannot encode call context: {}", e)))
    }
}

/// AirScript client (blocking).
///
/// Holds immutable configuration; each [`invoke`](Self::invoke) is an
/// independent round trip, so a shared reference can be used from several
/// threads at once.
pub struct AirScriptClient {
    transport: Box<dyn Transport>,
    endpoint: String,
    token: String,
    timeout: Duration,
}

impl std::fmt::Debug for AirScriptClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirScriptClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AirScriptClient {
    /// Create a client that talks HTTP via reqwest.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, HttpTransport::new())
    }

    /// Create a client using the saved config plus environment overrides.
    /// A saved file that does not parse is reported, not skipped.
    pub fn from_saved_config() -> Result<Self> {
        let config = match load_config()? {
            Some(saved) => saved.with_env_overrides(),
            None => ClientConfig::from_env().map_err(|_| {
                AirScriptError::NotConfigured("no saved config and AIRSCRIPT_* variables are not set".into())
            })?,
        };
        Self::new(config)
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport: Box::new(transport),
            endpoint: config.endpoint(),
            token: config.token,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call remote procedure `function` with `params`.
    ///
    /// `sheet_name` is forwarded as `active_sheet` only when given; the
    /// client never picks a default sheet. Transport failures and non-2xx
    /// statuses come back as [`AirScriptError::Transport`] and are not
    /// retried.
    pub fn invoke(
        &self,
        function: &str,
        sheet_name: Option<&str>,
        params: Map<String, Value>,
    ) -> Result<Unwrapped> {
        let context = CallContext::new(function, sheet_name, params)?;
        self.dispatch(&context)
    }

    /// Send a prepared context.
    pub fn dispatch(&self, context: &CallContext) -> Result<Unwrapped> {
        let function = context.function();
        let body = context.to_request_body()?;

        log::debug!(
            "invoke {} (sheet: {})",
            function,
            context.active_sheet.as_deref().unwrap_or("<active>")
        );
        log::trace!("request body: {}", body);

        let request = TransportRequest {
            url: &self.endpoint,
            token: &self.token,
            body: &body,
            timeout: self.timeout,
        };

        let response = self.transport.post_json(&request).map_err(|e| {
            log::warn!("{} failed: {}", function, e);
            e
        })?;

        if !response.is_success() {
            let text = response.body_text();
            log::warn!("{} returned HTTP {}: {}", function, response.status, text);
            return Err(AirScriptError::Transport {
                cause: format!("{} rejected by server", function),
                status: Some(response.status),
                body: Some(text),
            });
        }

        let envelope = decode_envelope(&response.body)?;
        Ok(unwrap_envelope(envelope))
    }
}

/// Build a parameter map from `(key, value)` pairs.
pub fn params<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fake transport shared by the dispatcher and facade tests.

    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::transport::TransportResponse;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Recorded {
        pub url: String,
        pub token: String,
        pub body: Value,
        pub timeout: Duration,
    }

    pub struct FakeTransport {
        pub requests: Mutex<Vec<Recorded>>,
        reply: Mutex<Result<TransportResponse>>,
    }

    impl FakeTransport {
        pub fn replying(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                reply: Mutex::new(Ok(TransportResponse { status, body: body.as_bytes().to_vec() })),
            })
        }

        /// Reply with `{"data":{"result": <result>}}`.
        pub fn with_result(result: &str) -> Arc<Self> {
            let envelope = serde_json::json!({ "data": { "result": result } });
            Self::replying(200, &envelope.to_string())
        }

        pub fn failing(cause: &str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                reply: Mutex::new(Err(AirScriptError::Transport {
                    cause: cause.to_string(),
                    status: None,
                    body: None,
                })),
            })
        }

        pub fn last(&self) -> Recorded {
            self.requests.lock().unwrap().last().cloned().expect("no request recorded")
        }

        pub fn count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl Transport for FakeTransport {
        fn post_json(&self, request: &TransportRequest<'_>) -> Result<TransportResponse> {
            self.requests.lock().unwrap().push(Recorded {
                url: request.url.to_string(),
                token: request.token.to_string(),
                body: request.body.clone(),
                timeout: request.timeout,
            });
            match &*self.reply.lock().unwrap() {
                Ok(resp) => Ok(resp.clone()),
                Err(AirScriptError::Transport { cause, status, body }) => Err(AirScriptError::Transport {
                    cause: cause.clone(),
                    status: *status,
                    body: body.clone(),
                }),
                Err(other) => panic!("fake transport only fails with Transport errors, got {:?}", other),
            }
        }
    }

    pub fn config() -> ClientConfig {
        ClientConfig::new("file-1", "script-1", "tok-abc").with_base_url("https://sheets.test")
    }

    pub fn client_with(transport: &Arc<FakeTransport>) -> AirScriptClient {
        AirScriptClient::with_transport(config(), Arc::clone(transport)).unwrap()
    }
}
