//! # HTTP Relay
//!
//! Line transport that forwards every message to a remote gateway instead
//! of dispatching it locally. Each POST carries the session id, a per-request
//! trace id and a user agent. Gateways may wrap the reply as
//! `{"body": <reply>}`, with the reply either inline or as a JSON string.
//! A 2xx answer with an empty body means the gateway has nothing to reply.
//! When `gateway_key` is configured it is sent as a Bearer token.

use crate::client::ClientError;
use crate::protocol::{RpcError, RpcResponse};
use crate::session::SessionState;
use reqwest::header::USER_AGENT;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const RELAY_AGENT: &str = concat!("cubebridge-relay/", env!("CARGO_PKG_VERSION"));

/// Forwards lines to a gateway URL.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    http: reqwest::Client,
    gateway_url: String,
    gateway_key: Option<String>,
    session: Arc<SessionState>,
}

impl HttpRelay {
    pub fn new(
        gateway_url: String,
        session: Arc<SessionState>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Connectivity(e.to_string()))?;
        let gateway_key = session.settings().gateway_key.clone();
        Ok(Self {
            http,
            gateway_url,
            gateway_key,
            session,
        })
    }

    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    /// Forward one line. Notifications are forwarded but never answered.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                return Some(
                    RpcResponse::failure(Value::Null, &RpcError::Parse(e.to_string())).to_line(),
                );
            }
        };

        let id = message.get("id").cloned().unwrap_or(Value::Null);
        let notification = id.is_null();
        let request_id = self.session.request_id(self.session.next_request());
        tracing::debug!(%request_id, gateway = %self.gateway_url, "Relaying message");

        let outcome = self.forward(&message, &request_id).await;
        if notification {
            if let Err(e) = outcome {
                tracing::debug!(%request_id, error = %e, "Relayed notification failed");
            }
            return None;
        }

        match outcome {
            Ok(Some(reply)) => Some(reply.to_string()),
            Ok(None) => {
                tracing::debug!(%request_id, "Gateway sent no reply");
                None
            }
            Err(e) => {
                tracing::warn!(%request_id, error = %e, "Relay failed");
                Some(
                    RpcResponse::failure(id, &RpcError::Internal(format!("Relay error: {e}")))
                        .to_line(),
                )
            }
        }
    }

    async fn forward(
        &self,
        message: &Value,
        request_id: &str,
    ) -> Result<Option<Value>, ClientError> {
        let mut request = self
            .http
            .post(&self.gateway_url)
            .header("X-Session-ID", self.session.session_id())
            .header("X-Request-ID", request_id)
            .header(USER_AGENT, RELAY_AGENT)
            .json(message);
        if let Some(ref key) = self.gateway_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Connectivity(format!("{}: {e}", self.gateway_url)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Connectivity(e.to_string()))?;
        if !status.is_success() {
            return Err(ClientError::Backend {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        let reply: Value =
            serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))?;
        unwrap_body(reply).map(Some)
    }
}

/// Strip a `{"body": ...}` wrapper; a string body holds the reply as JSON text.
fn unwrap_body(reply: Value) -> Result<Value, ClientError> {
    match reply {
        Value::Object(mut object) if object.contains_key("body") => {
            match object.remove("body").unwrap_or(Value::Null) {
                Value::String(text) => {
                    serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
                }
                body => Ok(body),
            }
        }
        other => Ok(other),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::json;

    #[test]
    fn string_body_is_parsed() {
        let reply = unwrap_body(json!({"body": "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}"}))
            .expect("unwrap");
        assert_eq!(reply["id"], 1);
    }

    #[test]
    fn inline_body_and_bare_reply() {
        let inline = unwrap_body(json!({"body": {"id": 2}})).expect("inline");
        assert_eq!(inline, json!({"id": 2}));

        let bare = unwrap_body(json!({"jsonrpc": "2.0", "id": 3})).expect("bare");
        assert_eq!(bare["id"], 3);
    }

    #[test]
    fn garbage_string_body_is_decode_error() {
        let err = unwrap_body(json!({"body": "<html>"})).expect_err("garbage");
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_gateway_becomes_internal_error() {
        let session = Arc::new(SessionState::with_id("session_r", Settings::default()));
        let relay = HttpRelay::new(
            "http://127.0.0.1:9/mcp".to_string(),
            session,
            Duration::from_secs(2),
        )
        .expect("relay");

        let reply = relay
            .handle_line(r#"{"jsonrpc":"2.0","id":11,"method":"tools/list"}"#)
            .await
            .expect("reply");
        let reply: Value = serde_json::from_str(&reply).expect("json");
        assert_eq!(reply["id"], 11);
        assert_eq!(reply["error"]["code"], -32603);

        assert!(
            relay
                .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .await
                .is_none()
        );
    }
}
