//! # Cube HTTP Client
//!
//! Wrapper around the Cube REST API (`load` and `meta`) for use by the MCP
//! server. One request per call, no retries, no caching.

use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

/// Errors from the HTTP client layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The upstream answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Backend { status: u16, body: String },
    /// Cannot reach the upstream (refused, DNS, timeout).
    #[error("Connection failed: {0}")]
    Connectivity(String),
    /// The response body was not the expected JSON.
    #[error("Invalid response: {0}")]
    Decode(String),
}

/// HTTP client that wraps calls to the Cube REST API.
#[derive(Clone, Debug)]
pub struct CubeClient {
    http: reqwest::Client,
    api_root: String,
    api_token: Option<String>,
}

impl CubeClient {
    /// Create a new client for `api_root` (base URL joined with the API
    /// prefix, e.g. `http://localhost:4000/cubejs-api/v1`).
    pub fn new(
        api_root: String,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Connectivity(e.to_string()))?;
        Ok(Self {
            http,
            api_root,
            api_token,
        })
    }

    /// The URL this client talks to.
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Build a request with optional Bearer auth.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.api_root, path);
        let mut req = self.http.request(method, &url);
        if let Some(ref token) = self.api_token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Send a request, check the status code and parse the JSON body.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, ClientError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ClientError::Connectivity(format!("{}: {e}", self.api_root)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Backend {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<Value>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// POST /load → execute a query (passed through as-is).
    pub async fn load(&self, query: &Value) -> Result<Value, ClientError> {
        let body = json!({ "query": query });
        let req = self.request(reqwest::Method::POST, "/load").json(&body);
        self.send(req).await
    }

    /// GET /meta → cubes, measures and dimensions.
    pub async fn meta(&self) -> Result<Value, ClientError> {
        let req = self.request(reqwest::Method::GET, "/meta");
        self.send(req).await
    }
}

// =============================================================================
// TESTS
// =============================================================================
