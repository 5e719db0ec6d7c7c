//! # Semantic Layer Backends
//!
//! One backend, three behaviours selected by [`BackendMode`]:
//!
//! | Mode | On success | On failure |
//! |------|-----------|------------|
//! | `strict` | live data | error |
//! | `resilient` | live data | retry with linear backoff, then synthetic fallback |
//! | `mock` | canned data | never fails |
//!
//! Every answer is tagged with its [`DataSource`] so callers can tell live
//! data from synthetic data.

use crate::client::{ClientError, CubeClient};
use crate::config::{BackendMode, RetryPolicy, Settings};
use crate::fallback;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// Where a backend answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Returned by the semantic layer.
    Live,
    /// Synthetic, substituted after the semantic layer kept failing.
    Fallback,
    /// Synthetic, the backend is mocked.
    Mock,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Fallback => f.write_str("fallback"),
            Self::Mock => f.write_str("mock"),
        }
    }
}

/// A backend answer and its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub payload: Value,
    pub source: DataSource,
}

impl BackendResponse {
    fn new(payload: Value, source: DataSource) -> Self {
        Self { payload, source }
    }
}

/// The semantic layer as seen by the dispatcher.
#[derive(Debug, Clone)]
pub enum Backend {
    Strict(CubeClient),
    Resilient {
        client: CubeClient,
        retry: RetryPolicy,
    },
    Mock,
}

impl Backend {
    /// Build the backend selected by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        let client = || {
            CubeClient::new(
                settings.api_root(),
                settings.api_token.clone(),
                settings.timeout(),
            )
        };
        Ok(match settings.backend {
            BackendMode::Strict => Self::Strict(client()?),
            BackendMode::Resilient => Self::Resilient {
                client: client()?,
                retry: settings.retry,
            },
            BackendMode::Mock => Self::Mock,
        })
    }

    /// The configured behaviour.
    pub fn mode(&self) -> BackendMode {
        match self {
            Self::Strict(_) => BackendMode::Strict,
            Self::Resilient { .. } => BackendMode::Resilient,
            Self::Mock => BackendMode::Mock,
        }
    }

    /// Execute a query. The query is forwarded untouched.
    pub async fn load(&self, query: &Value) -> Result<BackendResponse, ClientError> {
        match self {
            Self::Strict(client) => Ok(BackendResponse::new(
                client.load(query).await?,
                DataSource::Live,
            )),
            Self::Resilient { client, retry } => {
                match with_retry(retry, "load", move || client.load(query)).await {
                    Ok(payload) => Ok(BackendResponse::new(payload, DataSource::Live)),
                    Err(e) => {
                        tracing::warn!(
                            event = "fallback_data",
                            error = %e,
                            "Semantic layer unavailable, answering query with synthetic data"
                        );
                        Ok(BackendResponse::new(
                            fallback::load(query),
                            DataSource::Fallback,
                        ))
                    }
                }
            }
            Self::Mock => Ok(BackendResponse::new(fallback::load(query), DataSource::Mock)),
        }
    }

    /// Fetch cube metadata.
    pub async fn meta(&self) -> Result<BackendResponse, ClientError> {
        match self {
            Self::Strict(client) => Ok(BackendResponse::new(
                client.meta().await?,
                DataSource::Live,
            )),
            Self::Resilient { client, retry } => {
                match with_retry(retry, "meta", move || client.meta()).await {
                    Ok(payload) => Ok(BackendResponse::new(payload, DataSource::Live)),
                    Err(e) => {
                        tracing::warn!(
                            event = "fallback_data",
                            error = %e,
                            "Semantic layer unavailable, answering metadata with synthetic data"
                        );
                        Ok(BackendResponse::new(fallback::meta(), DataSource::Fallback))
                    }
                }
            }
            Self::Mock => Ok(BackendResponse::new(fallback::meta(), DataSource::Mock)),
        }
    }
}

/// Run `call` up to `retry.attempts` times, sleeping `n * base` after the
/// n-th failure. Returns the last error when every attempt fails.
async fn with_retry<F, Fut>(
    retry: &RetryPolicy,
    what: &str,
    mut call: F,
) -> Result<Value, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Value, ClientError>>,
{
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(payload) => return Ok(payload),
            Err(e) => {
                tracing::warn!(
                    attempt,
                    attempts,
                    error = %e,
                    "Semantic layer {what} attempt failed"
                );
                if attempt >= attempts {
                    return Err(e);
                }
                tokio::time::sleep(retry.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
