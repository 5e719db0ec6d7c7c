//! # JSON-RPC Envelopes
//!
//! Wire types for the line-delimited MCP protocol and the error taxonomy
//! that the dispatcher converts into error envelopes.
//!
//! ## Error Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | -32700 | Parse error: the line is not JSON |
//! | -32600 | Invalid request: JSON, but not a request object |
//! | -32601 | Unknown method or tool |
//! | -32602 | Invalid or missing tool arguments |
//! | -32603 | Internal error, including every backend failure |

use crate::client::ClientError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Protocol version tag carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

// =============================================================================
// ENVELOPES
// =============================================================================

/// An incoming request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl RpcRequest {
    /// Notifications carry no id (or a null id) and never get a reply.
    pub fn is_notification(&self) -> bool {
        matches!(self.id, None | Some(Value::Null))
    }

    /// The id to address a reply to.
    pub fn reply_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// Error object of an error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An outgoing response; exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Success envelope.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error envelope.
    pub fn failure(id: Value, error: &RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error.to_object()),
        }
    }

    /// Serialize to a single output line (no trailing newline).
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            // Unreachable for JSON values; still emit a well-formed line.
            let fallback = json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": Value::Null,
                "error": {"code": INTERNAL_ERROR, "message": format!("Internal error: {e}")},
            });
            fallback.to_string()
        })
    }
}

// =============================================================================
// ERROR TAXONOMY
// =============================================================================

/// Every failure the dispatcher can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown method: {0}")]
    MethodNotFound(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// JSON-RPC error code.
    pub fn code(&self) -> i64 {
        match self {
            Self::Parse(_) => PARSE_ERROR,
            Self::InvalidRequest(_) => INVALID_REQUEST,
            Self::MethodNotFound(_) | Self::ToolNotFound(_) => METHOD_NOT_FOUND,
            Self::InvalidParams(_) | Self::NotFound(_) => INVALID_PARAMS,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Structured context attached as `error.data`.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::MethodNotFound(method) => Some(json!({ "method": method })),
            Self::ToolNotFound(tool) => Some(json!({ "tool": tool })),
            _ => None,
        }
    }

    /// Error object for an envelope.
    pub fn to_object(&self) -> RpcErrorObject {
        RpcErrorObject {
            code: self.code(),
            message: self.to_string(),
            data: self.data(),
        }
    }
}

impl From<ClientError> for RpcError {
    fn from(e: ClientError) -> Self {
        Self::Internal(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
