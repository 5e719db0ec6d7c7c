//! # Protocol Dispatcher
//!
//! Turns one inbound JSON-RPC message into at most one outbound envelope.
//!
//! | Method | Reply |
//! |--------|-------|
//! | `initialize` | protocol version, capabilities, server info |
//! | `notifications/*` | none |
//! | `ping` | empty object |
//! | `tools/list` | the tool catalog |
//! | `tools/call` | tool result as a text content block |
//!
//! Messages without an id (or with a null id) are notifications: they are
//! processed and never answered, even when they fail. Every other failure
//! becomes an error envelope; nothing escapes to the transport.

use crate::backend::{Backend, BackendResponse};
use crate::protocol::{PROTOCOL_VERSION, RpcError, RpcRequest, RpcResponse};
use crate::session::SessionState;
use crate::tools::{
    QUERY_TOOL, QueryArgs, SCHEMA_TOOL, SUGGEST_TOOL, SchemaArgs, SuggestArgs, ToolCatalog,
    parse_args,
};
use cubebridge_core::{QueryCompiler, available_cubes, common_analyses, contextual_suggestions};
use serde_json::{Value, json};
use std::sync::Arc;

/// Name announced in `serverInfo`.
pub const SERVER_NAME: &str = "cubebridge-mcp";

const INSTRUCTIONS: &str = "Semantic layer access for analytics questions. \
    Use get_schema_metadata to discover cubes, then query_semantic_layer with a \
    structured query or a plain-language description. Every answer carries a \
    data_source of live, fallback or mock.";

/// Routes messages to handlers. Shared by every transport.
pub struct Dispatcher {
    backend: Backend,
    catalog: ToolCatalog,
    compiler: QueryCompiler,
    session: Arc<SessionState>,
}

impl Dispatcher {
    pub fn new(backend: Backend, session: Arc<SessionState>) -> Self {
        let catalog = ToolCatalog::new(session.settings().tools);
        Self {
            backend,
            catalog,
            compiler: QueryCompiler::new(),
            session,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Handle one raw line. `None` means nothing is written back.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(message) => self.handle_message(message).await.map(|r| r.to_line()),
            Err(e) => {
                self.session.next_request();
                tracing::debug!(error = %e, "Unparseable message");
                Some(RpcResponse::failure(Value::Null, &RpcError::Parse(e.to_string())).to_line())
            }
        }
    }

    /// Handle one decoded message.
    pub async fn handle_message(&self, message: Value) -> Option<RpcResponse> {
        let n = self.session.next_request();
        let raw_id = message.get("id").cloned().unwrap_or(Value::Null);

        let request: RpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "Message is not a request");
                return Some(RpcResponse::failure(
                    raw_id,
                    &RpcError::InvalidRequest(e.to_string()),
                ));
            }
        };

        if let Some(version) = request.jsonrpc.as_deref()
            && version != crate::protocol::JSONRPC_VERSION
        {
            tracing::debug!(version, "Unexpected jsonrpc version, handling anyway");
        }
        tracing::debug!(
            request_id = %self.session.request_id(n),
            method = %request.method,
            "Handling message"
        );

        let outcome = self.dispatch(&request).await;

        if request.is_notification() {
            if let Err(e) = outcome {
                tracing::debug!(method = %request.method, error = %e, "Notification failed");
            }
            return None;
        }

        match outcome {
            Ok(Some(result)) => Some(RpcResponse::success(request.reply_id(), result)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    method = %request.method,
                    code = e.code(),
                    error = %e,
                    "Request failed"
                );
                Some(RpcResponse::failure(request.reply_id(), &e))
            }
        }
    }

    async fn dispatch(&self, request: &RpcRequest) -> Result<Option<Value>, RpcError> {
        match request.method.as_str() {
            "initialize" => Ok(Some(self.initialize(request.params.as_ref()))),
            "ping" => Ok(Some(json!({}))),
            "tools/list" => Ok(Some(self.catalog.listing().clone())),
            "tools/call" => self.call_tool(request.params.as_ref()).await.map(Some),
            method if method.starts_with("notifications/") => Ok(None),
            method => Err(RpcError::MethodNotFound(method.to_string())),
        }
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        if let Some(client) = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
        {
            tracing::info!(
                client_version = client,
                server_version = PROTOCOL_VERSION,
                session = self.session.session_id(),
                "Client initializing"
            );
        }
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "experimental": {},
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": INSTRUCTIONS
        })
    }

    // =========================================================================
    // TOOLS
    // =========================================================================

    async fn call_tool(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let name = params
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::InvalidParams("missing tool name".to_string()))?;

        if !self.catalog.contains(name) {
            return Err(RpcError::ToolNotFound(name.to_string()));
        }
        let arguments = params.and_then(|p| p.get("arguments"));

        let body = match name {
            QUERY_TOOL => self.query_semantic_layer(parse_args(arguments)?).await?,
            SCHEMA_TOOL => self.get_schema_metadata(parse_args(arguments)?).await?,
            SUGGEST_TOOL => self.suggest_analysis(parse_args(arguments)?).await?,
            other => return Err(RpcError::ToolNotFound(other.to_string())),
        };
        text_content(&body)
    }

    async fn query_semantic_layer(&self, args: QueryArgs) -> Result<Value, RpcError> {
        if let Some(query) = args.query {
            if !query.is_object() {
                return Err(RpcError::InvalidParams(
                    "'query' must be an object".to_string(),
                ));
            }
            let response = self.backend.load(&query).await?;
            return Ok(answer(response));
        }

        let Some(description) = args.description else {
            return Err(RpcError::InvalidParams(
                "Either 'query' or 'description' must be provided".to_string(),
            ));
        };
        let query = self.compiler.compile_opt(description.as_deref()).to_json();
        let description = description.unwrap_or_default();
        tracing::debug!(%description, generated = %query, "Compiled description");

        let response = self.backend.load(&query).await?;
        Ok(json!({
            "natural_language": description,
            "generated_query": query,
            "data_source": response.source,
            "result": response.payload
        }))
    }

    async fn get_schema_metadata(&self, args: SchemaArgs) -> Result<Value, RpcError> {
        let response = self.backend.meta().await?;
        let Some(name) = args.cube_name else {
            return Ok(answer(response));
        };

        let cube = response
            .payload
            .get("cubes")
            .and_then(Value::as_array)
            .and_then(|cubes| {
                cubes
                    .iter()
                    .find(|cube| cube.get("name").and_then(Value::as_str) == Some(name.as_str()))
            })
            .cloned()
            .ok_or_else(|| RpcError::NotFound(format!("Cube '{name}' not found")))?;

        Ok(json!({ "data_source": response.source, "result": cube }))
    }

    async fn suggest_analysis(&self, args: SuggestArgs) -> Result<Value, RpcError> {
        let response = self.backend.meta().await?;
        let mut body = json!({
            "data_source": response.source,
            "available_cubes": available_cubes(&response.payload),
            "common_analyses": common_analyses(),
        });

        if let Some(question) = args.business_question.filter(|q| !q.trim().is_empty())
            && let Some(object) = body.as_object_mut()
        {
            object.insert(
                "contextual_suggestions".to_string(),
                json!(contextual_suggestions(&question)),
            );
            object.insert("business_question".to_string(), json!(question));
        }
        Ok(body)
    }
}

fn answer(response: BackendResponse) -> Value {
    json!({ "data_source": response.source, "result": response.payload })
}

/// Wrap a tool answer as a single pretty-printed text block.
fn text_content(body: &Value) -> Result<Value, RpcError> {
    let text = serde_json::to_string_pretty(body).map_err(|e| RpcError::Internal(e.to_string()))?;
    Ok(json!({ "content": [{ "type": "text", "text": text }] }))
}

// =============================================================================
// TESTS
// =============================================================================
