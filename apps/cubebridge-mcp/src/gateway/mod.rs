//! # HTTP Gateway
//!
//! Serves the dispatcher over HTTP for remote relays.
//!
//! ## Endpoints
//!
//! - `POST /mcp` - one JSON-RPC message per request body; `200` with the
//!   reply, or `202` with an empty body when there is nothing to reply
//! - `GET /health` - liveness, never authenticated

mod auth;

pub use auth::key_matches;

use crate::dispatcher::{Dispatcher, SERVER_NAME};
use crate::server::shutdown_signal;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Shared gateway state.
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    server: &'static str,
    version: &'static str,
    session: String,
    requests: u64,
}

/// Build the router. The Bearer check is installed only when a key is set.
pub fn create_router(dispatcher: Arc<Dispatcher>) -> Router {
    let key = dispatcher.session().settings().gateway_key.clone();
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/mcp", post(mcp_handler));

    match key {
        Some(key) => {
            tracing::info!("Gateway key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                Arc::<str>::from(key),
                auth::require_key,
            ));
        }
        None => {
            tracing::warn!(
                "Gateway key authentication disabled. Set CUBEBRIDGE_GATEWAY_KEY to require a Bearer key."
            );
        }
    }

    router
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(GatewayState { dispatcher })
}

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let session = state.dispatcher.session();
    Json(HealthResponse {
        status: "ok",
        server: SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
        session: session.session_id().to_string(),
        requests: session.request_count(),
    })
}

async fn mcp_handler(State(state): State<GatewayState>, body: String) -> Response {
    if body.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Empty body").into_response();
    }
    match state.dispatcher.handle_line(&body).await {
        Some(reply) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            reply,
        )
            .into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn run_gateway(addr: &str, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    let router = create_router(dispatcher);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Gateway listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}
