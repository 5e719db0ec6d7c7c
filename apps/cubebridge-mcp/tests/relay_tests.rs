//! Relay tests: stdio lines forwarded to a recording gateway, and to a real
//! gateway router served on an ephemeral port.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use cubebridge_mcp::gateway::create_router;
use cubebridge_mcp::relay::HttpRelay;
use cubebridge_mcp::{Backend, BackendMode, Dispatcher, ServerLoop, SessionState, Settings};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Recorder {
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

/// Echo the request id back, wrapped as a string body.
async fn wrapped_echo(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    recorder.headers.lock().unwrap().push(headers);
    recorder.bodies.lock().unwrap().push(body.clone());
    let reply = json!({"jsonrpc": "2.0", "id": body["id"], "result": {"echo": body["method"]}});
    (StatusCode::OK, Json(json!({"body": reply.to_string()})))
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/mcp")
}

fn relay(url: String, session_id: &str) -> HttpRelay {
    let session = Arc::new(SessionState::with_id(session_id, Settings::default()));
    HttpRelay::new(url, session, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_relay_sends_trace_headers() {
    let recorder = Recorder::default();
    let url = serve(
        Router::new()
            .route("/mcp", post(wrapped_echo))
            .with_state(recorder.clone()),
    )
    .await;
    let relay = relay(url, "session_42");

    let first = relay
        .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
        .await
        .unwrap();
    let second = relay
        .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#)
        .await
        .unwrap();

    let first: Value = serde_json::from_str(&first).unwrap();
    let second: Value = serde_json::from_str(&second).unwrap();
    assert_eq!(first["result"]["echo"], "tools/list");
    assert_eq!(second["id"], 2);

    let headers = recorder.headers.lock().unwrap();
    assert_eq!(headers.len(), 2);
    assert_eq!(headers[0]["x-session-id"], "session_42");
    assert_eq!(headers[0]["x-request-id"], "session_42_1");
    assert_eq!(headers[1]["x-request-id"], "session_42_2");
    let agent = headers[0][header::USER_AGENT].to_str().unwrap();
    assert!(agent.starts_with("cubebridge-relay/"));
}

#[tokio::test]
async fn test_relay_forwards_notifications_silently() {
    let recorder = Recorder::default();
    let url = serve(
        Router::new()
            .route("/mcp", post(wrapped_echo))
            .with_state(recorder.clone()),
    )
    .await;
    let relay = relay(url, "session_n");

    let reply = relay
        .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;

    assert!(reply.is_none());
    assert_eq!(recorder.bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_gateway_error_status_becomes_envelope() {
    async fn unavailable() -> (StatusCode, &'static str) {
        (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
    }
    let url = serve(Router::new().route("/mcp", post(unavailable))).await;
    let relay = relay(url, "session_e");

    let reply = relay
        .handle_line(r#"{"jsonrpc":"2.0","id":"r1","method":"tools/list"}"#)
        .await
        .unwrap();
    let reply: Value = serde_json::from_str(&reply).unwrap();

    assert_eq!(reply["id"], "r1");
    assert_eq!(reply["error"]["code"], -32603);
    assert!(reply["error"]["message"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn test_relay_parse_error_is_local() {
    let relay = relay("http://127.0.0.1:9/mcp".to_string(), "session_p");
    let reply = relay.handle_line("][").await.unwrap();
    let reply: Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(reply["error"]["code"], -32700);
}

#[tokio::test]
async fn test_relay_to_real_gateway() {
    let settings = Settings {
        backend: BackendMode::Mock,
        ..Settings::default()
    };
    let session = Arc::new(SessionState::with_id("session_gw", settings));
    let dispatcher = Arc::new(Dispatcher::new(Backend::Mock, session));
    let url = serve(create_router(dispatcher)).await;

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_schema_metadata","arguments":{"cube_name":"customers"}}}"#,
        "\n",
    );
    let mut output = Vec::new();
    ServerLoop::new(relay(url, "session_rl"))
        .run(input.as_bytes(), &mut output, std::future::pending())
        .await
        .unwrap();

    let replies: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["result"]["serverInfo"]["name"], "cubebridge-mcp");
    let text = replies[1]["result"]["content"][0]["text"].as_str().unwrap();
    let body: Value = serde_json::from_str(text).unwrap();
    assert_eq!(body["result"]["name"], "customers");
}

fn mock_gateway(gateway_key: Option<&str>) -> Arc<Dispatcher> {
    let settings = Settings {
        backend: BackendMode::Mock,
        gateway_key: gateway_key.map(str::to_string),
        ..Settings::default()
    };
    let session = Arc::new(SessionState::with_id("session_gw", settings));
    Arc::new(Dispatcher::new(Backend::Mock, session))
}

#[tokio::test]
async fn test_relay_stays_silent_on_empty_gateway_reply() {
    let url = serve(create_router(mock_gateway(None))).await;
    let relay = relay(url, "session_ack");

    // An id does not make notifications/initialized answerable.
    let reply = relay
        .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"notifications/initialized"}"#)
        .await;
    assert!(reply.is_none());

    let reply = relay
        .handle_line(r#"{"jsonrpc":"2.0","id":8,"method":"ping"}"#)
        .await
        .unwrap();
    let reply: Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(reply["id"], 8);
    assert!(reply["result"].is_object());
}

#[tokio::test]
async fn test_relay_sends_gateway_key() {
    let url = serve(create_router(mock_gateway(Some("k3y")))).await;

    let keyed = Settings {
        gateway_key: Some("k3y".to_string()),
        ..Settings::default()
    };
    let session = Arc::new(SessionState::with_id("session_key", keyed));
    let keyed_relay = HttpRelay::new(url.clone(), session, Duration::from_secs(5)).unwrap();

    let reply = keyed_relay
        .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
        .await
        .unwrap();
    let reply: Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(reply["id"], 1);
    assert!(reply["result"].is_object());

    let unkeyed = relay(url, "session_nokey");
    let reply = unkeyed
        .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#)
        .await
        .unwrap();
    let reply: Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(reply["error"]["code"], -32603);
    assert!(reply["error"]["message"].as_str().unwrap().contains("401"));
}
