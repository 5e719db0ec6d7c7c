//! # CLI Command Implementations

use super::{Cli, Commands};
use crate::backend::Backend;
use crate::client::ClientError;
use crate::config::{ConfigError, Settings};
use crate::dispatcher::Dispatcher;
use crate::gateway;
use crate::relay::HttpRelay;
use crate::server::ServerLoop;
use crate::session::SessionState;
use cubebridge_core::QueryCompiler;
use std::sync::Arc;
use thiserror::Error;

/// Errors that end the process with a non-zero status.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot build HTTP client: {0}")]
    Client(#[from] ClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot serialize query: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Relay needs a gateway URL (--gateway-url or CUBEBRIDGE_GATEWAY_URL)")]
    MissingGatewayUrl,
}

/// Run the selected command with already-resolved settings.
pub async fn execute(cli: Cli, settings: Settings) -> Result<(), CliError> {
    match cli.command.unwrap_or(Commands::Stdio) {
        Commands::Stdio => cmd_stdio(settings).await,
        Commands::Relay { .. } => cmd_relay(settings).await,
        Commands::Serve { host, port } => cmd_serve(settings, &host, port).await,
        Commands::Compile { text } => cmd_compile(&text.join(" ")),
    }
}

/// Dispatcher over the backend selected by `settings`.
pub fn build_dispatcher(settings: Settings) -> Result<Dispatcher, CliError> {
    let backend = Backend::from_settings(&settings)?;
    tracing::info!(
        backend = ?backend.mode(),
        tools = ?settings.tools,
        cube = %settings.api_root(),
        "Dispatcher ready"
    );
    let session = Arc::new(SessionState::new(settings));
    Ok(Dispatcher::new(backend, session))
}

async fn cmd_stdio(settings: Settings) -> Result<(), CliError> {
    let dispatcher = build_dispatcher(settings)?;
    tracing::info!(session = dispatcher.session().session_id(), "Serving MCP on stdio");
    ServerLoop::new(dispatcher).run_stdio().await?;
    Ok(())
}

async fn cmd_relay(settings: Settings) -> Result<(), CliError> {
    let gateway_url = settings
        .gateway_url
        .clone()
        .ok_or(CliError::MissingGatewayUrl)?;
    let timeout = settings.timeout();
    let session = Arc::new(SessionState::new(settings));
    let relay = HttpRelay::new(gateway_url, session, timeout)?;
    tracing::info!(gateway = relay.gateway_url(), "Relaying MCP from stdio");
    ServerLoop::new(relay).run_stdio().await?;
    Ok(())
}

async fn cmd_serve(settings: Settings, host: &str, port: u16) -> Result<(), CliError> {
    let dispatcher = Arc::new(build_dispatcher(settings)?);
    let addr = format!("{host}:{port}");
    gateway::run_gateway(&addr, dispatcher).await?;
    Ok(())
}

fn cmd_compile(text: &str) -> Result<(), CliError> {
    let query = QueryCompiler::new().compile(text);
    println!("{}", serde_json::to_string_pretty(&query)?);
    Ok(())
}
