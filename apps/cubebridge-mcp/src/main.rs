//! # cubebridge-mcp
//!
//! ```bash
//! # MCP over stdio (default), backed by a local Cube instance
//! cubebridge-mcp
//!
//! # Keep answering with synthetic data when Cube is down
//! cubebridge-mcp --backend resilient
//!
//! # HTTP gateway, and a stdio relay pointing at it
//! cubebridge-mcp serve --host 0.0.0.0 --port 8090
//! cubebridge-mcp relay --gateway-url http://gateway:8090/mcp
//!
//! # Inspect the compiler
//! cubebridge-mcp compile "top 5 cities by population"
//! ```

use clap::Parser;
use cubebridge_mcp::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    let settings = cli.settings();

    let debug = settings.as_ref().map_or(cli.debug, |s| s.debug);
    init_tracing(debug);

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::execute(cli, settings).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries protocol traffic.
/// `CUBEBRIDGE_LOG_FORMAT=json` switches to machine-parseable output.
fn init_tracing(debug: bool) {
    let log_format = std::env::var("CUBEBRIDGE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if debug {
        "cubebridge_mcp=debug,cubebridge_core=debug,tower_http=debug"
    } else {
        "cubebridge_mcp=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(false),
                )
                .init();
        }
    }
}
