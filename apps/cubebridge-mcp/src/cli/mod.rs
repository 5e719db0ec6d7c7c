//! # CLI Module
//!
//! ## Available Commands
//!
//! - `stdio` - Serve MCP over stdin/stdout (default)
//! - `relay` - Forward stdin/stdout traffic to a remote gateway
//! - `serve` - Serve MCP over HTTP as a gateway
//! - `compile` - Print the query compiled from a question

mod commands;

use crate::config::{BackendMode, ConfigError, Settings, ToolSet};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::{CliError, execute};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Semantic layer access for AI agents over MCP.
#[derive(Parser, Debug)]
#[command(name = "cubebridge-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend behaviour on failure
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendMode>,

    /// Advertised tool set
    #[arg(long, global = true, value_enum)]
    pub tools: Option<ToolSet>,

    /// Semantic layer base URL
    #[arg(long, global = true)]
    pub cube_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve MCP over stdin/stdout
    Stdio,

    /// Forward MCP traffic to a remote gateway
    Relay {
        /// Gateway endpoint (overrides CUBEBRIDGE_GATEWAY_URL)
        #[arg(short, long)]
        gateway_url: Option<String>,
    },

    /// Serve MCP over HTTP
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8090")]
        port: u16,
    },

    /// Print the query compiled from a question
    Compile {
        /// The question, words may be passed unquoted
        #[arg(required = true)]
        text: Vec<String>,
    },
}

impl Cli {
    /// Settings from file and environment, then overridden by flags.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let mut settings = Settings::load(self.config.as_deref())?;
        self.apply_overrides(&mut settings);
        Ok(settings)
    }

    /// Apply command-line flags on top of `settings`.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        if let Some(tools) = self.tools {
            settings.tools = tools;
        }
        if let Some(url) = &self.cube_url {
            settings.cube_url.clone_from(url);
        }
        if self.debug {
            settings.debug = true;
        }
        if let Some(Commands::Relay {
            gateway_url: Some(url),
        }) = &self.command
        {
            settings.gateway_url = Some(url.clone());
        }
    }
}
