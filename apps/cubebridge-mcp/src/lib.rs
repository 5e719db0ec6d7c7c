//! # cubebridge-mcp
//!
//! MCP server exposing a Cube semantic layer to AI agents.
//!
//! ```text
//!  stdin ──► ServerLoop ──► Dispatcher ──► Backend ──► Cube REST API
//!                │              │             └──► synthetic data
//!                │              └──► QueryCompiler (cubebridge-core)
//!                └──► HttpRelay ──► remote gateway (POST /mcp)
//! ```
//!
//! Three independent axes are chosen at startup: the transport (stdio,
//! relay, HTTP gateway), the backend behaviour (strict, resilient, mock) and
//! the advertised tool set (full, reduced).

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod fallback;
pub mod gateway;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod session;
pub mod tools;

pub use backend::{Backend, BackendResponse, DataSource};
pub use config::{BackendMode, Settings, ToolSet};
pub use dispatcher::Dispatcher;
pub use server::{LineHandler, ServerLoop};
pub use session::SessionState;
