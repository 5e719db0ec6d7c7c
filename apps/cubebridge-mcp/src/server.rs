//! # Server Loop
//!
//! Reads newline-delimited messages, hands each non-blank line to a
//! [`LineHandler`], and writes each reply as one line followed by a flush.
//! Stops at end of input or on an interrupt; an interrupt also abandons the
//! message in flight. A line that is not UTF-8 gets a parse error reply and
//! the loop keeps reading.

use crate::dispatcher::Dispatcher;
use crate::protocol::{RpcError, RpcResponse};
use crate::relay::HttpRelay;
use serde_json::Value;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Something that answers one line with at most one line.
pub trait LineHandler {
    fn handle_line(&self, line: &str) -> impl Future<Output = Option<String>> + Send;
}

impl LineHandler for Dispatcher {
    fn handle_line(&self, line: &str) -> impl Future<Output = Option<String>> + Send {
        Dispatcher::handle_line(self, line)
    }
}

impl LineHandler for HttpRelay {
    fn handle_line(&self, line: &str) -> impl Future<Output = Option<String>> + Send {
        HttpRelay::handle_line(self, line)
    }
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub lines: u64,
    pub replies: u64,
    pub interrupted: bool,
}

/// Line-oriented transport around a handler.
pub struct ServerLoop<H> {
    handler: H,
}

impl<H: LineHandler> ServerLoop<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Serve process stdin/stdout until end of input or Ctrl-C.
    pub async fn run_stdio(&self) -> std::io::Result<LoopStats> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run(stdin, stdout, shutdown_signal()).await
    }

    /// Serve `reader`/`writer` until end of input or until `shutdown` fires.
    pub async fn run<R, W, S>(
        &self,
        reader: R,
        mut writer: W,
        shutdown: S,
    ) -> std::io::Result<LoopStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let mut stats = LoopStats::default();
        let mut segments = reader.split(b'\n');
        tokio::pin!(shutdown);

        loop {
            let segment = tokio::select! {
                next = segments.next_segment() => next?,
                () = &mut shutdown => {
                    stats.interrupted = true;
                    break;
                }
            };
            let Some(segment) = segment else {
                tracing::debug!("End of input");
                break;
            };
            if segment.trim_ascii().is_empty() {
                continue;
            }
            stats.lines += 1;

            let reply = match String::from_utf8(segment) {
                Ok(line) => tokio::select! {
                    reply = self.handler.handle_line(&line) => reply,
                    () = &mut shutdown => {
                        stats.interrupted = true;
                        break;
                    }
                },
                Err(e) => {
                    tracing::debug!(error = %e, "Line is not UTF-8");
                    let error = RpcError::Parse(format!("line is not valid UTF-8: {e}"));
                    Some(RpcResponse::failure(Value::Null, &error).to_line())
                }
            };
            if let Some(reply) = reply {
                writer.write_all(reply.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
                stats.replies += 1;
            }
        }

        if stats.interrupted {
            tracing::info!("Interrupted, shutting down");
        }
        tracing::info!(lines = stats.lines, replies = stats.replies, "Server loop stopped");
        Ok(stats)
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix. Never resolves if no handler
/// can be installed.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

// =============================================================================
// TESTS
// =============================================================================
