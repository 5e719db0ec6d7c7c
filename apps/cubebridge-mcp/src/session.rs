//! # Session State
//!
//! Process-wide state shared by every transport: the settings read at
//! startup, a session id, and a monotonically increasing request counter.
//! Only the counter changes after startup.

use crate::config::Settings;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// State of one server process.
#[derive(Debug)]
pub struct SessionState {
    session_id: String,
    requests: AtomicU64,
    settings: Settings,
}

impl SessionState {
    /// New session with an id derived from the current time.
    pub fn new(settings: Settings) -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::with_id(format!("session_{secs}"), settings)
    }

    /// New session with an explicit id.
    pub fn with_id(session_id: impl Into<String>, settings: Settings) -> Self {
        Self {
            session_id: session_id.into(),
            requests: AtomicU64::new(0),
            settings,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn debug(&self) -> bool {
        self.settings.debug
    }

    /// Count one more request and return its 1-based number.
    pub fn next_request(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    /// Requests counted so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Trace id of request number `n`: `<session_id>_<n>`.
    pub fn request_id(&self, n: u64) -> String {
        format!("{}_{n}", self.session_id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
