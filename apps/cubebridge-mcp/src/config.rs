//! # Configuration
//!
//! Settings are layered, later layers winning:
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config <path>`)
//! 3. Environment variables
//! 4. Command-line flags (applied by the CLI module)
//!
//! ## Environment Variables
//!
//! - `CUBE_API_URL`: semantic layer base URL (default: `http://localhost:4000`)
//! - `CUBE_API_PREFIX`: REST prefix (default: `/cubejs-api/v1`)
//! - `CUBE_API_SECRET`: optional Bearer token
//! - `CUBEBRIDGE_BACKEND`: `strict`, `resilient` or `mock`
//! - `CUBEBRIDGE_TOOLS`: `full` or `reduced`
//! - `CUBEBRIDGE_TIMEOUT_SECS`: HTTP timeout for backend calls
//! - `CUBEBRIDGE_GATEWAY_URL`: remote gateway for the relay transport
//! - `CUBEBRIDGE_GATEWAY_KEY`: Bearer key required by the HTTP gateway
//! - `DEBUG`: `1`, `true` or `yes` enables debug logging

use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default semantic layer URL.
pub const DEFAULT_CUBE_URL: &str = "http://localhost:4000";

/// Default REST prefix of the Cube API.
pub const DEFAULT_API_PREFIX: &str = "/cubejs-api/v1";

// =============================================================================
// CONFIGURATION AXES
// =============================================================================

/// How backend failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Failures surface as protocol errors.
    #[default]
    Strict,
    /// Retry, then answer with synthetic fallback data.
    Resilient,
    /// Never call the backend; answer with canned data.
    Mock,
}

/// Which tools the server advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ToolSet {
    /// Query, metadata and suggestion tools.
    #[default]
    Full,
    /// Query and metadata tools only.
    Reduced,
}

/// Retry policy for the resilient backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay unit; attempt `n` is followed by a sleep of `n * base`.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Sleep after the given 1-based failed attempt.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(attempt)))
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cube_url: String,
    pub api_prefix: String,
    pub api_token: Option<String>,
    pub backend: BackendMode,
    pub tools: ToolSet,
    pub timeout_secs: Option<u64>,
    pub retry: RetryPolicy,
    pub gateway_url: Option<String>,
    pub gateway_key: Option<String>,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cube_url: DEFAULT_CUBE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            api_token: None,
            backend: BackendMode::default(),
            tools: ToolSet::default(),
            timeout_secs: None,
            retry: RetryPolicy::default(),
            gateway_url: None,
            gateway_key: None,
            debug: false,
        }
    }
}

/// Errors raised while assembling [`Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`Settings`].
    #[error("Invalid config file: {0}")]
    Parse(String),

    /// An environment variable holds an unusable value.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl Settings {
    /// Parse settings from TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults, overlaid with `path` (if any), overlaid with the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Overlay values found through `lookup`; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("CUBE_API_URL") {
            self.cube_url = url;
        }
        if let Some(prefix) = get("CUBE_API_PREFIX") {
            self.api_prefix = prefix;
        }
        if let Some(token) = get("CUBE_API_SECRET") {
            self.api_token = Some(token);
        }
        if let Some(mode) = get("CUBEBRIDGE_BACKEND") {
            self.backend = parse_enum("CUBEBRIDGE_BACKEND", &mode)?;
        }
        if let Some(tools) = get("CUBEBRIDGE_TOOLS") {
            self.tools = parse_enum("CUBEBRIDGE_TOOLS", &tools)?;
        }
        if let Some(secs) = get("CUBEBRIDGE_TIMEOUT_SECS") {
            let parsed = secs
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "CUBEBRIDGE_TIMEOUT_SECS",
                    value: secs.clone(),
                })?;
            self.timeout_secs = Some(parsed);
        }
        if let Some(url) = get("CUBEBRIDGE_GATEWAY_URL") {
            self.gateway_url = Some(url);
        }
        if let Some(key) = get("CUBEBRIDGE_GATEWAY_KEY") {
            self.gateway_key = Some(key);
        }
        if let Some(flag) = get("DEBUG") {
            self.debug = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    /// HTTP timeout for backend calls.
    ///
    /// Defaults to 10 s for the resilient backend (it retries) and 30 s
    /// otherwise.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        let secs = self.timeout_secs.unwrap_or(match self.backend {
            BackendMode::Resilient => 10,
            BackendMode::Strict | BackendMode::Mock => 30,
        });
        Duration::from_secs(secs)
    }

    /// Base URL joined with the API prefix, without a trailing slash.
    #[must_use]
    pub fn api_root(&self) -> String {
        let base = self.cube_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{prefix}")
        }
    }
}

fn parse_enum<T: ValueEnum>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    T::from_str(value.trim(), true).map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api_root(), "http://localhost:4000/cubejs-api/v1");
        assert_eq!(settings.backend, BackendMode::Strict);
        assert_eq!(settings.tools, ToolSet::Full);
        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert!(!settings.debug);
    }

    #[test]
    fn env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("CUBE_API_URL", "http://cube:4000/"),
                ("CUBE_API_SECRET", "s3cret"),
                ("CUBEBRIDGE_BACKEND", "Resilient"),
                ("CUBEBRIDGE_TOOLS", "reduced"),
                ("DEBUG", "yes"),
            ]))
            .expect("env");

        assert_eq!(settings.api_root(), "http://cube:4000/cubejs-api/v1");
        assert_eq!(settings.api_token.as_deref(), Some("s3cret"));
        assert_eq!(settings.backend, BackendMode::Resilient);
        assert_eq!(settings.tools, ToolSet::Reduced);
        assert_eq!(settings.timeout(), Duration::from_secs(10));
        assert!(settings.debug);
    }

    #[test]
    fn empty_env_values_ignored() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[("CUBE_API_SECRET", ""), ("CUBE_API_URL", "  ")]))
            .expect("env");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn bad_env_value_rejected() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(env(&[("CUBEBRIDGE_BACKEND", "sometimes")]))
            .expect_err("should reject");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "CUBEBRIDGE_BACKEND",
                ..
            }
        ));
    }

    #[test]
    fn toml_partial_file() {
        let settings = Settings::from_toml_str(
            r#"
            cube_url = "http://analytics:4000"
            backend = "mock"

            [retry]
            attempts = 5
            "#,
        )
        .expect("toml");

        assert_eq!(settings.cube_url, "http://analytics:4000");
        assert_eq!(settings.backend, BackendMode::Mock);
        assert_eq!(settings.retry.attempts, 5);
        assert_eq!(settings.retry.base_delay_ms, 1000);
        assert_eq!(settings.api_prefix, DEFAULT_API_PREFIX);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cubebridge.toml");
        std::fs::write(&path, "tools = \"reduced\"\n").expect("write");

        let settings = Settings::load(Some(&path)).expect("load");
        assert_eq!(settings.tools, ToolSet::Reduced);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/cubebridge.toml")))
            .expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
    }

    #[test]
    fn empty_prefix() {
        let settings = Settings {
            api_prefix: String::new(),
            ..Settings::default()
        };
        assert_eq!(settings.api_root(), "http://localhost:4000");
    }
}
