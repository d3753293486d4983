//! Typed configuration from environment variables.
//!
//! Loaded once at startup and passed by reference to whatever needs it,
//! never through an ambient global. Every knob has a default; only
//! malformed values fail.
//! In local dev, call `dotenvy::dotenv().ok()` before this.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default endpoint for the HTTP fetcher.
pub const DEFAULT_FETCH_BASE_URL: &str = "https://jsonplaceholder.typicode.com/users";

#[derive(Debug, Clone)]
pub struct Config {
    /// Application name attached to log events.
    pub app_name: String,
    /// Deployment environment name attached to log events.
    pub env_name: String,
    /// Log level filter; invalid values fall back to "info" with a warning.
    pub log_level: String,
    /// Log output format.
    pub log_output: LogOutput,
    /// Base URL the HTTP fetcher resolves items against.
    pub fetch_base_url: String,
    /// Per-request timeout for the HTTP fetcher.
    pub fetch_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            app_name: var_or("APP_NAME", "harvest"),
            env_name: var_or("ENV", "dev"),
            log_level: var_or("LOG_LEVEL", "info"),
            log_output: var_or("LOG_OUTPUT", "console").parse()?,
            fetch_base_url: var_or("FETCH_BASE_URL", DEFAULT_FETCH_BASE_URL),
            fetch_timeout: Duration::from_millis(millis_var_or("FETCH_TIMEOUT_MS", 10_000)?),
        })
    }
}

/// Where log output goes and how it is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Human-readable console output.
    Console,
    /// One JSON object per event, for log collectors.
    Json,
}

impl std::str::FromStr for LogOutput {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "json" => Ok(Self::Json),
            other => Err(Error::Config(format!(
                "LOG_OUTPUT must be \"console\" or \"json\", got {other:?}"
            ))),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn millis_var_or(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{name} is not a valid integer: {raw:?}"))),
    }
}
