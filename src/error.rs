//! Error types for harvest.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("telemetry error: {0}")]
    Telemetry(String),

    #[error("fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("shutdown timed out with {pending} task(s) still running")]
    ShutdownTimeout { pending: usize },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
