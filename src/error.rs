//! Error types for chaff

use thiserror::Error;

/// Top-level error type
///
/// Only startup problems reach a caller: once workers are running, all send
/// failures are absorbed into the stats counters and per-attempt logging.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Vocabulary could not be loaded or was empty
    #[error("vocabulary error: {0}")]
    Vocabulary(String),

    /// Worker construction error (missing wiring)
    #[error("worker error: {0}")]
    Worker(String),

    /// Orchestration error
    #[error("orchestration error: {0}")]
    Orchestration(String),

    /// HTTP transport error during startup (vocabulary fetch)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a worker error for a missing builder field
    pub fn missing_field(field: &str) -> Self {
        Error::Worker(format!("missing required field: {field}"))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
