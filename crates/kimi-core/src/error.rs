//! Error types for kimi-core

use thiserror::Error;

/// Main error type for kimi-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Episode catalogue error: {0}")]
    Catalog(String),

    #[error("Premium service error: {0}")]
    Premium(String),
}

/// Result type alias for kimi-core
pub type Result<T> = std::result::Result<T, Error>;
