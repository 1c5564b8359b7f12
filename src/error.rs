//! Error taxonomy for the acquisition engine.
//!
//! Only a handful of these ever reach a caller. Transport failures are absorbed
//! by the resolver's attempt chain, exhausted sources are absorbed by the
//! orchestrator, and everything downstream of extraction is infallible by
//! construction (empty vectors and `false` instead of errors).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsError {
    /// One transport attempt failed (timeout, bad status, undersized payload).
    #[error("{transport} failed for {url}: {reason}")]
    Transport {
        url: String,
        transport: String,
        reason: String,
    },

    /// Every transport in the chain failed for one logical fetch.
    #[error("all {attempts} transports failed for {url}")]
    SourceExhausted { url: String, attempts: usize },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, NewsError>;
