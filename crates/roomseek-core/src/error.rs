//! Error types for RoomSeek.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Reference data error: {0}")]
    ReferenceData(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
