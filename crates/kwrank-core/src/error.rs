//! Error types for kwrank.

use thiserror::Error;

/// Result type alias using kwrank's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for kwrank operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed call arguments (empty batch, blank candidate, negative metric)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// NLP capability (tagging/embedding) failed
    #[error("NLP error: {0}")]
    Nlp(String),

    /// Classifier artifact could not be loaded or evaluated
    #[error("Model error: {0}")]
    Model(String),

    /// Market-metrics provider failed
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
