//! Domain-specific error types for chirality-core

use thiserror::Error;

use crate::contracts::DocKind;

/// Which of the two generation calls failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Draft,
    Finalize,
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pass::Draft => f.write_str("draft"),
            Pass::Finalize => f.write_str("finalize"),
        }
    }
}

/// Main error type for the document pipeline
#[derive(Error, Debug)]
pub enum ChiralityError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Retrieval unavailable: {message}")]
    RetrievalUnavailable { message: String },

    #[error("Generation failed on {pass} pass: {message}")]
    Generation { pass: Pass, message: String },

    #[error("Schema violation for {kind}: {message}")]
    SchemaViolation { kind: DocKind, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for ChiralityError {
    fn from(err: anyhow::Error) -> Self {
        ChiralityError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChiralityError {
    fn from(err: serde_json::Error) -> Self {
        ChiralityError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ChiralityError {
    fn from(err: reqwest::Error) -> Self {
        ChiralityError::RetrievalUnavailable {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

impl From<std::io::Error> for ChiralityError {
    fn from(err: std::io::Error) -> Self {
        ChiralityError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ChiralityError>;
