//! Error types for the document-understanding core

use thiserror::Error;

use crate::dictionary::UnitFamily;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document could not be opened or decoded at all
    #[error("Document '{source_document}' is unreadable: {message}")]
    DocumentUnreadable {
        source_document: String,
        message: String,
    },

    /// A unit conversion crossed unit families
    #[error("Incompatible unit families: cannot convert {from} to {to}")]
    IncompatibleUnitFamily { from: UnitFamily, to: UnitFamily },

    /// Unit token is not in any conversion table
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// Exact conversion arithmetic exceeded the representable magnitude;
    /// the value must be treated as unparsed, never approximated
    #[error("Magnitude out of range converting to {0}")]
    MagnitudeOverflow(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index collaborator error
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// LLM collaborator error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Every expanded-query variant failed to retrieve
    #[error("No retrievable results: all query variants failed")]
    NoRetrievableResults,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a document unreadable error
    pub fn document_unreadable(
        source_document: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DocumentUnreadable {
            source_document: source_document.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_index(message: impl Into<String>) -> Self {
        Self::VectorIndex(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
