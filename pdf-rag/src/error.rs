//! Error types for the `pdf-rag` crate.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The failure mode reported by an external model or tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// The model or service could not be reached or is not installed.
    ModelUnavailable,
    /// The embedding input exceeds what the model accepts.
    InputTooLong,
    /// The assembled prompt exceeds the generator's context window.
    ContextTooLong,
    /// Any other failure reported by the service.
    Failed,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ModelUnavailable => "model unavailable",
            Self::InputTooLong => "input too long",
            Self::ContextTooLong => "context too long",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a [`RagError`], used for exit codes and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    DimensionMismatch,
    EmptyIndex,
    CorruptIndex,
    ExternalService,
    Cancelled,
    Io,
}

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid chunking, retrieval, or pipeline configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A document, folder, or persisted index does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A vector's length differs from the index dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality established by the index.
        expected: usize,
        /// The length of the offending vector.
        actual: usize,
    },

    /// A chunk arrived with a zero-length embedding.
    #[error("Empty embedding for chunk '{id}'")]
    EmptyEmbedding {
        /// The identifier of the offending chunk.
        id: String,
    },

    /// A vector contains NaN or an infinite component.
    #[error("Non-finite embedding for '{id}'")]
    NonFiniteEmbedding {
        /// The chunk identifier, or `query` for a search vector.
        id: String,
    },

    /// Search was attempted against an index with no entries.
    #[error("Index is empty")]
    EmptyIndex,

    /// Persisted index data failed validation on load.
    #[error("Corrupt index at {}: {reason}", path.display())]
    CorruptIndex {
        /// The index directory that was being loaded.
        path: PathBuf,
        /// What failed validation.
        reason: String,
    },

    /// An embedder, generator, or extraction tool failed.
    #[error("{service} {kind}: {message}")]
    ExternalService {
        /// The service that produced the error.
        service: String,
        /// The failure mode.
        kind: ServiceErrorKind,
        /// A description of the failure.
        message: String,
    },

    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// A filesystem error while persisting the index.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Shorthand for an [`RagError::ExternalService`] error.
    pub fn service(
        service: impl Into<String>,
        kind: ServiceErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::ExternalService { service: service.into(), kind, message: message.into() }
    }

    /// Return the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError(_) => ErrorKind::Configuration,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DimensionMismatch { .. }
            | Self::EmptyEmbedding { .. }
            | Self::NonFiniteEmbedding { .. } => ErrorKind::DimensionMismatch,
            Self::EmptyIndex => ErrorKind::EmptyIndex,
            Self::CorruptIndex { .. } => ErrorKind::CorruptIndex,
            Self::ExternalService { .. } => ErrorKind::ExternalService,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether a caller-level retry could plausibly succeed.
    ///
    /// Only an unavailable external model qualifies; everything else is
    /// deterministic given the same inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalService { kind: ServiceErrorKind::ModelUnavailable, .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_models_are_retryable() {
        let unavailable = RagError::service("ollama", ServiceErrorKind::ModelUnavailable, "down");
        let too_long = RagError::service("ollama", ServiceErrorKind::ContextTooLong, "big");
        assert!(unavailable.is_retryable());
        assert!(!too_long.is_retryable());
        assert!(!RagError::EmptyIndex.is_retryable());
    }

    #[test]
    fn display_names_service_and_kind() {
        let err = RagError::service("pdftotext", ServiceErrorKind::Failed, "exit status 1");
        assert_eq!(err.to_string(), "pdftotext failed: exit status 1");
        assert_eq!(err.kind(), ErrorKind::ExternalService);
    }
}
