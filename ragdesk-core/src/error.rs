//! Error types for the `ragdesk-core` crate.

use thiserror::Error;

/// Errors that can occur in retrieval-and-answer operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding provider is unreachable or misconfigured.
    #[error("Embedding unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index storage is unreachable or corrupt.
    #[error("Index unavailable ({backend}): {message}")]
    IndexUnavailable {
        /// The index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// Parallel batch inputs do not have the same length.
    #[error(
        "Batch length mismatch: {ids} ids, {contents} contents, {embeddings} embeddings, {metadatas} metadatas"
    )]
    LengthMismatch { ids: usize, contents: usize, embeddings: usize, metadatas: usize },

    /// An embedding does not match the dimension the index was configured with.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The language model call failed or returned nothing usable.
    #[error("Generation failed ({provider}): {message}")]
    GenerationFailed {
        /// The LLM provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A document the caller expected to exist is not in the index.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A request parameter is outside its accepted range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A component failure surfaced through the orchestrator.
    ///
    /// The original error is kept as the source so its message reaches diagnostics.
    #[error("Pipeline failed during {operation}: {source}")]
    PipelineFailed {
        /// The orchestrator operation that was running.
        operation: &'static str,
        /// The component error.
        #[source]
        source: Box<RagError>,
    },
}

impl RagError {
    /// Return the innermost error, looking through [`RagError::PipelineFailed`].
    pub fn root_cause(&self) -> &RagError {
        match self {
            RagError::PipelineFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
