//! Error types for the `uniguide-rag` crate.

use std::path::PathBuf;

use thiserror::Error;
use uniguide_model::GenerationError;

/// Errors that can occur in retrieval and answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding capability was unreachable or returned unusable output.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A persisted index was missing, unreadable, or inconsistent.
    #[error("Index load error ({}): {message}", path.display())]
    IndexLoad {
        /// Location of the persisted index.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// The knowledge base data file could not be read or parsed.
    #[error("Knowledge base error ({source_name}): {message}")]
    KnowledgeBase {
        /// File path or `<bundled>`.
        source_name: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The generation capability failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Filesystem failure while persisting the index.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialisation failure while persisting the index.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
