//! Data types for documents, chunks, and retrieval results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key-value metadata such as `university` and `topic`.
///
/// Ordered so that serialisation and fingerprinting are deterministic.
pub type Tags = BTreeMap<String, String>;

/// A source passage from the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDocument {
    /// Unique identifier for the document.
    pub id: String,
    /// The passage text.
    pub content: String,
    /// Metadata tags inherited by every chunk of this document.
    #[serde(default)]
    pub tags: Tags,
}

impl SourceDocument {
    /// Create a document from its parts.
    pub fn new(id: impl Into<String>, content: impl Into<String>, tags: Tags) -> Self {
        Self { id: id.into(), content: content.into(), tags }
    }

    /// Value of the `university` tag, if present.
    pub fn university(&self) -> Option<&str> {
        self.tags.get("university").map(String::as_str)
    }
}

/// A bounded-length window of a [`SourceDocument`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}_{sequence_index}`.
    pub id: String,
    /// The ID of the parent [`SourceDocument`].
    pub document_id: String,
    /// The text of this window.
    pub text: String,
    /// Tags copied verbatim from the parent document.
    pub tags: Tags,
    /// Position among the sibling chunks of the same parent.
    pub sequence_index: usize,
}

/// A [`Chunk`] paired with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedVector {
    /// The embedded chunk.
    pub chunk: Chunk,
    /// L2-normalised embedding of `chunk.text`.
    pub embedding: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]` (higher is more relevant).
    pub score: f32,
}

/// Ordered search results, best first, never longer than the requested `k`.
pub type RetrievalResult = Vec<SearchResult>;

/// Speaker of a [`ConversationTurn`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The student asking questions.
    User,
    /// A previous answer.
    Assistant,
}

/// A prior turn of the conversation, supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    /// Who spoke.
    pub role: Role,
    /// What was said.
    pub content: String,
}

impl ConversationTurn {
    /// A turn spoken by the student.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// A turn spoken by the assistant.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}
