//! Query-time retrieval: embed the question, search the index.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::EmbeddingIndex;

/// Number of chunks retrieved when the caller does not say otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// Retrieves the chunks most similar to a question.
///
/// Holds the read-only index and the embedding provider it was built with.
/// Cheap to clone; clones share both.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<EmbeddingIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    /// Create a retriever over `index`.
    ///
    /// `embedder` must be the provider the index was built with; vectors from
    /// another model give meaningless similarities.
    pub fn new(index: Arc<EmbeddingIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// The index being searched.
    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// An empty index yields an empty result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`](crate::RagError::Embedding) if the
    /// query cannot be embedded.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if self.index.is_empty() {
            debug!("index is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;

        let results = self.index.search(&query_embedding, k)?;
        debug!(
            k,
            result_count = results.len(),
            top_score = results.first().map(|r| r.score),
            "retrieved chunks"
        );
        Ok(results)
    }
}
