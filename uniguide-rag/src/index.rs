//! Exact cosine-similarity index over embedded chunks.
//!
//! An [`EmbeddingIndex`] is built once from every chunk of the knowledge base
//! (or loaded from disk, see [`crate::persist`]) and is read-only afterwards,
//! so it can be shared behind an `Arc` by any number of concurrent readers.

use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use crate::document::{Chunk, IndexedVector, RetrievalResult, SearchResult, SourceDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Chunks are embedded in requests of at most this many texts.
pub const EMBED_BATCH_SIZE: usize = 64;

/// An immutable set of chunk embeddings searchable by cosine similarity.
///
/// Entries keep insertion order (document order, then chunk order); ties in
/// similarity are resolved in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingIndex {
    pub(crate) model_id: String,
    pub(crate) dimensions: usize,
    pub(crate) fingerprint: String,
    pub(crate) entries: Vec<IndexedVector>,
}

impl EmbeddingIndex {
    /// Embed every chunk and build the index.
    ///
    /// No partial index is ever returned: the first embedding failure aborts
    /// the build.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the provider fails or returns a
    /// vector of the wrong dimensionality or the wrong count.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        fingerprint: impl Into<String>,
    ) -> Result<Self> {
        let dimensions = embedder.dimensions();
        let model_id = embedder.model_id().to_string();
        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = embedder.embed_batch(&texts).await.map_err(|e| {
                error!(model = %model_id, error = %e, "embedding failed during index build");
                e
            })?;

            if embeddings.len() != batch.len() {
                return Err(RagError::Embedding {
                    provider: model_id,
                    message: format!(
                        "requested {} embeddings, received {}",
                        batch.len(),
                        embeddings.len()
                    ),
                });
            }

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                if embedding.len() != dimensions {
                    return Err(RagError::Embedding {
                        provider: model_id,
                        message: format!(
                            "chunk '{}' embedded to {} dimensions, expected {dimensions}",
                            chunk.id,
                            embedding.len()
                        ),
                    });
                }
                entries.push(IndexedVector { chunk: chunk.clone(), embedding: normalize(embedding) });
            }
            debug!(indexed = entries.len(), total = chunks.len(), "embedded batch");
        }

        info!(chunk_count = entries.len(), model = %model_id, dimensions, "built embedding index");
        Ok(Self { model_id, dimensions, fingerprint: fingerprint.into(), entries })
    }

    /// Return up to `k` chunks most similar to `query`, best first.
    ///
    /// Always returns `min(k, self.len())` results. Equal scores keep
    /// insertion order, so repeated calls return identical results.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if `query` has the wrong dimensionality.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        if query.len() != self.dimensions {
            return Err(RagError::Embedding {
                provider: self.model_id.clone(),
                message: format!(
                    "query has {} dimensions, index expects {}",
                    query.len(),
                    self.dimensions
                ),
            });
        }
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query = normalize(query.to_vec());
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, dot(&entry.embedding, &query)))
            .collect();

        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult { chunk: self.entries[i].chunk.clone(), score })
            .collect())
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed chunks with their vectors, in insertion order.
    pub fn entries(&self) -> &[IndexedVector] {
        &self.entries
    }

    /// Embedding model the vectors were produced with.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Vector dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Content fingerprint recorded at build time.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Fingerprint of everything that determines index contents: the documents,
/// the chunking parameters, and the embedding model.
///
/// Returned as lowercase hex SHA-256.
pub fn content_fingerprint(
    documents: &[SourceDocument],
    chunk_size: usize,
    chunk_overlap: usize,
    model_id: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"uniguide-index\n");
    hasher.update(model_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(chunk_size.to_le_bytes());
    hasher.update(chunk_overlap.to_le_bytes());
    for document in documents {
        hasher.update(document.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(document.content.as_bytes());
        hasher.update([0u8]);
        for (key, value) in &document.tags {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([1u8]);
    }
    format!("{:x}", hasher.finalize())
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
