//! Startup lifecycle of the embedding index: load it if possible, otherwise
//! build and persist it.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::{EmbeddingIndex, content_fingerprint};
use crate::knowledge::KnowledgeBase;
use crate::persist;

/// How [`IndexManager::build_or_load`] obtained the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOrigin {
    /// Loaded from the persisted file.
    Loaded,
    /// Built because no persisted file existed.
    Built,
    /// Built although a persisted file existed.
    Rebuilt {
        /// Why the persisted file was not used.
        reason: String,
    },
}

impl fmt::Display for IndexOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => f.write_str("loaded"),
            Self::Built => f.write_str("built"),
            Self::Rebuilt { reason } => write!(f, "rebuilt ({reason})"),
        }
    }
}

/// Decides between loading the persisted index and rebuilding it.
///
/// The persisted index carries a fingerprint of the documents, chunking
/// parameters and embedding model. On mismatch the index is rebuilt unless
/// [`reuse_stale`](Self::reuse_stale) is set. A missing or corrupt file always
/// falls back to a rebuild.
///
/// # Example
///
/// ```rust,ignore
/// let (index, origin) = IndexManager::new(".uniguide/knowledge_index.json")
///     .build_or_load(&knowledge, &chunker, embedder.as_ref())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct IndexManager {
    path: PathBuf,
    reuse_stale: bool,
    force_rebuild: bool,
}

impl IndexManager {
    /// Manage the index persisted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), reuse_stale: false, force_rebuild: false }
    }

    /// Reuse a persisted index even when its fingerprint no longer matches.
    pub fn reuse_stale(mut self, reuse: bool) -> Self {
        self.reuse_stale = reuse;
        self
    }

    /// Ignore any persisted index and always rebuild.
    pub fn force_rebuild(mut self, force: bool) -> Self {
        self.force_rebuild = force;
        self
    }

    /// Location of the persisted index.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted index or build a fresh one from `knowledge`.
    ///
    /// A freshly built index is persisted; a failed write is logged and the
    /// in-memory index is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`](crate::RagError::Embedding) if the
    /// build fails. Load failures never surface; they trigger a rebuild.
    pub async fn build_or_load(
        &self,
        knowledge: &KnowledgeBase,
        chunker: &RecursiveChunker,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<(EmbeddingIndex, IndexOrigin)> {
        let fingerprint = content_fingerprint(
            knowledge.documents(),
            chunker.chunk_size(),
            chunker.chunk_overlap(),
            embedder.model_id(),
        );

        let origin = if self.force_rebuild {
            IndexOrigin::Rebuilt { reason: "rebuild forced".to_string() }
        } else if !persist::exists(&self.path).await {
            IndexOrigin::Built
        } else {
            match persist::load(&self.path).await {
                Ok(index) => match self.check_loaded(&index, &fingerprint, embedder) {
                    None => {
                        info!(
                            path = %self.path.display(),
                            chunk_count = index.len(),
                            "using persisted index"
                        );
                        return Ok((index, IndexOrigin::Loaded));
                    }
                    Some(reason) => IndexOrigin::Rebuilt { reason },
                },
                Err(e) => {
                    warn!(error = %e, "persisted index unusable, rebuilding");
                    IndexOrigin::Rebuilt { reason: e.to_string() }
                }
            }
        };

        let chunks = chunk_all(knowledge, chunker);
        let index = EmbeddingIndex::build(chunks, embedder, fingerprint).await?;

        if let Err(e) = persist::persist(&index, &self.path).await {
            warn!(path = %self.path.display(), error = %e, "failed to persist index");
        }

        info!(origin = %origin, chunk_count = index.len(), "index ready");
        Ok((index, origin))
    }

    /// Return the reason a loaded index must be rebuilt, if any.
    fn check_loaded(
        &self,
        index: &EmbeddingIndex,
        fingerprint: &str,
        embedder: &dyn EmbeddingProvider,
    ) -> Option<String> {
        if index.dimensions() != embedder.dimensions() {
            warn!(
                persisted = index.dimensions(),
                current = embedder.dimensions(),
                "persisted index has different dimensionality, rebuilding"
            );
            return Some(format!(
                "dimension mismatch: persisted {}, embedder {}",
                index.dimensions(),
                embedder.dimensions()
            ));
        }
        if index.fingerprint() == fingerprint {
            return None;
        }
        if self.reuse_stale {
            warn!(path = %self.path.display(), "persisted index is stale, reusing as configured");
            return None;
        }
        warn!(
            path = %self.path.display(),
            persisted_model = index.model_id(),
            "knowledge base, chunking or embedding model changed since the index was built, rebuilding"
        );
        Some("content fingerprint changed".to_string())
    }
}

/// Chunk every document of the knowledge base, in document order.
pub fn chunk_all(knowledge: &KnowledgeBase, chunker: &dyn Chunker) -> Vec<Chunk> {
    knowledge.documents().iter().flat_map(|doc| chunker.chunk(doc)).collect()
}
