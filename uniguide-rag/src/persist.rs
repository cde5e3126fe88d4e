//! Durable storage for [`EmbeddingIndex`].
//!
//! The index is stored as a single JSON document. Writes go to a temporary
//! sibling file which is flushed and then renamed over the target, so readers
//! only ever observe the previous file or the complete new one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::document::IndexedVector;
use crate::error::{RagError, Result};
use crate::index::EmbeddingIndex;

/// On-disk format version written by [`persist`].
pub const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct PersistedIndexRef<'a> {
    format_version: u32,
    model_id: &'a str,
    dimensions: usize,
    fingerprint: &'a str,
    entries: &'a [IndexedVector],
}

#[derive(Deserialize)]
struct PersistedIndex {
    format_version: u32,
    model_id: String,
    dimensions: usize,
    fingerprint: String,
    entries: Vec<IndexedVector>,
}

/// Write `index` to `path` atomically, creating parent directories.
///
/// # Errors
///
/// Returns [`RagError::Io`] or [`RagError::Serialization`] on failure; the
/// previous file at `path`, if any, is left untouched.
pub async fn persist(index: &EmbeddingIndex, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_vec(&PersistedIndexRef {
        format_version: INDEX_FORMAT_VERSION,
        model_id: index.model_id(),
        dimensions: index.dimensions(),
        fingerprint: index.fingerprint(),
        entries: index.entries(),
    })?;

    let tmp = temp_path(path);
    if let Err(e) = write_synced(&tmp, &body).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    info!(path = %path.display(), chunk_count = index.len(), bytes = body.len(), "persisted index");
    Ok(())
}

/// Load an index previously written by [`persist`].
///
/// # Errors
///
/// Returns [`RagError::IndexLoad`] if the file is missing, unreadable,
/// not valid JSON, of another format version, or internally inconsistent.
pub async fn load(path: impl AsRef<Path>) -> Result<EmbeddingIndex> {
    let path = path.as_ref();
    let load_error = |message: String| RagError::IndexLoad { path: path.to_path_buf(), message };

    let raw = tokio::fs::read(path).await.map_err(|e| load_error(format!("read failed: {e}")))?;
    let persisted: PersistedIndex =
        serde_json::from_slice(&raw).map_err(|e| load_error(format!("parse failed: {e}")))?;

    if persisted.format_version != INDEX_FORMAT_VERSION {
        return Err(load_error(format!(
            "unsupported format version {} (expected {INDEX_FORMAT_VERSION})",
            persisted.format_version
        )));
    }
    if let Some(bad) = persisted.entries.iter().find(|e| e.embedding.len() != persisted.dimensions)
    {
        return Err(load_error(format!(
            "chunk '{}' has {} dimensions, header says {}",
            bad.chunk.id,
            bad.embedding.len(),
            persisted.dimensions
        )));
    }

    debug!(path = %path.display(), chunk_count = persisted.entries.len(), "loaded index");
    Ok(EmbeddingIndex {
        model_id: persisted.model_id,
        dimensions: persisted.dimensions,
        fingerprint: persisted.fingerprint,
        entries: persisted.entries,
    })
}

/// Whether a persisted index file exists at `path`.
pub async fn exists(path: impl AsRef<Path>) -> bool {
    match tokio::fs::try_exists(path.as_ref()).await {
        Ok(found) => found,
        Err(e) => {
            warn!(path = %path.as_ref().display(), error = %e, "could not check index file");
            false
        }
    }
}

/// Distinguishes concurrent writers inside one process.
static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling of `path`, unique per process and per call.
fn temp_path(path: &Path) -> PathBuf {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let sequence = TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{file_name}.{}.{sequence}.tmp", std::process::id()))
}

async fn write_synced(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(body).await?;
    file.sync_all().await?;
    Ok(())
}
