//! The document store: a fixed set of passages loaded from a JSON data file.
//!
//! The bundled knowledge base covers COMSATS, NUST, UET Lahore and QAU and is
//! compiled into the binary. A different file with the same shape can be
//! loaded with [`KnowledgeBase::load`]:
//!
//! ```json
//! {
//!   "version": 1,
//!   "documents": [
//!     { "id": "comsats-phd-admissions",
//!       "content": "University: COMSATS ...",
//!       "tags": { "university": "COMSATS", "topic": "phd admissions" } }
//!   ]
//! }
//! ```
//!
//! `id` is optional; when absent it is derived from the tags and position.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::document::{SourceDocument, Tags};
use crate::error::{RagError, Result};

const BUNDLED_KNOWLEDGE_BASE: &str = include_str!("../data/knowledge_base.json");
const BUNDLED_SOURCE: &str = "<bundled>";
const SUPPORTED_VERSION: u32 = 1;

#[derive(Deserialize)]
struct KnowledgeFile {
    version: u32,
    documents: Vec<DocumentRecord>,
}

#[derive(Deserialize)]
struct DocumentRecord {
    #[serde(default)]
    id: Option<String>,
    content: String,
    #[serde(default)]
    tags: Tags,
}

/// The immutable collection of source documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBase {
    documents: Vec<SourceDocument>,
}

impl KnowledgeBase {
    /// Wrap an existing list of documents.
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self { documents }
    }

    /// The knowledge base shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_SOURCE, BUNDLED_KNOWLEDGE_BASE)
    }

    /// Load a knowledge base data file from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| RagError::KnowledgeBase {
            source_name: source_name.clone(),
            message: format!("failed to read file: {e}"),
        })?;
        Self::from_json_str(&source_name, &raw)
    }

    /// Parse a knowledge base from its JSON text.
    ///
    /// Content is trimmed; documents with no content are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::KnowledgeBase`] on malformed JSON, an unsupported
    /// version, or duplicate document IDs.
    pub fn from_json_str(source_name: &str, raw: &str) -> Result<Self> {
        let file: KnowledgeFile = serde_json::from_str(raw).map_err(|e| RagError::KnowledgeBase {
            source_name: source_name.to_string(),
            message: format!("invalid JSON: {e}"),
        })?;

        if file.version != SUPPORTED_VERSION {
            return Err(RagError::KnowledgeBase {
                source_name: source_name.to_string(),
                message: format!(
                    "unsupported version {} (expected {SUPPORTED_VERSION})",
                    file.version
                ),
            });
        }

        let mut seen = HashSet::new();
        let mut documents = Vec::with_capacity(file.documents.len());
        for (position, record) in file.documents.into_iter().enumerate() {
            let content = record.content.trim();
            if content.is_empty() {
                warn!(source = source_name, position, "skipping document with empty content");
                continue;
            }

            let id = record.id.unwrap_or_else(|| derive_id(&record.tags, position));
            if !seen.insert(id.clone()) {
                return Err(RagError::KnowledgeBase {
                    source_name: source_name.to_string(),
                    message: format!("duplicate document id '{id}'"),
                });
            }

            documents.push(SourceDocument::new(id, content, record.tags));
        }

        info!(source = source_name, document_count = documents.len(), "loaded knowledge base");
        Ok(Self { documents })
    }

    /// All documents, in file order.
    pub fn documents(&self) -> &[SourceDocument] {
        &self.documents
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the knowledge base has no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Distinct `university` tag values, in first-seen order.
    pub fn universities(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.documents
            .iter()
            .filter_map(SourceDocument::university)
            .filter(|u| seen.insert(*u))
            .collect()
    }
}

fn derive_id(tags: &Tags, position: usize) -> String {
    let mut out = String::new();
    for value in tags.values() {
        for c in value.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
            } else if !out.ends_with('-') && !out.is_empty() {
                out.push('-');
            }
        }
        if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    if out.is_empty() { format!("doc-{position}") } else { format!("{out}{position}") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_knowledge_base_covers_four_universities() {
        let kb = KnowledgeBase::bundled().unwrap();
        assert!(kb.len() >= 20);
        let universities = kb.universities();
        for expected in ["COMSATS", "NUST", "UET Lahore", "QAU"] {
            assert!(universities.contains(&expected), "missing {expected}");
        }
        assert!(kb.documents().iter().all(|d| d.content == d.content.trim()));
    }

    #[test]
    fn derives_missing_ids_and_trims_content() {
        let raw = r#"{
            "version": 1,
            "documents": [
                { "content": "  Hello  \n", "tags": { "university": "NUST", "topic": "fees" } },
                { "content": "No tags" }
            ]
        }"#;
        let kb = KnowledgeBase::from_json_str("test", raw).unwrap();
        assert_eq!(kb.documents()[0].id, "fees-nust-0");
        assert_eq!(kb.documents()[0].content, "Hello");
        assert_eq!(kb.documents()[1].id, "doc-1");
    }

    #[test]
    fn skips_empty_documents() {
        let raw = r#"{ "version": 1, "documents": [ { "content": "   " }, { "content": "x" } ] }"#;
        let kb = KnowledgeBase::from_json_str("test", raw).unwrap();
        assert_eq!(kb.len(), 1);
    }

    #[test]
    fn rejects_duplicate_ids_and_unknown_versions() {
        let dup = r#"{ "version": 1, "documents": [
            { "id": "a", "content": "x" }, { "id": "a", "content": "y" } ] }"#;
        assert!(matches!(
            KnowledgeBase::from_json_str("test", dup),
            Err(RagError::KnowledgeBase { .. })
        ));

        let future = r#"{ "version": 2, "documents": [] }"#;
        assert!(KnowledgeBase::from_json_str("test", future).is_err());
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let err = KnowledgeBase::load("/nonexistent/kb.json").await.unwrap_err();
        assert!(matches!(err, RagError::KnowledgeBase { .. }));
    }
}
