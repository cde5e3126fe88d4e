//! Offline embedding provider based on token feature hashing.
//!
//! Needs no network or model weights. It backs the test suites and runs
//! where the `minilm` model cannot be fetched. Similarity is lexical only:
//! texts sharing rare words score high, paraphrases do not. Semantic
//! retrieval uses `minilm::MiniLmEmbeddingProvider`
//! (feature `minilm`).

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;

/// Default vector width, matching common sentence-embedding models.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 384;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "i", "in", "is", "it", "me", "my", "of", "on", "or", "tell", "that", "the", "this", "to",
    "what", "when", "where", "which", "who", "with", "about",
];

/// An [`EmbeddingProvider`] that hashes word tokens into a fixed-width vector.
///
/// Each lowercase alphanumeric token (minus common stopwords) is hashed with
/// FNV-1a into a bucket and a sign; bucket weights use sublinear term
/// frequency `1 + ln(tf)`. Vectors are L2-normalised.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
    model_id: String,
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

impl HashingEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` components (at least 1).
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self { dimensions, model_id: format!("hashing-fnv1a-v1-{dimensions}") }
    }

    /// Embed synchronously; the async trait methods delegate here.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for token in tokens(&lowered) {
            *counts.entry(token).or_default() += 1;
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for (token, tf) in counts {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign * (1.0 + (tf as f32).ln());
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .filter(|t| !STOPWORDS.contains(t))
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
