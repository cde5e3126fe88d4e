//! # uniguide-rag
//!
//! Retrieval-augmented question answering over a curated knowledge base of
//! university admissions facts.
//!
//! ## Overview
//!
//! Startup chunks the [`KnowledgeBase`], embeds every chunk and persists the
//! resulting [`EmbeddingIndex`]. Each question is then answered by:
//!
//! 1. [`Retriever`] - embeds the question and finds the most similar chunks
//! 2. [`PromptAssembler`] - joins the chunks into a context block inside the instruction template
//! 3. [`AnswerSynthesizer`] - sends the prompt to a [`TextGenerator`](uniguide_model::TextGenerator)
//!
//! [`Assistant`] wires the three together and is what callers use.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use uniguide_model::{GroqClient, GroqConfig};
//! use uniguide_rag::{Assistant, AssistantConfig, HashingEmbeddingProvider, KnowledgeBase};
//!
//! let knowledge = KnowledgeBase::bundled()?;
//! let generator = Arc::new(GroqClient::new(GroqConfig::from_env()?)?);
//! let (assistant, _origin) = Assistant::start(
//!     &AssistantConfig::default(),
//!     &knowledge,
//!     Arc::new(HashingEmbeddingProvider::default()),
//!     generator,
//! )
//! .await?;
//!
//! println!("{}", assistant.answer("What is the fee structure at NUST?", &[]).await);
//! ```
//!
//! ## Features
//!
//! - `openai` (default) - [`OpenAIEmbeddingProvider`](openai::OpenAIEmbeddingProvider)
//! - `minilm` - [`MiniLmEmbeddingProvider`](minilm::MiniLmEmbeddingProvider), local
//!   `all-MiniLM-L6-v2` sentence embeddings on candle
//!
//! [`HashingEmbeddingProvider`] needs no model files or network; it backs the
//! test suites and offline runs.

mod assistant;
pub mod chunking;
mod config;
pub mod document;
mod embedding;
mod error;
mod hashing;
pub mod index;
mod knowledge;
pub mod manager;
#[cfg(feature = "minilm")]
pub mod minilm;
#[cfg(feature = "openai")]
pub mod openai;
pub mod persist;
pub mod prompt;
mod retriever;
mod synthesizer;

pub use assistant::{Answer, Assistant, AssistantConfig, DEFAULT_INDEX_PATH};
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    Chunk, ConversationTurn, IndexedVector, RetrievalResult, Role, SearchResult, SourceDocument,
    Tags,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use hashing::{DEFAULT_HASHING_DIMENSIONS, HashingEmbeddingProvider};
pub use index::{EmbeddingIndex, content_fingerprint};
pub use knowledge::KnowledgeBase;
pub use manager::{IndexManager, IndexOrigin};
pub use prompt::{PromptAssembler, PromptTemplate};
pub use retriever::{DEFAULT_TOP_K, Retriever};
pub use synthesizer::{
    APOLOGY_PREFIX, AnswerSynthesizer, DEFAULT_GENERATION_TIMEOUT, DEFAULT_RETRY_BACKOFF, apology,
};
