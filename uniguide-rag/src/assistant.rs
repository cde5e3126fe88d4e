//! The caller-facing question answering facade.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uniguide_model::{GenerationOptions, TextGenerator};

use crate::chunking::RecursiveChunker;
use crate::config::RagConfig;
use crate::document::{ConversationTurn, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::manager::{IndexManager, IndexOrigin};
use crate::prompt::{PromptAssembler, PromptTemplate};
use crate::retriever::Retriever;
use crate::synthesizer::{AnswerSynthesizer, DEFAULT_GENERATION_TIMEOUT, apology};

/// Default location of the persisted index.
pub const DEFAULT_INDEX_PATH: &str = ".uniguide/knowledge_index.json";

/// Everything needed to start an [`Assistant`].
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Chunking and retrieval parameters.
    pub rag: RagConfig,
    /// Where the index is persisted.
    pub index_path: PathBuf,
    /// Reuse a persisted index whose fingerprint no longer matches.
    pub reuse_stale: bool,
    /// Rebuild the index even if a usable one is persisted.
    pub force_rebuild: bool,
    /// Number of recent conversation turns rendered into the prompt.
    pub history_turns: usize,
    /// Sampling options passed to the generator.
    pub generation: GenerationOptions,
    /// Deadline for one generation attempt.
    pub generation_timeout: Duration,
    /// Retries for transient generation failures.
    pub max_retries: u32,
    /// Instruction template; the built-in one when `None`.
    pub template: Option<PromptTemplate>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            rag: RagConfig::default(),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            reuse_stale: false,
            force_rebuild: false,
            history_turns: 0,
            generation: GenerationOptions::default(),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            max_retries: 0,
            template: None,
        }
    }
}

/// An answer together with the passages it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The generated answer text.
    pub text: String,
    /// Retrieved chunks, best first.
    pub sources: RetrievalResult,
}

/// Answers admissions questions: retrieve, assemble, synthesize.
///
/// Cloning is cheap; clones share the index and the generator, so one
/// assistant can serve concurrent questions.
#[derive(Clone)]
pub struct Assistant {
    retriever: Retriever,
    assembler: PromptAssembler,
    synthesizer: AnswerSynthesizer,
    top_k: usize,
}

impl Assistant {
    /// Assemble an assistant from already constructed parts.
    pub fn new(
        retriever: Retriever,
        assembler: PromptAssembler,
        synthesizer: AnswerSynthesizer,
        top_k: usize,
    ) -> Self {
        Self { retriever, assembler, synthesizer, top_k }
    }

    /// Load or build the index for `knowledge` and wire up an assistant.
    ///
    /// # Errors
    ///
    /// Fails if the index has to be built and embedding fails. No index file
    /// is written in that case.
    pub async fn start(
        config: &AssistantConfig,
        knowledge: &KnowledgeBase,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<(Self, IndexOrigin)> {
        let chunker = RecursiveChunker::from_config(&config.rag);
        let (index, origin) = IndexManager::new(config.index_path.clone())
            .reuse_stale(config.reuse_stale)
            .force_rebuild(config.force_rebuild)
            .build_or_load(knowledge, &chunker, embedder.as_ref())
            .await?;

        info!(
            documents = knowledge.len(),
            chunk_count = index.len(),
            embedder = embedder.model_id(),
            generator = generator.name(),
            origin = %origin,
            "assistant ready"
        );

        let retriever = Retriever::new(Arc::new(index), embedder);
        let assembler = PromptAssembler::new(config.template.clone().unwrap_or_default())
            .with_history_turns(config.history_turns);
        let synthesizer = AnswerSynthesizer::new(generator)
            .with_options(config.generation)
            .with_timeout(config.generation_timeout)
            .with_max_retries(config.max_retries);

        Ok((Self::new(retriever, assembler, synthesizer, config.rag.top_k), origin))
    }

    /// The retriever used to find context.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `question`, returning the text and its sources.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`](crate::RagError::Embedding) if the
    /// question cannot be embedded and
    /// [`RagError::Generation`](crate::RagError::Generation) if no answer
    /// could be generated.
    pub async fn ask(&self, question: &str, history: &[ConversationTurn]) -> Result<Answer> {
        let sources = self.retriever.retrieve(question, self.top_k).await?;
        if sources.is_empty() {
            warn!("no context retrieved, answering from instructions only");
        }

        let prompt = self.assembler.assemble(question, &sources, history);
        let text = self.synthesizer.synthesize(&prompt).await?;
        info!(source_count = sources.len(), answer_len = text.len(), "answered question");
        Ok(Answer { text, sources })
    }

    /// Answer `question`. Never fails: any error becomes an apology text.
    pub async fn answer(&self, question: &str, history: &[ConversationTurn]) -> String {
        match self.ask(question, history).await {
            Ok(answer) => answer.text,
            Err(e) => apology(e),
        }
    }
}
