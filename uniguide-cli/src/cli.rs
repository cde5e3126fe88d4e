//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use uniguide_model::{DEFAULT_GROQ_MODEL, GROQ_API_BASE, GenerationOptions};
use uniguide_rag::{
    AssistantConfig, DEFAULT_HASHING_DIMENSIONS, DEFAULT_INDEX_PATH, PromptTemplate, RagConfig,
};

#[derive(Debug, Parser)]
#[command(
    name = "uniguide",
    about = "Admissions assistant for COMSATS, NUST, UET Lahore and QAU",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build (or refresh) the persisted embedding index
    Index {
        /// Rebuild even if the persisted index is current
        #[arg(long)]
        force: bool,
    },

    /// Show the passages retrieved for a query
    Search {
        /// Query text
        query: String,
        /// Number of passages
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Answer a single question
    Ask {
        /// The question
        question: String,
        /// Also print the retrieved passages
        #[arg(long)]
        show_sources: bool,
    },

    /// Interactive chat session
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Local all-MiniLM-L6-v2 sentence model (needs the `minilm` feature)
    Minilm,
    /// Lexical token hashing, no model files or network
    Hashing,
    /// OpenAI-compatible embeddings endpoint
    Openai,
}

impl EmbedderKind {
    /// `minilm` when compiled in, else `hashing`.
    pub const DEFAULT: Self = if cfg!(feature = "minilm") { Self::Minilm } else { Self::Hashing };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Where the embedding index is persisted
    #[arg(long, global = true, env = "UNIGUIDE_INDEX_PATH", default_value = DEFAULT_INDEX_PATH)]
    pub index_path: PathBuf,

    /// Knowledge base JSON file (default: the bundled one)
    #[arg(long, global = true, env = "UNIGUIDE_KNOWLEDGE")]
    pub knowledge: Option<PathBuf>,

    /// Reuse a persisted index even if the knowledge base changed
    #[arg(long, global = true)]
    pub reuse_stale: bool,

    /// Embedding backend
    #[arg(long, global = true, env = "UNIGUIDE_EMBEDDER", value_enum, default_value_t = EmbedderKind::DEFAULT)]
    pub embedder: EmbedderKind,

    /// Width of hashing embeddings
    #[arg(long, global = true, default_value_t = DEFAULT_HASHING_DIMENSIONS)]
    pub hashing_dimensions: usize,

    /// Model for the OpenAI-compatible embedder
    #[arg(long, global = true, env = "UNIGUIDE_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Vector width requested from the OpenAI-compatible embedder
    #[arg(long, global = true)]
    pub embedding_dimensions: Option<usize>,

    /// Base URL for the OpenAI-compatible embedder
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    pub embedding_base_url: Option<String>,

    /// API key for the OpenAI-compatible embedder
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Groq API key
    #[arg(long, global = true, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: Option<String>,

    /// Generation model
    #[arg(long, global = true, env = "GROQ_MODEL", default_value = DEFAULT_GROQ_MODEL)]
    pub model: String,

    /// Generation API base URL
    #[arg(long, global = true, env = "GROQ_BASE_URL", default_value = GROQ_API_BASE)]
    pub base_url: String,

    /// Sampling temperature
    #[arg(long, global = true, default_value_t = uniguide_model::DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Maximum tokens per answer
    #[arg(long, global = true, default_value_t = uniguide_model::DEFAULT_MAX_OUTPUT_TOKENS)]
    pub max_tokens: u32,

    /// Generation timeout in seconds
    #[arg(long, global = true, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Retries for transient generation failures
    #[arg(long, global = true, default_value_t = 0)]
    pub retries: u32,

    /// Conversation turns included in the prompt during chat
    #[arg(long, global = true, default_value_t = 0)]
    pub history_turns: usize,

    /// Maximum chunk size in characters
    #[arg(long, global = true, default_value_t = 600)]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    #[arg(long, global = true, default_value_t = 80)]
    pub chunk_overlap: usize,

    /// Passages retrieved per question
    #[arg(long, global = true, default_value_t = 5)]
    pub top_k: usize,

    /// File holding a custom instruction template
    #[arg(long, global = true)]
    pub template: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    /// Validated chunking and retrieval parameters.
    pub fn rag_config(&self) -> anyhow::Result<RagConfig> {
        Ok(RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .build()?)
    }

    /// Generation deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the assistant configuration, reading the template file if given.
    pub fn assistant_config(&self, force_rebuild: bool) -> anyhow::Result<AssistantConfig> {
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!("--temperature must be between 0 and 2, got {}", self.temperature);
        }

        let template = match &self.template {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading template {}", path.display()))?;
                Some(PromptTemplate::parse(&raw)?)
            }
            None => None,
        };

        Ok(AssistantConfig {
            rag: self.rag_config()?,
            index_path: self.index_path.clone(),
            reuse_stale: self.reuse_stale,
            force_rebuild,
            history_turns: self.history_turns,
            generation: GenerationOptions::default()
                .with_temperature(self.temperature)
                .with_max_output_tokens(self.max_tokens),
            generation_timeout: self.timeout(),
            max_retries: self.retries,
            template,
        })
    }
}
