//! Subcommand implementations.

use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing::info;
use uniguide_model::{GroqClient, GroqConfig, TextGenerator};
use uniguide_rag::openai::{OpenAIEmbeddingConfig, OpenAIEmbeddingProvider};
use uniguide_rag::{
    Assistant, EmbeddingProvider, HashingEmbeddingProvider, IndexManager, KnowledgeBase,
    RecursiveChunker, Retriever, SearchResult,
};

use crate::chat;
use crate::cli::{Cli, Command, EmbedderKind, GlobalArgs};

/// Run the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let args = &cli.global;
    match cli.command {
        Command::Index { force } => index(args, force).await,
        Command::Search { ref query, k } => search(args, query, k).await,
        Command::Ask { ref question, show_sources } => ask(args, question, show_sources).await,
        Command::Chat => {
            let assistant = start_assistant(args).await?;
            chat::run(&assistant).await
        }
    }
}

async fn index(args: &GlobalArgs, force: bool) -> anyhow::Result<()> {
    let knowledge = load_knowledge(args).await?;
    let embedder = build_embedder(args).await?;
    let chunker = RecursiveChunker::from_config(&args.rag_config()?);

    let (index, origin) = IndexManager::new(&args.index_path)
        .reuse_stale(args.reuse_stale)
        .force_rebuild(force)
        .build_or_load(&knowledge, &chunker, embedder.as_ref())
        .await
        .context("building the index")?;

    println!(
        "Index {origin}: {} chunks from {} documents at {}",
        index.len(),
        knowledge.len(),
        args.index_path.display()
    );
    Ok(())
}

async fn search(args: &GlobalArgs, query: &str, k: Option<usize>) -> anyhow::Result<()> {
    let knowledge = load_knowledge(args).await?;
    let embedder = build_embedder(args).await?;
    let rag = args.rag_config()?;
    let chunker = RecursiveChunker::from_config(&rag);

    let (index, _) = IndexManager::new(&args.index_path)
        .reuse_stale(args.reuse_stale)
        .build_or_load(&knowledge, &chunker, embedder.as_ref())
        .await
        .context("loading the index")?;

    let retriever = Retriever::new(Arc::new(index), embedder);
    let results = retriever.retrieve(query, k.unwrap_or(rag.top_k)).await?;
    if results.is_empty() {
        println!("No passages found.");
    }
    print_sources(&results);
    Ok(())
}

async fn ask(args: &GlobalArgs, question: &str, show_sources: bool) -> anyhow::Result<()> {
    let assistant = start_assistant(args).await?;
    if !show_sources {
        println!("{}", assistant.answer(question, &[]).await);
        return Ok(());
    }

    let answer = assistant.ask(question, &[]).await?;
    println!("{}\n", answer.text);
    println!("Sources:");
    print_sources(&answer.sources);
    Ok(())
}

/// Load the knowledge base, build the providers and start the assistant.
pub async fn start_assistant(args: &GlobalArgs) -> anyhow::Result<Assistant> {
    let config = args.assistant_config(false)?;
    let knowledge = load_knowledge(args).await?;
    let embedder = build_embedder(args).await?;
    let generator = build_generator(args)?;

    let (assistant, origin) = Assistant::start(&config, &knowledge, embedder, generator)
        .await
        .context("starting the assistant")?;
    info!(%origin, "index ready");
    Ok(assistant)
}

async fn load_knowledge(args: &GlobalArgs) -> anyhow::Result<KnowledgeBase> {
    let knowledge = match &args.knowledge {
        Some(path) => KnowledgeBase::load(path).await?,
        None => KnowledgeBase::bundled()?,
    };
    if knowledge.is_empty() {
        return Err(anyhow!("the knowledge base has no documents"));
    }
    Ok(knowledge)
}

/// Construct the embedding provider selected on the command line.
pub async fn build_embedder(args: &GlobalArgs) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match args.embedder {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbeddingProvider::new(args.hashing_dimensions))),
        EmbedderKind::Minilm => minilm_embedder().await,
        EmbedderKind::Openai => {
            let key = args
                .openai_api_key
                .clone()
                .context("--embedder openai needs OPENAI_API_KEY or --openai-api-key")?;
            let mut config = OpenAIEmbeddingConfig::new(key);
            if let Some(model) = &args.embedding_model {
                config = config.with_model(model);
            }
            if let Some(dimensions) = args.embedding_dimensions {
                config = config.with_dimensions(dimensions);
            }
            if let Some(base_url) = &args.embedding_base_url {
                config = config.with_base_url(base_url);
            }
            Ok(Arc::new(OpenAIEmbeddingProvider::new(config)?))
        }
    }
}

#[cfg(feature = "minilm")]
async fn minilm_embedder() -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let provider = uniguide_rag::minilm::MiniLmEmbeddingProvider::from_hub()
        .await
        .context("loading all-MiniLM-L6-v2; pass --embedder hashing to run without it")?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "minilm"))]
async fn minilm_embedder() -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    Err(anyhow!("this build has no `minilm` feature; use --embedder hashing or openai"))
}

/// Construct the Groq client from the command line.
pub fn build_generator(args: &GlobalArgs) -> anyhow::Result<Arc<dyn TextGenerator>> {
    let key = args
        .groq_api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .context("GROQ_API_KEY is not set; export it or pass --groq-api-key")?;
    let config = GroqConfig::new(key, &args.model)
        .with_base_url(&args.base_url)
        .with_timeout(args.timeout());
    Ok(Arc::new(GroqClient::new(config)?))
}

fn print_sources(results: &[SearchResult]) {
    for (rank, result) in results.iter().enumerate() {
        let university = result.chunk.tags.get("university").map(String::as_str).unwrap_or("-");
        println!("{}. [{:.3}] {} ({university})", rank + 1, result.score, result.chunk.id);
        for line in result.chunk.text.lines().filter(|l| !l.trim().is_empty()).take(3) {
            println!("     {}", line.trim());
        }
    }
}
