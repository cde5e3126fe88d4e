//! Local sentence embeddings with `all-MiniLM-L6-v2` on candle.
//!
//! Only compiled with the `minilm` feature. Weights come from a local
//! directory or the Hugging Face hub cache. Vectors are the attention-masked
//! mean of the last hidden state, L2-normalised, as sentence-transformers does.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Hub repository of the default sentence model.
pub const MINILM_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Hub revision fetched by [`MiniLmEmbeddingProvider::from_hub`].
pub const MINILM_REVISION: &str = "main";

/// Output width of `all-MiniLM-L6-v2`.
pub const MINILM_DIMENSIONS: usize = 384;

/// Tokens kept per text; the model was trained on 256-token windows.
pub const MAX_SEQUENCE_TOKENS: usize = 256;

const PROVIDER: &str = "MiniLM";

fn failure(message: impl std::fmt::Display) -> RagError {
    RagError::Embedding { provider: PROVIDER.into(), message: message.to_string() }
}

/// Paths of the three files a BERT sentence model needs.
#[derive(Debug, Clone)]
pub struct MiniLmFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl MiniLmFiles {
    /// `config.json`, `tokenizer.json` and `model.safetensors` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            config: dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            weights: dir.join("model.safetensors"),
        }
    }

    /// Fetch (or reuse from the local cache) the files of `repo` at `revision`.
    ///
    /// Blocking; call from [`tokio::task::spawn_blocking`].
    pub fn from_hub(repo: &str, revision: &str) -> Result<Self> {
        let api = candle_hf_hub::api::sync::Api::new().map_err(failure)?;
        let repo = api.repo(candle_hf_hub::Repo::with_revision(
            repo.to_string(),
            candle_hf_hub::RepoType::Model,
            revision.to_string(),
        ));
        Ok(Self {
            config: repo.get("config.json").map_err(failure)?,
            tokenizer: repo.get("tokenizer.json").map_err(failure)?,
            weights: repo.get("model.safetensors").map_err(failure)?,
        })
    }
}

#[derive(Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

struct Loaded {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// [`EmbeddingProvider`] running a BERT sentence model in-process.
///
/// Inference is CPU-bound and runs on the blocking thread pool. The provider
/// is cheap to clone and share.
#[derive(Clone)]
pub struct MiniLmEmbeddingProvider {
    inner: Arc<Loaded>,
    dimensions: usize,
    model_id: String,
}

impl std::fmt::Debug for MiniLmEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniLmEmbeddingProvider")
            .field("model_id", &self.model_id)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl MiniLmEmbeddingProvider {
    /// Download (or reuse) `all-MiniLM-L6-v2` from the hub and load it.
    pub async fn from_hub() -> Result<Self> {
        tokio::task::spawn_blocking(|| {
            let files = MiniLmFiles::from_hub(MINILM_REPO, MINILM_REVISION)?;
            Self::load(&files, MINILM_REPO)
        })
        .await
        .map_err(failure)?
    }

    /// Load a BERT sentence model from local files. `model_id` names it in
    /// the persisted index.
    ///
    /// # Errors
    ///
    /// [`RagError::Embedding`] if any file is missing or malformed.
    pub fn load(files: &MiniLmFiles, model_id: impl Into<String>) -> Result<Self> {
        let device = Device::Cpu;
        let raw_config = std::fs::read_to_string(&files.config)
            .map_err(|e| failure(format!("{}: {e}", files.config.display())))?;
        let config: BertConfig = serde_json::from_str(&raw_config).map_err(failure)?;
        let HiddenSize { hidden_size } = serde_json::from_str(&raw_config).map_err(failure)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| failure(format!("{}: {e}", files.tokenizer.display())))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_TOKENS,
                ..Default::default()
            }))
            .map_err(failure)?;

        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.as_path()], DType::F32, &device)
        }
        .map_err(failure)?;
        let model = BertModel::load(vb, &config).map_err(failure)?;

        let model_id = model_id.into();
        info!(model = %model_id, dimensions = hidden_size, "loaded sentence embedding model");
        Ok(Self { inner: Arc::new(Loaded { model, tokenizer, device }), dimensions: hidden_size, model_id })
    }
}

impl Loaded {
    fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let encodings = self.tokenizer.encode_batch(texts, true).map_err(failure)?;

        let rows = |column: fn(&tokenizers::Encoding) -> &[u32]| -> Result<Tensor> {
            let rows = encodings
                .iter()
                .map(|e| Tensor::new(column(e), &self.device))
                .collect::<candle_core::Result<Vec<_>>>()
                .map_err(failure)?;
            Tensor::stack(&rows, 0).map_err(failure)
        };
        let input_ids = rows(tokenizers::Encoding::get_ids)?;
        let attention_mask = rows(tokenizers::Encoding::get_attention_mask)?;
        let token_type_ids = input_ids.zeros_like().map_err(failure)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(failure)?;
        mean_pool_normalized(&hidden, &attention_mask)
            .and_then(|pooled| pooled.to_vec2::<f32>())
            .map_err(failure)
    }
}

/// Masked mean over the sequence axis of `(batch, seq, hidden)`, then unit length.
fn mean_pool_normalized(hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9f32, f32::MAX)?;
    let pooled = summed.broadcast_div(&counts)?;
    let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12f32, f32::MAX)?;
    pooled.broadcast_div(&norms)
}

#[async_trait]
impl EmbeddingProvider for MiniLmEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text]).await?.pop().ok_or_else(|| failure("model returned no vector"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = PROVIDER, batch_size = texts.len(), "embedding locally");
        let inner = Arc::clone(&self.inner);
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        tokio::task::spawn_blocking(move || inner.embed_texts(owned)).await.map_err(failure)?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
