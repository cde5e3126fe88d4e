//! Remote embeddings over an OpenAI-compatible `/embeddings` endpoint.
//!
//! Only compiled with the `openai` feature. OpenAI itself, Together, a
//! text-embeddings-inference container or Ollama all speak this shape.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Public OpenAI API.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Model used when none is configured.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Native width of [`DEFAULT_EMBEDDING_MODEL`].
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// HTTP deadline for one embeddings request.
pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "OpenAI";

/// Connection settings for [`OpenAIEmbeddingProvider`].
#[derive(Clone)]
pub struct OpenAIEmbeddingConfig {
    /// Bearer token.
    pub api_key: String,
    /// Embedding model name.
    pub model: String,
    /// Base URL without the `/embeddings` suffix.
    pub base_url: String,
    /// Width of returned vectors.
    pub dimensions: usize,
    /// Send `dimensions` in the request body so the server truncates vectors.
    pub truncate: bool,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAIEmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIEmbeddingConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("dimensions", &self.dimensions)
            .field("truncate", &self.truncate)
            .finish()
    }
}

impl OpenAIEmbeddingConfig {
    /// Defaults for the public API with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            truncate: false,
            timeout: DEFAULT_EMBEDDING_TIMEOUT,
        }
    }

    /// Read `OPENAI_API_KEY`, and `OPENAI_BASE_URL` / `UNIGUIDE_EMBEDDING_MODEL` if set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::Config("OPENAI_API_KEY environment variable not set".into()))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Ok(model) = std::env::var("UNIGUIDE_EMBEDDING_MODEL") {
            config = config.with_model(model);
        }
        Ok(config)
    }

    /// Use another model. The width is unchanged; call
    /// [`with_dimensions`](Self::with_dimensions) if it differs.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Ask the server for vectors of this width (`text-embedding-3-*` truncation).
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self.truncate = true;
        self
    }

    /// Set the per-request HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

/// [`EmbeddingProvider`] calling an OpenAI-compatible embeddings API.
///
/// A batch is sent as one request; the response items are put back in input
/// order using their `index` field.
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAIEmbeddingConfig,
    model_id: String,
}

impl std::fmt::Debug for OpenAIEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIEmbeddingProvider").field("config", &self.config).finish()
    }
}

impl OpenAIEmbeddingProvider {
    /// # Errors
    ///
    /// [`RagError::Config`] for a blank key, zero dimensions, or an HTTP
    /// client that cannot be built.
    pub fn new(config: OpenAIEmbeddingConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RagError::Config("embedding API key must not be empty".into()));
        }
        if config.dimensions == 0 {
            return Err(RagError::Config("embedding dimensions must be positive".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;

        // Width is part of the id so a truncation change invalidates the index.
        let model_id = format!("openai:{}:{}", config.model, config.dimensions);
        Ok(Self { client, config, model_id })
    }

    /// The configuration this provider was built with.
    pub fn config(&self) -> &OpenAIEmbeddingConfig {
        &self.config
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    encoding_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn failure(message: impl Into<String>) -> RagError {
    RagError::Embedding { provider: PROVIDER.into(), message: message.into() }
}

/// Put items in input order. Items without an `index` keep their position.
///
/// The count is not checked here; [`EmbeddingIndex::build`](crate::EmbeddingIndex::build)
/// rejects a short or long batch.
fn into_input_order(items: Vec<EmbeddingItem>, requested: usize) -> Result<Vec<Vec<f32>>> {
    let mut keyed = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        let slot = item.index.unwrap_or(position);
        if slot >= requested {
            return Err(failure(format!("response index {slot} outside a batch of {requested}")));
        }
        keyed.push((slot, item.embedding));
    }
    keyed.sort_by_key(|(slot, _)| *slot);
    if keyed.windows(2).any(|pair| pair[0].0 == pair[1].0) {
        return Err(failure("response repeats an input index"));
    }
    Ok(keyed.into_iter().map(|(_, embedding)| embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| failure("response contained no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = PROVIDER, model = %self.config.model, batch_size = texts.len(), "requesting embeddings");

        let body = EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
            encoding_format: "float",
            dimensions: self.config.truncate.then_some(self.config.dimensions),
        };

        let response = self
            .client
            .post(self.config.embeddings_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(provider = PROVIDER, error = %e, "embeddings request failed");
                failure(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiError>(&raw).map(|e| e.error.message).unwrap_or(raw);
            warn!(provider = PROVIDER, %status, "embeddings API error");
            return Err(failure(format!("API returned {status}: {detail}")));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| failure(format!("failed to parse response: {e}")))?;
        into_input_order(parsed.data, texts.len())
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
