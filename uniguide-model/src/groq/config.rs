//! Configuration for the Groq client.

use std::time::Duration;

use crate::error::{GenerationError, Result};

/// Base URL of Groq's OpenAI-compatible API.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Model used when `GROQ_MODEL` is not set.
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// HTTP deadline for a single completion request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`GroqClient`](super::GroqClient).
#[derive(Clone)]
pub struct GroqConfig {
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Model identifier, e.g. `llama-3.3-70b-versatile`.
    pub model: String,
    /// API base URL without the `/chat/completions` suffix.
    pub base_url: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GroqConfig {
    /// Create a config for the given key and model against the public Groq API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GROQ_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a config from `GROQ_API_KEY`, `GROQ_MODEL` and `GROQ_BASE_URL`.
    ///
    /// Only the API key is required.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY").map_err(|_| {
            GenerationError::Config("GROQ_API_KEY environment variable not set".into())
        })?;
        let model = std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_GROQ_MODEL.to_string());

        let mut config = Self::new(api_key, model);
        if let Ok(base_url) = std::env::var("GROQ_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }

    /// Point the client at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the chat completions endpoint.
    pub(crate) fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
