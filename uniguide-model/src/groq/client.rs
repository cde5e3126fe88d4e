//! Groq chat completions client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::config::GroqConfig;
use crate::config::GenerationOptions;
use crate::error::{GenerationError, Result};
use crate::generator::TextGenerator;

const PROVIDER: &str = "Groq";

/// A [`TextGenerator`] backed by an OpenAI-compatible chat completions API.
///
/// Each call sends the prompt as a single user message.
pub struct GroqClient {
    client: reqwest::Client,
    config: GroqConfig,
}

impl GroqClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] if the API key is empty or the
    /// HTTP client cannot be constructed.
    pub fn new(config: GroqConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::Config("API key must not be empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &GroqConfig {
        &self.config
    }

    fn map_send_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.config.timeout)
        } else {
            GenerationError::Network { provider: PROVIDER.into(), message: e.to_string() }
        }
    }
}

// ── Chat completions request/response types ────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn status_error(status: StatusCode, detail: String) -> GenerationError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GenerationError::Auth { provider: PROVIDER.into(), message: detail }
        }
        StatusCode::TOO_MANY_REQUESTS => {
            GenerationError::RateLimited { provider: PROVIDER.into(), message: detail }
        }
        _ => GenerationError::Api {
            provider: PROVIDER.into(),
            status: status.as_u16(),
            message: detail,
        },
    }
}

// ── TextGenerator implementation ───────────────────────────────────

#[async_trait]
impl TextGenerator for GroqClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.config.model,
            prompt_len = prompt.len(),
            temperature = options.temperature,
            "sending completion request"
        );

        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: options.temperature,
            max_tokens: options.max_output_tokens,
        };

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                self.map_send_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(status_error(status, detail));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            if e.is_timeout() {
                GenerationError::Timeout(self.config.timeout)
            } else {
                GenerationError::MalformedResponse {
                    provider: PROVIDER.into(),
                    message: format!("failed to parse response: {e}"),
                }
            }
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| GenerationError::MalformedResponse {
                provider: PROVIDER.into(),
                message: "response contained no completion text".into(),
            })?;

        debug!(provider = PROVIDER, completion_len = text.len(), "completion received");
        Ok(text)
    }
}
