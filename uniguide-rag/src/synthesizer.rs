//! Answer synthesis: one bounded call to the text generator.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};
use uniguide_model::{GenerationError, GenerationOptions, TextGenerator};

/// Default deadline for a single generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Delay before the first retry; doubled for each further attempt.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(8);

/// Prefix of the text returned to the user when an answer cannot be produced.
pub const APOLOGY_PREFIX: &str = "Sorry, an error occurred: ";

/// Format the user-visible apology for `error`.
pub fn apology(error: impl std::fmt::Display) -> String {
    format!("{APOLOGY_PREFIX}{error}")
}

/// Turns an assembled prompt into answer text.
///
/// Makes a single attempt by default. With [`with_max_retries`](Self::with_max_retries)
/// transient failures ([`GenerationError::is_transient`]) are retried with
/// exponential backoff; other failures are returned immediately.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    generator: Arc<dyn TextGenerator>,
    options: GenerationOptions,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl AnswerSynthesizer {
    /// Create a synthesizer with default options, a 60 second timeout and no retries.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            options: GenerationOptions::default(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
            max_retries: 0,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Set sampling options.
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the per-attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry transient failures up to `retries` times.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Name of the underlying generator.
    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Generate an answer for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns the generator's error, or [`GenerationError::Timeout`] if an
    /// attempt exceeds the deadline. With retries enabled this is the error
    /// of the last attempt.
    pub async fn synthesize(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 0;
        let mut backoff = self.backoff;
        loop {
            match self.attempt(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        generator = self.generator.name(),
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "generation failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_RETRY_BACKOFF);
                }
                Err(e) => {
                    error!(generator = self.generator.name(), error = %e, "generation failed");
                    return Err(e);
                }
            }
        }
    }

    /// Generate an answer for `prompt`, turning any failure into an apology.
    pub async fn synthesize_or_apologize(&self, prompt: &str) -> String {
        match self.synthesize(prompt).await {
            Ok(text) => text,
            Err(e) => apology(e),
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(generator = self.generator.name(), prompt_len = prompt.len(), "calling generator");
        let text = tokio::time::timeout(self.timeout, self.generator.generate(prompt, &self.options))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::MalformedResponse {
                provider: self.generator.name().to_string(),
                message: "empty completion".into(),
            });
        }
        Ok(text.to_string())
    }
}
