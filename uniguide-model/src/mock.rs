//! Scripted generator for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::GenerationOptions;
use crate::error::{GenerationError, Result};
use crate::generator::TextGenerator;

enum Fallback {
    Fixed(Result<String>),
    Echo,
}

/// A [`TextGenerator`] that replays scripted outcomes.
///
/// Outcomes queued with [`push_response`](Self::push_response) /
/// [`push_error`](Self::push_error) are returned first, in order. Once the
/// queue is empty every call returns the fallback outcome. Every prompt is
/// recorded and can be inspected with [`prompts`](Self::prompts).
pub struct MockGenerator {
    name: String,
    fallback: Fallback,
    queue: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockGenerator {
    /// A generator that always answers `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self::with_fallback("mock", Fallback::Fixed(Ok(response.into())))
    }

    /// A generator that always fails with `error`.
    pub fn failing(error: GenerationError) -> Self {
        Self::with_fallback("mock", Fallback::Fixed(Err(error)))
    }

    /// A generator that echoes the prompt back, useful for asserting on prompt content.
    pub fn echo() -> Self {
        Self::with_fallback("mock-echo", Fallback::Echo)
    }

    fn with_fallback(name: &str, fallback: Fallback) -> Self {
        Self {
            name: name.to_string(),
            fallback,
            queue: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Queue a successful response.
    pub fn push_response(self, response: impl Into<String>) -> Self {
        self.lock_queue().push_back(Ok(response.into()));
        self
    }

    /// Queue a failure.
    pub fn push_error(self, error: GenerationError) -> Self {
        self.lock_queue().push_back(Err(error));
        self
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String>>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(outcome) = self.lock_queue().pop_front() {
            return outcome;
        }

        match &self.fallback {
            Fallback::Fixed(outcome) => outcome.clone(),
            Fallback::Echo => Ok(prompt.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queue_then_fallback() {
        let mock = MockGenerator::new("fallback")
            .push_response("first")
            .push_error(GenerationError::Config("boom".into()));
        let options = GenerationOptions::default();

        assert_eq!(mock.generate("a", &options).await.unwrap(), "first");
        assert!(mock.generate("b", &options).await.is_err());
        assert_eq!(mock.generate("c", &options).await.unwrap(), "fallback");
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn echo_returns_prompt() {
        let mock = MockGenerator::echo();
        let text = mock.generate("context block", &GenerationOptions::default()).await.unwrap();
        assert_eq!(text, "context block");
        assert_eq!(mock.call_count(), 1);
    }
}
