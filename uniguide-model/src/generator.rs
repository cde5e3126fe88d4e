//! The text generation capability.

use async_trait::async_trait;

use crate::config::GenerationOptions;
use crate::error::Result;

/// A backend that turns a single-turn prompt into completion text.
///
/// Implementations make exactly one backend call per invocation. They do not
/// stream, chain turns, or retry; callers that want retries wrap the call.
///
/// # Example
///
/// ```rust,ignore
/// use uniguide_model::{GenerationOptions, MockGenerator, TextGenerator};
///
/// let generator = MockGenerator::new("hello");
/// let text = generator.generate("prompt", &GenerationOptions::default()).await?;
/// assert_eq!(text, "hello");
/// ```
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Identifier of the model behind this generator.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}
