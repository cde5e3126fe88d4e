//! Per-request generation settings.

use serde::{Deserialize, Serialize};

/// Low temperature favours factual, repeatable answers over creative ones.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Upper bound on the completion length, in tokens.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Sampling options sent with every generation request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature. `0.0` is the most deterministic setting.
    pub temperature: f32,
    /// Maximum number of tokens the backend may produce.
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { temperature: DEFAULT_TEMPERATURE, max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS }
    }
}

impl GenerationOptions {
    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum completion length.
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}
