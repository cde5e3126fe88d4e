//! # uniguide-model
//!
//! Text generation backends for the uniguide assistant.
//!
//! ## Overview
//!
//! The assistant treats the language model as an opaque capability:
//! one prompt in, one completion out. This crate provides:
//!
//! - [`TextGenerator`] - the trait every backend implements
//! - [`GroqClient`] - Groq (or any OpenAI-compatible) chat completions over HTTP
//! - [`MockGenerator`] - scripted generator for tests and offline demos
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use uniguide_model::{GenerationOptions, GroqClient, GroqConfig, TextGenerator};
//!
//! let client = GroqClient::new(GroqConfig::from_env()?)?;
//! let text = client.generate("Say hello", &GenerationOptions::default()).await?;
//! ```
//!
//! ## Supported Models
//!
//! | Model | Description |
//! |-------|-------------|
//! | `llama-3.3-70b-versatile` | Default, good factual recall |
//! | `llama-3.1-8b-instant` | Fast, cheaper |

mod config;
mod error;
mod generator;
#[cfg(feature = "groq")]
pub mod groq;
pub mod mock;

pub use config::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, GenerationOptions};
pub use error::{GenerationError, Result};
pub use generator::TextGenerator;
#[cfg(feature = "groq")]
pub use groq::{DEFAULT_GROQ_MODEL, GROQ_API_BASE, GroqClient, GroqConfig};
pub use mock::MockGenerator;
