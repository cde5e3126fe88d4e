//! Groq provider implementation.
//!
//! Groq exposes an OpenAI-compatible chat completions endpoint, so the same
//! client also works with OpenAI, vLLM, Ollama, or any other server that
//! speaks `POST /chat/completions`.
//!
//! # Example
//!
//! ```rust,ignore
//! use uniguide_model::groq::{GroqClient, GroqConfig};
//!
//! // Reads GROQ_API_KEY, GROQ_MODEL, GROQ_BASE_URL
//! let client = GroqClient::new(GroqConfig::from_env()?)?;
//!
//! // Any OpenAI-compatible server
//! let local = GroqClient::new(
//!     GroqConfig::new("unused", "llama3.1")
//!         .with_base_url("http://localhost:11434/v1"),
//! )?;
//! ```
//!
//! # Errors
//!
//! | HTTP outcome | Error |
//! |--------------|-------|
//! | 401 / 403 | [`GenerationError::Auth`](crate::GenerationError::Auth) |
//! | 429 | [`GenerationError::RateLimited`](crate::GenerationError::RateLimited) |
//! | other non-2xx | [`GenerationError::Api`](crate::GenerationError::Api) |
//! | no response | [`GenerationError::Network`](crate::GenerationError::Network) |
//! | client timeout | [`GenerationError::Timeout`](crate::GenerationError::Timeout) |

mod client;
mod config;

pub use client::GroqClient;
pub use config::{DEFAULT_GROQ_MODEL, DEFAULT_TIMEOUT, GROQ_API_BASE, GroqConfig};
