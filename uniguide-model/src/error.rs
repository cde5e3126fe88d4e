//! Error types for text generation.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while calling a generation backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// The request never produced an HTTP response (DNS, TLS, connection reset).
    #[error("network error ({provider}): {message}")]
    Network {
        /// The backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend rejected the credentials.
    #[error("authentication failed ({provider}): {message}")]
    Auth {
        /// The backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend refused the request because of quota or rate limits.
    #[error("rate limited ({provider}): {message}")]
    RateLimited {
        /// The backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend returned a non-success status not covered above.
    #[error("API error ({provider}) {status}: {message}")]
    Api {
        /// The backend that produced the error.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// A description of the failure.
        message: String,
    },

    /// The call did not complete within the configured deadline.
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered but the payload could not be used.
    #[error("malformed response ({provider}): {message}")]
    MalformedResponse {
        /// The backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend is misconfigured (missing API key, invalid URL).
    #[error("configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::RateLimited { .. } | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Auth { .. } | Self::MalformedResponse { .. } | Self::Config(_) => false,
        }
    }
}

/// A convenience result type for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;
