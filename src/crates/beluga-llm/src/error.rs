//! Provider error types

use thiserror::Error;

use beluga_agent::ModelError;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors from an OpenAI-compatible provider.
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key in the config or environment
    #[error("API key not found; set OPENAI_API_KEY")]
    ApiKeyNotFound,

    /// Network-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the credentials
    #[error("Authentication failed")]
    Authentication,

    /// The provider applied rate limiting
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Any other non-success status from the provider
    #[error("Provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    /// The response payload could not be interpreted
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl From<LlmError> for ModelError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(e) => ModelError::Transport(e.to_string()),
            LlmError::InvalidResponse(msg) => ModelError::InvalidResponse(msg),
            other => ModelError::Provider(other.to_string()),
        }
    }
}
