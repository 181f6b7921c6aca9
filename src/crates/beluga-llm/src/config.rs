//! Provider configuration

use std::time::Duration;

use crate::error::{LlmError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct RemoteLlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub organization: Option<String>,
}

impl RemoteLlmConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            organization: None,
        }
    }

    /// Read the API key from `OPENAI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| LlmError::ApiKeyNotFound)?;
        Ok(Self::new(api_key, model))
    }

    /// Point at a non-default endpoint (a proxy, or a compatible server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RemoteLlmConfig::new("sk-test", "gpt-4o");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.organization.is_none());
    }

    #[test]
    fn test_builders() {
        let config = RemoteLlmConfig::new("sk-test", "gpt-4o")
            .with_base_url("http://localhost:8080/v1")
            .with_timeout(Duration::from_secs(5))
            .with_organization("org-1");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.organization.as_deref(), Some("org-1"));
    }
}
