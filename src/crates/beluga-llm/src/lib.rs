//! # beluga-llm - OpenAI-Compatible Model Client
//!
//! Implements `beluga-agent`'s `ChatModel` boundary against the OpenAI
//! chat-completions API (or any compatible endpoint via a custom base
//! URL), including the tool-calling wire format.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let config = RemoteLlmConfig::from_env("gpt-4o")?;
//! let model = OpenAiClient::new(config)?.with_tools(vec![
//!     ToolDefinition {
//!         name: "search_records".to_string(),
//!         description: "Query the records database".to_string(),
//!         parameters: serde_json::json!({"type": "object"}),
//!     },
//! ]);
//! let agent = AgentExecutor::new(Arc::new(model), tools, saver, config)?;
//! ```

pub mod config;
pub mod error;
pub mod openai;

pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use openai::{OpenAiClient, ToolDefinition};
