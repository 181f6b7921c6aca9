//! Tool collaborators and dispatch
//!
//! Tools are external capabilities behind a fixed contract: a name and a
//! `call(arguments) -> String` invocation. The registry makes dispatch
//! total — any failure, including an unknown name, comes back as an
//! `"Error: ..."` observation string so the reasoning step can read it
//! and self-correct. Nothing at this layer ever retries; the search
//! sub-workflow owns retry policy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::message::{Message, ToolCall};

/// Failure inside a tool implementation.
///
/// Never escapes the registry; [`ToolRegistry::execute`] folds it into
/// the observation string.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The arguments did not match what the tool expects
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The underlying capability failed
    #[error("{0}")]
    Execution(String),
}

/// One external capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the assistant uses to request this tool.
    fn name(&self) -> &str;

    /// Short description for diagnostics and prompt assembly.
    fn description(&self) -> &str {
        ""
    }

    /// Invoke the capability. A returned `Err` is converted to an
    /// `"Error:"` observation by the registry, never propagated.
    async fn call(&self, arguments: serde_json::Value) -> Result<String, ToolError>;
}

/// Name-to-capability table, built once at startup and shared read-only.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Registered tool names, sorted for stable error messages.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invoke a tool by name, converting every failure into an
    /// observation string. Total: never returns an error.
    pub async fn execute(&self, name: &str, arguments: serde_json::Value) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!(
                "Error: unknown tool '{}'. Valid tools: {}",
                name,
                self.names().join(", ")
            );
        };
        debug!(tool = name, "executing tool");
        match tool.call(arguments).await {
            Ok(observation) => observation,
            Err(err) => format!("Error: {err}"),
        }
    }
}

/// Dispatch a batch of tool calls concurrently.
///
/// Calls run in parallel but the returned observations match the order of
/// the input list, not completion order — downstream reasoning depends on
/// results lining up with the declaring `tool_calls` list.
pub async fn dispatch_batch(registry: &ToolRegistry, calls: &[ToolCall]) -> Vec<Message> {
    let invocations = calls.iter().map(|call| async move {
        let observation = registry.execute(&call.name, call.arguments.clone()).await;
        Message::tool_result(observation, &call.id)
    });
    futures::future::join_all(invocations).await
}
