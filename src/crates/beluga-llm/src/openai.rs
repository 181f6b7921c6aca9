//! OpenAI chat-completions client
//!
//! Implements the agent's [`ChatModel`] boundary over the chat
//! completions wire format, including tool calling. Tool definitions are
//! bound at construction; the agent's `tool_calls` list maps one-to-one
//! onto the provider's function-call structures, with arguments carried
//! as a JSON string on the wire.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use beluga_agent::{ChatModel, Message, ModelError, Role, ToolCall};

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};

/// A capability advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the arguments object
    pub parameters: serde_json::Value,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolDefinition,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// Arguments as a JSON-encoded string, per the wire format
    arguments: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::Human => "user",
        Role::Assistant => "assistant",
        Role::ToolResult => "tool",
        Role::System => "system",
    }
}

fn to_wire(message: &Message) -> WireMessage {
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };
    WireMessage {
        role: wire_role(message.role).to_string(),
        content: Some(message.content.clone()),
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn from_wire(message: WireMessage) -> Result<Message> {
    let mut reply = Message::assistant(message.content.unwrap_or_default());
    if let Some(calls) = message.tool_calls {
        let calls: Result<Vec<ToolCall>> = calls
            .into_iter()
            .map(|call| {
                let arguments = serde_json::from_str(&call.function.arguments).map_err(|e| {
                    LlmError::InvalidResponse(format!(
                        "tool call '{}' carries unparseable arguments: {e}",
                        call.function.name
                    ))
                })?;
                Ok(ToolCall::new(call.id, call.function.name, arguments))
            })
            .collect();
        reply = reply.with_tool_calls(calls?);
    }
    Ok(reply)
}

fn parse_reply(response: ChatResponse) -> Result<Message> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;
    from_wire(choice.message)
}

/// Chat-completions client implementing [`ChatModel`].
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: reqwest::Client,
    tools: Vec<ToolDefinition>,
}

impl OpenAiClient {
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            client,
            tools: Vec::new(),
        })
    }

    /// Advertise tool definitions on every request.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    async fn complete(&self, system: &str, history: &[Message]) -> Result<Message> {
        let mut messages = vec![WireMessage {
            role: "system".to_string(),
            content: Some(system.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }];
        messages.extend(history.iter().map(to_wire));

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            tools: if self.tools.is_empty() {
                None
            } else {
                Some(
                    self.tools
                        .iter()
                        .map(|t| WireTool {
                            kind: "function",
                            function: t.clone(),
                        })
                        .collect(),
                )
            },
        };

        debug!(model = %self.config.model, turns = history.len(), "chat completion request");
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request);
        if let Some(org) = &self.config.organization {
            builder = builder.header("OpenAI-Organization", org);
        }
        let response = builder.send().await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(LlmError::Authentication);
        }
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let payload: ChatResponse = response.json().await?;
        parse_reply(payload)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn generate(&self, system: &str, history: &[Message]) -> std::result::Result<Message, ModelError> {
        self.complete(system, history).await.map_err(Into::into)
    }
}
