//! Conversation message model
//!
//! Typed entries for one conversation: human input, assistant replies
//! (which may carry structured tool calls), tool observations, and system
//! text. Tool results link back to the call that requested them through
//! `tool_call_id`; the sanitizer relies on that link to repair histories
//! interrupted between a call and its answer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One structured tool invocation requested by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique id linking the eventual result back to this call
    pub id: String,
    /// Name of the capability to invoke
    pub name: String,
    /// Arguments as a JSON object
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Assistant,
    ToolResult,
    System,
}

/// One conversational turn.
///
/// `tool_calls` is only populated on assistant messages; `tool_call_id`
/// only on tool results. An assistant message may have empty `content`
/// when it exists solely to request tool calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique within a thread
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn base(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::base(Role::Human, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::base(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::base(Role::System, content)
    }

    /// An observation answering the tool call with the given id.
    pub fn tool_result(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        let mut msg = Self::base(Role::ToolResult, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Attach tool calls (assistant messages only, by convention).
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    /// True for an assistant message that requests at least one tool call.
    pub fn requests_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// True if `message` carries tool calls that the immediately following
/// tool-result run does not answer.
pub fn has_unanswered_tool_calls(message: &Message, following: &[Message]) -> bool {
    if !message.requests_tools() {
        return false;
    }
    let answered: Vec<&str> = following
        .iter()
        .take_while(|m| m.role == Role::ToolResult)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    message
        .tool_calls
        .iter()
        .any(|call| !answered.contains(&call.id.as_str()))
}

/// True if a tool observation should be treated as a failure.
///
/// This is a case-insensitive substring match on "error", kept for
/// compatibility with the tools' observation format. It can misfire on
/// legitimate content that happens to contain the word.
pub fn is_error_observation(text: &str) -> bool {
    text.to_lowercase().contains("error")
}
