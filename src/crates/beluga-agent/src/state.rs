//! Thread state and its reducer
//!
//! One [`ThreadState`] exists per conversation thread. Nodes never touch
//! it directly; they emit a [`StateUpdate`] and the reducer folds it in:
//! messages are append-only, the retry counter is last-write-wins.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use beluga_graph::GraphState;

use crate::message::{Message, Role, ToolCall};

/// Conversation-scoped state carried through the graph.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ThreadState {
    /// Ordered conversation history; the reducer only ever appends.
    pub messages: Vec<Message>,
    /// Retry counter for the search sub-workflow; 0 outside of it.
    #[serde(default)]
    pub retries_used: u32,
}

impl ThreadState {
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of tool observations recorded in the thread.
    pub fn tool_result_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::ToolResult)
            .count()
    }

    /// Tool calls from the most recent assistant message that have no
    /// recorded result yet, in declaration order.
    pub fn pending_tool_calls(&self) -> Vec<ToolCall> {
        let Some(idx) = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            return Vec::new();
        };
        let assistant = &self.messages[idx];
        let answered: HashSet<&str> = self.messages[idx + 1..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assistant
            .tool_calls
            .iter()
            .filter(|c| !answered.contains(c.id.as_str()))
            .cloned()
            .collect()
    }
}

/// Delta produced by one node execution.
#[derive(Debug, Default)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub retries_used: Option<u32>,
}

impl StateUpdate {
    pub fn message(message: Message) -> Self {
        Self {
            messages: vec![message],
            retries_used: None,
        }
    }

    pub fn messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            retries_used: None,
        }
    }

    pub fn with_retries(mut self, retries_used: u32) -> Self {
        self.retries_used = Some(retries_used);
        self
    }
}

impl GraphState for ThreadState {
    type Update = StateUpdate;

    fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        if let Some(retries) = update.retries_used {
            self.retries_used = retries;
        }
    }
}
