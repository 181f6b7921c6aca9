//! Checkpoint data structure
//!
//! A [`Checkpoint`] is one durable snapshot of a conversation thread: the
//! full state after a node has run, plus the name of the node that should
//! run next. A thread's history is the ordered list of its checkpoints;
//! the latest one is sufficient to resume execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A snapshot of thread state at one execution step.
///
/// Checkpoints are immutable once written. `step` is a per-thread sequence
/// number assigned by the executor; `next_node` is `None` when the run
/// reached a terminal transition and `Some(name)` otherwise, where `name`
/// is the stable string identifier of a graph node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    /// Unique checkpoint identifier
    pub id: String,

    /// Conversation thread this snapshot belongs to
    pub thread_id: String,

    /// Per-thread sequence number, starting at 0
    pub step: u64,

    /// When the snapshot was taken
    pub ts: DateTime<Utc>,

    /// Serialized thread state
    pub state: serde_json::Value,

    /// Node to execute next, or `None` if the run is complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<String>,
}

impl Checkpoint {
    /// Create a checkpoint with a fresh id and the current timestamp.
    pub fn new(thread_id: impl Into<String>, step: u64, state: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            step,
            ts: Utc::now(),
            state,
            next_node: None,
        }
    }

    /// Set the node to execute when the thread resumes.
    pub fn with_next_node(mut self, node: impl Into<String>) -> Self {
        self.next_node = Some(node.into());
        self
    }

    /// True if this checkpoint marks a completed run.
    pub fn is_terminal(&self) -> bool {
        self.next_node.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkpoint_creation() {
        let cp = Checkpoint::new("thread-1", 0, json!({"messages": []}));
        assert_eq!(cp.thread_id, "thread-1");
        assert_eq!(cp.step, 0);
        assert!(cp.next_node.is_none());
        assert!(cp.is_terminal());
        assert!(!cp.id.is_empty());
    }

    #[test]
    fn test_with_next_node() {
        let cp = Checkpoint::new("thread-1", 3, json!({})).with_next_node("tools");
        assert_eq!(cp.next_node.as_deref(), Some("tools"));
        assert!(!cp.is_terminal());
    }

    #[test]
    fn test_unique_ids() {
        let a = Checkpoint::new("t", 0, json!({}));
        let b = Checkpoint::new("t", 0, json!({}));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_serde_round_trip() {
        let cp = Checkpoint::new("thread-9", 7, json!({"retries_used": 2}))
            .with_next_node("reason");
        let encoded = serde_json::to_string(&cp).unwrap();
        let decoded: Checkpoint = serde_json::from_str(&encoded).unwrap();
        assert_eq!(cp, decoded);
    }

    #[test]
    fn test_next_node_omitted_when_terminal() {
        let cp = Checkpoint::new("thread-1", 1, json!({}));
        let encoded = serde_json::to_value(&cp).unwrap();
        assert!(encoded.get("next_node").is_none());
    }
}
