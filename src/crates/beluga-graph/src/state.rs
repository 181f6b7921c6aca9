//! Typed state and reducer contract
//!
//! Every graph runs over one concrete state type. Nodes never mutate state
//! directly: they return an update value, and the state's [`GraphState::apply`]
//! reducer folds it in. Keeping the reducer on the state type makes the
//! merge semantics (append vs. replace, per field) explicit and testable in
//! one place.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// State carried through a graph run.
///
/// The state must round-trip through JSON so checkpoints can snapshot it.
/// `Update` is the value nodes produce; `apply` defines how an update folds
/// into the state.
pub trait GraphState: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Value produced by a node, folded in by [`apply`](Self::apply).
    type Update: Send + 'static;

    /// Fold one node's output into the state.
    fn apply(&mut self, update: Self::Update);
}

/// Stable identity for a graph node.
///
/// Node keys are small enums in practice. `as_str` supplies the stable name
/// written into checkpoints; `parse` restores the key when a checkpoint is
/// loaded, returning `None` for names the graph no longer knows.
pub trait NodeKey: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Stable string name, as stored in checkpoints.
    fn as_str(&self) -> &'static str;

    /// Restore a key from its stable name.
    fn parse(name: &str) -> Option<Self>;
}

/// Where control flows after a node completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<N> {
    /// Continue to another node
    To(N),
    /// Terminate the run
    End,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Counter {
        total: i64,
    }

    impl GraphState for Counter {
        type Update = i64;

        fn apply(&mut self, update: i64) {
            self.total += update;
        }
    }

    #[test]
    fn test_apply_folds_updates() {
        let mut state = Counter { total: 0 };
        state.apply(3);
        state.apply(-1);
        assert_eq!(state.total, 2);
    }

    #[test]
    fn test_state_round_trips() {
        let state = Counter { total: 42 };
        let value = serde_json::to_value(&state).unwrap();
        let restored: Counter = serde_json::from_value(value).unwrap();
        assert_eq!(state, restored);
    }
}
