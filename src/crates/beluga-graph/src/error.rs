//! Error types for graph construction and execution

use thiserror::Error;

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while building or executing a graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// A transition named a node that is not registered
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// A node has no outgoing edge rule
    #[error("Node '{0}' has no outgoing edge")]
    MissingEdge(String),

    /// The graph definition is inconsistent
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// The step limit was reached without a terminal transition
    #[error("Step limit of {0} reached without completing")]
    StepLimit(u64),

    /// A node handler failed
    #[error("Node '{node}' failed: {source}")]
    Node {
        node: String,
        #[source]
        source: anyhow::Error,
    },

    /// Checkpoint persistence failed
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] beluga_checkpoint::CheckpointError),

    /// State could not be serialized or restored
    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// Wrap a handler failure with the name of the node that produced it.
    pub fn node(node: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Node {
            node: node.into(),
            source: source.into(),
        }
    }
}
