//! Agent-level error taxonomy
//!
//! Tool failures never show up here: the dispatcher folds them into
//! observation strings that the model reads and recovers from. What does
//! surface is fatal to the current turn only — model transport faults,
//! storage faults, and protocol misuse around the approval gate. The
//! thread itself stays resumable from its last good checkpoint in every
//! case.

use thiserror::Error;

use beluga_checkpoint::CheckpointError;
use beluga_graph::GraphError;

use crate::llm::ModelError;

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors surfaced to the caller of a turn, resume, or recovery.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The model collaborator failed; no checkpoint was written for the
    /// failed step
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Engine-level failure (routing, step limit, state restore)
    #[error(transparent)]
    Graph(GraphError),

    /// Checkpoint store failure
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Resume was requested but no approval is pending
    #[error("Nothing to resume for thread '{0}'")]
    NothingToResume(String),

    /// A new turn was requested while an approval is still pending
    #[error("Thread '{0}' is awaiting approval; resolve it before sending a new message")]
    ApprovalPending(String),
}

impl From<GraphError> for AgentError {
    fn from(err: GraphError) -> Self {
        // Model faults travel through the engine wrapped in the node
        // error; unwrap them so callers see the model taxonomy directly.
        match err {
            GraphError::Node { node, source } => match source.downcast::<ModelError>() {
                Ok(model_err) => AgentError::Model(model_err),
                Err(source) => AgentError::Graph(GraphError::Node { node, source }),
            },
            other => AgentError::Graph(other),
        }
    }
}
