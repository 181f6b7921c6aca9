//! Node handler trait

use async_trait::async_trait;

use crate::error::GraphError;
use crate::state::GraphState;

/// One unit of work in a graph.
///
/// Handlers receive the current state by reference plus a caller-supplied
/// context `C` (shared collaborators: model clients, tool registries, output
/// channels). They return an update for the state's reducer; they never
/// mutate the state in place, and they never decide routing.
#[async_trait]
pub trait NodeHandler<S: GraphState, C: Send + Sync>: Send + Sync {
    /// Execute the node against the current state.
    async fn run(&self, state: &S, ctx: &C) -> Result<S::Update, GraphError>;
}
