//! Self-correcting search sub-workflow
//!
//! A nested two-node graph scoped to the search capability. The model
//! translates the request into a concrete query; the tool runs it; if the
//! observation carries an error marker and retries remain, control loops
//! back to the model with the error text now visible, letting it fix
//! field or table names on its own. The loop is bounded by a retry
//! ceiling, and whatever text the sub-workflow ends on becomes the tool
//! observation for the outer graph.
//!
//! Retry accounting: the guard after the tool step re-enters reasoning
//! only while `retries_used` is below the ceiling, and the reasoning step
//! consumes a retry when it re-enters over an error. An always-failing
//! tool with ceiling 3 therefore costs exactly 4 reasoning calls and 4
//! tool calls before the sub-workflow gives up and returns the error
//! text as its result.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use beluga_graph::{
    Executor, GraphBuilder, GraphError, NodeHandler, NodeKey, RunOutcome, Transition,
};

use crate::config::AgentConfig;
use crate::llm::ChatModel;
use crate::message::{is_error_observation, Message, Role};
use crate::sanitize::sanitize_history;
use crate::state::{StateUpdate, ThreadState};
use crate::tool::ToolRegistry;

/// Observation returned when a search completes with nothing to say.
pub const NO_RECORDS: &str = "No records found.";

/// Nodes of the nested search graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SubNode {
    Reason,
    Tools,
}

impl NodeKey for SubNode {
    fn as_str(&self) -> &'static str {
        match self {
            SubNode::Reason => "reason",
            SubNode::Tools => "tools",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "reason" => Some(SubNode::Reason),
            "tools" => Some(SubNode::Tools),
            _ => None,
        }
    }
}

/// True when the state's last message is a failed tool observation.
fn last_is_error(state: &ThreadState) -> bool {
    state
        .last_message()
        .map(|m| m.role == Role::ToolResult && is_error_observation(&m.content))
        .unwrap_or(false)
}

/// Reasoning step of the nested graph.
///
/// Consumes one retry when it re-enters over an error observation; the
/// first invocation of a run never counts against the ceiling.
struct SubReasonNode {
    model: Arc<dyn ChatModel>,
    search_prompt: String,
}

#[async_trait]
impl NodeHandler<ThreadState, ()> for SubReasonNode {
    async fn run(&self, state: &ThreadState, _ctx: &()) -> Result<StateUpdate, GraphError> {
        let history = sanitize_history(&state.messages);
        let reply = self
            .model
            .generate(&self.search_prompt, &history)
            .await
            .map_err(|err| GraphError::node(SubNode::Reason.as_str(), err))?;
        let update = StateUpdate::message(reply);
        if last_is_error(state) {
            Ok(update.with_retries(state.retries_used + 1))
        } else {
            Ok(update)
        }
    }
}

/// Executes the search capability for every pending call.
struct SubToolsNode {
    registry: Arc<ToolRegistry>,
}

#[async_trait]
impl NodeHandler<ThreadState, ()> for SubToolsNode {
    async fn run(&self, state: &ThreadState, _ctx: &()) -> Result<StateUpdate, GraphError> {
        let mut results = Vec::new();
        for call in state.pending_tool_calls() {
            let observation = self.registry.execute(&call.name, call.arguments.clone()).await;
            results.push(Message::tool_result(observation, &call.id));
        }
        Ok(StateUpdate::messages(results))
    }
}

/// The bounded reason / act / observe loop for the search capability.
pub struct SearchSubflow {
    executor: Executor<SubNode, ThreadState, ()>,
}

impl SearchSubflow {
    pub fn new(
        model: Arc<dyn ChatModel>,
        registry: Arc<ToolRegistry>,
        config: &AgentConfig,
    ) -> Result<Self, GraphError> {
        let ceiling = config.max_search_retries;
        let graph = GraphBuilder::new()
            .add_node(
                SubNode::Reason,
                SubReasonNode {
                    model,
                    search_prompt: config.search_prompt.clone(),
                },
            )
            .add_node(SubNode::Tools, SubToolsNode { registry })
            .add_conditional_edge(SubNode::Reason, |state: &ThreadState| {
                match state.last_message() {
                    Some(last) if last.requests_tools() => Transition::To(SubNode::Tools),
                    _ => Transition::End,
                }
            })
            .add_conditional_edge(SubNode::Tools, move |state: &ThreadState| {
                if last_is_error(state) && state.retries_used < ceiling {
                    Transition::To(SubNode::Reason)
                } else {
                    Transition::End
                }
            })
            .set_entry(SubNode::Reason)
            .build()?;

        // Worst case: (ceiling + 1) reason / tool pairs, plus headroom for
        // a final text-only reasoning step.
        let max_steps = 2 * (u64::from(ceiling) + 1) + 1;
        let executor = Executor::new(graph).with_max_steps(max_steps);
        Ok(Self { executor })
    }

    /// Run one search request to completion and return the observation
    /// text for the outer graph.
    pub async fn run(&self, arguments: &serde_json::Value) -> Result<String, GraphError> {
        let state = ThreadState {
            messages: vec![Message::human(arguments.to_string())],
            retries_used: 0,
        };
        // Detached: the nested run is never checkpointed, so the id only
        // shows up in logs.
        let run_id = format!("search-{}", Uuid::new_v4());
        debug!(run_id = %run_id, "entering search sub-workflow");

        let outcome = self
            .executor
            .run(&run_id, state, SubNode::Reason, 0, &())
            .await?;
        let state = match outcome {
            RunOutcome::Complete { state, .. } | RunOutcome::Paused { state, .. } => state,
        };
        let text = state
            .last_message()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        if text.trim().is_empty() {
            Ok(NO_RECORDS.to_string())
        } else {
            Ok(text)
        }
    }
}
