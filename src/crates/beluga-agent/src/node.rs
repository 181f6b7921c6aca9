//! Node handlers for the agent graph
//!
//! Four nodes: `reason` invokes the model over a sanitized history,
//! `tools` dispatches the pending calls directly, `tools_gated` executes
//! only approved capabilities, and `delegate` hands each search call to
//! the self-correcting sub-workflow. Handlers produce state deltas; all
//! routing between them lives in the edge table.

use std::sync::Arc;

use async_trait::async_trait;

use beluga_graph::{GraphError, NodeHandler, NodeKey};

use crate::llm::{ChatModel, TokenSender};
use crate::message::Message;
use crate::sanitize::sanitize_history;
use crate::state::{StateUpdate, ThreadState};
use crate::subflow::SearchSubflow;
use crate::tool::{dispatch_batch, ToolRegistry};

/// Nodes of the outer agent graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Reason,
    Tools,
    ToolsGated,
    Delegate,
}

impl NodeKey for NodeKind {
    fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Reason => "reason",
            NodeKind::Tools => "tools",
            NodeKind::ToolsGated => "tools_gated",
            NodeKind::Delegate => "delegate",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "reason" => Some(NodeKind::Reason),
            "tools" => Some(NodeKind::Tools),
            "tools_gated" => Some(NodeKind::ToolsGated),
            "delegate" => Some(NodeKind::Delegate),
            _ => None,
        }
    }
}

/// Per-turn context handed to every node.
pub struct TurnCtx {
    /// Side channel for incremental reasoning tokens, if the caller wants
    /// them. Absent for resume and recovery runs.
    pub stream: Option<TokenSender>,
}

impl TurnCtx {
    pub fn detached() -> Self {
        Self { stream: None }
    }

    pub fn streaming(tokens: TokenSender) -> Self {
        Self {
            stream: Some(tokens),
        }
    }
}

/// Invokes the model with the full sanitized history.
pub struct ReasonNode {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
}

impl ReasonNode {
    pub fn new(model: Arc<dyn ChatModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
        }
    }
}

#[async_trait]
impl NodeHandler<ThreadState, TurnCtx> for ReasonNode {
    async fn run(&self, state: &ThreadState, ctx: &TurnCtx) -> Result<StateUpdate, GraphError> {
        // Repair runs before every model call: the loaded history may end
        // in tool calls that were interrupted before their results landed.
        let history = sanitize_history(&state.messages);
        let reply = match &ctx.stream {
            Some(tokens) => {
                self.model
                    .generate_streamed(&self.system_prompt, &history, tokens)
                    .await
            }
            None => self.model.generate(&self.system_prompt, &history).await,
        }
        .map_err(|err| GraphError::node(NodeKind::Reason.as_str(), err))?;
        Ok(StateUpdate::message(reply))
    }
}

/// Dispatches every pending tool call concurrently.
pub struct ToolsNode {
    registry: Arc<ToolRegistry>,
}

impl ToolsNode {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl NodeHandler<ThreadState, TurnCtx> for ToolsNode {
    async fn run(&self, state: &ThreadState, _ctx: &TurnCtx) -> Result<StateUpdate, GraphError> {
        let pending = state.pending_tool_calls();
        if pending.is_empty() {
            return Err(GraphError::node(
                NodeKind::Tools.as_str(),
                anyhow::anyhow!("reached with no pending tool calls"),
            ));
        }
        let results = dispatch_batch(&self.registry, &pending).await;
        Ok(StateUpdate::messages(results))
    }
}

/// Like [`ToolsNode`], but only approved capabilities actually execute;
/// anything else in the batch is short-circuited to a skip observation.
/// The executor pauses before this node, so by the time it runs a human
/// has approved the batch.
pub struct GatedToolsNode {
    registry: Arc<ToolRegistry>,
    gated_tools: Vec<String>,
}

impl GatedToolsNode {
    pub fn new(registry: Arc<ToolRegistry>, gated_tools: Vec<String>) -> Self {
        Self {
            registry,
            gated_tools,
        }
    }
}

#[async_trait]
impl NodeHandler<ThreadState, TurnCtx> for GatedToolsNode {
    async fn run(&self, state: &ThreadState, _ctx: &TurnCtx) -> Result<StateUpdate, GraphError> {
        let pending = state.pending_tool_calls();
        if pending.is_empty() {
            return Err(GraphError::node(
                NodeKind::ToolsGated.as_str(),
                anyhow::anyhow!("reached with no pending tool calls"),
            ));
        }
        let invocations = pending.iter().map(|call| async move {
            if self.gated_tools.iter().any(|g| g == &call.name) {
                let observation = self
                    .registry
                    .execute(&call.name, call.arguments.clone())
                    .await;
                Message::tool_result(observation, &call.id)
            } else {
                Message::tool_result(
                    format!(
                        "Skipped: '{}' was not executed because this batch required approval.",
                        call.name
                    ),
                    &call.id,
                )
            }
        });
        let results = futures::future::join_all(invocations).await;
        Ok(StateUpdate::messages(results))
    }
}

/// Runs the search sub-workflow once per matching pending call and wraps
/// each outcome as an ordinary tool observation.
pub struct DelegateNode {
    subflow: Arc<SearchSubflow>,
    delegated_tool: String,
}

impl DelegateNode {
    pub fn new(subflow: Arc<SearchSubflow>, delegated_tool: impl Into<String>) -> Self {
        Self {
            subflow,
            delegated_tool: delegated_tool.into(),
        }
    }
}

#[async_trait]
impl NodeHandler<ThreadState, TurnCtx> for DelegateNode {
    async fn run(&self, state: &ThreadState, _ctx: &TurnCtx) -> Result<StateUpdate, GraphError> {
        let mut results = Vec::new();
        for call in state.pending_tool_calls() {
            if call.name != self.delegated_tool {
                // Left unanswered here; the sanitizer patches it before
                // the next reasoning call.
                continue;
            }
            let observation = self.subflow.run(&call.arguments).await?;
            results.push(Message::tool_result(observation, &call.id));
        }
        Ok(StateUpdate::messages(results))
    }
}
