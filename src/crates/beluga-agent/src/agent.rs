//! Turn-level orchestration
//!
//! [`AgentExecutor`] is the externally visible surface: it owns the
//! compiled agent graph, the checkpoint store, and a per-thread lock
//! table, and exposes three operations — [`run_turn`] for a new human
//! message, [`resume`] to resolve a pending approval, and [`recover`] to
//! finish a turn interrupted mid-flight. All three serialize on the
//! thread id, so no two steps for one conversation ever run concurrently;
//! distinct threads proceed independently.
//!
//! [`run_turn`]: AgentExecutor::run_turn
//! [`resume`]: AgentExecutor::resume
//! [`recover`]: AgentExecutor::recover

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use beluga_checkpoint::CheckpointSaver;
use beluga_graph::{Executor, GraphBuilder, GraphState, RunOutcome, Transition};

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::llm::{ChatModel, TokenSender};
use crate::message::Message;
use crate::node::{DelegateNode, GatedToolsNode, NodeKind, ReasonNode, ToolsNode, TurnCtx};
use crate::router::{Next, Router};
use crate::sanitize::sanitize_history;
use crate::state::{StateUpdate, ThreadState};
use crate::subflow::SearchSubflow;
use crate::tool::ToolRegistry;

/// Observation recorded for a gated call the user declined.
pub const SKIPPED_BY_USER: &str = "Skipped by user.";

/// The caller's verdict on a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    /// Execute the gated batch
    Approve,
    /// Record a skip observation for each pending call and continue
    /// without executing anything
    Reject,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The graph reached a terminal transition
    Completed,
    /// Execution is paused on the approval gate; call
    /// [`AgentExecutor::resume`] to continue
    AwaitingApproval,
}

/// Result of a turn, resume, or recovery.
#[derive(Debug)]
pub struct Turn {
    pub state: ThreadState,
    pub status: TurnStatus,
}

impl Turn {
    fn from_outcome(outcome: RunOutcome<NodeKind, ThreadState>) -> Self {
        match outcome {
            RunOutcome::Complete { state, .. } => Turn {
                state,
                status: TurnStatus::Completed,
            },
            RunOutcome::Paused { state, .. } => Turn {
                state,
                status: TurnStatus::AwaitingApproval,
            },
        }
    }
}

/// The agent's execution core, built once at startup and shared.
pub struct AgentExecutor {
    executor: Executor<NodeKind, ThreadState, TurnCtx>,
    checkpointer: Arc<dyn CheckpointSaver>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AgentExecutor {
    /// Assemble the agent graph and validate it.
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        checkpointer: Arc<dyn CheckpointSaver>,
        config: AgentConfig,
    ) -> Result<Self> {
        let subflow = Arc::new(SearchSubflow::new(model.clone(), tools.clone(), &config)?);
        let router = Router::new(&config);

        let graph = GraphBuilder::new()
            .add_node(
                NodeKind::Reason,
                ReasonNode::new(model, config.system_prompt.clone()),
            )
            .add_node(NodeKind::Tools, ToolsNode::new(tools.clone()))
            .add_node(
                NodeKind::ToolsGated,
                GatedToolsNode::new(tools, config.gated_tools.clone()),
            )
            .add_node(
                NodeKind::Delegate,
                DelegateNode::new(subflow, config.delegated_tool.clone()),
            )
            .add_conditional_edge(NodeKind::Reason, move |state: &ThreadState| {
                match router.route(state) {
                    Next::End => Transition::End,
                    Next::Tools => Transition::To(NodeKind::Tools),
                    Next::ToolsGated => Transition::To(NodeKind::ToolsGated),
                    Next::Delegate => Transition::To(NodeKind::Delegate),
                }
            })
            .add_edge(NodeKind::Tools, Transition::To(NodeKind::Reason))
            .add_edge(NodeKind::ToolsGated, Transition::To(NodeKind::Reason))
            .add_edge(NodeKind::Delegate, Transition::To(NodeKind::Reason))
            .set_entry(NodeKind::Reason)
            .interrupt_before(NodeKind::ToolsGated)
            .build()?;

        let executor = Executor::new(graph)
            .with_checkpointer(checkpointer.clone())
            .with_max_steps(config.max_steps);

        Ok(Self {
            executor,
            checkpointer,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Process one new human message on a thread, running until the turn
    /// completes or pauses on the approval gate.
    ///
    /// Fails with [`AgentError::ApprovalPending`] if the thread is paused
    /// awaiting an approval; the gate must be resolved via
    /// [`resume`](Self::resume) first.
    pub async fn run_turn(&self, thread_id: &str, text: &str) -> Result<Turn> {
        self.start_turn(thread_id, text, None).await
    }

    /// As [`run_turn`](Self::run_turn), forwarding incremental reasoning
    /// tokens to the given side channel.
    pub async fn run_turn_streamed(
        &self,
        thread_id: &str,
        text: &str,
        tokens: TokenSender,
    ) -> Result<Turn> {
        self.start_turn(thread_id, text, Some(tokens)).await
    }

    async fn start_turn(
        &self,
        thread_id: &str,
        text: &str,
        stream: Option<TokenSender>,
    ) -> Result<Turn> {
        let _guard = self.lock_thread(thread_id).await;
        info!(thread_id, "starting turn");

        let latest = self.checkpointer.latest(thread_id).await?;
        let (mut state, pending, start_step) = match &latest {
            Some(cp) => {
                let (state, next) = self.executor.restore(cp)?;
                (state, next, cp.step + 1)
            }
            None => (ThreadState::default(), None, 0),
        };
        if pending == Some(NodeKind::ToolsGated) {
            return Err(AgentError::ApprovalPending(thread_id.to_string()));
        }

        state.messages = sanitize_history(&state.messages);
        state.messages.push(Message::human(text));
        state.retries_used = 0;

        let ctx = TurnCtx { stream };
        let outcome = self
            .executor
            .run(thread_id, state, NodeKind::Reason, start_step, &ctx)
            .await?;
        Ok(Turn::from_outcome(outcome))
    }

    /// Resolve a pending approval gate.
    ///
    /// Valid only when the thread's latest checkpoint is paused on the
    /// gate; anything else fails with [`AgentError::NothingToResume`].
    /// `Approve` executes the gated batch normally. `Reject` records a
    /// skip observation ([`SKIPPED_BY_USER`]) for every pending call and
    /// continues with reasoning, never invoking the capability.
    pub async fn resume(&self, thread_id: &str, decision: ResumeDecision) -> Result<Turn> {
        let _guard = self.lock_thread(thread_id).await;
        info!(thread_id, ?decision, "resuming thread");

        let Some(cp) = self.checkpointer.latest(thread_id).await? else {
            return Err(AgentError::NothingToResume(thread_id.to_string()));
        };
        let (mut state, next) = self.executor.restore(&cp)?;
        if next != Some(NodeKind::ToolsGated) {
            return Err(AgentError::NothingToResume(thread_id.to_string()));
        }

        let mut step = cp.step + 1;
        let ctx = TurnCtx::detached();
        let outcome = match decision {
            ResumeDecision::Approve => {
                self.executor
                    .run(thread_id, state, NodeKind::ToolsGated, step, &ctx)
                    .await?
            }
            ResumeDecision::Reject => {
                let skipped: Vec<Message> = state
                    .pending_tool_calls()
                    .iter()
                    .map(|call| Message::tool_result(SKIPPED_BY_USER, &call.id))
                    .collect();
                state.apply(StateUpdate::messages(skipped));
                // The rejection lands on the durable record before
                // reasoning continues.
                self.executor
                    .persist(thread_id, &state, Some(NodeKind::Reason), step)
                    .await?;
                step += 1;
                self.executor
                    .run(thread_id, state, NodeKind::Reason, step, &ctx)
                    .await?
            }
        };
        Ok(Turn::from_outcome(outcome))
    }

    /// Finish a turn that was interrupted mid-flight.
    ///
    /// Re-enters the node named by the latest checkpoint. Returns
    /// `Ok(None)` when there is nothing to do (unknown thread, or the
    /// last turn completed); a thread paused on the approval gate is
    /// reported as [`TurnStatus::AwaitingApproval`] without executing
    /// anything, since only [`resume`](Self::resume) may clear the gate.
    pub async fn recover(&self, thread_id: &str) -> Result<Option<Turn>> {
        let _guard = self.lock_thread(thread_id).await;

        let Some(cp) = self.checkpointer.latest(thread_id).await? else {
            return Ok(None);
        };
        let (state, next) = self.executor.restore(&cp)?;
        match next {
            None => Ok(None),
            Some(NodeKind::ToolsGated) => Ok(Some(Turn {
                state,
                status: TurnStatus::AwaitingApproval,
            })),
            Some(node) => {
                info!(thread_id, node = ?node, "recovering interrupted turn");
                let outcome = self
                    .executor
                    .run(thread_id, state, node, cp.step + 1, &TurnCtx::detached())
                    .await?;
                Ok(Some(Turn::from_outcome(outcome)))
            }
        }
    }

    /// Serialize all operations per thread id; checkpoint read-modify-
    /// write must never interleave for one conversation.
    async fn lock_thread(&self, thread_id: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(thread_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }
}
