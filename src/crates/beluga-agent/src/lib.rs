//! # beluga-agent - Conversational Agent Core
//!
//! The execution core of a checkpointed conversational agent: a reasoning
//! step driven by a language model, interleaved with external tool
//! invocations, a human approval gate in front of sensitive capabilities,
//! and a bounded self-correcting sub-workflow for data lookups. Built on
//! `beluga-graph` (the state machine) and `beluga-checkpoint` (durable
//! snapshots).
//!
//! # Architecture
//!
//! ```text
//!   human message
//!        │
//!        ▼
//!   ┌─────────┐   router    ┌─────────────┐
//!   │ reason  │────────────▶│   tools     │──┐
//!   │ (model) │             └─────────────┘  │
//!   │         │────────────▶┌─────────────┐  │
//!   │         │  ⏸ pause    │ tools_gated │──┤
//!   │         │             └─────────────┘  │
//!   │         │────────────▶┌─────────────┐  │
//!   │         │             │  delegate   │──┤
//!   │         │             │ (sub-flow)  │  │
//!   │         │◀────────────┴─────────────┘◀─┘
//!   └─────────┘
//!        │ router → end
//!        ▼
//!   assistant reply
//! ```
//!
//! Every step writes a checkpoint; the gate pauses by persisting
//! `next_node = tools_gated` and handing control back to the caller, who
//! later resolves it with an approve or reject decision. A crash anywhere
//! mid-turn is recoverable from the latest checkpoint, with the history
//! sanitizer patching any tool call left unanswered by the interruption.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let agent = AgentExecutor::new(model, tools, saver, AgentConfig::default())?;
//!
//! let turn = agent.run_turn("thread-1", "email bob about the outage").await?;
//! if turn.status == TurnStatus::AwaitingApproval {
//!     // a human signs off on the gated batch
//!     agent.resume("thread-1", ResumeDecision::Approve).await?;
//! }
//! ```
//!
//! # Modules
//!
//! - [`message`] - typed conversation entries and invariant predicates
//! - [`sanitize`] - history repair for interrupted tool calls
//! - [`state`] - `ThreadState` and its append-only reducer
//! - [`tool`] - the capability trait, registry and ordered fan-out dispatch
//! - [`llm`] - the model collaborator boundary and token side channel
//! - [`router`] - the pure post-reasoning routing decision
//! - [`node`] - the four node handlers of the outer graph
//! - [`subflow`] - the retry-bounded search sub-workflow
//! - [`agent`] - turn orchestration: run, pause, resume, recover

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod message;
pub mod node;
pub mod router;
pub mod sanitize;
pub mod state;
pub mod subflow;
pub mod tool;

pub use agent::{AgentExecutor, ResumeDecision, Turn, TurnStatus, SKIPPED_BY_USER};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use llm::{token_channel, ChatModel, ModelError, ScriptedModel, TokenSender};
pub use message::{has_unanswered_tool_calls, is_error_observation, Message, Role, ToolCall};
pub use node::{NodeKind, TurnCtx};
pub use router::{Next, Router};
pub use sanitize::{sanitize_history, INTERRUPTED_PLACEHOLDER};
pub use state::{StateUpdate, ThreadState};
pub use subflow::{SearchSubflow, NO_RECORDS};
pub use tool::{dispatch_batch, Tool, ToolError, ToolRegistry};
