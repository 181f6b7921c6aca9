//! # beluga-graph - Checkpointed State-Machine Executor
//!
//! A small graph execution engine for resumable agent workflows. A workflow
//! is a set of named nodes plus an edge table; nodes do work and return
//! typed updates, edges decide where control flows next, and the executor
//! persists a checkpoint after every step so a thread can pause for human
//! input or survive a process restart.
//!
//! # Architecture
//!
//! ```text
//!                 ┌─────────────────────────────────┐
//!                 │            Executor             │
//!                 │                                 │
//!   state ───────▶│  run node ─▶ apply update       │
//!                 │      │                          │
//!                 │      ▼                          │
//!                 │  resolve edge (fixed / router)  │
//!                 │      │                          │
//!                 │      ▼                          │
//!                 │  append checkpoint ─▶ saver     │
//!                 │      │                          │
//!                 │      ├── End ──────▶ Complete   │
//!                 │      ├── interrupt ▶ Paused     │
//!                 │      └── To(next) ─▶ loop       │
//!                 └─────────────────────────────────┘
//! ```
//!
//! # Design
//!
//! - **Typed state, explicit reducer**: each graph runs over one concrete
//!   state type implementing [`GraphState`]; nodes return an `Update` value
//!   and the state's `apply` folds it in. No dynamic channel maps.
//! - **Routing is data**: nodes never name their successor. Fixed and
//!   conditional edges live in the [`GraphBuilder`] tables and are resolved
//!   by the executor after each step.
//! - **Checkpoint after route**: a snapshot is written once the node has
//!   succeeded and the next node is known, so the latest checkpoint always
//!   carries an accurate `next_node`.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let graph = GraphBuilder::new()
//!     .add_node(Step::Fetch, FetchHandler)
//!     .add_node(Step::Summarize, SummarizeHandler)
//!     .add_conditional_edge(Step::Fetch, |state: &MyState| {
//!         if state.done { Transition::End } else { Transition::To(Step::Summarize) }
//!     })
//!     .add_edge(Step::Summarize, Transition::To(Step::Fetch))
//!     .set_entry(Step::Fetch)
//!     .build()?;
//!
//! let executor = Executor::new(graph).with_checkpointer(saver);
//! let outcome = executor.run("thread-1", state, Step::Fetch, 0, &ctx).await?;
//! ```
//!
//! # See Also
//!
//! - `beluga-checkpoint` - the snapshot store this engine writes to
//! - `beluga-agent` - the conversational workflow built on this engine

pub mod builder;
pub mod error;
pub mod executor;
pub mod node;
pub mod state;

pub use builder::{EdgeRule, Graph, GraphBuilder};
pub use error::{GraphError, Result};
pub use executor::{Executor, RunOutcome};
pub use node::NodeHandler;
pub use state::{GraphState, NodeKey, Transition};
