//! Step loop with checkpoint-per-step persistence
//!
//! [`Executor`] drives a [`Graph`]: run the current node, fold its update
//! into the state, resolve the outgoing edge, persist a checkpoint, repeat.
//! The checkpoint is written after the node succeeds and the route is
//! known, so a crash between steps loses at most the step in flight and
//! the latest checkpoint always names the correct next node.

use std::sync::Arc;

use tracing::{debug, warn};

use beluga_checkpoint::{Checkpoint, CheckpointSaver};

use crate::builder::Graph;
use crate::error::{GraphError, Result};
use crate::state::{GraphState, NodeKey, Transition};

const DEFAULT_MAX_STEPS: u64 = 25;

/// How a call to [`Executor::run`] ended.
#[derive(Debug)]
pub enum RunOutcome<N, S> {
    /// The graph reached a terminal transition.
    Complete {
        state: S,
        /// Step number the next run on this thread should start from
        next_step: u64,
    },
    /// Execution paused before an interrupt node.
    Paused {
        state: S,
        /// The node awaiting clearance
        next: N,
        /// Step number the resumed run should start from
        next_step: u64,
    },
}

/// Drives a graph over a thread's state, one node at a time.
pub struct Executor<N: NodeKey, S: GraphState, C: Send + Sync> {
    graph: Graph<N, S, C>,
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
    max_steps: u64,
}

impl<N: NodeKey, S: GraphState, C: Send + Sync> Executor<N, S, C> {
    pub fn new(graph: Graph<N, S, C>) -> Self {
        Self {
            graph,
            checkpointer: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Persist a checkpoint after every step.
    pub fn with_checkpointer(mut self, saver: Arc<dyn CheckpointSaver>) -> Self {
        self.checkpointer = Some(saver);
        self
    }

    /// Cap the number of node executions per [`run`](Self::run) call.
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// The underlying graph definition.
    pub fn graph(&self) -> &Graph<N, S, C> {
        &self.graph
    }

    /// Execute from `start`, checkpointing each step under `thread_id`.
    ///
    /// `start_step` is the sequence number for the first checkpoint this
    /// run writes; callers resuming a thread pass one past the latest
    /// stored step. A node failure propagates without writing a
    /// checkpoint, so the thread remains resumable from its last good
    /// snapshot.
    pub async fn run(
        &self,
        thread_id: &str,
        mut state: S,
        start: N,
        start_step: u64,
        ctx: &C,
    ) -> Result<RunOutcome<N, S>> {
        let mut current = start;
        let mut step = start_step;
        let mut executed: u64 = 0;

        loop {
            if executed >= self.max_steps {
                warn!(thread_id, max_steps = self.max_steps, "step limit reached");
                return Err(GraphError::StepLimit(self.max_steps));
            }

            debug!(thread_id, node = current.as_str(), step, "executing node");
            let handler = self.graph.handler(current)?;
            let update = handler.run(&state, ctx).await?;
            state.apply(update);
            executed += 1;

            match self.graph.route(current, &state)? {
                Transition::End => {
                    self.persist(thread_id, &state, None, step).await?;
                    return Ok(RunOutcome::Complete {
                        state,
                        next_step: step + 1,
                    });
                }
                Transition::To(next) => {
                    self.persist(thread_id, &state, Some(next), step).await?;
                    step += 1;
                    if self.graph.should_interrupt_before(next) {
                        debug!(thread_id, node = next.as_str(), "pausing before node");
                        return Ok(RunOutcome::Paused {
                            state,
                            next,
                            next_step: step,
                        });
                    }
                    current = next;
                }
            }
        }
    }

    /// Write a checkpoint outside the step loop.
    ///
    /// Used when a caller amends a paused thread's state (for example,
    /// recording a human rejection) and needs the amendment on the durable
    /// record before execution continues.
    pub async fn persist(
        &self,
        thread_id: &str,
        state: &S,
        next: Option<N>,
        step: u64,
    ) -> Result<()> {
        let Some(saver) = &self.checkpointer else {
            return Ok(());
        };
        let snapshot = serde_json::to_value(state)?;
        let mut cp = Checkpoint::new(thread_id, step, snapshot);
        if let Some(next) = next {
            cp = cp.with_next_node(next.as_str());
        }
        debug!(thread_id, step, next = cp.next_node.as_deref(), "appending checkpoint");
        saver.append(cp).await?;
        Ok(())
    }

    /// Decode a stored checkpoint back into typed state and next node.
    ///
    /// Fails with [`GraphError::UnknownNode`] if the checkpoint names a
    /// node this graph does not define.
    pub fn restore(&self, checkpoint: &Checkpoint) -> Result<(S, Option<N>)> {
        let state: S = serde_json::from_value(checkpoint.state.clone())?;
        let next = match checkpoint.next_node.as_deref() {
            Some(name) => Some(
                N::parse(name).ok_or_else(|| GraphError::UnknownNode(name.to_string()))?,
            ),
            None => None,
        };
        Ok((state, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use async_trait::async_trait;
    use beluga_checkpoint::MemorySaver;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Key {
        Incr,
        Double,
    }

    impl NodeKey for Key {
        fn as_str(&self) -> &'static str {
            match self {
                Key::Incr => "incr",
                Key::Double => "double",
            }
        }

        fn parse(name: &str) -> Option<Self> {
            match name {
                "incr" => Some(Key::Incr),
                "double" => Some(Key::Double),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Count {
        n: i64,
    }

    enum Op {
        Add(i64),
        Mul(i64),
    }

    impl GraphState for Count {
        type Update = Op;

        fn apply(&mut self, update: Op) {
            match update {
                Op::Add(v) => self.n += v,
                Op::Mul(v) => self.n *= v,
            }
        }
    }

    struct Incr;

    #[async_trait]
    impl crate::node::NodeHandler<Count, ()> for Incr {
        async fn run(&self, _: &Count, _: &()) -> Result<Op> {
            Ok(Op::Add(1))
        }
    }

    struct Double;

    #[async_trait]
    impl crate::node::NodeHandler<Count, ()> for Double {
        async fn run(&self, _: &Count, _: &()) -> Result<Op> {
            Ok(Op::Mul(2))
        }
    }

    struct Failing;

    #[async_trait]
    impl crate::node::NodeHandler<Count, ()> for Failing {
        async fn run(&self, _: &Count, _: &()) -> Result<Op> {
            Err(GraphError::node("incr", anyhow::anyhow!("boom")))
        }
    }

    fn linear_graph() -> Graph<Key, Count, ()> {
        GraphBuilder::new()
            .add_node(Key::Incr, Incr)
            .add_node(Key::Double, Double)
            .add_edge(Key::Incr, Transition::To(Key::Double))
            .add_edge(Key::Double, Transition::End)
            .set_entry(Key::Incr)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_to_completion() {
        let executor = Executor::new(linear_graph());
        let outcome = executor
            .run("t1", Count { n: 1 }, Key::Incr, 0, &())
            .await
            .unwrap();
        match outcome {
            RunOutcome::Complete { state, next_step } => {
                assert_eq!(state.n, 4); // (1 + 1) * 2
                assert_eq!(next_step, 2);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_checkpoint_per_step() {
        let saver = Arc::new(MemorySaver::new());
        let executor = Executor::new(linear_graph()).with_checkpointer(saver.clone());
        executor
            .run("t1", Count { n: 0 }, Key::Incr, 0, &())
            .await
            .unwrap();

        let history = saver.list("t1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].next_node.as_deref(), Some("double"));
        assert!(history[1].next_node.is_none());
    }

    #[tokio::test]
    async fn test_interrupt_pauses_before_node() {
        let saver = Arc::new(MemorySaver::new());
        let graph = GraphBuilder::new()
            .add_node(Key::Incr, Incr)
            .add_node(Key::Double, Double)
            .add_edge(Key::Incr, Transition::To(Key::Double))
            .add_edge(Key::Double, Transition::End)
            .set_entry(Key::Incr)
            .interrupt_before(Key::Double)
            .build()
            .unwrap();
        let executor = Executor::new(graph).with_checkpointer(saver.clone());

        let outcome = executor
            .run("t1", Count { n: 0 }, Key::Incr, 0, &())
            .await
            .unwrap();
        let RunOutcome::Paused { state, next, next_step } = outcome else {
            panic!("expected pause");
        };
        assert_eq!(state.n, 1);
        assert_eq!(next, Key::Double);
        assert_eq!(next_step, 1);

        // The durable record names the gated node so a restart resumes there.
        let latest = saver.latest("t1").await.unwrap().unwrap();
        assert_eq!(latest.next_node.as_deref(), Some("double"));

        // Resuming from the pause point finishes the run.
        let outcome = executor
            .run("t1", state, next, next_step, &())
            .await
            .unwrap();
        let RunOutcome::Complete { state, .. } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(state.n, 2);
    }

    #[tokio::test]
    async fn test_failed_node_writes_no_checkpoint() {
        let saver = Arc::new(MemorySaver::new());
        let graph = GraphBuilder::new()
            .add_node(Key::Incr, Failing)
            .add_node(Key::Double, Double)
            .add_edge(Key::Incr, Transition::To(Key::Double))
            .add_edge(Key::Double, Transition::End)
            .set_entry(Key::Incr)
            .build()
            .unwrap();
        let executor = Executor::new(graph).with_checkpointer(saver.clone());

        let result = executor.run("t1", Count { n: 0 }, Key::Incr, 0, &()).await;
        assert!(matches!(result, Err(GraphError::Node { .. })));
        assert_eq!(saver.checkpoint_count().await, 0);
    }

    #[tokio::test]
    async fn test_step_limit() {
        let graph = GraphBuilder::new()
            .add_node(Key::Incr, Incr)
            .add_node(Key::Double, Double)
            .add_edge(Key::Incr, Transition::To(Key::Double))
            .add_edge(Key::Double, Transition::To(Key::Incr))
            .set_entry(Key::Incr)
            .build()
            .unwrap();
        let executor = Executor::new(graph).with_max_steps(6);

        let result = executor.run("t1", Count { n: 0 }, Key::Incr, 0, &()).await;
        assert!(matches!(result, Err(GraphError::StepLimit(6))));
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let executor = Executor::new(linear_graph());
        let cp = Checkpoint::new("t1", 3, serde_json::json!({"n": 9}))
            .with_next_node("double");
        let (state, next) = executor.restore(&cp).unwrap();
        assert_eq!(state, Count { n: 9 });
        assert_eq!(next, Some(Key::Double));
    }

    #[tokio::test]
    async fn test_restore_unknown_node() {
        let executor = Executor::new(linear_graph());
        let cp = Checkpoint::new("t1", 0, serde_json::json!({"n": 0}))
            .with_next_node("vanished");
        assert!(matches!(
            executor.restore(&cp),
            Err(GraphError::UnknownNode(_))
        ));
    }
}
