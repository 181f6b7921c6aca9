//! Graph definition and validation
//!
//! A graph is data: a table of node handlers and a table of edge rules,
//! assembled by [`GraphBuilder`] and frozen into a [`Graph`] by
//! [`GraphBuilder::build`]. Routing lives entirely in the edge table, so
//! the control flow of a workflow can be read off its construction site.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::node::NodeHandler;
use crate::state::{GraphState, NodeKey, Transition};

/// Routing rule attached to a node's outgoing edge.
pub enum EdgeRule<N, S> {
    /// Always take the same transition
    Fixed(Transition<N>),
    /// Inspect the state after the node runs and pick a transition
    Conditional(Arc<dyn Fn(&S) -> Transition<N> + Send + Sync>),
}

impl<N: NodeKey, S> EdgeRule<N, S> {
    fn resolve(&self, state: &S) -> Transition<N> {
        match self {
            EdgeRule::Fixed(t) => *t,
            EdgeRule::Conditional(f) => f(state),
        }
    }
}

/// Builder for a [`Graph`].
pub struct GraphBuilder<N: NodeKey, S: GraphState, C: Send + Sync> {
    nodes: HashMap<N, Arc<dyn NodeHandler<S, C>>>,
    edges: HashMap<N, EdgeRule<N, S>>,
    entry: Option<N>,
    interrupt_before: HashSet<N>,
}

impl<N: NodeKey, S: GraphState, C: Send + Sync> Default for GraphBuilder<N, S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeKey, S: GraphState, C: Send + Sync> GraphBuilder<N, S, C> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            interrupt_before: HashSet::new(),
        }
    }

    /// Register a node handler under a key.
    pub fn add_node(mut self, key: N, handler: impl NodeHandler<S, C> + 'static) -> Self {
        self.nodes.insert(key, Arc::new(handler));
        self
    }

    /// Register a node handler that is already behind an `Arc`.
    pub fn add_shared_node(mut self, key: N, handler: Arc<dyn NodeHandler<S, C>>) -> Self {
        self.nodes.insert(key, handler);
        self
    }

    /// Attach a fixed transition to a node.
    pub fn add_edge(mut self, from: N, to: Transition<N>) -> Self {
        self.edges.insert(from, EdgeRule::Fixed(to));
        self
    }

    /// Attach a state-inspecting router to a node.
    pub fn add_conditional_edge<F>(mut self, from: N, router: F) -> Self
    where
        F: Fn(&S) -> Transition<N> + Send + Sync + 'static,
    {
        self.edges.insert(from, EdgeRule::Conditional(Arc::new(router)));
        self
    }

    /// Set the node a fresh run starts at.
    pub fn set_entry(mut self, node: N) -> Self {
        self.entry = Some(node);
        self
    }

    /// Pause the run before this node executes, persisting a checkpoint
    /// whose `next_node` names it.
    pub fn interrupt_before(mut self, node: N) -> Self {
        self.interrupt_before.insert(node);
        self
    }

    /// Validate the definition and freeze it.
    ///
    /// Checks that an entry node is set and registered, that every node has
    /// an outgoing edge rule, and that every fixed transition targets a
    /// registered node. Conditional routers are opaque; their targets are
    /// checked at execution time instead.
    pub fn build(self) -> Result<Graph<N, S, C>> {
        let entry = self
            .entry
            .ok_or_else(|| GraphError::Validation("no entry node set".to_string()))?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::UnknownNode(entry.as_str().to_string()));
        }
        for key in self.nodes.keys() {
            if !self.edges.contains_key(key) {
                return Err(GraphError::MissingEdge(key.as_str().to_string()));
            }
        }
        for rule in self.edges.values() {
            if let EdgeRule::Fixed(Transition::To(target)) = rule {
                if !self.nodes.contains_key(target) {
                    return Err(GraphError::UnknownNode(target.as_str().to_string()));
                }
            }
        }
        for key in &self.interrupt_before {
            if !self.nodes.contains_key(key) {
                return Err(GraphError::UnknownNode(key.as_str().to_string()));
            }
        }
        Ok(Graph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
            interrupt_before: self.interrupt_before,
        })
    }
}

/// A validated, immutable graph definition.
pub struct Graph<N: NodeKey, S: GraphState, C: Send + Sync> {
    nodes: HashMap<N, Arc<dyn NodeHandler<S, C>>>,
    edges: HashMap<N, EdgeRule<N, S>>,
    entry: N,
    interrupt_before: HashSet<N>,
}

impl<N: NodeKey, S: GraphState, C: Send + Sync> Graph<N, S, C> {
    /// The node a fresh run starts at.
    pub fn entry(&self) -> N {
        self.entry
    }

    /// True if execution must pause before this node runs.
    pub fn should_interrupt_before(&self, node: N) -> bool {
        self.interrupt_before.contains(&node)
    }

    pub(crate) fn handler(&self, node: N) -> Result<&Arc<dyn NodeHandler<S, C>>> {
        self.nodes
            .get(&node)
            .ok_or_else(|| GraphError::UnknownNode(node.as_str().to_string()))
    }

    pub(crate) fn route(&self, node: N, state: &S) -> Result<Transition<N>> {
        let rule = self
            .edges
            .get(&node)
            .ok_or_else(|| GraphError::MissingEdge(node.as_str().to_string()))?;
        let transition = rule.resolve(state);
        if let Transition::To(target) = transition {
            if !self.nodes.contains_key(&target) {
                return Err(GraphError::UnknownNode(target.as_str().to_string()));
            }
        }
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Key {
        A,
        B,
    }

    impl NodeKey for Key {
        fn as_str(&self) -> &'static str {
            match self {
                Key::A => "a",
                Key::B => "b",
            }
        }

        fn parse(name: &str) -> Option<Self> {
            match name {
                "a" => Some(Key::A),
                "b" => Some(Key::B),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct S0;

    impl GraphState for S0 {
        type Update = ();
        fn apply(&mut self, _: ()) {}
    }

    struct Noop;

    #[async_trait]
    impl NodeHandler<S0, ()> for Noop {
        async fn run(&self, _: &S0, _: &()) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_build_requires_entry() {
        let result = GraphBuilder::<Key, S0, ()>::new()
            .add_node(Key::A, Noop)
            .add_edge(Key::A, Transition::End)
            .build();
        assert!(matches!(result, Err(GraphError::Validation(_))));
    }

    #[test]
    fn test_build_requires_edges_for_all_nodes() {
        let result = GraphBuilder::<Key, S0, ()>::new()
            .add_node(Key::A, Noop)
            .set_entry(Key::A)
            .build();
        assert!(matches!(result, Err(GraphError::MissingEdge(_))));
    }

    #[test]
    fn test_build_rejects_dangling_fixed_edge() {
        let result = GraphBuilder::<Key, S0, ()>::new()
            .add_node(Key::A, Noop)
            .add_edge(Key::A, Transition::To(Key::B))
            .set_entry(Key::A)
            .build();
        assert!(matches!(result, Err(GraphError::UnknownNode(_))));
    }

    #[test]
    fn test_build_valid_graph() {
        let graph = GraphBuilder::<Key, S0, ()>::new()
            .add_node(Key::A, Noop)
            .add_node(Key::B, Noop)
            .add_edge(Key::A, Transition::To(Key::B))
            .add_edge(Key::B, Transition::End)
            .set_entry(Key::A)
            .interrupt_before(Key::B)
            .build()
            .unwrap();
        assert_eq!(graph.entry(), Key::A);
        assert!(graph.should_interrupt_before(Key::B));
        assert!(!graph.should_interrupt_before(Key::A));
    }
}
