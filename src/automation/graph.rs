//! Item graphs and their conversion into an execution order
//!
//! The node editor lets users wire items together, with condition nodes
//! branching on whether their template was found. Before a plain run the
//! graph is flattened with [`SequenceGraph::linearize`]; [`SequenceGraph::next_node`]
//! answers the branch question for graph runs.

use super::error::GraphError;
use super::item::{Item, Sequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    #[default]
    Normal,
    /// Branches on its match result through `Success`/`Failure` edges
    Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeTag {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    /// `None` for normal nodes, `Some` for condition nodes
    pub tag: Option<EdgeTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub item: Item,
    pub kind: NodeKind,
}

/// How the step at a node went, as far as branching cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Matched,
    Missed,
    /// Disabled node, passed through without matching
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<Edge>,
}

impl SequenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph where every item is a normal node chained to the next one
    pub fn chain(sequence: Sequence) -> Self {
        let mut graph = Self::new();
        let mut previous: Option<NodeId> = None;
        for item in sequence.into_items() {
            let id = graph.add_node(item, NodeKind::Normal);
            if let Some(prev) = previous {
                graph.edges.push(Edge {
                    from: prev,
                    to: id,
                    tag: None,
                });
            }
            previous = Some(id);
        }
        graph
    }

    pub fn add_node(&mut self, item: Item, kind: NodeKind) -> NodeId {
        self.nodes.push(GraphNode { item, kind });
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Add an edge, enforcing the tagging rules of the source node's kind
    pub fn connect(&mut self, from: NodeId, to: NodeId, tag: Option<EdgeTag>) -> Result<(), GraphError> {
        let source = self.node(from).ok_or(GraphError::UnknownNode { id: from })?;
        if self.node(to).is_none() {
            return Err(GraphError::UnknownNode { id: to });
        }
        if from == to {
            return Err(GraphError::SelfLoop { id: from });
        }
        match (source.kind, tag) {
            (NodeKind::Normal, Some(_)) => return Err(GraphError::TaggedEdgeFromNormal { id: from }),
            (NodeKind::Condition, None) => {
                return Err(GraphError::UntaggedEdgeFromCondition { id: from });
            }
            _ => {}
        }
        if self.outgoing(from).any(|edge| edge.tag == tag) {
            return Err(GraphError::DuplicateEdge { id: from, tag });
        }

        self.edges.push(Edge { from, to, tag });
        Ok(())
    }

    /// Remove the edge `from -> to`, returning whether one existed
    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> bool {
        let before = self.edges.len();
        self.edges.retain(|edge| !(edge.from == from && edge.to == to));
        self.edges.len() != before
    }

    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |edge| edge.from == id)
    }

    /// Nodes without inbound edges, in insertion order
    pub fn roots(&self) -> Vec<NodeId> {
        let mut has_inbound = vec![false; self.nodes.len()];
        for edge in &self.edges {
            has_inbound[edge.to.0] = true;
        }
        self.node_ids().filter(|id| !has_inbound[id.0]).collect()
    }

    /// Execution order: reversed depth-first post-order from every root, then
    /// from any node no root reached. Each node appears exactly once; cycles
    /// are cut where the traversal first meets an already visited node.
    pub fn linearize_ids(&self) -> Vec<NodeId> {
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            adjacency[edge.from.0].push(edge.to.0);
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut post_order = Vec::with_capacity(self.nodes.len());

        let starts = self.roots().into_iter().chain(self.node_ids());
        for start in starts {
            if visited[start.0] {
                continue;
            }
            visited[start.0] = true;
            let mut stack: Vec<(usize, usize)> = vec![(start.0, 0)];
            while let Some(top) = stack.len().checked_sub(1) {
                let (node, next_edge) = stack[top];
                if let Some(&child) = adjacency[node].get(next_edge) {
                    stack[top].1 += 1;
                    if !visited[child] {
                        visited[child] = true;
                        stack.push((child, 0));
                    }
                } else {
                    post_order.push(NodeId(node));
                    stack.pop();
                }
            }
        }

        post_order.reverse();
        post_order
    }

    /// Flatten into a plain sequence for the linear runner
    pub fn linearize(&self) -> Sequence {
        self.linearize_ids()
            .into_iter()
            .map(|id| self.nodes[id.0].item.clone())
            .collect()
    }

    /// First node of the default ordering
    pub fn entry(&self) -> Option<NodeId> {
        self.linearize_ids().first().copied()
    }

    /// Where a graph run goes after `id`.
    ///
    /// Condition nodes follow `Success` on a match and `Failure` on a miss;
    /// a skipped condition node counts as passed. Normal nodes always follow
    /// their untagged edge. `None` ends the current path.
    pub fn next_node(&self, id: NodeId, result: StepResult) -> Option<NodeId> {
        let node = self.node(id)?;
        let wanted = match node.kind {
            NodeKind::Normal => None,
            NodeKind::Condition => match result {
                StepResult::Matched | StepResult::Skipped => Some(EdgeTag::Success),
                StepResult::Missed => Some(EdgeTag::Failure),
            },
        };
        self.outgoing(id)
            .find(|edge| edge.tag == wanted)
            .map(|edge| edge.to)
    }
}
