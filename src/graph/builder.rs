//! ConceptGraph - directed concept hierarchy
//!
//! Builds the graph from the payload's concept and edge lists:
//! - one node per concept, in payload order
//! - one edge per `[parent, child]` pair, rejecting self-loops, repeats and
//!   dangling endpoints
//! - concepts with neither parents nor children are adopted by a synthetic
//!   `unlinked` root, after which roots and leaves are recomputed
//! - the result must be acyclic

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

use crate::error::{GraphError, InvalidEdgeReason};
use crate::types::{Concept, ConceptId, Edge, NodeId};

/// Immutable concept DAG shared by every snapshot created from one payload.
#[derive(Debug, Clone)]
pub struct ConceptGraph {
    graph: DiGraph<NodeId, ()>,
    index: HashMap<NodeId, NodeIndex>,
    roots: Vec<NodeId>,
    leaves: Vec<NodeId>,
    unlinked: Vec<NodeId>,
    /// Children before parents; drives the attribute pass.
    bottom_up: Vec<NodeIndex>,
}

impl ConceptGraph {
    /// Build the graph, attaching unlinked concepts to the synthetic root.
    pub fn build(concepts: &[Concept], edges: &[Edge]) -> Result<Self, GraphError> {
        let mut graph = DiGraph::with_capacity(concepts.len() + 1, edges.len());
        let mut index = HashMap::with_capacity(concepts.len() + 1);

        for concept in concepts {
            let id = NodeId::Concept(concept.concept_id);
            if index.contains_key(&id) {
                return Err(GraphError::DuplicateNode { id });
            }
            index.insert(id, graph.add_node(id));
        }

        let mut seen: HashSet<(ConceptId, ConceptId)> = HashSet::with_capacity(edges.len());
        for edge in edges {
            let (parent, child) = (NodeId::Concept(edge.parent()), NodeId::Concept(edge.child()));
            let invalid = |reason| GraphError::InvalidEdge {
                parent,
                child,
                reason,
            };

            if parent == child {
                return Err(invalid(InvalidEdgeReason::SelfLoop));
            }
            let from = *index.get(&parent).ok_or_else(|| {
                invalid(InvalidEdgeReason::UnknownEndpoint { missing: parent })
            })?;
            let to = *index
                .get(&child)
                .ok_or_else(|| invalid(InvalidEdgeReason::UnknownEndpoint { missing: child }))?;
            if !seen.insert((edge.parent(), edge.child())) {
                return Err(invalid(InvalidEdgeReason::DuplicateEdge));
            }
            graph.add_edge(from, to, ());
        }

        let mut built = Self {
            graph,
            index,
            roots: Vec::new(),
            leaves: Vec::new(),
            unlinked: Vec::new(),
            bottom_up: Vec::new(),
        };
        built.refresh_ends();

        // Concepts that are both a root and a leaf have no edges at all.
        let leaves: HashSet<NodeId> = built.leaves.iter().copied().collect();
        built.unlinked = built
            .roots
            .iter()
            .copied()
            .filter(|id| leaves.contains(id))
            .collect();

        if !built.unlinked.is_empty() {
            let root = built.graph.add_node(NodeId::Unlinked);
            built.index.insert(NodeId::Unlinked, root);
            for id in &built.unlinked {
                let child = built.index[id];
                built.graph.add_edge(root, child, ());
            }
            built.refresh_ends();
        }

        let mut order = toposort(&built.graph, None).map_err(|cycle| GraphError::Cycle {
            node: built.graph[cycle.node_id()],
        })?;
        order.reverse();
        built.bottom_up = order;

        debug!(
            nodes = built.node_count(),
            edges = built.edge_count(),
            roots = built.roots.len(),
            unlinked = built.unlinked.len(),
            "Concept graph built"
        );

        Ok(built)
    }

    fn refresh_ends(&mut self) {
        let graph = &self.graph;
        let has = |ix: NodeIndex, dir: Direction| graph.neighbors_directed(ix, dir).next().is_some();

        self.roots = graph
            .node_indices()
            .filter(|&ix| !has(ix, Direction::Incoming))
            .map(|ix| graph[ix])
            .collect();
        self.leaves = graph
            .node_indices()
            .filter(|&ix| !has(ix, Direction::Outgoing))
            .map(|ix| graph[ix])
            .collect();
    }

    /// Nodes with no incoming edges, in node order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Nodes with no outgoing edges, in node order.
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// Concepts that arrived with no edges and now hang off `unlinked`.
    pub fn unlinked_concepts(&self) -> &[NodeId] {
        &self.unlinked
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All node ids in insertion order (concepts, then `unlinked`).
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices().map(|ix| self.graph[ix])
    }

    /// Node ids ordered so that every child precedes all of its parents.
    pub fn bottom_up(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.bottom_up.iter().map(|&ix| self.graph[ix])
    }

    /// Direct children in edge insertion order.
    pub fn children(&self, id: &NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct parents in edge insertion order.
    pub fn parents(&self, id: &NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &NodeId, dir: Direction) -> Vec<NodeId> {
        let Some(&ix) = self.index.get(id) else {
            return Vec::new();
        };
        self.neighbor_indices(ix, dir)
            .into_iter()
            .map(|n| self.graph[n])
            .collect()
    }

    fn neighbor_indices(&self, ix: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        // petgraph lists the most recently added edge first
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(ix, dir).collect();
        out.reverse();
        out
    }

    /// Shortest directed path `from ..= to`, or `None` when `to` is not
    /// reachable from `from`.
    ///
    /// Breadth-first over children in edge order, so among equally short
    /// paths the one through the earliest edges wins.
    pub fn shortest_path(&self, from: &NodeId, to: &NodeId) -> Option<Vec<NodeId>> {
        let start = *self.index.get(from)?;
        let goal = *self.index.get(to)?;

        let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(ix) = queue.pop_front() {
            if ix == goal {
                let mut path = vec![self.graph[goal]];
                let mut at = goal;
                while let Some(&prev) = came_from.get(&at) {
                    path.push(self.graph[prev]);
                    at = prev;
                }
                path.reverse();
                return Some(path);
            }
            for next in self.neighbor_indices(ix, Direction::Outgoing) {
                if seen.insert(next) {
                    came_from.insert(next, ix);
                    queue.push_back(next);
                }
            }
        }

        None
    }
}
