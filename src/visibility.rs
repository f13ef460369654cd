//! Visible row projection.
//!
//! Walks the concept DAG from its roots and lists the rows a reader sees:
//! 1. every root, then the children of every expanded row, depth first
//! 2. under a collapsed row, members of enabled show-though-collapsed
//!    categories that the row can reach, each placed once per projection
//! 3. finally, rows belonging to enabled hide-though-expanded categories are
//!    removed; anything listed beneath them stays

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::graph::{ConceptGraph, Node, NodeMap};
use crate::options::StatsOptions;
use crate::types::NodeId;

/// One row of the projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleRow {
    #[serde(flatten)]
    pub node: Arc<Node>,

    /// Indentation level; roots are 0.
    pub depth: usize,

    /// Set only for rows placed by a show-though-collapsed rule: the
    /// shortest path from the collapsed row that placed this one down to
    /// (but excluding) this row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<Vec<NodeId>>,
}

impl VisibleRow {
    pub fn id(&self) -> NodeId {
        self.node.id
    }
}

/// Result of one projection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Projection {
    pub rows: Vec<VisibleRow>,

    /// Ids that were listed but removed by a hide-though-expanded rule.
    pub hidden_by_rule: BTreeSet<NodeId>,
}

impl Projection {
    pub fn row_ids(&self) -> Vec<NodeId> {
        self.rows.iter().map(VisibleRow::id).collect()
    }
}

/// Project the graph into visible rows.
pub fn project(graph: &ConceptGraph, nodes: &NodeMap, options: &StatsOptions) -> Projection {
    let pending_order = options.show_ids();
    let mut walk = Traversal {
        graph,
        nodes,
        pending: pending_order.iter().copied().collect(),
        pending_order,
        rows: Vec::new(),
    };

    for root in walk.sorted(graph.roots()) {
        walk.visit(root, 0);
    }

    let mut rows = walk.rows;
    let listed: HashSet<NodeId> = rows.iter().map(VisibleRow::id).collect();
    let hidden_by_rule: BTreeSet<NodeId> = options
        .hide_ids()
        .into_iter()
        .filter(|id| listed.contains(id))
        .collect();
    rows.retain(|row| !hidden_by_rule.contains(&row.id()));

    debug!(
        rows = rows.len(),
        hidden = hidden_by_rule.len(),
        unplaced = walk.pending.len(),
        "Projection computed"
    );

    Projection {
        rows,
        hidden_by_rule,
    }
}

struct Traversal<'a> {
    graph: &'a ConceptGraph,
    nodes: &'a NodeMap,
    /// Show-though-collapsed ids not yet listed
    pending: HashSet<NodeId>,
    pending_order: Vec<NodeId>,
    rows: Vec<VisibleRow>,
}

impl<'a> Traversal<'a> {
    /// Stable order with prioritized nodes first.
    fn sorted(&self, ids: &[NodeId]) -> Vec<NodeId> {
        let mut ids = ids.to_vec();
        ids.sort_by_key(|id| !self.nodes.get(id).is_some_and(|n| n.has_priority()));
        ids
    }

    fn push(&mut self, node: &Arc<Node>, depth: usize, breadcrumb: Option<Vec<NodeId>>) {
        self.pending.remove(&node.id);
        self.rows.push(VisibleRow {
            node: Arc::clone(node),
            depth,
            breadcrumb,
        });
    }

    fn visit(&mut self, id: NodeId, depth: usize) {
        let nodes = self.nodes;
        let Some(node) = nodes.get(&id) else {
            return;
        };

        self.push(node, depth, None);
        if node.expanded {
            self.visit_children(node, depth + 1);
        } else {
            self.place_pending(node, depth);
        }
    }

    fn visit_children(&mut self, node: &Node, depth: usize) {
        for child in self.sorted(&node.children) {
            self.visit(child, depth);
        }
    }

    /// List pending show-though-collapsed ids reachable from the collapsed
    /// `anchor` one level below it.
    fn place_pending(&mut self, anchor: &Node, depth: usize) {
        if self.pending.is_empty() || anchor.descendants.is_empty() {
            return;
        }
        let nodes = self.nodes;
        let candidates: Vec<NodeId> = self
            .pending_order
            .iter()
            .filter(|id| self.pending.contains(*id))
            .copied()
            .collect();

        for target in candidates {
            // an earlier placement may already have listed it
            if !self.pending.contains(&target) {
                continue;
            }
            if anchor.descendants.binary_search(&target).is_err() {
                trace!(anchor = %anchor.id, %target, "Target not below anchor");
                continue;
            }
            let Some(path) = self.graph.shortest_path(&anchor.id, &target) else {
                continue;
            };
            let Some(node) = nodes.get(&target) else {
                continue;
            };

            let breadcrumb = path[..path.len() - 1].to_vec();
            self.push(node, depth + 1, Some(breadcrumb));
            if node.expanded {
                self.visit_children(node, depth + 2);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HierarchyConfig;
    use crate::graph::compute_attributes;
    use crate::options::CategoryKey;
    use crate::types::{Concept, ConceptId, Edge, GraphData, SpecialConceptSet};

    fn c(id: ConceptId) -> NodeId {
        NodeId::Concept(id)
    }

    struct Fixture {
        graph: ConceptGraph,
        nodes: NodeMap,
        options: StatsOptions,
    }

    impl Fixture {
        fn new(ids: &[ConceptId], edges: &[Edge], special: SpecialConceptSet) -> Self {
            let concepts: Vec<Concept> =
                ids.iter().map(|&id| Concept::new(id, format!("C{}", id))).collect();
            let data = GraphData::new(concepts, edges.to_vec()).with_special_concepts(special);
            let graph = ConceptGraph::build(&data.concepts, &data.edges).unwrap();
            let nodes = compute_attributes(&graph, &data.concepts, "Unlinked");
            let options = StatsOptions::classify(&HierarchyConfig::default(), &data, None);
            Self {
                graph,
                nodes,
                options,
            }
        }

        fn expand(&mut self, id: ConceptId) -> &mut Self {
            let toggled = self.nodes[&c(id)].toggled();
            self.nodes.insert(c(id), Arc::new(toggled));
            self
        }

        fn enable(&mut self, key: &str) -> &mut Self {
            assert!(self.options.toggle(&CategoryKey::new(key)));
            self
        }

        fn rows(&self) -> Vec<(NodeId, usize)> {
            project(&self.graph, &self.nodes, &self.options)
                .rows
                .iter()
                .map(|r| (r.id(), r.depth))
                .collect()
        }
    }

    #[test]
    fn test_collapsed_roots_only() {
        let fx = Fixture::new(&[1, 2, 3], &[Edge(1, 2), Edge(1, 3)], SpecialConceptSet::new());
        assert_eq!(fx.rows(), vec![(c(1), 0)]);
    }

    #[test]
    fn test_expanded_lists_children() {
        let mut fx = Fixture::new(
            &[1, 2, 3, 4],
            &[Edge(1, 2), Edge(1, 3), Edge(3, 4)],
            SpecialConceptSet::new(),
        );
        fx.expand(1);
        // 3 has children, so it sorts ahead of leaf 2
        assert_eq!(fx.rows(), vec![(c(1), 0), (c(3), 1), (c(2), 1)]);

        fx.expand(3);
        assert_eq!(fx.rows(), vec![(c(1), 0), (c(3), 1), (c(4), 2), (c(2), 1)]);
    }

    #[test]
    fn test_show_though_collapsed_breadcrumb() {
        let mut fx = Fixture::new(
            &[1, 2, 3, 4],
            &[Edge(1, 2), Edge(1, 3), Edge(3, 4)],
            SpecialConceptSet::new().with("added", vec![3]),
        );
        fx.enable("added");

        let projection = project(&fx.graph, &fx.nodes, &fx.options);
        assert_eq!(projection.row_ids(), vec![c(1), c(3)]);
        assert_eq!(projection.rows[1].depth, 1);
        assert_eq!(projection.rows[1].breadcrumb, Some(vec![c(1)]));
        assert_eq!(projection.rows[0].breadcrumb, None);
    }

    #[test]
    fn test_deep_target_breadcrumb_holds_path() {
        let mut fx = Fixture::new(
            &[1, 2, 3, 4],
            &[Edge(1, 2), Edge(2, 3), Edge(3, 4)],
            SpecialConceptSet::new().with("added", vec![4]),
        );
        fx.enable("added");

        let projection = project(&fx.graph, &fx.nodes, &fx.options);
        assert_eq!(projection.row_ids(), vec![c(1), c(4)]);
        assert_eq!(projection.rows[1].depth, 1);
        assert_eq!(projection.rows[1].breadcrumb, Some(vec![c(1), c(2), c(3)]));
    }

    #[test]
    fn test_placed_node_expanded_recurses_two_levels_down() {
        let mut fx = Fixture::new(
            &[1, 2, 3, 4],
            &[Edge(1, 2), Edge(1, 3), Edge(3, 4)],
            SpecialConceptSet::new().with("added", vec![3]),
        );
        fx.enable("added").expand(3);
        assert_eq!(fx.rows(), vec![(c(1), 0), (c(3), 1), (c(4), 2)]);
    }

    #[test]
    fn test_shared_target_placed_once() {
        // diamond: 4 reachable from both 2 and 3
        let mut fx = Fixture::new(
            &[1, 2, 3, 4],
            &[Edge(1, 2), Edge(1, 3), Edge(2, 4), Edge(3, 4)],
            SpecialConceptSet::new().with("added", vec![4]),
        );
        fx.enable("added").expand(1);

        let rows = fx.rows();
        assert_eq!(rows.iter().filter(|(id, _)| *id == c(4)).count(), 1);
        assert_eq!(rows, vec![(c(1), 0), (c(2), 1), (c(4), 2), (c(3), 1)]);
    }

    #[test]
    fn test_unreachable_target_skipped() {
        let mut fx = Fixture::new(
            &[1, 2, 3, 4],
            &[Edge(1, 2), Edge(3, 4)],
            SpecialConceptSet::new().with("added", vec![4]),
        );
        fx.enable("added");
        // not reachable from 1, but placed under root 3
        assert_eq!(fx.rows(), vec![(c(1), 0), (c(3), 0), (c(4), 1)]);
    }

    #[test]
    fn test_root_target_listed_once() {
        let mut fx = Fixture::new(
            &[1, 2, 3],
            &[Edge(1, 2), Edge(3, 2)],
            SpecialConceptSet::new().with("added", vec![1]),
        );
        fx.enable("added");
        // 1 is itself a root; listing it consumes the pending entry
        assert_eq!(fx.rows(), vec![(c(1), 0), (c(3), 0)]);
    }

    #[test]
    fn test_target_reachable_from_nowhere_is_absent() {
        let mut fx = Fixture::new(
            &[1, 2],
            &[Edge(1, 2)],
            SpecialConceptSet::new().with("added", vec![99]),
        );
        fx.enable("added");
        assert_eq!(fx.rows(), vec![(c(1), 0)]);
    }

    #[test]
    fn test_hide_removes_row_but_keeps_descendants() {
        let mut fx = Fixture::new(
            &[1, 2, 3, 4],
            &[Edge(1, 2), Edge(2, 3), Edge(1, 4)],
            SpecialConceptSet::new().with("zeroRecord", vec![2]),
        );
        fx.expand(1).expand(2).enable("zeroRecord");

        let projection = project(&fx.graph, &fx.nodes, &fx.options);
        assert_eq!(projection.row_ids(), vec![c(1), c(3), c(4)]);
        assert_eq!(projection.hidden_by_rule, BTreeSet::from([c(2)]));
        // depth is kept from the traversal
        assert_eq!(projection.rows[1].depth, 2);
    }

    #[test]
    fn test_hide_ignores_unlisted_members() {
        let mut fx = Fixture::new(
            &[1, 2],
            &[Edge(1, 2)],
            SpecialConceptSet::new().with("zeroRecord", vec![2]),
        );
        fx.enable("zeroRecord");

        let projection = project(&fx.graph, &fx.nodes, &fx.options);
        assert!(projection.hidden_by_rule.is_empty());
        assert_eq!(projection.row_ids(), vec![c(1)]);
    }

    #[test]
    fn test_hide_wins_over_show() {
        let mut fx = Fixture::new(
            &[1, 2, 3],
            &[Edge(1, 2), Edge(2, 3)],
            SpecialConceptSet::new()
                .with("added", vec![2])
                .with("nonStandard", vec![2]),
        );
        fx.enable("added").enable("nonStandard");

        let projection = project(&fx.graph, &fx.nodes, &fx.options);
        assert_eq!(projection.row_ids(), vec![c(1)]);
        assert_eq!(projection.hidden_by_rule, BTreeSet::from([c(2)]));
    }

    #[test]
    fn test_unlinked_root_listed() {
        let mut fx = Fixture::new(&[1, 2, 5], &[Edge(1, 2)], SpecialConceptSet::new());
        assert_eq!(fx.rows(), vec![(c(1), 0), (NodeId::Unlinked, 0)]);

        let toggled = fx.nodes[&NodeId::Unlinked].toggled();
        fx.nodes.insert(NodeId::Unlinked, Arc::new(toggled));
        assert_eq!(
            fx.rows(),
            vec![(c(1), 0), (NodeId::Unlinked, 0), (c(5), 1)]
        );
    }
}
