//! Per-node attributes derived from the graph shape.
//!
//! The concept graph is a DAG, so a node can be reached through many parents.
//! Attributes are computed once per node, children before parents, and every
//! parent reads its children's finished results out of the arena instead of
//! recursing into them again.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::builder::ConceptGraph;
use crate::types::{Concept, NodeId};

/// Node id → node. Values are shared between snapshots; a toggle replaces
/// only the entry it touches.
pub type NodeMap = HashMap<NodeId, Arc<Node>>;

/// A concept together with its computed hierarchy attributes.
///
/// Serializes as one flat record: the concept's fields followed by the
/// attributes. `concept_id` is written from the node id, so the synthetic
/// root reads `"unlinked"` and never collides with a real concept 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,

    pub concept: Arc<Concept>,

    /// Whether direct children are shown. Never set automatically.
    pub expanded: bool,

    /// 0 for leaves, otherwise 1 + the deepest child's value
    pub levels_below: usize,

    /// Size of the deduplicated descendant set
    pub descendant_count: usize,

    /// Every node reachable below this one, sorted, no repeats
    pub descendants: Arc<[NodeId]>,

    /// Direct children in edge order
    pub children: Arc<[NodeId]>,

    pub child_count: usize,

    /// Own `total_cnt` plus the `total_cnt` of every descendant
    pub drc: u64,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Rank used when ordering siblings: nodes with something underneath
    /// them, or with a status, are listed first.
    pub fn has_priority(&self) -> bool {
        self.levels_below > 0 || self.descendant_count > 0 || !self.concept.status.is_empty()
    }

    /// Copy of this node with `expanded` flipped.
    pub fn toggled(&self) -> Self {
        Self {
            expanded: !self.expanded,
            ..self.clone()
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let concept = &self.concept;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("concept_id", &self.id)?;
        map.serialize_entry("concept_name", &concept.concept_name)?;
        map.serialize_entry("vocabulary_id", &concept.vocabulary_id)?;
        map.serialize_entry("standard_concept", &concept.standard_concept)?;
        map.serialize_entry("total_cnt", &concept.total_cnt)?;
        map.serialize_entry("distinct_person_cnt", &concept.distinct_person_cnt)?;
        map.serialize_entry("status", &concept.status)?;
        map.serialize_entry("expanded", &self.expanded)?;
        map.serialize_entry("levels_below", &self.levels_below)?;
        map.serialize_entry("descendant_count", &self.descendant_count)?;
        map.serialize_entry("descendants", &self.descendants)?;
        map.serialize_entry("children", &self.children)?;
        map.serialize_entry("child_count", &self.child_count)?;
        map.serialize_entry("drc", &self.drc)?;
        map.end()
    }
}

/// Compute attributes for every node in `graph`.
///
/// `concepts` must be the list the graph was built from. The synthetic
/// `unlinked` root gets a placeholder concept named `unlinked_label` with
/// zero counts.
pub fn compute_attributes(
    graph: &ConceptGraph,
    concepts: &[Concept],
    unlinked_label: &str,
) -> NodeMap {
    let mut records: HashMap<NodeId, Arc<Concept>> = concepts
        .iter()
        .map(|c| (NodeId::Concept(c.concept_id), Arc::new(c.clone())))
        .collect();
    records.insert(
        NodeId::Unlinked,
        Arc::new(Concept::unlinked_placeholder(unlinked_label)),
    );

    let mut arena: NodeMap = HashMap::with_capacity(graph.node_count());

    for id in graph.bottom_up() {
        let children = graph.children(&id);
        let mut levels_below = 0;
        let mut descendants = BTreeSet::new();

        for child in &children {
            // bottom-up order guarantees the child is already in the arena
            let done = &arena[child];
            levels_below = levels_below.max(1 + done.levels_below);
            descendants.insert(*child);
            descendants.extend(done.descendants.iter().copied());
        }

        let concept = Arc::clone(&records[&id]);
        let drc = concept.total_cnt
            + descendants
                .iter()
                .map(|d| arena[d].concept.total_cnt)
                .sum::<u64>();

        let node = Node {
            id,
            concept,
            expanded: false,
            levels_below,
            descendant_count: descendants.len(),
            descendants: descendants.into_iter().collect(),
            child_count: children.len(),
            children: children.into(),
            drc,
        };
        arena.insert(id, Arc::new(node));
    }

    arena
}
