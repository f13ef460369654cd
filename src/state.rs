//! Snapshot container and the action reducer.
//!
//! A [`GraphContainer`] is never mutated. Every transition returns a fresh
//! snapshot that shares all untouched structure with its predecessor through
//! `Arc`; only the toggled node or the toggled category is copied.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::HierarchyConfig;
use crate::error::{GraphError, StateError};
use crate::graph::{compute_attributes, ConceptGraph, Node, NodeMap};
use crate::options::{CategoryKey, StatsOptions};
use crate::stats::{stats_rows, StatsRow};
use crate::types::{ConceptId, Diagnostics, GraphData, NodeId, SpecialConceptSet};
use crate::visibility::{project, Projection, VisibleRow};

/// Result type for state transitions
pub type StateResult<T> = Result<T, StateError>;

const CREATE: &str = "CREATE";
const TOGGLE_NODE_EXPANDED: &str = "TOGGLE_NODE_EXPANDED";
const TOGGLE_OPTION: &str = "TOGGLE_OPTION";

/// Actions accepted by [`reduce`].
///
/// Wire form is `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Build a new snapshot from a full payload.
    Create(Box<GraphData>),

    /// Flip one node's `expanded` flag.
    ToggleNodeExpanded {
        #[serde(rename = "nodeId")]
        node_id: NodeId,
    },

    /// Flip one category's enabled flag.
    ToggleOption {
        #[serde(rename = "type")]
        category: CategoryKey,
    },
}

#[derive(Deserialize)]
struct NodePayload {
    #[serde(rename = "nodeId")]
    node_id: NodeId,
}

#[derive(Deserialize)]
struct OptionPayload {
    #[serde(rename = "type")]
    category: CategoryKey,
}

impl Action {
    /// Decode an action from its JSON form.
    ///
    /// A `type` the reducer does not know is reported as
    /// [`StateError::UnknownAction`] rather than as a decode failure.
    pub fn from_value(value: Value) -> StateResult<Self> {
        let action_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let payload = value.get("payload").cloned().unwrap_or(Value::Null);

        // Payloads are decoded on their own so integer map keys inside them
        // are read straight from JSON regardless of field order.
        let decoded = match action_type.as_str() {
            CREATE => serde_json::from_value(payload).map(Action::Create),
            TOGGLE_NODE_EXPANDED => serde_json::from_value(payload)
                .map(|p: NodePayload| Action::ToggleNodeExpanded { node_id: p.node_id }),
            TOGGLE_OPTION => serde_json::from_value(payload)
                .map(|p: OptionPayload| Action::ToggleOption { category: p.category }),
            _ => return Err(StateError::UnknownAction { action_type }),
        };

        decoded.map_err(|source| StateError::InvalidPayload { action_type, source })
    }

    pub fn action_type(&self) -> &'static str {
        match self {
            Action::Create(_) => CREATE,
            Action::ToggleNodeExpanded { .. } => TOGGLE_NODE_EXPANDED,
            Action::ToggleOption { .. } => TOGGLE_OPTION,
        }
    }
}

/// One immutable snapshot: graph, node attributes, category descriptors and
/// the visible rows derived from them.
#[derive(Debug, Clone)]
pub struct GraphContainer {
    config: Arc<HierarchyConfig>,
    data: Arc<GraphData>,
    graph: Arc<ConceptGraph>,
    nodes: Arc<NodeMap>,
    options: Arc<StatsOptions>,
    projection: Arc<Projection>,
}

impl GraphContainer {
    /// Run the full pipeline over `data`.
    pub fn create(data: GraphData, config: Arc<HierarchyConfig>) -> Result<Self, GraphError> {
        let graph = ConceptGraph::build(&data.concepts, &data.edges)?;
        let nodes = compute_attributes(&graph, &data.concepts, &config.unlinked_label);
        let options = StatsOptions::classify(&config, &data, None);
        let projection = project(&graph, &nodes, &options);

        info!(
            concepts = data.concepts.len(),
            edges = data.edges.len(),
            roots = graph.roots().len(),
            categories = options.len(),
            rows = projection.rows.len(),
            "Concept graph created"
        );

        Ok(Self {
            config,
            data: Arc::new(data),
            graph: Arc::new(graph),
            nodes: Arc::new(nodes),
            options: Arc::new(options),
            projection: Arc::new(projection),
        })
    }

    /// New snapshot with one node's `expanded` flag flipped.
    pub fn toggle_node_expanded(&self, id: &NodeId) -> StateResult<Self> {
        let current = self
            .nodes
            .get(id)
            .ok_or(StateError::UnknownNode { id: *id })?;
        let toggled = Arc::new(current.toggled());
        debug!(node = %id, expanded = toggled.expanded, "Toggling node");

        // Clones the map's Arc entries, O(nodes) per toggle; node values
        // themselves stay shared with the previous snapshot.
        let mut nodes = Arc::clone(&self.nodes);
        Arc::make_mut(&mut nodes).insert(*id, toggled);

        Ok(self.reproject(nodes, Arc::clone(&self.options)))
    }

    /// New snapshot with one category's enabled flag flipped.
    ///
    /// A category that is not present in this snapshot leaves everything as
    /// it was.
    pub fn toggle_option(&self, key: &CategoryKey) -> Self {
        if self.options.get(key).is_none() {
            warn!(category = %key, "Category not present in snapshot, toggle ignored");
            return self.clone();
        }

        let mut options = Arc::clone(&self.options);
        Arc::make_mut(&mut options).toggle(key);
        debug!(category = %key, "Toggled category");

        self.reproject(Arc::clone(&self.nodes), options)
    }

    /// Re-classify against a different catalogue, keeping enabled flags and
    /// expansion state.
    pub fn with_config(&self, config: Arc<HierarchyConfig>) -> Self {
        let options = StatsOptions::classify(&config, &self.data, Some(&self.options));

        let mut nodes = Arc::clone(&self.nodes);
        if let Some(unlinked) = self.nodes.get(&NodeId::Unlinked) {
            if unlinked.concept.concept_name != config.unlinked_label {
                let mut relabeled = Node::clone(unlinked);
                Arc::make_mut(&mut relabeled.concept).concept_name = config.unlinked_label.clone();
                Arc::make_mut(&mut nodes).insert(NodeId::Unlinked, Arc::new(relabeled));
            }
        }

        Self {
            config,
            ..self.reproject(nodes, Arc::new(options))
        }
    }

    fn reproject(&self, nodes: Arc<NodeMap>, options: Arc<StatsOptions>) -> Self {
        let projection = Arc::new(project(&self.graph, &nodes, &options));
        Self {
            config: Arc::clone(&self.config),
            data: Arc::clone(&self.data),
            graph: Arc::clone(&self.graph),
            nodes,
            options,
            projection,
        }
    }

    pub fn visible_rows(&self) -> &[VisibleRow] {
        &self.projection.rows
    }

    /// Category table for the toggle controls.
    pub fn stats_options(&self) -> Vec<StatsRow> {
        stats_rows(&self.options, &self.projection)
    }

    pub fn options(&self) -> &StatsOptions {
        &self.options
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Ids listed by the traversal but dropped by a hide rule.
    pub fn hidden_by_rule(&self) -> &BTreeSet<NodeId> {
        &self.projection.hidden_by_rule
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(Arc::as_ref)
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn graph(&self) -> &ConceptGraph {
        &self.graph
    }

    pub fn roots(&self) -> &[NodeId] {
        self.graph.roots()
    }

    pub fn leaves(&self) -> &[NodeId] {
        self.graph.leaves()
    }

    pub fn unlinked_concepts(&self) -> &[NodeId] {
        self.graph.unlinked_concepts()
    }

    pub fn data(&self) -> &GraphData {
        &self.data
    }

    pub fn concept_ids(&self) -> &[ConceptId] {
        &self.data.concept_ids
    }

    pub fn special_concepts(&self) -> &SpecialConceptSet {
        &self.data.special_concepts
    }

    /// Passthrough lists, untouched by any computation.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.data.diagnostics
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }
}

/// Apply `action` to `state`.
///
/// CREATE ignores `state`; the toggles require one. `config` is only read by
/// CREATE, toggles keep the catalogue of the snapshot they start from.
pub fn reduce(
    state: Option<&GraphContainer>,
    action: Action,
    config: &Arc<HierarchyConfig>,
) -> StateResult<GraphContainer> {
    match action {
        Action::Create(data) => Ok(GraphContainer::create(*data, Arc::clone(config))?),
        Action::ToggleNodeExpanded { node_id } => state
            .ok_or(StateError::NotCreated)?
            .toggle_node_expanded(&node_id),
        Action::ToggleOption { category } => Ok(state
            .ok_or(StateError::NotCreated)?
            .toggle_option(&category)),
    }
}

/// Holds the current snapshot and runs dispatched actions one at a time.
///
/// A rejected action leaves the current snapshot in place.
#[derive(Debug, Default)]
pub struct GraphStore {
    config: Arc<HierarchyConfig>,
    current: Option<Arc<GraphContainer>>,
}

impl GraphStore {
    pub fn new(config: HierarchyConfig) -> Self {
        Self {
            config: Arc::new(config),
            current: None,
        }
    }

    pub fn dispatch(&mut self, action: Action) -> StateResult<Arc<GraphContainer>> {
        let action_type = action.action_type();

        let next = match reduce(self.current.as_deref(), action, &self.config) {
            Ok(next) => Arc::new(next),
            Err(e) => {
                warn!(action = action_type, code = e.code(), error = %e, "Action rejected");
                return Err(e);
            }
        };

        debug!(
            action = action_type,
            rows = next.visible_rows().len(),
            "Action applied"
        );
        self.current = Some(Arc::clone(&next));
        Ok(next)
    }

    /// Decode and dispatch an action in its `{type, payload}` form.
    pub fn dispatch_json(&mut self, value: Value) -> StateResult<Arc<GraphContainer>> {
        let action = Action::from_value(value).inspect_err(|e| {
            warn!(code = e.code(), error = %e, "Action rejected");
        })?;
        self.dispatch(action)
    }

    pub fn current(&self) -> Option<&Arc<GraphContainer>> {
        self.current.as_ref()
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Swap the catalogue. The current snapshot, if any, is re-classified
    /// against it.
    pub fn set_config(&mut self, config: HierarchyConfig) {
        self.config = Arc::new(config);
        if let Some(current) = &self.current {
            let next = current.with_config(Arc::clone(&self.config));
            self.current = Some(Arc::new(next));
        }
    }
}
