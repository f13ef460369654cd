//! Concept Hierarchy Projection
//!
//! Turns a concept-set comparison dataset into a collapsible, ordered list of
//! rows over the concept DAG.
//!
//! # Pipeline
//!
//! ```text
//! GraphData ──► ConceptGraph::build ──► compute_attributes ──► StatsOptions::classify ──► project
//!               (GraphBuilder)          (AttributeComputer)    (OverrideClassifier)       (VisibilityEngine)
//! ```
//!
//! A [`GraphContainer`] is one immutable snapshot of that pipeline. Actions go
//! through [`reduce`] (or a [`GraphStore`]) and always produce a new snapshot;
//! unchanged structure is shared by `Arc` between snapshots.
//!
//! # Example
//!
//! ```
//! use cset_hierarchy::{Action, Concept, Edge, GraphData, GraphStore, NodeId};
//!
//! let data = GraphData::new(
//!     vec![Concept::new(1, "Diabetes"), Concept::new(2, "Type 2 diabetes")],
//!     vec![Edge(1, 2)],
//! );
//!
//! let mut store = GraphStore::default();
//! store.dispatch(Action::Create(Box::new(data))).unwrap();
//! let gc = store
//!     .dispatch(Action::ToggleNodeExpanded { node_id: NodeId::Concept(1) })
//!     .unwrap();
//!
//! let ids: Vec<_> = gc.visible_rows().iter().map(|r| r.id()).collect();
//! assert_eq!(ids, vec![NodeId::Concept(1), NodeId::Concept(2)]);
//! ```

pub mod config;
mod error;
pub mod graph;
pub mod options;
pub mod state;
pub mod stats;
pub mod types;
pub mod visibility;

// Re-exports
pub use config::{CategoryDef, CountSource, HierarchyConfig};
pub use error::{GraphError, InvalidEdgeReason, StateError};
pub use graph::{compute_attributes, ConceptGraph, Node, NodeMap};
pub use options::{CategoryKey, StatsOption, StatsOptions, TreatmentRule};
pub use state::{reduce, Action, GraphContainer, GraphStore};
pub use stats::StatsRow;
pub use types::{
    Concept, ConceptId, CsmiEntry, Diagnostics, Edge, GraphData, NodeId, SpecialConceptSet,
};
pub use visibility::{project, Projection, VisibleRow};
