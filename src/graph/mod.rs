//! Concept graph construction and per-node attributes.
//!
//! `builder` turns concepts and edges into a validated DAG with an
//! `unlinked` root; `attributes` runs the memoized descendant pass over it.

pub mod attributes;
pub mod builder;

pub use attributes::{compute_attributes, Node, NodeMap};
pub use builder::ConceptGraph;
