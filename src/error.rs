//! Error types.

use crate::types::NodeId;
use thiserror::Error;

/// Why an edge was rejected during graph construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidEdgeReason {
    /// Parent and child are the same concept.
    SelfLoop,
    /// The same (parent, child) pair appeared earlier in the edge list.
    DuplicateEdge,
    /// One endpoint is not in the concept list.
    UnknownEndpoint { missing: NodeId },
}

impl std::fmt::Display for InvalidEdgeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfLoop => write!(f, "self-loop"),
            Self::DuplicateEdge => write!(f, "duplicate edge"),
            Self::UnknownEndpoint { missing } => write!(f, "unknown endpoint {}", missing),
        }
    }
}

/// Errors raised while building the concept graph.
///
/// All of these abort snapshot creation; no partial graph is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The concept list contains the same id twice.
    #[error("Duplicate node: concept {id} appears more than once")]
    DuplicateNode {
        /// Repeated concept id.
        id: NodeId,
    },

    /// An edge cannot be added to the graph.
    #[error("Invalid edge {parent} -> {child}: {reason}")]
    InvalidEdge {
        parent: NodeId,
        child: NodeId,
        reason: InvalidEdgeReason,
    },

    /// The edges do not form a DAG.
    #[error("Cycle detected in concept graph at node {node}")]
    Cycle {
        /// A node that lies on a cycle.
        node: NodeId,
    },
}

impl GraphError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateNode { .. } => "DUPLICATE_NODE",
            Self::InvalidEdge {
                reason: InvalidEdgeReason::SelfLoop,
                ..
            } => "SELF_LOOP",
            Self::InvalidEdge {
                reason: InvalidEdgeReason::DuplicateEdge,
                ..
            } => "DUPLICATE_EDGE",
            Self::InvalidEdge {
                reason: InvalidEdgeReason::UnknownEndpoint { .. },
                ..
            } => "UNKNOWN_ENDPOINT",
            Self::Cycle { .. } => "CYCLE_DETECTED",
        }
    }
}

/// Errors raised by the reducer.
///
/// A failed transition leaves no new snapshot behind; callers keep whatever
/// snapshot they already held.
#[derive(Debug, Error)]
pub enum StateError {
    /// CREATE payload could not be turned into a graph.
    #[error("Graph construction failed: {0}")]
    Construction(#[from] GraphError),

    /// Action type is not one the reducer handles.
    #[error("Unknown action type '{action_type}'")]
    UnknownAction { action_type: String },

    /// Node toggle names a node that is not in the graph.
    #[error("Unknown node {id}")]
    UnknownNode { id: NodeId },

    /// A toggle was dispatched before any CREATE.
    #[error("No graph has been created yet")]
    NotCreated,

    /// Action type is known but its payload does not decode.
    #[error("Invalid payload for {action_type}: {source}")]
    InvalidPayload {
        action_type: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StateError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Construction(e) => e.code(),
            Self::UnknownAction { .. } => "UNKNOWN_ACTION",
            Self::UnknownNode { .. } => "UNKNOWN_NODE",
            Self::NotCreated => "NOT_CREATED",
            Self::InvalidPayload { .. } => "INVALID_PAYLOAD",
        }
    }
}
