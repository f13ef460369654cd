//! Input records supplied by the data-fetch layer.
//!
//! These mirror the comparison payload field for field, so a payload fetched
//! as JSON deserializes straight into [`GraphData`].

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Vocabulary concept identifier.
pub type ConceptId = i64;

/// Wire name of the synthetic root that adopts unlinked concepts.
pub const UNLINKED_ID: &str = "unlinked";

// =============================================================================
// NODE ID
// =============================================================================

/// Identity of a node in the concept graph.
///
/// Every node is either a real concept or the single synthetic root that
/// adopts concepts with no parents and no children. On the wire a concept is
/// a number and the synthetic root is the string `"unlinked"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    /// A concept from the dataset.
    Concept(ConceptId),
    /// The synthetic parent of unlinked concepts.
    Unlinked,
}

impl NodeId {
    /// The concept id, if this is a real concept.
    pub fn concept_id(&self) -> Option<ConceptId> {
        match self {
            NodeId::Concept(id) => Some(*id),
            NodeId::Unlinked => None,
        }
    }

    pub fn is_unlinked(&self) -> bool {
        matches!(self, NodeId::Unlinked)
    }
}

impl From<ConceptId> for NodeId {
    fn from(id: ConceptId) -> Self {
        NodeId::Concept(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Concept(id) => write!(f, "{}", id),
            NodeId::Unlinked => f.write_str(UNLINKED_ID),
        }
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == UNLINKED_ID {
            return Ok(NodeId::Unlinked);
        }
        s.trim().parse::<ConceptId>().map(NodeId::Concept)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NodeId::Concept(id) => serializer.serialize_i64(*id),
            NodeId::Unlinked => serializer.serialize_str(UNLINKED_ID),
        }
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NodeIdVisitor;

        impl Visitor<'_> for NodeIdVisitor {
            type Value = NodeId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a concept id or \"{}\"", UNLINKED_ID)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<NodeId, E> {
                Ok(NodeId::Concept(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<NodeId, E> {
                ConceptId::try_from(v)
                    .map(NodeId::Concept)
                    .map_err(|_| E::custom(format!("concept id {} out of range", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<NodeId, E> {
                v.parse()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(NodeIdVisitor)
    }
}

// =============================================================================
// CONCEPT / EDGE
// =============================================================================

/// A vocabulary concept with its usage statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub concept_id: ConceptId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub concept_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub vocabulary_id: String,

    /// `"S"` standard, `"C"` classification, empty otherwise.
    #[serde(default, deserialize_with = "null_as_default")]
    pub standard_concept: String,

    /// Accepts a number, a numeric string, or null (0).
    #[serde(default, deserialize_with = "count_from_any")]
    pub total_cnt: u64,

    #[serde(default, deserialize_with = "count_from_any")]
    pub distinct_person_cnt: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

impl Concept {
    pub fn new(concept_id: ConceptId, concept_name: impl Into<String>) -> Self {
        Self {
            concept_id,
            concept_name: concept_name.into(),
            vocabulary_id: String::new(),
            standard_concept: String::new(),
            total_cnt: 0,
            distinct_person_cnt: 0,
            status: String::new(),
        }
    }

    /// Placeholder concept backing the synthetic unlinked root.
    pub fn unlinked_placeholder(label: impl Into<String>) -> Self {
        Self {
            vocabulary_id: "--".into(),
            ..Self::new(0, label)
        }
    }

    pub fn with_vocabulary(mut self, vocabulary_id: impl Into<String>) -> Self {
        self.vocabulary_id = vocabulary_id.into();
        self
    }

    pub fn with_standard_concept(mut self, flag: impl Into<String>) -> Self {
        self.standard_concept = flag.into();
        self
    }

    pub fn with_counts(mut self, total_cnt: u64, distinct_person_cnt: u64) -> Self {
        self.total_cnt = total_cnt;
        self.distinct_person_cnt = distinct_person_cnt;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// Directed `[parent_id, child_id]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge(pub ConceptId, pub ConceptId);

impl Edge {
    pub fn parent(&self) -> ConceptId {
        self.0
    }

    pub fn child(&self) -> ConceptId {
        self.1
    }
}

// =============================================================================
// CATEGORY MEMBERSHIP
// =============================================================================

/// Category name → concept ids ("added", "removed", "nonStandard", ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecialConceptSet(pub BTreeMap<String, Vec<ConceptId>>);

impl SpecialConceptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Members of a category, `None` when the category was not supplied.
    pub fn get(&self, category: &str) -> Option<&[ConceptId]> {
        self.0.get(category).map(Vec::as_slice)
    }

    pub fn insert(&mut self, category: impl Into<String>, ids: Vec<ConceptId>) {
        self.0.insert(category.into(), ids);
    }

    pub fn with(mut self, category: impl Into<String>, ids: Vec<ConceptId>) -> Self {
        self.insert(category, ids);
        self
    }
}

/// Concept-set membership/item flags for one concept in one codeset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsmiEntry {
    /// Concept is a member of the expanded concept set.
    #[serde(default)]
    pub csm: bool,
    /// Concept is an explicit item of the concept set definition.
    #[serde(default)]
    pub item: bool,
}

/// codeset_id → concept_id → membership flags.
pub type Csmi = BTreeMap<i64, BTreeMap<ConceptId, CsmiEntry>>;

/// Lists reported alongside the graph; carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default)]
    pub filled_gaps: serde_json::Value,
    #[serde(default)]
    pub missing_from_graph: serde_json::Value,
    #[serde(default)]
    pub hidden_by_vocab: serde_json::Value,
    #[serde(default)]
    pub nonstandard_concepts_hidden: serde_json::Value,
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Payload of the CREATE action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub concepts: Vec<Concept>,

    #[serde(rename = "specialConcepts", default)]
    pub special_concepts: SpecialConceptSet,

    #[serde(default)]
    pub csmi: Csmi,

    #[serde(default)]
    pub edges: Vec<Edge>,

    #[serde(default)]
    pub concept_ids: Vec<ConceptId>,

    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

impl GraphData {
    /// Payload with `concept_ids` taken from the concept list.
    pub fn new(concepts: Vec<Concept>, edges: Vec<Edge>) -> Self {
        let concept_ids = concepts.iter().map(|c| c.concept_id).collect();
        Self {
            concepts,
            edges,
            concept_ids,
            ..Self::default()
        }
    }

    pub fn with_special_concepts(mut self, special_concepts: SpecialConceptSet) -> Self {
        self.special_concepts = special_concepts;
        self
    }

    pub fn with_csmi(mut self, csmi: Csmi) -> Self {
        self.csmi = csmi;
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn count_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    struct CountVisitor;

    impl Visitor<'_> for CountVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative count, as a number or numeric string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
            if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
                Ok(v as u64)
            } else {
                Err(E::invalid_value(de::Unexpected::Float(v), &self))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }

        fn visit_none<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }
    }

    deserializer.deserialize_any(CountVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_serialization() {
        assert_eq!(serde_json::to_string(&NodeId::Concept(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&NodeId::Unlinked).unwrap(),
            r#""unlinked""#
        );
    }

    #[test]
    fn test_node_id_accepts_numeric_strings() {
        let ids: Vec<NodeId> = serde_json::from_str(r#"[7, "8", "unlinked"]"#).unwrap();
        assert_eq!(
            ids,
            vec![NodeId::Concept(7), NodeId::Concept(8), NodeId::Unlinked]
        );
        assert!(serde_json::from_str::<NodeId>(r#""eight""#).is_err());
        assert!(ids[2].is_unlinked());
        assert!(!ids[0].is_unlinked());
    }

    #[test]
    fn test_graph_data_from_payload() {
        let json = r#"{
            "concepts": [
                {"concept_id": 1, "concept_name": "Diabetes", "vocabulary_id": "SNOMED",
                 "standard_concept": "S", "total_cnt": 10, "distinct_person_cnt": 4, "status": ""},
                {"concept_id": 2, "concept_name": "T2DM", "vocabulary_id": "SNOMED",
                 "standard_concept": null, "total_cnt": null, "distinct_person_cnt": 0, "status": null}
            ],
            "edges": [[1, 2]],
            "specialConcepts": {"added": [2], "nonStandard": [2]},
            "csmi": {"100": {"1": {"csm": true, "item": false}, "2": {"csm": false, "item": true}}},
            "concept_ids": [1, 2],
            "filled_gaps": [],
            "hidden_by_vocab": {"RxNorm Extension": 3}
        }"#;

        let data: GraphData = serde_json::from_str(json).unwrap();
        assert_eq!(data.concepts.len(), 2);
        assert_eq!(data.concepts[1].standard_concept, "");
        assert_eq!(data.concepts[1].total_cnt, 0);
        assert_eq!(data.edges, vec![Edge(1, 2)]);
        assert_eq!(data.special_concepts.get("added"), Some(&[2][..]));
        assert_eq!(data.special_concepts.get("removed"), None);
        assert!(data.csmi[&100][&1].csm);
        assert!(data.csmi[&100][&2].item);
        assert_eq!(
            data.diagnostics.hidden_by_vocab,
            serde_json::json!({"RxNorm Extension": 3})
        );
        assert!(data.diagnostics.missing_from_graph.is_null());
    }

    #[test]
    fn test_counts_accept_numeric_strings() {
        let concepts: Vec<Concept> = serde_json::from_str(
            r#"[
                {"concept_id": 1, "total_cnt": "12", "distinct_person_cnt": "3"},
                {"concept_id": 2, "total_cnt": 5, "distinct_person_cnt": ""},
                {"concept_id": 3, "total_cnt": null}
            ]"#,
        )
        .unwrap();

        assert_eq!(concepts[0].total_cnt, 12);
        assert_eq!(concepts[0].distinct_person_cnt, 3);
        assert_eq!(concepts[1].total_cnt, 5);
        assert_eq!(concepts[1].distinct_person_cnt, 0);
        assert_eq!(concepts[2].total_cnt, 0);
        assert_eq!(concepts[2].distinct_person_cnt, 0);

        let bad = serde_json::from_str::<Concept>(r#"{"concept_id": 4, "total_cnt": "many"}"#);
        assert!(bad.is_err());
        let negative = serde_json::from_str::<Concept>(r#"{"concept_id": 4, "total_cnt": -1}"#);
        assert!(negative.is_err());
    }

    #[test]
    fn test_graph_data_new_fills_concept_ids() {
        let data = GraphData::new(vec![Concept::new(5, "a"), Concept::new(9, "b")], vec![]);
        assert_eq!(data.concept_ids, vec![5, 9]);
    }
}
