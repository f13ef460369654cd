//! Category counts for the toggle controls.
//!
//! Derived on demand from a snapshot's descriptors and projection; nothing
//! here is stored.

use serde::Serialize;
use std::collections::HashSet;

use crate::config::CountSource;
use crate::options::{CategoryKey, StatsOptions, TreatmentRule};
use crate::types::NodeId;
use crate::visibility::Projection;

/// One line of the category table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsRow {
    #[serde(rename = "type")]
    pub key: CategoryKey,
    pub name: String,
    pub display_order: usize,
    pub value: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_concept_cnt: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_concept_cnt: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<TreatmentRule>,
    /// Present only for categories that carry a rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Build the category table in display order.
pub fn stats_rows(options: &StatsOptions, projection: &Projection) -> Vec<StatsRow> {
    let visible: HashSet<NodeId> = projection.rows.iter().map(|r| r.id()).collect();

    options
        .iter()
        .map(|option| {
            let (value, visible_cnt, hidden_cnt) = match (option.source, option.rule) {
                (CountSource::VisibleRows, _) => (projection.rows.len(), None, None),
                (_, Some(TreatmentRule::HideThoughExpanded)) => (
                    option.value,
                    Some(count_where(&option.members, |id| visible.contains(id))),
                    Some(count_where(&option.members, |id| {
                        projection.hidden_by_rule.contains(id)
                    })),
                ),
                _ => (
                    option.value,
                    None,
                    Some(count_where(&option.members, |id| !visible.contains(id))),
                ),
            };

            StatsRow {
                key: option.key.clone(),
                name: option.name.clone(),
                display_order: option.display_order,
                value,
                visible_concept_cnt: visible_cnt,
                hidden_concept_cnt: hidden_cnt,
                rule: option.rule,
                enabled: option.rule.map(|_| option.enabled),
            }
        })
        .collect()
}

fn count_where<F: Fn(&NodeId) -> bool>(members: &[NodeId], keep: F) -> usize {
    members.iter().filter(|&id| keep(id)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HierarchyConfig;
    use crate::graph::{compute_attributes, ConceptGraph};
    use crate::types::{Concept, Edge, GraphData, SpecialConceptSet};
    use crate::visibility::project;
    use std::sync::Arc;

    #[test]
    fn test_counts_follow_projection() {
        let data = GraphData::new(
            vec![
                Concept::new(1, "a"),
                Concept::new(2, "b"),
                Concept::new(3, "c"),
                Concept::new(4, "d"),
            ],
            vec![Edge(1, 2), Edge(1, 3), Edge(3, 4)],
        )
        .with_special_concepts(
            SpecialConceptSet::new()
                .with("added", vec![4])
                .with("zeroRecord", vec![2, 3]),
        );
        let graph = ConceptGraph::build(&data.concepts, &data.edges).unwrap();
        let mut nodes = compute_attributes(&graph, &data.concepts, "Unlinked");
        let expanded = nodes[&NodeId::Concept(1)].toggled();
        nodes.insert(NodeId::Concept(1), Arc::new(expanded));

        let mut options = StatsOptions::classify(&HierarchyConfig::default(), &data, None);
        options.toggle(&"zeroRecord".into());

        // rows: 1, 3 (hidden), 2 (hidden) -> visible 1 only
        let projection = project(&graph, &nodes, &options);
        let rows = stats_rows(&options, &projection);
        let row = |k: &str| rows.iter().find(|r| r.key.as_str() == k).unwrap();

        assert_eq!(row("visibleRows").value, 1);
        assert_eq!(row("concepts").hidden_concept_cnt, Some(3));
        assert_eq!(row("added").hidden_concept_cnt, Some(1));
        assert_eq!(row("added").enabled, Some(false));
        assert_eq!(row("zeroRecord").visible_concept_cnt, Some(0));
        assert_eq!(row("zeroRecord").hidden_concept_cnt, Some(2));
        assert_eq!(row("zeroRecord").enabled, Some(true));
        assert_eq!(row("standard").enabled, None);
    }

    #[test]
    fn test_rows_in_display_order() {
        let data = GraphData::new(vec![Concept::new(1, "a")], vec![]);
        let graph = ConceptGraph::build(&data.concepts, &data.edges).unwrap();
        let nodes = compute_attributes(&graph, &data.concepts, "Unlinked");
        let options = StatsOptions::classify(&HierarchyConfig::default(), &data, None);
        let rows = stats_rows(&options, &project(&graph, &nodes, &options));

        let orders: Vec<usize> = rows.iter().map(|r| r.display_order).collect();
        let mut sorted = orders.clone();
        sorted.sort_unstable();
        assert_eq!(orders, sorted);
        assert_eq!(rows[0].key.as_str(), "visibleRows");
        // unlinked root only; concept 1 sits beneath it
        assert_eq!(rows[0].value, 1);
    }
}
