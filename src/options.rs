//! Concept categories and their override rules.
//!
//! Each configured category becomes a [`StatsOption`] describing what the
//! category covers and whether its rule is switched on. Categories whose
//! members are undefined for the current payload are left out entirely.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::{CountSource, HierarchyConfig};
use crate::types::{ConceptId, GraphData, NodeId};

/// Category key, e.g. `added` or `zeroRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryKey(String);

impl CategoryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Override a category applies to the projection while enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentRule {
    /// Members are listed even when every ancestor is collapsed.
    ShowThoughCollapsed,
    /// Members are dropped even when their parent is expanded.
    HideThoughExpanded,
}

impl TreatmentRule {
    pub fn label(&self) -> &'static str {
        match self {
            TreatmentRule::ShowThoughCollapsed => "show though collapsed",
            TreatmentRule::HideThoughExpanded => "hide though expanded",
        }
    }
}

impl fmt::Display for TreatmentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Descriptor for one category present in the current payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsOption {
    #[serde(rename = "type")]
    pub key: CategoryKey,
    pub name: String,
    pub display_order: usize,
    pub source: CountSource,
    /// Number of distinct members
    pub value: usize,
    pub rule: Option<TreatmentRule>,
    pub enabled: bool,
    /// Member ids in payload order, no repeats
    #[serde(skip)]
    pub members: Arc<[NodeId]>,
}

impl StatsOption {
    /// Rule in force right now, if any.
    pub fn active_rule(&self) -> Option<TreatmentRule> {
        self.rule.filter(|_| self.enabled)
    }
}

/// Ordered category descriptors for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatsOptions {
    options: Vec<StatsOption>,
}

impl StatsOptions {
    /// Classify `data` against the catalogue.
    ///
    /// Enabled flags are taken from `previous` where it has the same
    /// category, otherwise from the catalogue default.
    pub fn classify(
        config: &HierarchyConfig,
        data: &GraphData,
        previous: Option<&StatsOptions>,
    ) -> Self {
        let mut options = Vec::with_capacity(config.categories.len());

        for (display_order, def) in config.categories.iter().enumerate() {
            let Some(members) = members_for(def.count, def.key.as_str(), data) else {
                debug!(category = %def.key, "Category has no defined members, omitted");
                continue;
            };
            let enabled = previous
                .and_then(|p| p.get(&def.key))
                .map(|p| p.enabled)
                .unwrap_or(def.default_enabled);

            options.push(StatsOption {
                key: def.key.clone(),
                name: def.name.clone(),
                display_order,
                source: def.count,
                value: members.len(),
                rule: def.rule,
                enabled,
                members: members.into(),
            });
        }

        Self { options }
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatsOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn get(&self, key: &CategoryKey) -> Option<&StatsOption> {
        self.options.iter().find(|o| &o.key == key)
    }

    /// Flip a category's enabled flag. Returns `false` when the category is
    /// not present.
    pub fn toggle(&mut self, key: &CategoryKey) -> bool {
        match self.options.iter_mut().find(|o| &o.key == key) {
            Some(option) => {
                option.enabled = !option.enabled;
                true
            }
            None => false,
        }
    }

    /// Members of every enabled show-though-collapsed category, in display
    /// order then payload order, without repeats.
    pub fn show_ids(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.active(TreatmentRule::ShowThoughCollapsed)
            .flat_map(|o| o.members.iter().copied())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Members of every enabled hide-though-expanded category.
    pub fn hide_ids(&self) -> BTreeSet<NodeId> {
        self.active(TreatmentRule::HideThoughExpanded)
            .flat_map(|o| o.members.iter().copied())
            .collect()
    }

    fn active(&self, rule: TreatmentRule) -> impl Iterator<Item = &StatsOption> {
        self.options
            .iter()
            .filter(move |o| o.active_rule() == Some(rule))
    }
}

/// Member ids for a category, or `None` when the payload does not define it.
fn members_for(source: CountSource, key: &str, data: &GraphData) -> Option<Vec<NodeId>> {
    let ids: Vec<ConceptId> = match source {
        CountSource::VisibleRows => Vec::new(),
        CountSource::ConceptIds => data.concept_ids.clone(),
        CountSource::SpecialSet => data.special_concepts.get(key)?.to_vec(),
        CountSource::ExpansionMembers => data
            .csmi
            .values()
            .flat_map(|codeset| codeset.iter())
            .filter(|(_, entry)| entry.csm)
            .map(|(&id, _)| id)
            .collect(),
        CountSource::StandardConcepts => with_standard_flag(data, "S"),
        CountSource::ClassificationConcepts => with_standard_flag(data, "C"),
    };

    let mut seen = HashSet::new();
    Some(
        ids.into_iter()
            .filter(|id| seen.insert(*id))
            .map(NodeId::Concept)
            .collect(),
    )
}

fn with_standard_flag(data: &GraphData, flag: &str) -> Vec<ConceptId> {
    data.concepts
        .iter()
        .filter(|c| c.standard_concept == flag)
        .map(|c| c.concept_id)
        .collect()
}
