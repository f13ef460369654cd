//! Category catalogue configuration
//!
//! Defines the serde schema for `config/categories.yaml`: which concept
//! categories are reported, in what order, and which of them carry an
//! override rule.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::options::{CategoryKey, TreatmentRule};

/// Label of the synthetic root that adopts unlinked concepts.
pub const DEFAULT_UNLINKED_LABEL: &str = "Concepts in set but not linked to others";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    pub version: String,

    /// Concept name shown on the synthetic unlinked root
    #[serde(default = "default_unlinked_label")]
    pub unlinked_label: String,

    /// Category catalogue; list position is the display order
    pub categories: Vec<CategoryDef>,
}

fn default_unlinked_label() -> String {
    DEFAULT_UNLINKED_LABEL.to_string()
}

/// Definition of a single category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Category key; for `special_set` categories also the key into `specialConcepts`
    pub key: CategoryKey,

    /// Display name
    pub name: String,

    /// Where the category's members come from
    pub count: CountSource,

    /// Override applied while the category is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<TreatmentRule>,

    /// Enabled flag used the first time the category is classified
    #[serde(default)]
    pub default_enabled: bool,
}

/// Source of a category's member ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSource {
    /// Rows in the current projection (no member ids)
    VisibleRows,
    /// `concept_ids` from the payload
    ConceptIds,
    /// `specialConcepts[key]`; undefined when the key is absent
    SpecialSet,
    /// Concepts flagged `csm` in any codeset of `csmi`
    ExpansionMembers,
    /// Concepts with `standard_concept == "S"`
    StandardConcepts,
    /// Concepts with `standard_concept == "C"`
    ClassificationConcepts,
}

impl CategoryDef {
    pub fn new(key: &str, name: &str, count: CountSource) -> Self {
        Self {
            key: CategoryKey::new(key),
            name: name.to_string(),
            count,
            rule: None,
            default_enabled: false,
        }
    }

    pub fn with_rule(mut self, rule: TreatmentRule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.default_enabled = enabled;
        self
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        use CountSource::*;
        use TreatmentRule::*;

        Self {
            version: "1.0".to_string(),
            unlinked_label: default_unlinked_label(),
            categories: vec![
                CategoryDef::new("visibleRows", "Visible rows", VisibleRows),
                CategoryDef::new("concepts", "Concepts", ConceptIds),
                CategoryDef::new("definitionConcepts", "Definition concepts", SpecialSet)
                    .with_rule(ShowThoughCollapsed),
                CategoryDef::new("added", "Added", SpecialSet).with_rule(ShowThoughCollapsed),
                CategoryDef::new("removed", "Removed", SpecialSet).with_rule(ShowThoughCollapsed),
                CategoryDef::new("expansion", "Expansion concepts", ExpansionMembers),
                CategoryDef::new("standard", "Standard concepts", StandardConcepts),
                CategoryDef::new(
                    "classification",
                    "Classification concepts",
                    ClassificationConcepts,
                ),
                CategoryDef::new("nonStandard", "Non-standard", SpecialSet)
                    .with_rule(HideThoughExpanded),
                CategoryDef::new("zeroRecord", "Zero records / patients", SpecialSet)
                    .with_rule(HideThoughExpanded),
            ],
        }
    }
}

impl HierarchyConfig {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: HierarchyConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject catalogues that list a key twice
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for category in &self.categories {
            if !seen.insert(&category.key) {
                bail!("duplicate category key '{}'", category.key);
            }
        }
        Ok(())
    }

    pub fn category(&self, key: &CategoryKey) -> Option<&CategoryDef> {
        self.categories.iter().find(|c| &c.key == key)
    }
}
