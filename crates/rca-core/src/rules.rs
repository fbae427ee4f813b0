use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{RcaError, Result};
use crate::state::WorkflowState;

/// Maximum rules returned by one catalog query.
pub const RULE_PAGE_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Processing and severity guidance for one class of incident, with the
/// tools each kind of reasoning may use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub processing_rule: String,
    #[serde(default)]
    pub processing_rule_tools: HashSet<String>,
    pub severity_determination_rule: String,
    #[serde(default)]
    pub severity_determination_rule_tools: HashSet<String>,
    /// Catalog entry the rule came from.
    pub source_document: String,
}

/// One entry in `.rca/rules.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub kpi_missed: Vec<String>,
    pub processing_rule: String,
    #[serde(default)]
    pub processing_rule_tools: Vec<String>,
    pub severity_determination_rule: String,
    #[serde(default)]
    pub severity_determination_rule_tools: Vec<String>,
}

impl CatalogEntry {
    pub fn matches(&self, kpis: &BTreeSet<String>) -> bool {
        self.kpi_missed.iter().any(|k| kpis.contains(k))
    }

    pub fn to_rule(&self) -> Rule {
        Rule {
            processing_rule: self.processing_rule.clone(),
            processing_rule_tools: self.processing_rule_tools.iter().cloned().collect(),
            severity_determination_rule: self.severity_determination_rule.clone(),
            severity_determination_rule_tools: self
                .severity_determination_rule_tools
                .iter()
                .cloned()
                .collect(),
            source_document: self.id.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RuleCatalog
// ---------------------------------------------------------------------------

/// Rule lookup by missed-KPI membership. Results keep catalog order.
#[async_trait]
pub trait RuleCatalog: Send + Sync {
    async fn find_rules(&self, kpi_names: &BTreeSet<String>) -> Result<Vec<Rule>>;
}

/// Catalog backed by a YAML list of [`CatalogEntry`] records.
#[derive(Debug, Clone)]
pub struct YamlRuleCatalog {
    path: PathBuf,
}

impl YamlRuleCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> Result<Vec<CatalogEntry>> {
        if !self.path.exists() {
            return Err(RcaError::Upstream(format!(
                "rule catalog not found at {}",
                self.path.display()
            )));
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_yaml::from_str(&data)?)
    }
}

#[async_trait]
impl RuleCatalog for YamlRuleCatalog {
    async fn find_rules(&self, kpi_names: &BTreeSet<String>) -> Result<Vec<Rule>> {
        let rules: Vec<Rule> = self
            .entries()?
            .iter()
            .filter(|e| e.matches(kpi_names))
            .take(RULE_PAGE_SIZE)
            .map(CatalogEntry::to_rule)
            .collect();
        tracing::debug!(kpis = ?kpi_names, matched = rules.len(), "rule catalog query");
        Ok(rules)
    }
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// Merged view of every matched rule: bodies kept per rule in catalog
/// order, tool names unioned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub processing_rules: Vec<String>,
    pub severity_rules: Vec<String>,
    pub processing_tools: HashSet<String>,
    pub severity_tools: HashSet<String>,
}

impl RuleSet {
    pub fn merge(rules: &[Rule]) -> Self {
        let mut set = RuleSet::default();
        for rule in rules {
            set.processing_rules.push(rule.processing_rule.clone());
            set.severity_rules
                .push(rule.severity_determination_rule.clone());
            set.processing_tools
                .extend(rule.processing_rule_tools.iter().cloned());
            set.severity_tools
                .extend(rule.severity_determination_rule_tools.iter().cloned());
        }
        set
    }

    /// Write the four rule slots. Tool sets become lists here and only here.
    pub fn apply_to(self, state: &mut WorkflowState) {
        state.processing_rules = Some(self.processing_rules);
        state.severity_rules = Some(self.severity_rules);
        state.processing_rule_tools = Some(self.processing_tools.into_iter().collect());
        state.severity_rule_tools = Some(self.severity_tools.into_iter().collect());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rule(id: &str, ptools: &[&str], stools: &[&str]) -> Rule {
        Rule {
            processing_rule: format!("process {id}"),
            processing_rule_tools: ptools.iter().map(|s| s.to_string()).collect(),
            severity_determination_rule: format!("severity {id}"),
            severity_determination_rule_tools: stools.iter().map(|s| s.to_string()).collect(),
            source_document: id.to_string(),
        }
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_unions_tools_and_keeps_bodies_in_order() {
        let rules = vec![
            rule("r1", &["a", "b"], &["x"]),
            rule("r2", &["b", "c"], &["x", "y"]),
        ];
        let merged = RuleSet::merge(&rules);
        assert_eq!(merged.processing_rules, vec!["process r1", "process r2"]);
        assert_eq!(merged.severity_rules, vec!["severity r1", "severity r2"]);
        assert_eq!(merged.processing_tools, set(&["a", "b", "c"]));
        assert_eq!(merged.severity_tools, set(&["x", "y"]));
    }

    #[test]
    fn merge_tools_ignore_order_and_duplicates() {
        let r1 = rule("r1", &["a", "b"], &["x"]);
        let r2 = rule("r2", &["c"], &["y"]);
        let forward = RuleSet::merge(&[r1.clone(), r2.clone()]);
        let backward = RuleSet::merge(&[r2.clone(), r1.clone()]);
        let doubled = RuleSet::merge(&[r1.clone(), r2.clone(), r1, r2]);
        assert_eq!(forward.processing_tools, backward.processing_tools);
        assert_eq!(forward.severity_tools, backward.severity_tools);
        assert_eq!(forward.processing_tools, doubled.processing_tools);
    }

    #[test]
    fn apply_writes_all_four_slots() {
        let mut state = WorkflowState::new();
        RuleSet::merge(&[rule("r1", &["a", "b"], &[])]).apply_to(&mut state);
        let mut tools = state.processing_rule_tools.clone().unwrap();
        tools.sort();
        assert_eq!(tools, vec!["a", "b"]);
        assert_eq!(state.severity_rule_tools, Some(vec![]));
        assert_eq!(state.processing_rules.unwrap().len(), 1);
        assert_eq!(state.severity_rules.unwrap().len(), 1);
    }

    const CATALOG: &str = r#"
- id: erab-low
  description: ERAB drops caused by uplink noise
  kpi_missed: [erab_success_rate]
  processing_rule: Check uplink RSSI and cell traces.
  processing_rule_tools: [get_uplink_rssi_level, get_cell_trace_statistics]
  severity_determination_rule: HIGH if below 90.
  severity_determination_rule_tools: []
- id: rrc
  kpi_missed: [rrc_setup_success_rate]
  processing_rule: Check RRC.
  severity_determination_rule: MEDIUM.
- id: erab-config
  kpi_missed: [erab_success_rate, rrc_setup_success_rate]
  processing_rule: Check uplink power configuration.
  processing_rule_tools: [get_uplink_configuration]
  severity_determination_rule: LOW if isolated.
"#;

    #[tokio::test]
    async fn yaml_catalog_filters_by_membership_in_file_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, CATALOG).unwrap();
        let catalog = YamlRuleCatalog::new(&path);

        let kpis: BTreeSet<String> = ["erab_success_rate".to_string()].into();
        let rules = catalog.find_rules(&kpis).await.unwrap();
        let ids: Vec<&str> = rules.iter().map(|r| r.source_document.as_str()).collect();
        assert_eq!(ids, vec!["erab-low", "erab-config"]);
    }

    #[tokio::test]
    async fn yaml_catalog_caps_results_at_page_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.yaml");
        let entries: Vec<CatalogEntry> = (0..15)
            .map(|i| CatalogEntry {
                id: format!("r{i}"),
                description: String::new(),
                kpi_missed: vec!["k".into()],
                processing_rule: "p".into(),
                processing_rule_tools: vec![],
                severity_determination_rule: "s".into(),
                severity_determination_rule_tools: vec![],
            })
            .collect();
        std::fs::write(&path, serde_yaml::to_string(&entries).unwrap()).unwrap();
        let kpis: BTreeSet<String> = ["k".to_string()].into();
        let rules = YamlRuleCatalog::new(&path).find_rules(&kpis).await.unwrap();
        assert_eq!(rules.len(), RULE_PAGE_SIZE);
        assert_eq!(rules[0].source_document, "r0");
    }

    #[tokio::test]
    async fn missing_catalog_is_upstream_error() {
        let dir = TempDir::new().unwrap();
        let catalog = YamlRuleCatalog::new(dir.path().join("absent.yaml"));
        let err = catalog.find_rules(&BTreeSet::new()).await.unwrap_err();
        assert!(matches!(err, RcaError::Upstream(_)));
    }
}
