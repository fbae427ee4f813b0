use reasoning_agent::GroundingMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{RcaError, Result};
use crate::incident::Incident;
use crate::paths;
use crate::types::{ActionStatus, Severity};

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Named workflow slots. Used for precondition errors and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    IncidentInfo,
    IncidentData,
    Instructions,
    Analysis,
    SeverityLevel,
    SeverityExplanation,
    ExternalSearchGrounding,
    ExternalSearchResults,
    InternalSearchGrounding,
    InternalSearchResults,
    PriorIncidents,
    ProcessingRules,
    ProcessingRuleTools,
    SeverityDeterminationRules,
    SeverityDeterminationRuleTools,
    Actions,
    Report,
}

impl Slot {
    pub fn as_str(self) -> &'static str {
        match self {
            Slot::IncidentInfo => "incident_info",
            Slot::IncidentData => "incident_data",
            Slot::Instructions => "instructions",
            Slot::Analysis => "analysis",
            Slot::SeverityLevel => "severity_level",
            Slot::SeverityExplanation => "severity_level_explanation",
            Slot::ExternalSearchGrounding => "external_search_grounding",
            Slot::ExternalSearchResults => "external_search_results",
            Slot::InternalSearchGrounding => "internal_search_grounding",
            Slot::InternalSearchResults => "internal_search_results",
            Slot::PriorIncidents => "prior_incidents",
            Slot::ProcessingRules => "processing_rules",
            Slot::ProcessingRuleTools => "processing_rule_tools",
            Slot::SeverityDeterminationRules => "severity_determination_rules",
            Slot::SeverityDeterminationRuleTools => "severity_determination_rule_tools",
            Slot::Actions => "actions",
            Slot::Report => "report",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrow a mandatory slot or fail the step with `MissingPrecondition`.
pub fn require<T>(value: &Option<T>, slot: Slot) -> Result<&T> {
    value
        .as_ref()
        .ok_or_else(|| RcaError::MissingPrecondition(slot.to_string()))
}

// ---------------------------------------------------------------------------
// Action / Document / search results
// ---------------------------------------------------------------------------

/// A remediation proposed by the analyzer. Never executed at proposal time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub reason_to_perform: String,
    pub status: ActionStatus,
}

impl Action {
    pub fn suggested(
        tool_name: impl Into<String>,
        parameters: BTreeMap<String, serde_json::Value>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            reason_to_perform: reason.into(),
            status: ActionStatus::Suggested,
        }
    }

    pub fn parameters_display(&self) -> String {
        let parts: Vec<String> = self
            .parameters
            .iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => format!("{k}={s}"),
                other => format!("{k}={other}"),
            })
            .collect();
        parts.join(", ")
    }
}

/// A reference behind a grounded documentation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSearchResult {
    pub search_results: String,
    pub references: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalSearchResult {
    pub queries: Vec<String>,
    pub search_result: String,
    pub references: Vec<Document>,
}

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// Typed context threaded through every step of one incident's run.
///
/// A fresh instance is created per run; nothing here is namespaced by
/// incident id. Slots are set once (the narrative accumulates) and never
/// cleared mid-run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident: Option<Incident>,
    /// Free-text narrative built up across steps; the prior-incident
    /// search embeds this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_grounding: Option<GroundingMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_search: Option<ExternalSearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_grounding: Option<GroundingMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_search: Option<InternalSearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_incidents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_rules: Option<Vec<String>>,
    /// Stored as a list; order carries no meaning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_rule_tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_rules: Option<Vec<String>>,
    /// Stored as a list; order carries no meaning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_rule_tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incident(&self) -> Result<&Incident> {
        require(&self.incident, Slot::IncidentInfo)
    }

    /// Append a titled section to the narrative, separated from any prior
    /// content by a blank line.
    pub fn append_narrative(&mut self, section: &str, details: &str) {
        let existing = self.narrative.take().unwrap_or_default();
        let sep = if existing.is_empty() { "" } else { "\n\n" };
        self.narrative = Some(format!("{existing}{sep}**{section}**\n{details}"));
    }

    pub fn suggested_actions(&self) -> impl Iterator<Item = (usize, &Action)> {
        self.actions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.status == ActionStatus::Suggested)
    }

    pub fn has_suggested_actions(&self) -> bool {
        self.suggested_actions().next().is_some()
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub fn save(&self, root: &Path) -> Result<()> {
        let id = &self.incident()?.id;
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::run_state_path(root, id), data.as_bytes())
    }

    pub fn load(root: &Path, incident_id: &str) -> Result<Self> {
        let path = paths::run_state_path(root, incident_id);
        if !path.exists() {
            return Err(RcaError::NotFound(incident_id.to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::MissedKpi;
    use crate::types::IncidentStatus;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn incident() -> Incident {
        Incident {
            id: "inc-7".into(),
            description: "d".into(),
            kpi_missed: vec![MissedKpi::new("erab_success_rate", 92.0)],
            enodeb_id: Some("E".into()),
            cell_id: Some("C".into()),
            status: IncidentStatus::New,
            start_time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end_time: None,
            severity: None,
            cause: None,
            resolution: None,
        }
    }

    #[test]
    fn append_narrative_separates_sections() {
        let mut st = WorkflowState::new();
        st.append_narrative("General info", "Missed KPIs: x");
        assert_eq!(st.narrative.as_deref(), Some("**General info**\nMissed KPIs: x"));
        st.append_narrative("Cell traces statistics", "OTHER: 3");
        assert_eq!(
            st.narrative.as_deref(),
            Some("**General info**\nMissed KPIs: x\n\n**Cell traces statistics**\nOTHER: 3")
        );
    }

    #[test]
    fn missing_incident_is_precondition_failure() {
        let st = WorkflowState::new();
        match st.incident() {
            Err(RcaError::MissingPrecondition(slot)) => assert_eq!(slot, "incident_info"),
            other => panic!("expected MissingPrecondition, got {other:?}"),
        }
    }

    #[test]
    fn suggested_actions_filters_by_status() {
        let mut st = WorkflowState::new();
        st.actions.push(Action::suggested("a", BTreeMap::new(), "r"));
        let mut done = Action::suggested("b", BTreeMap::new(), "r");
        done.status = ActionStatus::Executed;
        st.actions.push(done);
        let ids: Vec<usize> = st.suggested_actions().map(|(i, _)| i).collect();
        assert_eq!(ids, vec![0]);
        assert!(st.has_suggested_actions());
    }

    #[test]
    fn parameters_display_is_key_ordered() {
        let mut params = BTreeMap::new();
        params.insert("enodeb_id".to_string(), serde_json::json!("X"));
        params.insert("cell_id".to_string(), serde_json::json!("Y"));
        let a = Action::suggested("t", params, "r");
        assert_eq!(a.parameters_display(), "cell_id=Y, enodeb_id=X");
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut st = WorkflowState::new();
        st.incident = Some(incident());
        st.severity = Some(Severity::Medium);
        st.processing_rule_tools = Some(vec!["get_uplink_rssi_level".into()]);
        st.save(dir.path()).unwrap();
        let loaded = WorkflowState::load(dir.path(), "inc-7").unwrap();
        assert_eq!(loaded, st);
    }

    #[test]
    fn save_without_incident_fails() {
        let dir = TempDir::new().unwrap();
        assert!(WorkflowState::new().save(dir.path()).is_err());
    }
}
