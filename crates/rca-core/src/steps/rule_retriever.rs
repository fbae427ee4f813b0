use crate::error::{RcaError, Result};
use crate::rules::{RuleCatalog, RuleSet};
use crate::state::{Slot, WorkflowState};

/// Query the catalog with the incident's missed KPI names and write the
/// processing/severity rules and their tool allow-lists. Returns the number
/// of matched rules.
pub async fn retrieve(catalog: &dyn RuleCatalog, state: &mut WorkflowState) -> Result<usize> {
    let kpis = state.incident()?.missed_kpi_names();
    if kpis.is_empty() {
        return Err(RcaError::MissingPrecondition(format!(
            "{} (no missed KPIs)",
            Slot::IncidentInfo
        )));
    }
    let rules = catalog.find_rules(&kpis).await?;
    if rules.is_empty() {
        tracing::warn!(kpis = ?kpis, "no rules matched the incident");
    } else {
        tracing::info!(matched = rules.len(), "rules retrieved");
    }
    let count = rules.len();
    RuleSet::merge(&rules).apply_to(state);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::{Incident, MissedKpi};
    use crate::rules::Rule;
    use crate::types::IncidentStatus;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeSet;

    struct FixedCatalog(Vec<Rule>);

    #[async_trait]
    impl RuleCatalog for FixedCatalog {
        async fn find_rules(&self, kpis: &BTreeSet<String>) -> Result<Vec<Rule>> {
            assert!(kpis.contains("erab_success_rate"));
            Ok(self.0.clone())
        }
    }

    fn rule(id: &str, tools: &[&str]) -> Rule {
        Rule {
            processing_rule: format!("process {id}"),
            processing_rule_tools: tools.iter().map(|s| s.to_string()).collect(),
            severity_determination_rule: format!("severity {id}"),
            severity_determination_rule_tools: Default::default(),
            source_document: id.into(),
        }
    }

    fn state_with(kpis: Vec<MissedKpi>) -> WorkflowState {
        let mut st = WorkflowState::new();
        st.incident = Some(Incident {
            id: "inc".into(),
            description: "d".into(),
            kpi_missed: kpis,
            enodeb_id: None,
            cell_id: None,
            status: IncidentStatus::New,
            start_time: Utc::now(),
            end_time: None,
            severity: None,
            cause: None,
            resolution: None,
        });
        st
    }

    #[tokio::test]
    async fn writes_merged_rule_slots() {
        let catalog = FixedCatalog(vec![
            rule("a", &["get_uplink_rssi_level"]),
            rule("b", &["get_uplink_rssi_level", "get_uplink_configuration"]),
        ]);
        let mut st = state_with(vec![MissedKpi::new("erab_success_rate", 92.0)]);
        assert_eq!(retrieve(&catalog, &mut st).await.unwrap(), 2);
        assert_eq!(
            st.processing_rules,
            Some(vec!["process a".to_string(), "process b".to_string()])
        );
        let mut tools = st.processing_rule_tools.unwrap();
        tools.sort();
        assert_eq!(tools, vec!["get_uplink_configuration", "get_uplink_rssi_level"]);
    }

    #[tokio::test]
    async fn missing_incident_is_precondition_failure() {
        let catalog = FixedCatalog(vec![]);
        let mut st = WorkflowState::new();
        let err = retrieve(&catalog, &mut st).await.unwrap_err();
        assert!(matches!(err, RcaError::MissingPrecondition(_)));
        assert_eq!(st, WorkflowState::new());
    }

    #[tokio::test]
    async fn empty_kpi_list_is_precondition_failure() {
        let catalog = FixedCatalog(vec![]);
        let mut st = state_with(vec![]);
        let err = retrieve(&catalog, &mut st).await.unwrap_err();
        assert!(matches!(err, RcaError::MissingPrecondition(_)));
        assert!(st.processing_rules.is_none());
    }
}
