use serde_json::{json, Value};

use crate::error::Result;
use crate::incident::Incident;
use crate::state::WorkflowState;
use crate::store::IncidentStore;

use super::STORE_FAILED;

/// Result of looking an incident up by id.
#[derive(Debug, Clone, PartialEq)]
pub enum IncidentLookup {
    Found(Incident),
    NotFound { incident_id: String },
    Error { description: String },
}

impl IncidentLookup {
    pub fn to_json(&self) -> Value {
        match self {
            IncidentLookup::Found(incident) => json!({ "status": "success", "incident": incident }),
            IncidentLookup::NotFound { incident_id } => json!({
                "status": "not found",
                "description": format!("Couldn't find incident with id {incident_id}"),
            }),
            IncidentLookup::Error { description } => {
                json!({ "status": "error", "description": description })
            }
        }
    }
}

/// Load the incident into `incident_info` and open the narrative with its
/// "General info" section. Not-found and store failures write nothing.
pub async fn retrieve(
    store: &dyn IncidentStore,
    incident_id: &str,
    state: &mut WorkflowState,
) -> Result<IncidentLookup> {
    let incident = match store.get_incident(incident_id).await {
        Ok(Some(incident)) => incident,
        Ok(None) => {
            tracing::warn!(incident_id, "couldn't find incident");
            return Ok(IncidentLookup::NotFound {
                incident_id: incident_id.to_string(),
            });
        }
        Err(e) if e.is_recoverable() => {
            tracing::error!(incident_id, error = %e, "incident lookup failed");
            return Ok(IncidentLookup::Error {
                description: STORE_FAILED.to_string(),
            });
        }
        Err(e) => return Err(e),
    };
    tracing::info!(incident_id, "incident retrieved");
    state.append_narrative("General info", &incident.general_info());
    state.incident = Some(incident.clone());
    Ok(IncidentLookup::Found(incident))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::MissedKpi;
    use crate::steps::STORE_FAILED;
    use crate::store::offline::OfflineStore;
    use crate::store::SqliteStore;
    use crate::types::IncidentStatus;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn incident(id: &str) -> Incident {
        Incident {
            id: id.into(),
            description: "ERAB success rate is below 97%".into(),
            kpi_missed: vec![MissedKpi::new("erab_success_rate", 92.0)],
            enodeb_id: Some("E1".into()),
            cell_id: Some("C1".into()),
            status: IncidentStatus::New,
            start_time: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
            end_time: Some(Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap()),
            severity: None,
            cause: None,
            resolution: None,
        }
    }

    #[tokio::test]
    async fn found_writes_incident_and_general_info() {
        let store = SqliteStore::open_in_memory(Duration::from_secs(5)).unwrap();
        store.insert_incident(&incident("inc-1")).await.unwrap();
        let mut state = WorkflowState::new();
        let out = retrieve(&store, "inc-1", &mut state).await.unwrap();
        assert!(matches!(out, IncidentLookup::Found(_)));
        assert_eq!(out.to_json()["status"], "success");
        assert_eq!(state.incident().unwrap().id, "inc-1");
        assert_eq!(
            state.narrative.as_deref(),
            Some("**General info**\nMissed KPIs: erab_success_rate (value=92). Duration: 1800 seconds.")
        );
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_and_writes_nothing() {
        let store = SqliteStore::open_in_memory(Duration::from_secs(5)).unwrap();
        let mut state = WorkflowState::new();
        let out = retrieve(&store, "missing", &mut state).await.unwrap();
        assert_eq!(
            out,
            IncidentLookup::NotFound {
                incident_id: "missing".into()
            }
        );
        assert_eq!(
            out.to_json()["description"],
            "Couldn't find incident with id missing"
        );
        assert_eq!(state, WorkflowState::new());
    }

    #[tokio::test]
    async fn duplicate_rows_propagate() {
        let store = SqliteStore::open_in_memory(Duration::from_secs(5)).unwrap();
        store.insert_incident(&incident("dup")).await.unwrap();
        store.insert_incident(&incident("dup")).await.unwrap();
        let mut state = WorkflowState::new();
        assert!(retrieve(&store, "dup", &mut state).await.is_err());
        assert!(state.incident.is_none());
    }

    #[tokio::test]
    async fn store_failure_is_reported_apart_from_not_found() {
        let mut state = WorkflowState::new();
        let out = retrieve(&OfflineStore, "inc-1", &mut state).await.unwrap();
        assert_eq!(
            out.to_json(),
            json!({"status": "error", "description": STORE_FAILED})
        );
        assert_eq!(state, WorkflowState::new());
    }
}
