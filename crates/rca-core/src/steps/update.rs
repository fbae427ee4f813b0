use serde_json::{json, Value};

use crate::embeddings::Embedder;
use crate::error::Result;
use crate::incident::IncidentUpdate;
use crate::state::{require, Slot, WorkflowState};
use crate::store::IncidentStore;
use crate::types::IncidentStatus;

use super::prior_incidents::EMBEDDING_FAILED;

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated { incident_id: String },
    Error { description: String },
}

impl UpdateOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            UpdateOutcome::Updated { .. } => json!({ "status": "success" }),
            UpdateOutcome::Error { description } => {
                json!({ "status": "error", "description": description })
            }
        }
    }
}

/// Persist the report: status ANALYZED, the report as preliminary analysis,
/// the severity, and the narrative with its embedding. Nothing is written if
/// embedding fails.
pub async fn update_incident(
    embedder: &dyn Embedder,
    store: &dyn IncidentStore,
    state: &WorkflowState,
) -> Result<UpdateOutcome> {
    let incident = state.incident()?;
    let severity = *require(&state.severity, Slot::SeverityLevel)?;
    let narrative = require(&state.narrative, Slot::IncidentData)?;
    let report = require(&state.report, Slot::Report)?;

    let embedding = match embedder.embed(narrative).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "failed to embed the incident narrative");
            return Ok(UpdateOutcome::Error {
                description: EMBEDDING_FAILED.to_string(),
            });
        }
    };
    let update = IncidentUpdate {
        status: IncidentStatus::Analyzed,
        severity: Some(severity),
        preliminary_analysis: report.clone(),
        events: narrative.clone(),
        events_embeddings: embedding,
    };
    match store.update_incident(&incident.id, &update).await {
        Ok(()) => Ok(UpdateOutcome::Updated {
            incident_id: incident.id.clone(),
        }),
        Err(e) if e.is_recoverable() => {
            tracing::error!(incident_id = %incident.id, error = %e, "incident update failed");
            Ok(UpdateOutcome::Error {
                description: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}
