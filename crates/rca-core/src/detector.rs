use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::incident::{Incident, MissedKpi};
use crate::paths;
use crate::store::IncidentStore;
use crate::types::IncidentStatus;

pub const ERAB_SUCCESS_RATE: &str = "erab_success_rate";

// ---------------------------------------------------------------------------
// IncidentDetector
// ---------------------------------------------------------------------------

/// Finds cells whose ERAB success rate fell below the threshold.
///
/// Breaches are assumed contiguous: one candidate per (eNodeB, cell) pair
/// spanning the first to last breaching measurement, even if the KPI
/// recovered in between.
pub struct IncidentDetector<'a> {
    store: &'a dyn IncidentStore,
    threshold: f64,
}

impl<'a> IncidentDetector<'a> {
    pub fn new(store: &'a dyn IncidentStore, threshold: f64) -> Self {
        Self { store, threshold }
    }

    pub async fn scan(&self) -> Result<CandidateSet> {
        let breaches = self.store.kpi_breaches(ERAB_SUCCESS_RATE, self.threshold).await?;
        let description = format!("ERAB success rate is below {}%", self.threshold);
        let incidents: Vec<Incident> = breaches
            .into_iter()
            .map(|b| Incident {
                id: uuid::Uuid::new_v4().to_string(),
                description: description.clone(),
                kpi_missed: vec![MissedKpi::new(b.kpi, b.avg_value)],
                enodeb_id: Some(b.enodeb_id),
                cell_id: Some(b.cell_id),
                status: IncidentStatus::New,
                start_time: b.started,
                end_time: Some(b.ended),
                severity: None,
                cause: None,
                resolution: None,
            })
            .collect();
        tracing::info!(candidates = incidents.len(), "potential incidents detected");
        Ok(CandidateSet::from_incidents(incidents))
    }
}

// ---------------------------------------------------------------------------
// CandidateSet
// ---------------------------------------------------------------------------

/// Detected incidents awaiting confirmation, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateSet {
    #[serde(default)]
    pub candidates: BTreeMap<String, Incident>,
}

impl CandidateSet {
    pub fn from_incidents(incidents: Vec<Incident>) -> Self {
        Self {
            candidates: incidents.into_iter().map(|i| (i.id.clone(), i)).collect(),
        }
    }

    /// Missing file is an empty set.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::candidates_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::candidates_path(root), data.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Display order: lowest KPI value first.
    pub fn prioritized(&self) -> Vec<&Incident> {
        let mut list: Vec<&Incident> = self.candidates.values().collect();
        list.sort_by(|a, b| {
            let av = a.worst_kpi_value().unwrap_or(f64::INFINITY);
            let bv = b.worst_kpi_value().unwrap_or(f64::INFINITY);
            av.total_cmp(&bv)
        });
        list
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Incident),
    Failed { reason: String },
    Error { description: String },
}

impl CreateOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            CreateOutcome::Created(_) => json!({ "status": "Success" }),
            CreateOutcome::Failed { reason } => json!({ "status": "Failed", "reason": reason }),
            CreateOutcome::Error { description } => {
                json!({ "status": "error", "description": description })
            }
        }
    }
}

/// Persist exactly one candidate. A created candidate leaves the set.
pub async fn create_incident(
    store: &dyn IncidentStore,
    candidates: &mut CandidateSet,
    incident_id: &str,
) -> Result<CreateOutcome> {
    let Some(incident) = candidates.candidates.get(incident_id).cloned() else {
        tracing::error!(incident_id, "unable to find candidate incident");
        return Ok(CreateOutcome::Failed {
            reason: "Unable to find incident by provided id".to_string(),
        });
    };
    match store.insert_incident(&incident).await {
        Ok(()) => {
            candidates.candidates.remove(incident_id);
            tracing::info!(incident_id, "incident created");
            Ok(CreateOutcome::Created(incident))
        }
        Err(e) if e.is_recoverable() => {
            tracing::error!(incident_id, error = %e, "failed to save incident");
            Ok(CreateOutcome::Error {
                description: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
