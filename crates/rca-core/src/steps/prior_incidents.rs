use serde_json::{json, Value};

use crate::config::SimilarityConfig;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::similarity::{MatchLabel, VectorQuery};
use crate::state::{require, Slot, WorkflowState};
use crate::store::{IncidentStore, PriorIncident};

use super::STORE_FAILED;

pub const EMBEDDING_FAILED: &str = "Failed to generate embeddings for the event.";
const NOT_DETERMINED: &str = "Not yet determined";

/// Outcome of the similar-incident search. "Found none" and "search failed"
/// are distinct.
#[derive(Debug, Clone, PartialEq)]
pub enum PriorSearchOutcome {
    Found(Vec<String>),
    NoneFound,
    Error { description: String },
}

impl PriorSearchOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            PriorSearchOutcome::Found(records) => {
                json!({ "status": "success", "prior_incidents": records })
            }
            PriorSearchOutcome::NoneFound => json!({ "status": "no similar incidents found" }),
            PriorSearchOutcome::Error { description } => {
                json!({ "status": "error", "description": description })
            }
        }
    }
}

/// Render one hit for the report.
pub fn format_prior_incident(hit: &PriorIncident, likely_match_distance: f64) -> String {
    let or_unknown = |v: &Option<String>| {
        v.as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(NOT_DETERMINED)
            .to_string()
    };
    format!(
        "*Incident {}*\n**Search distance**: {} ({})\n**Events**\n{}\n**Final analysis**\n{}\n**Cause**\n{}\n**Resolution**\n{}\n",
        hit.incident_id,
        hit.distance,
        MatchLabel::classify(hit.distance, likely_match_distance),
        hit.events,
        or_unknown(&hit.final_analysis),
        or_unknown(&hit.cause),
        or_unknown(&hit.resolution),
    )
}

/// Embed the narrative and look up the nearest stored incidents. Writes
/// `prior_incidents` only when something was found.
pub async fn search(
    embedder: &dyn Embedder,
    store: &dyn IncidentStore,
    similarity: &SimilarityConfig,
    state: &mut WorkflowState,
) -> Result<PriorSearchOutcome> {
    let narrative = require(&state.narrative, Slot::IncidentData)?;
    let embedding = match embedder.embed(narrative).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "failed to embed the incident narrative");
            return Ok(PriorSearchOutcome::Error {
                description: EMBEDDING_FAILED.to_string(),
            });
        }
    };
    let query = VectorQuery {
        embedding: &embedding,
        top_k: similarity.max_incidents,
        cutoff: similarity.cutoff_distance,
        metric: similarity.distance,
    };
    let hits = match store.nearest_incidents(query).await {
        Ok(hits) => hits,
        Err(e) if e.is_recoverable() => {
            tracing::error!(error = %e, "prior incident search failed");
            return Ok(PriorSearchOutcome::Error {
                description: STORE_FAILED.to_string(),
            });
        }
        Err(e) => return Err(e),
    };
    if hits.is_empty() {
        tracing::info!("no similar incidents found");
        return Ok(PriorSearchOutcome::NoneFound);
    }
    let records: Vec<String> = hits
        .iter()
        .map(|h| format_prior_incident(h, similarity.likely_match_distance))
        .collect();
    tracing::info!(found = records.len(), "similar incidents found");
    state.prior_incidents = Some(records.clone());
    Ok(PriorSearchOutcome::Found(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RcaError;
    use crate::incident::{Incident, IncidentUpdate, MissedKpi};
    use crate::similarity::DistanceMetric;
    use crate::store::offline::OfflineStore;
    use crate::store::SqliteStore;
    use crate::types::IncidentStatus;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration;

    struct FixedEmbedder(Option<Vec<f32>>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.0
                .clone()
                .ok_or_else(|| RcaError::Upstream("embedding service down".into()))
        }
    }

    fn similarity() -> SimilarityConfig {
        SimilarityConfig {
            cutoff_distance: 0.5,
            likely_match_distance: 0.9,
            max_incidents: 5,
            distance: DistanceMetric::Euclidean,
        }
    }

    async fn store_with(hits: &[(&str, f32, Option<&str>)]) -> SqliteStore {
        let store = SqliteStore::open_in_memory(Duration::from_secs(5)).unwrap();
        for (id, x, cause) in hits {
            store
                .insert_incident(&Incident {
                    id: id.to_string(),
                    description: "d".into(),
                    kpi_missed: vec![MissedKpi::new("erab_success_rate", 92.0)],
                    enodeb_id: None,
                    cell_id: None,
                    status: IncidentStatus::New,
                    start_time: Utc::now(),
                    end_time: None,
                    severity: None,
                    cause: cause.map(str::to_string),
                    resolution: None,
                })
                .await
                .unwrap();
            store
                .update_incident(
                    id,
                    &IncidentUpdate {
                        status: IncidentStatus::Analyzed,
                        severity: None,
                        preliminary_analysis: String::new(),
                        events: format!("events {id}"),
                        events_embeddings: vec![*x],
                    },
                )
                .await
                .unwrap();
        }
        store
    }

    fn state() -> WorkflowState {
        let mut st = WorkflowState::new();
        st.append_narrative("General info", "Missed KPIs: erab_success_rate (value=92).");
        st
    }

    #[tokio::test]
    async fn labels_hits_and_excludes_beyond_cutoff() {
        let store = store_with(&[("a", 0.3, Some("Antenna tilt")), ("b", 0.6, None)]).await;
        let embedder = FixedEmbedder(Some(vec![0.0]));
        let mut st = state();
        let out = search(&embedder, &store, &similarity(), &mut st).await.unwrap();
        let PriorSearchOutcome::Found(records) = out else {
            panic!("expected Found");
        };
        assert_eq!(records.len(), 1);
        assert!(records[0].starts_with("*Incident a*\n"));
        assert!(records[0].contains("(likely match)"));
        assert!(records[0].contains("**Cause**\nAntenna tilt\n"));
        assert!(records[0].contains("**Resolution**\nNot yet determined\n"));
        assert_eq!(st.prior_incidents.unwrap().len(), 1);
    }

    #[test]
    fn somewhat_similar_label_above_likely_threshold() {
        let hit = PriorIncident {
            incident_id: "x".into(),
            distance: 0.7,
            events: "e".into(),
            final_analysis: None,
            cause: None,
            resolution: None,
        };
        assert!(format_prior_incident(&hit, 0.5).contains("0.7 (somewhat similar)"));
        assert!(format_prior_incident(&hit, 0.9).contains("0.7 (likely match)"));
    }

    #[tokio::test]
    async fn none_found_is_distinct_from_error() {
        let store = store_with(&[("far", 0.8, None)]).await;
        let mut st = state();
        let out = search(&FixedEmbedder(Some(vec![0.0])), &store, &similarity(), &mut st)
            .await
            .unwrap();
        assert_eq!(out, PriorSearchOutcome::NoneFound);
        assert_eq!(out.to_json()["status"], "no similar incidents found");
        assert!(st.prior_incidents.is_none());
    }

    #[tokio::test]
    async fn embedding_failure_is_reported_not_raised() {
        let store = store_with(&[]).await;
        let mut st = state();
        let out = search(&FixedEmbedder(None), &store, &similarity(), &mut st)
            .await
            .unwrap();
        assert_eq!(
            out.to_json(),
            json!({"status": "error", "description": EMBEDDING_FAILED})
        );
    }

    #[tokio::test]
    async fn missing_narrative_is_precondition_failure() {
        let store = store_with(&[]).await;
        let mut st = WorkflowState::new();
        let err = search(&FixedEmbedder(Some(vec![0.0])), &store, &similarity(), &mut st)
            .await
            .unwrap_err();
        assert!(matches!(err, RcaError::MissingPrecondition(ref s) if s == "incident_data"));
    }

    #[tokio::test]
    async fn store_failure_uses_fixed_description() {
        let mut st = state();
        let out = search(&FixedEmbedder(Some(vec![0.0])), &OfflineStore, &similarity(), &mut st)
            .await
            .unwrap();
        assert_eq!(
            out.to_json(),
            json!({"status": "error", "description": STORE_FAILED})
        );
        assert!(st.prior_incidents.is_none());
    }
}
