use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{RcaError, Result};
use crate::types::{IncidentStatus, Severity};

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Canonical persistence format: UTC with microsecond fraction.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Locale-style format shown to operators (`%c` in the C locale).
pub const DISPLAY_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

pub fn to_wire(ts: &DateTime<Utc>) -> String {
    ts.format(WIRE_FORMAT).to_string()
}

pub fn to_display(ts: &DateTime<Utc>) -> String {
    ts.format(DISPLAY_FORMAT).to_string()
}

/// Parse a timestamp supplied at a boundary: the wire format, RFC 3339, or
/// the display format.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, DISPLAY_FORMAT) {
        return Ok(naive.and_utc());
    }
    Err(RcaError::Validation(format!("unrecognised timestamp '{s}'")))
}

// ---------------------------------------------------------------------------
// MissedKpi
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissedKpi {
    pub kpi: String,
    pub value: f64,
}

impl MissedKpi {
    pub fn new(kpi: impl Into<String>, value: f64) -> Self {
        Self {
            kpi: kpi.into(),
            value,
        }
    }

    pub fn describe(&self) -> String {
        format!("{} (value={})", self.kpi, self.value)
    }
}

// ---------------------------------------------------------------------------
// Incident
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub kpi_missed: Vec<MissedKpi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enodeb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_id: Option<String>,
    pub status: IncidentStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl Incident {
    pub fn missed_kpi_names(&self) -> BTreeSet<String> {
        self.kpi_missed.iter().map(|k| k.kpi.clone()).collect()
    }

    /// Lowest missed KPI value, used to prioritise candidates for display.
    pub fn worst_kpi_value(&self) -> Option<f64> {
        self.kpi_missed
            .iter()
            .map(|k| k.value)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Seconds between start and end; zero for an open incident.
    pub fn duration_secs(&self) -> i64 {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds())
            .unwrap_or(0)
    }

    /// Narrative "General info" section body.
    pub fn general_info(&self) -> String {
        let kpis: Vec<String> = self.kpi_missed.iter().map(MissedKpi::describe).collect();
        format!(
            "Missed KPIs: {}. Duration: {} seconds.",
            kpis.join(", "),
            self.duration_secs()
        )
    }

    /// Multi-line operator view with display-format timestamps.
    pub fn summary(&self) -> String {
        let kpis: Vec<String> = self.kpi_missed.iter().map(MissedKpi::describe).collect();
        let mut out = format!(
            "Incident {}\n  Description: {}\n  Status: {}\n  eNodeB: {}\n  Cell: {}\n  Missed KPIs: {}\n  Start: {}\n",
            self.id,
            self.description,
            self.status,
            self.enodeb_id.as_deref().unwrap_or("-"),
            self.cell_id.as_deref().unwrap_or("-"),
            kpis.join(", "),
            to_display(&self.start_time),
        );
        if let Some(end) = &self.end_time {
            out.push_str(&format!("  End: {}\n", to_display(end)));
        }
        if let Some(sev) = self.severity {
            out.push_str(&format!("  Severity: {sev}\n"));
        }
        out
    }
}

/// Fields written once, at the end of a workflow run.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentUpdate {
    pub status: IncidentStatus,
    pub severity: Option<Severity>,
    pub preliminary_analysis: String,
    pub events: String,
    pub events_embeddings: Vec<f32>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
