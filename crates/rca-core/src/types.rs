use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RcaError;

// ---------------------------------------------------------------------------
// IncidentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    New,
    Analyzed,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IncidentStatus::New => "NEW",
            IncidentStatus::Analyzed => "ANALYZED",
            IncidentStatus::Resolved => "RESOLVED",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IncidentStatus {
    type Err = RcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(IncidentStatus::New),
            "ANALYZED" => Ok(IncidentStatus::Analyzed),
            "RESOLVED" => Ok(IncidentStatus::Resolved),
            _ => Err(RcaError::Validation(format!("unknown incident status '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn all() -> &'static [Severity] {
        &[Severity::High, Severity::Medium, Severity::Low]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact match only. A lowercase or padded value is a contract violation,
/// not something to coerce.
impl std::str::FromStr for Severity {
    type Err = RcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Severity::High),
            "MEDIUM" => Ok(Severity::Medium),
            "LOW" => Ok(Severity::Low),
            _ => Err(RcaError::Validation(format!(
                "severity must be one of HIGH, MEDIUM, LOW; got '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Suggested,
    Executed,
    Failed,
}

impl ActionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionStatus::Suggested => "SUGGESTED",
            ActionStatus::Executed => "EXECUTED",
            ActionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// States of the root controller, in their nominal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitIncidentId,
    RetrieveIncident,
    RetrieveRules,
    SynthesizeInstructions,
    Analyze,
    ExecuteActions,
    ClassifySeverity,
    RetrieveExternalDocs,
    RetrieveInternalDocs,
    SearchPriorIncidents,
    GenerateReport,
    PresentReport,
    UpdateIncident,
    Idle,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::AwaitIncidentId,
            Phase::RetrieveIncident,
            Phase::RetrieveRules,
            Phase::SynthesizeInstructions,
            Phase::Analyze,
            Phase::ExecuteActions,
            Phase::ClassifySeverity,
            Phase::RetrieveExternalDocs,
            Phase::RetrieveInternalDocs,
            Phase::SearchPriorIncidents,
            Phase::GenerateReport,
            Phase::PresentReport,
            Phase::UpdateIncident,
            Phase::Idle,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Nominal successor. Branches (actions, update) are decided by the
    /// controller, not here.
    pub fn next(self) -> Option<Phase> {
        let all = Phase::all();
        all.get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::AwaitIncidentId => "await_incident_id",
            Phase::RetrieveIncident => "retrieve_incident",
            Phase::RetrieveRules => "retrieve_rules",
            Phase::SynthesizeInstructions => "synthesize_instructions",
            Phase::Analyze => "analyze",
            Phase::ExecuteActions => "execute_actions",
            Phase::ClassifySeverity => "classify_severity",
            Phase::RetrieveExternalDocs => "retrieve_external_docs",
            Phase::RetrieveInternalDocs => "retrieve_internal_docs",
            Phase::SearchPriorIncidents => "search_prior_incidents",
            Phase::GenerateReport => "generate_report",
            Phase::PresentReport => "present_report",
            Phase::UpdateIncident => "update_incident",
            Phase::Idle => "idle",
        }
    }

    /// Operator-facing description used in progress and confirmation prompts.
    pub fn describe(self) -> &'static str {
        match self {
            Phase::AwaitIncidentId => "Waiting for an incident id",
            Phase::RetrieveIncident => "Retrieving the incident",
            Phase::RetrieveRules => "Retrieving rules related to this incident",
            Phase::SynthesizeInstructions => "Generating analysis instructions from the rules",
            Phase::Analyze => "Performing the root cause analysis",
            Phase::ExecuteActions => "Reviewing suggested actions",
            Phase::ClassifySeverity => "Determining the severity level",
            Phase::RetrieveExternalDocs => "Retrieving external documentation",
            Phase::RetrieveInternalDocs => "Retrieving internal documentation",
            Phase::SearchPriorIncidents => "Searching for similar prior incidents",
            Phase::GenerateReport => "Generating the report",
            Phase::PresentReport => "Presenting the report",
            Phase::UpdateIncident => "Updating the incident with the report",
            Phase::Idle => "Done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
