//! Root controller: sequences the delegate steps for one incident and owns
//! the transfer-of-control protocol between them.
//!
//! The controller never retries. A recoverable failure is shown to the
//! operator and the machine goes back to waiting for an incident id; giving
//! the same id again resumes at the phase that failed.

use reasoning_agent::Reasoner;
use std::path::PathBuf;
use std::sync::Arc;

use crate::agent_loop::StepContext;
use crate::capability::NetworkTools;
use crate::config::{Config, StepModel};
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::rules::RuleCatalog;
use crate::state::WorkflowState;
use crate::steps::documentation::{DocOutcome, DocumentationRetriever};
use crate::steps::incident_retriever::IncidentLookup;
use crate::steps::prior_incidents::PriorSearchOutcome;
use crate::steps::update::UpdateOutcome;
use crate::steps::{
    action_executor, analyzer, incident_retriever, instructions, prior_incidents, report,
    rule_retriever, severity, update,
};
use crate::store::IncidentStore;
use crate::types::Phase;

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// The human on the other side of the run.
pub trait Operator: Send {
    /// Next incident id to analyze. `None` ends the session.
    fn incident_id(&mut self) -> Option<String>;
    fn confirm(&mut self, prompt: &str) -> bool;
    /// Pick a suggested action by 0-based position, or `None` to decline.
    fn choose_action(&mut self, listing: &str, count: usize) -> Option<usize>;
    fn show(&mut self, message: &str);
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Collaborators {
    pub reasoner: Arc<dyn Reasoner>,
    pub store: Arc<dyn IncidentStore>,
    pub catalog: Arc<dyn RuleCatalog>,
    pub embedder: Arc<dyn Embedder>,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The report was produced; `updated` says whether it was persisted.
    Completed { incident_id: String, updated: bool },
    /// The operator declined a step confirmation.
    Abandoned { incident_id: String, phase: Phase },
    /// The operator stopped supplying incident ids.
    Ended,
}

fn step_context<'a>(reasoner: &'a dyn Reasoner, config: &'a Config, step: StepModel) -> StepContext<'a> {
    StepContext {
        reasoner,
        model: config.models.model_for(step),
        max_turns: config.reasoning.max_turns,
        include_thoughts: config.reasoning.show_thoughts,
    }
}

// ---------------------------------------------------------------------------
// RootController
// ---------------------------------------------------------------------------

pub struct RootController {
    deps: Collaborators,
    network: NetworkTools,
    config: Config,
    snapshot_root: Option<PathBuf>,
    phase: Phase,
    state: WorkflowState,
    current_id: Option<String>,
    failed_phase: Option<Phase>,
    updated: bool,
}

impl RootController {
    pub fn new(deps: Collaborators, config: Config) -> Self {
        let network = NetworkTools::new(deps.store.clone());
        Self {
            deps,
            network,
            config,
            snapshot_root: None,
            phase: Phase::AwaitIncidentId,
            state: WorkflowState::new(),
            current_id: None,
            failed_phase: None,
            updated: false,
        }
    }

    /// Save the workflow state under `root` after every completed step.
    pub fn with_snapshots(mut self, root: impl Into<PathBuf>) -> Self {
        self.snapshot_root = Some(root.into());
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Drive the machine until the report is presented, the operator
    /// abandons, or no more incident ids are supplied. Afterwards the
    /// controller waits for an id again, so `run` can be called repeatedly.
    pub async fn run(&mut self, operator: &mut dyn Operator) -> Result<RunOutcome> {
        loop {
            match self.phase {
                Phase::AwaitIncidentId => {
                    let Some(raw) = operator.incident_id() else {
                        return Ok(RunOutcome::Ended);
                    };
                    let id = raw.trim().to_string();
                    if id.is_empty() {
                        operator.show("An incident id is required.");
                        continue;
                    }
                    self.begin(id);
                }
                Phase::Idle => {
                    self.phase = Phase::AwaitIncidentId;
                    let incident_id = self.current_id.clone().unwrap_or_default();
                    return Ok(RunOutcome::Completed {
                        incident_id,
                        updated: self.updated,
                    });
                }
                phase => {
                    if self.config.workflow.confirm_each_step {
                        let prompt = format!("Next step: {}. Continue?", phase.describe());
                        if !operator.confirm(&prompt) {
                            tracing::info!(phase = %phase, "operator abandoned the run");
                            self.fail(phase);
                            return Ok(RunOutcome::Abandoned {
                                incident_id: self.current_id.clone().unwrap_or_default(),
                                phase,
                            });
                        }
                    } else {
                        operator.show(&format!("{}...", phase.describe()));
                    }

                    // A failed step must leave no partial writes behind for the resume.
                    let checkpoint = self.state.clone();
                    match self.step(phase, operator).await {
                        Ok(next) => {
                            tracing::info!(from = %phase, to = %next, "transition");
                            self.snapshot()?;
                            self.phase = next;
                        }
                        Err(e) if e.is_recoverable() => {
                            tracing::error!(phase = %phase, error = %e, "step failed");
                            self.state = checkpoint;
                            operator.show(&format!(
                                "{} failed: {e}. Supply the same incident id to resume.",
                                phase.describe()
                            ));
                            self.fail(phase);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    /// Same id after a failure resumes; anything else starts over.
    fn begin(&mut self, id: String) {
        let resume = match (self.failed_phase, &self.current_id) {
            (Some(phase), Some(current)) if *current == id => Some(phase),
            _ => None,
        };
        self.failed_phase = None;
        if let Some(phase) = resume {
            tracing::info!(incident_id = %id, phase = %phase, "resuming run");
            self.phase = phase;
            return;
        }
        self.state = WorkflowState::new();
        self.updated = false;
        self.current_id = Some(id);
        self.phase = Phase::RetrieveIncident;
    }

    fn fail(&mut self, phase: Phase) {
        self.failed_phase = Some(phase);
        self.phase = Phase::AwaitIncidentId;
    }

    fn snapshot(&self) -> Result<()> {
        match &self.snapshot_root {
            Some(root) if self.state.incident.is_some() => self.state.save(root),
            _ => Ok(()),
        }
    }

    /// Run one phase and return the next one.
    async fn step(&mut self, phase: Phase, operator: &mut dyn Operator) -> Result<Phase> {
        let reasoner = self.deps.reasoner.as_ref();
        let config = &self.config;
        let state = &mut self.state;

        let next = match phase {
            Phase::RetrieveIncident => {
                let id = self.current_id.clone().unwrap_or_default();
                match incident_retriever::retrieve(self.deps.store.as_ref(), &id, state).await? {
                    IncidentLookup::Found(incident) => {
                        operator.show(&incident.summary());
                        Phase::RetrieveRules
                    }
                    lookup => {
                        let reply = lookup.to_json();
                        let msg = reply["description"].as_str().unwrap_or("lookup failed");
                        operator.show(msg);
                        // Stay put: the operator may retry this id or pick another.
                        self.failed_phase = Some(Phase::RetrieveIncident);
                        Phase::AwaitIncidentId
                    }
                }
            }
            Phase::RetrieveRules => {
                let found = rule_retriever::retrieve(self.deps.catalog.as_ref(), state).await?;
                operator.show(&format!("Found {found} matching rule(s)."));
                Phase::SynthesizeInstructions
            }
            Phase::SynthesizeInstructions => {
                let ctx = step_context(reasoner, config, StepModel::InstructionGenerator);
                instructions::synthesize(&ctx, state).await?;
                Phase::Analyze
            }
            Phase::Analyze => {
                let ctx = step_context(reasoner, config, StepModel::Analyzer);
                let outcome = analyzer::analyze(&ctx, &self.network, state).await?;
                operator.show(&outcome.analysis);
                if outcome.proposed > 0 || state.has_suggested_actions() {
                    Phase::ExecuteActions
                } else {
                    Phase::ClassifySeverity
                }
            }
            Phase::ExecuteActions => {
                let summary = action_executor::run(&self.network, state, operator).await?;
                tracing::info!(
                    executed = summary.executed,
                    failed = summary.failed,
                    exit = ?summary.exit,
                    "control returned from action executor"
                );
                Phase::ClassifySeverity
            }
            Phase::ClassifySeverity => {
                let ctx = step_context(reasoner, config, StepModel::SeverityClassifier);
                let level = severity::classify(&ctx, &self.network, state).await?;
                operator.show(&format!("Severity level: {level}"));
                Phase::RetrieveExternalDocs
            }
            Phase::RetrieveExternalDocs => {
                let ctx = step_context(reasoner, config, StepModel::ExternalDocRetriever);
                let retriever =
                    DocumentationRetriever::external(config.documentation.external_sites.clone());
                let outcome = retriever.retrieve(&ctx, state).await?;
                show_docs(operator, "External", &outcome);
                Phase::RetrieveInternalDocs
            }
            Phase::RetrieveInternalDocs => {
                let ctx = step_context(reasoner, config, StepModel::InternalDocRetriever);
                let retriever =
                    DocumentationRetriever::internal(config.documentation.internal_datastore_id.clone());
                let outcome = retriever.retrieve(&ctx, state).await?;
                show_docs(operator, "Internal", &outcome);
                Phase::SearchPriorIncidents
            }
            Phase::SearchPriorIncidents => {
                let outcome = prior_incidents::search(
                    self.deps.embedder.as_ref(),
                    self.deps.store.as_ref(),
                    &config.similarity,
                    state,
                )
                .await?;
                match &outcome {
                    PriorSearchOutcome::Found(records) => {
                        operator.show(&format!("Found {} similar prior incident(s).", records.len()))
                    }
                    PriorSearchOutcome::NoneFound => operator.show("No similar prior incidents found."),
                    PriorSearchOutcome::Error { description } => operator.show(description),
                }
                Phase::GenerateReport
            }
            Phase::GenerateReport => {
                report::generate(state);
                Phase::PresentReport
            }
            Phase::PresentReport => {
                let text = state.report.clone().unwrap_or_else(|| report::generate(state));
                operator.show(&text);
                if operator.confirm("Update the incident with this report?") {
                    Phase::UpdateIncident
                } else {
                    Phase::Idle
                }
            }
            Phase::UpdateIncident => {
                let outcome = update::update_incident(
                    self.deps.embedder.as_ref(),
                    self.deps.store.as_ref(),
                    state,
                )
                .await?;
                match outcome {
                    UpdateOutcome::Updated { incident_id } => {
                        tracing::info!(incident_id = %incident_id, "incident updated");
                        operator.show(&format!("Incident {incident_id} updated."));
                        self.updated = true;
                        Phase::Idle
                    }
                    UpdateOutcome::Error { description } => {
                        operator.show(&description);
                        self.failed_phase = Some(Phase::UpdateIncident);
                        Phase::AwaitIncidentId
                    }
                }
            }
            Phase::AwaitIncidentId | Phase::Idle => phase,
        };
        Ok(next)
    }
}

fn show_docs(operator: &mut dyn Operator, kind: &str, outcome: &DocOutcome) {
    match outcome {
        DocOutcome::Grounded { references, .. } => operator.show(&format!(
            "{kind} documentation: {} reference(s) found.",
            references.len()
        )),
        DocOutcome::NotFound(msg) => operator.show(msg),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
