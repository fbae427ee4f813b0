use super::{open_store, runtime};
use anyhow::Context;
use rca_core::embeddings::HttpEmbedder;
use rca_core::rules::YamlRuleCatalog;
use rca_core::{paths, Collaborators, Operator, RootController, RunOutcome};
use reasoning_agent::HttpReasoner;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// TerminalOperator
// ---------------------------------------------------------------------------

/// Operator backed by stdin/stdout. End of input declines everything.
struct TerminalOperator {
    first_id: Option<String>,
}

impl TerminalOperator {
    fn prompt(&self, text: &str) -> Option<String> {
        print!("{text}");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl Operator for TerminalOperator {
    fn incident_id(&mut self) -> Option<String> {
        if let Some(id) = self.first_id.take() {
            return Some(id);
        }
        self.prompt("\nIncident id to analyze (empty to quit): ")
            .filter(|id| !id.is_empty())
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompt(&format!("{prompt} [y/N] "))
            .map(|a| matches!(a.to_ascii_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false)
    }

    fn choose_action(&mut self, listing: &str, count: usize) -> Option<usize> {
        println!("\n{listing}");
        let answer = self.prompt(&format!("Run which action? (1-{count}, empty to go back): "))?;
        match answer.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => Some(n - 1),
            _ => None,
        }
    }

    fn show(&mut self, message: &str) {
        println!("{message}");
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(root: &Path, id: Option<String>) -> anyhow::Result<()> {
    let (config, store) = open_store(root)?;

    let reasoner = HttpReasoner::new(config.reasoning.endpoint.clone(), config.reasoning.timeout())
        .context("failed to build reasoning client")?
        .with_api_key(std::env::var(&config.reasoning.api_key_env).ok());
    let embedder = HttpEmbedder::new(
        config.embeddings.endpoint.clone(),
        config.embeddings.model.clone(),
        Duration::from_secs(config.embeddings.timeout_secs),
    )
    .context("failed to build embeddings client")?
    .with_api_key(std::env::var(&config.embeddings.api_key_env).ok());

    let deps = Collaborators {
        reasoner: Arc::new(reasoner),
        store: Arc::new(store),
        catalog: Arc::new(YamlRuleCatalog::new(paths::rules_path(root))),
        embedder: Arc::new(embedder),
    };
    tracing::info!(agent = %config.workflow.root_agent_name, "starting analysis session");
    let mut controller = RootController::new(deps, config).with_snapshots(root);
    let mut operator = TerminalOperator { first_id: id };

    let rt = runtime()?;
    loop {
        let outcome = rt
            .block_on(controller.run(&mut operator))
            .context("analysis aborted")?;
        match outcome {
            RunOutcome::Completed {
                incident_id,
                updated,
            } => {
                let note = if updated { "updated" } else { "not updated" };
                println!("\nAnalysis of {incident_id} finished ({note}).");
            }
            RunOutcome::Abandoned { incident_id, phase } => {
                println!("\nAnalysis of {incident_id} stopped before: {}.", phase.describe());
            }
            RunOutcome::Ended => return Ok(()),
        }
    }
}
