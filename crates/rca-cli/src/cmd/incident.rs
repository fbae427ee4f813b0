use super::{open_store, runtime};
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use rca_core::detector::{create_incident, CandidateSet, CreateOutcome, IncidentDetector};
use rca_core::incident::{to_display, Incident};
use rca_core::store::IncidentStore;
use std::path::Path;

#[derive(Subcommand)]
pub enum IncidentSubcommand {
    /// Scan KPI measurements for threshold breaches and record candidates
    Scan,

    /// Show the candidates recorded by the last scan
    Candidates,

    /// Persist one candidate as a NEW incident
    Create { id: String },

    /// Show a stored incident
    Show { id: String },

    /// List stored incidents
    List,
}

pub fn run(root: &Path, subcmd: IncidentSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        IncidentSubcommand::Scan => scan(root, json),
        IncidentSubcommand::Candidates => candidates(root, json),
        IncidentSubcommand::Create { id } => create(root, &id, json),
        IncidentSubcommand::Show { id } => show(root, &id, json),
        IncidentSubcommand::List => list(root, json),
    }
}

fn candidate_rows(set: &CandidateSet) -> Vec<Vec<String>> {
    set.prioritized()
        .into_iter()
        .map(|i| {
            vec![
                i.id.clone(),
                i.enodeb_id.clone().unwrap_or_default(),
                i.cell_id.clone().unwrap_or_default(),
                i.kpi_missed
                    .iter()
                    .map(|k| k.describe())
                    .collect::<Vec<_>>()
                    .join(", "),
                to_display(&i.start_time),
                i.end_time.as_ref().map(to_display).unwrap_or_default(),
            ]
        })
        .collect()
}

fn print_candidates(set: &CandidateSet, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&set.prioritized());
    }
    print_table(
        &["ID", "ENODEB", "CELL", "MISSED KPIS", "START", "END"],
        &candidate_rows(set),
        "No potential incidents found.",
    );
    Ok(())
}

fn scan(root: &Path, json: bool) -> anyhow::Result<()> {
    let (config, store) = open_store(root)?;
    let threshold = config.detection.erab_success_rate_threshold;
    let set = runtime()?
        .block_on(IncidentDetector::new(&store, threshold).scan())
        .context("incident scan failed")?;
    set.save(root).context("failed to save candidates")?;
    print_candidates(&set, json)
}

fn candidates(root: &Path, json: bool) -> anyhow::Result<()> {
    let set = CandidateSet::load(root).context("failed to load candidates")?;
    print_candidates(&set, json)
}

fn create(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let (_, store) = open_store(root)?;
    let mut set = CandidateSet::load(root).context("failed to load candidates")?;
    let outcome = runtime()?.block_on(create_incident(&store, &mut set, id))?;
    set.save(root).context("failed to save candidates")?;

    if json {
        print_json(&outcome.to_json())?;
    }
    match outcome {
        CreateOutcome::Created(incident) => {
            if !json {
                println!("Created incident {}", incident.id);
            }
            Ok(())
        }
        CreateOutcome::Failed { reason } => anyhow::bail!("{reason}: {id}"),
        CreateOutcome::Error { description } => anyhow::bail!("{description}"),
    }
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let (_, store) = open_store(root)?;
    let incident: Incident = runtime()?
        .block_on(store.get_incident(id))?
        .with_context(|| format!("incident not found: {id}"))?;
    if json {
        print_json(&incident)?;
    } else {
        print!("{}", incident.summary());
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, store) = open_store(root)?;
    let incidents = runtime()?.block_on(store.list_incidents())?;
    if json {
        return print_json(&incidents);
    }
    let rows: Vec<Vec<String>> = incidents
        .iter()
        .map(|i| {
            vec![
                i.id.clone(),
                i.status.to_string(),
                i.severity.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                to_display(&i.start_time),
                i.description.clone(),
            ]
        })
        .collect();
    print_table(
        &["ID", "STATUS", "SEVERITY", "START", "DESCRIPTION"],
        &rows,
        "No incidents.",
    );
    Ok(())
}
