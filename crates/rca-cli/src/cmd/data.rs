use super::{open_store, runtime};
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use rca_core::store::DataSet;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum DataSubcommand {
    /// Load KPI measurements, cell traces and cell configuration from a
    /// YAML or JSON file
    Load { file: PathBuf },
}

pub fn run(root: &Path, subcmd: DataSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DataSubcommand::Load { file } => load(root, &file, json),
    }
}

fn load(root: &Path, file: &Path, json: bool) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    // YAML is a superset of JSON, so one parser covers both.
    let data: DataSet = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    let (_, store) = open_store(root)?;
    let counts = runtime()?.block_on(store.load_dataset(data))?;

    if json {
        print_json(&counts)?;
    } else {
        println!(
            "Loaded {} KPI measurement(s), {} cell trace(s), {} cell configuration(s).",
            counts.performance_kpi, counts.cell_traces, counts.cell_config
        );
    }
    Ok(())
}
