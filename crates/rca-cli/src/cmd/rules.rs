use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use rca_core::{paths, rules::YamlRuleCatalog};
use std::path::Path;

#[derive(Subcommand)]
pub enum RulesSubcommand {
    /// List catalog entries
    List {
        /// Also print the processing and severity rule bodies
        #[arg(long)]
        full: bool,
    },
}

pub fn run(root: &Path, subcmd: RulesSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RulesSubcommand::List { full } => list(root, full, json),
    }
}

fn list(root: &Path, full: bool, json: bool) -> anyhow::Result<()> {
    let catalog = YamlRuleCatalog::new(paths::rules_path(root));
    let entries = catalog.entries().context("failed to read rule catalog")?;

    if json {
        return print_json(&entries);
    }
    if full {
        if entries.is_empty() {
            println!("No rules in {}.", paths::RULES_FILE);
        }
        for e in &entries {
            println!("{}: {}", e.id, e.description);
            println!("  KPIs: {}", e.kpi_missed.join(", "));
            println!("  Processing rule:\n    {}", e.processing_rule.trim().replace('\n', "\n    "));
            println!(
                "  Severity rule:\n    {}",
                e.severity_determination_rule.trim().replace('\n', "\n    ")
            );
            println!();
        }
        return Ok(());
    }
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.id.clone(),
                e.kpi_missed.join(","),
                e.processing_rule_tools.join(","),
                e.description.clone(),
            ]
        })
        .collect();
    print_table(
        &["ID", "KPIS", "TOOLS", "DESCRIPTION"],
        &rows,
        &format!("No rules in {}.", paths::RULES_FILE),
    );
    Ok(())
}
