use anyhow::Context;
use rca_core::{config::Config, io, paths, store::SqliteStore};
use std::path::Path;

const SAMPLE_RULES: &str = r#"# Rule catalog. An entry applies to an incident when one of its
# kpi_missed names is among the incident's missed KPIs.
- id: erab-success-rate
  description: ERAB setup success rate below target
  kpi_missed:
    - erab_success_rate
  processing_rule: |
    Gather cell trace statistics for the incident window. If most failed
    connections are radio related, check the uplink RSSI level. An RSSI
    above -105 dBm points at uplink interference: compare the uplink
    configuration against pZeroNominalPucch -116 and pZeroNominalPusch -103
    and propose an uplink configuration adjustment when they differ.
  processing_rule_tools:
    - get_cell_trace_statistics
    - get_uplink_rssi_level
    - get_uplink_configuration
  severity_determination_rule: |
    HIGH when the success rate is below 90 or the incident lasted more than
    an hour. MEDIUM when it is between 90 and 95. LOW otherwise.
  severity_determination_rule_tools: []
"#;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing RCA in: {}", root.display());

    for dir in [paths::RCA_DIR, paths::RUNS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let config = if paths::config_path(root).exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
        Config::load(root).context("failed to load config")?
    } else {
        let cfg = Config::default();
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        cfg
    };

    let written = io::write_if_missing(&paths::rules_path(root), SAMPLE_RULES.as_bytes())
        .context("failed to write rules.yaml")?;
    println!(
        "  {} {}",
        if written { "created:" } else { "exists: " },
        paths::RULES_FILE
    );

    let db = config.store_path(root);
    let existed = db.exists();
    SqliteStore::open(&db, config.store.query_timeout())
        .with_context(|| format!("failed to create incident store at {}", db.display()))?;
    println!(
        "  {} {}",
        if existed { "exists: " } else { "created:" },
        db.strip_prefix(root).unwrap_or(&db).display()
    );

    println!("\nNext: load measurements with 'rca data load <file>', then 'rca incident scan'.");
    Ok(())
}
