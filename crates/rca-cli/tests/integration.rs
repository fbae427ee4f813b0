#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn rca(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rca").unwrap();
    cmd.current_dir(dir.path())
        .env("RCA_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &TempDir) {
    rca(dir).arg("init").assert().success();
}

const MEASUREMENTS: &str = r#"
performance_kpi:
  - { enodeb_id: E1, cell_id: C1, kpi: erab_success_rate, value: 99.0,
      measurement_start: "2025-03-01T09:45:00Z", measurement_end: "2025-03-01T10:00:00Z" }
  - { enodeb_id: E1, cell_id: C1, kpi: erab_success_rate, value: 92.0,
      measurement_start: "2025-03-01T10:00:00Z", measurement_end: "2025-03-01T10:15:00Z" }
  - { enodeb_id: E1, cell_id: C1, kpi: erab_success_rate, value: 92.0,
      measurement_start: "2025-03-01T10:15:00Z", measurement_end: "2025-03-01T10:30:00Z" }
cell_config:
  - { enodeb_id: E1, cell_id: C1, uplink_rssi: -100.0,
      p_zero_nominal_pucch: -110, p_zero_nominal_pusch: -94 }
"#;

fn load_measurements(dir: &TempDir) {
    let file = dir.path().join("measurements.yaml");
    std::fs::write(&file, MEASUREMENTS).unwrap();
    rca(dir)
        .args(["data", "load"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 3 KPI measurement(s)"));
}

fn scan_ids(dir: &TempDir) -> Vec<String> {
    let out = rca(dir)
        .args(["--json", "incident", "scan"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let candidates: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    candidates
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// rca init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_project_files() {
    let dir = TempDir::new().unwrap();
    rca(&dir).arg("init").assert().success();

    assert!(dir.path().join(".rca").is_dir());
    assert!(dir.path().join(".rca/runs").is_dir());
    assert!(dir.path().join(".rca/config.yaml").exists());
    assert!(dir.path().join(".rca/rules.yaml").exists());
    assert!(dir.path().join(".rca/incidents.db").exists());
}

#[test]
fn init_is_idempotent_and_keeps_edits() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(dir.path().join(".rca/rules.yaml"), "[]\n").unwrap();
    rca(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .rca/config.yaml"));
    let rules = std::fs::read_to_string(dir.path().join(".rca/rules.yaml")).unwrap();
    assert_eq!(rules, "[]\n");
}

#[test]
fn commands_before_init_fail() {
    let dir = TempDir::new().unwrap();
    rca(&dir)
        .args(["incident", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

// ---------------------------------------------------------------------------
// rca config / rules
// ---------------------------------------------------------------------------

#[test]
fn default_config_validates_with_warnings_only() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    rca(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("internal_datastore_id"));
}

#[test]
fn zero_max_incidents_is_a_validation_error() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join(".rca/config.yaml"),
        "similarity:\n  max_incidents: 0\n",
    )
    .unwrap();
    rca(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] similarity.max_incidents is 0"));
}

#[test]
fn config_show_prints_defaults() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    rca(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cutoff_distance: 0.5"));
}

#[test]
fn rules_list_shows_sample_rule() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    rca(&dir)
        .args(["rules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("erab-success-rate"));
}

// ---------------------------------------------------------------------------
// rca incident
// ---------------------------------------------------------------------------

#[test]
fn scan_finds_one_candidate_per_cell() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    load_measurements(&dir);

    let ids = scan_ids(&dir);
    assert_eq!(ids.len(), 1);
    assert!(dir.path().join(".rca/candidates.yaml").exists());

    rca(&dir)
        .args(["incident", "candidates"])
        .assert()
        .success()
        .stdout(predicate::str::contains(ids[0].as_str()))
        .stdout(predicate::str::contains("erab_success_rate (value=92)"));
}

#[test]
fn create_persists_candidate_as_new_incident() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    load_measurements(&dir);
    let id = scan_ids(&dir).remove(0);

    rca(&dir)
        .args(["incident", "create", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Created incident {id}")));

    rca(&dir)
        .args(["incident", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: NEW"))
        .stdout(predicate::str::contains("ERAB success rate is below 97%"));

    rca(&dir)
        .args(["incident", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()));

    // a created candidate cannot be created twice
    rca(&dir)
        .args(["incident", "create", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unable to find incident by provided id"));
}

#[test]
fn create_unknown_candidate_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    rca(&dir)
        .args(["--json", "incident", "create", "nope"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"status\": \"Failed\""));
}

#[test]
fn show_unknown_incident_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    rca(&dir)
        .args(["incident", "show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("incident not found: nope"));
}

// ---------------------------------------------------------------------------
// rca analyze
// ---------------------------------------------------------------------------

#[test]
fn analyze_without_input_ends_cleanly() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    rca(&dir).arg("analyze").write_stdin("").assert().success();
}

#[test]
fn analyze_unknown_incident_reports_not_found() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    rca(&dir)
        .args(["analyze", "missing-id"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Couldn't find incident with id missing-id"));
}
