use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const RCA_DIR: &str = ".rca";
pub const RUNS_DIR: &str = ".rca/runs";

pub const CONFIG_FILE: &str = ".rca/config.yaml";
pub const RULES_FILE: &str = ".rca/rules.yaml";
pub const CANDIDATES_FILE: &str = ".rca/candidates.yaml";
pub const DEFAULT_DB_FILE: &str = ".rca/incidents.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn rca_dir(root: &Path) -> PathBuf {
    root.join(RCA_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn rules_path(root: &Path) -> PathBuf {
    root.join(RULES_FILE)
}

pub fn candidates_path(root: &Path) -> PathBuf {
    root.join(CANDIDATES_FILE)
}

/// Snapshot of one incident's workflow state.
pub fn run_state_path(root: &Path, incident_id: &str) -> PathBuf {
    root.join(RUNS_DIR).join(format!("{incident_id}.yaml"))
}

/// Resolve a configured store path: absolute paths are kept, relative ones
/// are taken from the project root.
pub fn resolve_in_root(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}
