use crate::error::{RcaError, Result};
use crate::paths;
use crate::similarity::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ModelsConfig
// ---------------------------------------------------------------------------

/// Reasoning steps that can be pointed at a dedicated model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepModel {
    InstructionGenerator,
    Analyzer,
    SeverityClassifier,
    ExternalDocRetriever,
    InternalDocRetriever,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_generator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_classifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_doc_retriever: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_doc_retriever: Option<String>,
}

fn default_model() -> String {
    "gemini-3-pro-preview".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            instruction_generator: None,
            analyzer: None,
            severity_classifier: None,
            external_doc_retriever: None,
            internal_doc_retriever: None,
        }
    }
}

impl ModelsConfig {
    pub fn model_for(&self, step: StepModel) -> &str {
        let specific = match step {
            StepModel::InstructionGenerator => &self.instruction_generator,
            StepModel::Analyzer => &self.analyzer,
            StepModel::SeverityClassifier => &self.severity_classifier,
            StepModel::ExternalDocRetriever => &self.external_doc_retriever,
            StepModel::InternalDocRetriever => &self.internal_doc_retriever,
        };
        specific.as_deref().unwrap_or(&self.default_model)
    }
}

// ---------------------------------------------------------------------------
// ReasoningConfig / EmbeddingsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_reasoning_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_reasoning_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default)]
    pub show_thoughts: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_reasoning_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_reasoning_key_env() -> String {
    "RCA_REASONING_API_KEY".to_string()
}

fn default_max_turns() -> u32 {
    12
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            endpoint: default_reasoning_endpoint(),
            api_key_env: default_reasoning_key_env(),
            max_turns: default_max_turns(),
            show_thoughts: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ReasoningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embeddings_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embeddings_model")]
    pub model: String,
    #[serde(default = "default_embeddings_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embeddings_endpoint() -> String {
    "http://localhost:8081".to_string()
}

fn default_embeddings_model() -> String {
    "gemini-embedding-001".to_string()
}

fn default_embeddings_key_env() -> String {
    "RCA_EMBEDDINGS_API_KEY".to_string()
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embeddings_endpoint(),
            model: default_embeddings_model(),
            api_key_env: default_embeddings_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// SimilarityConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    #[serde(default = "default_cutoff")]
    pub cutoff_distance: f64,
    #[serde(default = "default_likely_match")]
    pub likely_match_distance: f64,
    #[serde(default = "default_max_incidents")]
    pub max_incidents: usize,
    #[serde(default)]
    pub distance: DistanceMetric,
}

fn default_cutoff() -> f64 {
    0.5
}

fn default_likely_match() -> f64 {
    0.9
}

fn default_max_incidents() -> usize {
    5
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            cutoff_distance: default_cutoff(),
            likely_match_distance: default_likely_match(),
            max_incidents: default_max_incidents(),
            distance: DistanceMetric::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// StoreConfig / DetectionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DB_FILE)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            query_timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_erab_threshold")]
    pub erab_success_rate_threshold: f64,
}

fn default_erab_threshold() -> f64 {
    97.0
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            erab_success_rate_threshold: default_erab_threshold(),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentationConfig / WorkflowConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentationConfig {
    #[serde(default = "default_external_sites")]
    pub external_sites: Vec<String>,
    #[serde(default)]
    pub internal_datastore_id: String,
}

fn default_external_sites() -> Vec<String> {
    vec!["https://ourtechplanet.com/lte-erab-success-rate/".to_string()]
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            external_sites: default_external_sites(),
            internal_datastore_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub confirm_each_step: bool,
    #[serde(default = "default_root_agent_name")]
    pub root_agent_name: String,
}

fn default_root_agent_name() -> String {
    "root_cause_analyst".to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            confirm_each_step: false,
            root_agent_name: default_root_agent_name(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub documentation: DocumentationConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(RcaError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        // An empty file is a valid all-defaults config.
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn store_path(&self, root: &Path) -> PathBuf {
        paths::resolve_in_root(root, &self.store.path)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let sim = &self.similarity;

        if sim.max_incidents == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "similarity.max_incidents is 0: prior incident search can never match"
                    .to_string(),
            });
        }

        if sim.cutoff_distance < 0.0 || sim.likely_match_distance < 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "similarity distances must not be negative".to_string(),
            });
        }

        // Every hit already satisfies distance <= cutoff, so a looser
        // likely-match threshold labels every hit a likely match.
        if sim.likely_match_distance > sim.cutoff_distance {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "similarity.likely_match_distance ({}) is looser than cutoff_distance ({}): every hit will be labeled a likely match",
                    sim.likely_match_distance, sim.cutoff_distance
                ),
            });
        }

        if self.documentation.external_sites.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "documentation.external_sites is empty: external search will report nothing found"
                    .to_string(),
            });
        }

        if self.documentation.internal_datastore_id.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "documentation.internal_datastore_id is not set: internal search is misconfigured"
                    .to_string(),
            });
        }

        if self.reasoning.max_turns == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "reasoning.max_turns is 0: no reasoning step can complete".to_string(),
            });
        }

        if self.store.query_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "store.query_timeout_secs is 0: every store call would time out"
                    .to_string(),
            });
        }

        if self.models.default_model.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "models.default_model is empty".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
