use thiserror::Error;

#[derive(Debug, Error)]
pub enum RcaError {
    #[error("not initialized: run 'rca init'")]
    NotInitialized,

    #[error("missing precondition: '{0}' is not available yet")]
    MissingPrecondition(String),

    #[error("incident not found: {0}")]
    NotFound(String),

    #[error("upstream service error: {0}")]
    Upstream(String),

    #[error("upstream call timed out after {0}s")]
    Timeout(u64),

    #[error("validation violation: {0}")]
    Validation(String),

    #[error("operator declined")]
    Declined,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl RcaError {
    /// Expected failure modes that are reported to the operator, who may
    /// resume with the same input. Everything else is an invariant breach.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RcaError::MissingPrecondition(_)
                | RcaError::NotFound(_)
                | RcaError::Upstream(_)
                | RcaError::Timeout(_)
                | RcaError::Declined
        )
    }
}

impl From<reasoning_agent::ReasoningError> for RcaError {
    fn from(e: reasoning_agent::ReasoningError) -> Self {
        RcaError::Upstream(format!("reasoning service: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, RcaError>;
