use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse response line: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("reasoning service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("reasoning service timed out")]
    Timeout,

    #[error("response stream error: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for ReasoningError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ReasoningError::Timeout
        } else {
            ReasoningError::Transport(e.to_string())
        }
    }
}
