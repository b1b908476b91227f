use thiserror::Error;

/// Run-fatal error taxonomy. No stage recovers locally; the only
/// recovery mechanism is the scheduler's whole-run retry policy.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Readiness probe timed out after {waited_seconds}s (poke interval {poke_interval_seconds}s)")]
    Timeout {
        waited_seconds: u64,
        poke_interval_seconds: u64,
    },

    #[error("Upstream returned {status}: {body}")]
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
