use thiserror::Error;

/// Core error type shared across tapigen crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The snapshot violates internal invariants.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    /// The snapshot document does not match its JSON contract.
    #[error("snapshot contract violation: {0}")]
    Contract(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results returned by tapigen crates.
pub type Result<T> = std::result::Result<T, Error>;
