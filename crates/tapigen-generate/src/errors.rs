use thiserror::Error;

use tapigen_config::ConfigError;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("table {schema}.{table} not found in metadata snapshot")]
    MissingTable { schema: String, table: String },
    #[error("render error in fragment '{fragment}': {message}")]
    Render { fragment: String, message: String },
    #[error("ledger error ({path}): {message}")]
    Ledger { path: String, message: String },
    #[error("staging error: {0}")]
    Staging(String),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] tapigen_core::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GenerationError {
    pub(crate) fn render(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationError::Render {
            fragment: fragment.into(),
            message: message.into(),
        }
    }

    /// Stable code used in diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Config(_) => "configuration",
            GenerationError::MissingTable { .. } => "missing_table",
            GenerationError::Render { .. } => "render",
            GenerationError::Ledger { .. } => "ledger",
            GenerationError::Staging(_) => "staging",
            GenerationError::Snapshot(_) => "snapshot",
            GenerationError::Io(_) => "io",
            GenerationError::Csv(_) => "csv",
        }
    }
}

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;
