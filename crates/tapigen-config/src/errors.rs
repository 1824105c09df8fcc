use thiserror::Error;

/// Configuration errors. Every variant is fatal to a generation run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {section}.{key}")]
    MissingKey { section: String, key: String },
    #[error("invalid value '{value}' for {section}.{key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
    #[error("ambiguous classification for column {table}.{column}: listed as auto-maintained and configured as the row version column")]
    AmbiguousColumn { table: String, column: String },
    #[error("missing template fragment '{fragment}' ({path})")]
    MissingFragment { fragment: String, path: String },
    #[error("conflicting configuration: {0}")]
    Conflict(String),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
