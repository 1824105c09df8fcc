//! Layered configuration for tapigen.
//!
//! Built-in defaults, a sectioned TOML settings file and run-scoped overrides
//! are merged into one immutable [`Policy`] per generation run.

pub mod errors;
pub mod model;
pub mod resolve;
pub mod settings;

pub use errors::{ConfigError, Result};
pub use model::{
    AutoMaintainMethod, FileControls, NoopSetting, OperationKind, Policy, ProcedureNames,
    SignatureStyle,
};
pub use resolve::{PolicyResolver, RunOverrides, SettingOrigin, resolve_policy};
pub use settings::SettingsSource;
