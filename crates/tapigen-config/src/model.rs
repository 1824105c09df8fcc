use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Kind of data operation a generated procedure performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    Select,
    Update,
    Delete,
    Upsert,
    Merge,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::Insert,
        OperationKind::Select,
        OperationKind::Update,
        OperationKind::Delete,
        OperationKind::Upsert,
        OperationKind::Merge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Select => "select",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Upsert => "upsert",
            OperationKind::Merge => "merge",
        }
    }

    /// Operations whose ordinary columns accept the noop sentinel.
    pub fn supports_partial_update(self) -> bool {
        matches!(
            self,
            OperationKind::Update | OperationKind::Upsert | OperationKind::Merge
        )
    }

    /// Title used in generated banner comments.
    pub fn title(self) -> &'static str {
        match self {
            OperationKind::Insert => "Insert",
            OperationKind::Select => "Select",
            OperationKind::Update => "Update",
            OperationKind::Delete => "Delete",
            OperationKind::Upsert => "Upsert",
            OperationKind::Merge => "Merge",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| {
                format!(
                    "unknown operation kind '{value}', expected one of: insert, select, update, delete, upsert, merge"
                )
            })
    }
}

/// Whether a procedure takes the whole row or one parameter per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStyle {
    Rowtype,
    Coltype,
}

impl SignatureStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureStyle::Rowtype => "rowtype",
            SignatureStyle::Coltype => "coltype",
        }
    }
}

impl fmt::Display for SignatureStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureStyle {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rowtype" => Ok(SignatureStyle::Rowtype),
            "coltype" => Ok(SignatureStyle::Coltype),
            other => Err(format!(
                "unknown signature style '{other}', expected rowtype or coltype"
            )),
        }
    }
}

/// How auto-maintained and version columns get their values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoMaintainMethod {
    /// A generated trigger maintains the columns; package DML leaves them out.
    Trigger,
    /// Column expression fragments are inlined into package DML.
    Expression,
}

impl FromStr for AutoMaintainMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trigger" => Ok(AutoMaintainMethod::Trigger),
            "expression" => Ok(AutoMaintainMethod::Expression),
            other => Err(format!(
                "unknown auto-maintain method '{other}', expected trigger or expression"
            )),
        }
    }
}

/// Configured source of the "leave unchanged" default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum NoopSetting {
    /// Random literal generated once per run.
    Auto,
    /// Literal text used verbatim.
    Static(String),
    /// Expression emitted verbatim, evaluated by the generated code.
    Dynamic(String),
}

/// Procedure name assigned to each operation kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureNames {
    pub insert: String,
    pub select: String,
    pub update: String,
    pub delete: String,
    pub upsert: String,
    pub merge: String,
}

impl ProcedureNames {
    pub fn name_for(&self, kind: OperationKind) -> &str {
        match kind {
            OperationKind::Insert => &self.insert,
            OperationKind::Select => &self.select,
            OperationKind::Update => &self.update,
            OperationKind::Delete => &self.delete,
            OperationKind::Upsert => &self.upsert,
            OperationKind::Merge => &self.merge,
        }
    }
}

/// Output placement and naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileControls {
    pub staging_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub spec_dir: PathBuf,
    pub body_dir: PathBuf,
    pub trigger_dir: PathBuf,
    pub view_dir: PathBuf,
    pub spec_suffix: String,
    pub body_suffix: String,
    pub trigger_suffix: String,
    pub view_suffix: String,
    pub package_name_suffix: String,
    pub trigger_name_suffix: String,
    pub view_name_suffix: String,
}

/// Effective, immutable policy for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub app_name: String,
    pub tapi_author: String,
    pub copyright_year: String,
    pub table_owner: String,
    pub package_owner: String,
    pub trigger_owner: String,
    pub view_owner: String,
    pub operations: Vec<OperationKind>,
    pub signature_styles: Vec<SignatureStyle>,
    pub include_defaults: bool,
    pub return_key_columns: bool,
    pub include_commit: bool,
    pub include_rowid: bool,
    pub noop: NoopSetting,
    pub version_column_name: Option<String>,
    /// Lowercased names of columns maintained by database-side logic.
    pub auto_maintained_columns: Vec<String>,
    pub auto_maintain_method: AutoMaintainMethod,
    pub procedure_names: ProcedureNames,
    pub indent_spaces: usize,
    pub files: FileControls,
    pub skip_on_missing_table: bool,
    /// Every settings key flattened across sections, exposed to templates.
    pub settings_bindings: BTreeMap<String, String>,
}

impl Policy {
    pub fn is_version_column(&self, name: &str) -> bool {
        self.version_column_name
            .as_deref()
            .is_some_and(|version| version.eq_ignore_ascii_case(name))
    }

    pub fn is_auto_maintained(&self, name: &str) -> bool {
        self.auto_maintained_columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(name))
    }

    /// Auto-maintained columns followed by the version column, lowercased.
    pub fn maintained_columns(&self) -> Vec<String> {
        let mut columns = self.auto_maintained_columns.clone();
        if let Some(version) = &self.version_column_name {
            let version = version.to_lowercase();
            if !columns.contains(&version) {
                columns.push(version);
            }
        }
        columns
    }

    /// Indentation unit substituted for `%STAB%`.
    pub fn indent(&self) -> String {
        " ".repeat(self.indent_spaces)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operations.is_empty() {
            return Err(ConfigError::Conflict(
                "no operation kinds selected (api_controls.default_api_types)".to_string(),
            ));
        }
        if self.signature_styles.is_empty() {
            return Err(ConfigError::Conflict(
                "no signature styles configured (api_controls.signature_types)".to_string(),
            ));
        }
        if self.files.spec_dir == self.files.body_dir
            && self.files.spec_suffix == self.files.body_suffix
        {
            return Err(ConfigError::Conflict(
                "spec_dir and body_dir must differ when spec_suffix equals body_suffix"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
