use std::fmt;

use serde::{Deserialize, Serialize};

use tapigen_config::{ConfigError, Policy};
use tapigen_core::{Column, Table};

/// Role a column plays in generated procedures for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Key,
    AutoMaintained,
    Version,
    Ordinary,
}

impl ColumnRole {
    /// Auto-maintained and version columns are set by database-side logic.
    pub fn is_maintained(self) -> bool {
        matches!(self, ColumnRole::AutoMaintained | ColumnRole::Version)
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnRole::Key => "key",
            ColumnRole::AutoMaintained => "auto_maintained",
            ColumnRole::Version => "version",
            ColumnRole::Ordinary => "ordinary",
        };
        f.write_str(label)
    }
}

/// A column paired with its role.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedColumn<'a> {
    pub column: &'a Column,
    pub role: ColumnRole,
}

impl ClassifiedColumn<'_> {
    pub fn name_lc(&self) -> String {
        self.column.name.to_lowercase()
    }
}

/// Classify a single column. Version beats auto-maintained, which beats key.
pub fn classify(
    column: &Column,
    table: &Table,
    policy: &Policy,
) -> Result<ColumnRole, ConfigError> {
    let is_version = policy.is_version_column(&column.name);
    let is_auto = policy.is_auto_maintained(&column.name);

    if is_version && is_auto {
        return Err(ConfigError::AmbiguousColumn {
            table: table.name.clone(),
            column: column.name.clone(),
        });
    }
    if is_version {
        return Ok(ColumnRole::Version);
    }
    if is_auto {
        return Ok(ColumnRole::AutoMaintained);
    }
    if table.is_key_column(&column.name) {
        return Ok(ColumnRole::Key);
    }
    Ok(ColumnRole::Ordinary)
}

/// Classify every column of a table, in ordinal order.
pub fn classify_table<'a>(
    table: &'a Table,
    policy: &Policy,
) -> Result<Vec<ClassifiedColumn<'a>>, ConfigError> {
    table
        .ordered_columns()
        .into_iter()
        .map(|column| {
            classify(column, table, policy).map(|role| ClassifiedColumn { column, role })
        })
        .collect()
}
