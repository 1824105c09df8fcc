use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constraints::Constraint;
use crate::types::{ColumnType, IdentityGeneration};

/// Top-level metadata snapshot produced by catalog introspection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MetadataSnapshot {
    /// Contract version for this snapshot format.
    pub snapshot_version: String,
    /// Database engine identifier (e.g. `oracle`).
    pub engine: String,
    /// Database or service name when available.
    #[serde(default)]
    pub database: Option<String>,
    /// Schemas (owners) captured from the catalog.
    pub schemas: Vec<Schema>,
}

impl MetadataSnapshot {
    /// Look up a schema by name, ignoring case.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas
            .iter()
            .find(|schema| schema.name.eq_ignore_ascii_case(name))
    }

    /// Look up a table by owner and name, ignoring case.
    pub fn table(&self, schema: &str, table: &str) -> Option<&Table> {
        self.schema(schema).and_then(|schema| schema.table(table))
    }
}

/// A database schema (owner) containing tables.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }
}

/// A table-like object with its ordered columns and key constraints.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub kind: TableKind,
    #[serde(default)]
    pub comment: Option<String>,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

/// Kind of table represented in the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    #[default]
    Table,
    View,
}

impl Table {
    /// Columns sorted by ordinal position.
    pub fn ordered_columns(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.iter().collect();
        columns.sort_by_key(|column| column.ordinal_position);
        columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn is_primary_key_column(&self, name: &str) -> bool {
        self.constraints.iter().any(|constraint| match constraint {
            Constraint::PrimaryKey(pk) => contains_ignore_case(&pk.columns, name),
            Constraint::Unique(_) => false,
        })
    }

    pub fn is_unique_key_column(&self, name: &str) -> bool {
        self.constraints.iter().any(|constraint| match constraint {
            Constraint::Unique(unique) => contains_ignore_case(&unique.columns, name),
            Constraint::PrimaryKey(_) => false,
        })
    }

    /// True when the column participates in the primary key or any unique constraint.
    pub fn is_key_column(&self, name: &str) -> bool {
        self.is_primary_key_column(name) || self.is_unique_key_column(name)
    }

    /// Length of the longest column name, used to align generated parameters.
    pub fn max_column_name_len(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.name.len())
            .max()
            .unwrap_or(0)
    }
}

/// Column metadata for a table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    pub ordinal_position: i16,
    pub name: String,
    pub column_type: ColumnType,
    pub is_nullable: bool,
    /// Declared default expression, verbatim from the catalog.
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub identity: Option<IdentityGeneration>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Column {
    /// The declared default with surrounding whitespace removed, if non-empty.
    pub fn declared_default(&self) -> Option<&str> {
        self.default
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// True when the database supplies a value on insert (default or identity).
    pub fn is_database_generated(&self) -> bool {
        self.identity.is_some() || self.declared_default().is_some()
    }

    /// `GENERATED ALWAYS AS IDENTITY`: the database rejects explicit values.
    pub fn is_identity_always(&self) -> bool {
        self.identity == Some(IdentityGeneration::Always)
    }

    /// A `NOT NULL` column without any database-supplied value.
    pub fn is_mandatory(&self) -> bool {
        !self.is_nullable && !self.is_database_generated()
    }
}

fn contains_ignore_case(columns: &[String], name: &str) -> bool {
    columns.iter().any(|column| column.eq_ignore_ascii_case(name))
}
