use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Primary key definition preserving column order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PrimaryKey {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Unique constraint definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UniqueConstraint {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Key constraints relevant to API generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    PrimaryKey(PrimaryKey),
    Unique(UniqueConstraint),
}
