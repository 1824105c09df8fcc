use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Formatted and raw type metadata for a column.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnType {
    /// Base type name as reported by the catalog (e.g. `VARCHAR2`, `NUMBER`).
    pub data_type: String,
    #[serde(default)]
    pub character_max_length: Option<i32>,
    #[serde(default)]
    pub numeric_precision: Option<i32>,
    #[serde(default)]
    pub numeric_scale: Option<i32>,
}

/// Identity generation strategy for columns using `GENERATED ... AS IDENTITY`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdentityGeneration {
    Always,
    ByDefault,
}
