use std::fmt;

use serde::{Deserialize, Serialize};

use tapigen_config::{ConfigError, OperationKind, Policy, SignatureStyle};
use tapigen_core::Table;

use crate::roles::{ClassifiedColumn, ColumnRole, classify_table};
use crate::sentinel::SentinelSpec;

pub const ROW_PARAMETER: &str = "p_row";
pub const ROWID_PARAMETER: &str = "p_rowid";
pub const COMMIT_PARAMETER: &str = "p_commit";

/// Parameter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
    InOut,
}

impl Direction {
    /// Mode keyword padded to a fixed width so parameter types line up.
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::In => "in    ",
            Direction::Out => "   out",
            Direction::InOut => "in out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword().trim())
    }
}

/// Data type reference of a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamType {
    /// `<table>.<column>%type`
    Column { table: String, column: String },
    /// `<table>%rowtype`
    Row { table: String },
    Boolean,
    RowId,
}

impl ParamType {
    pub fn reference(&self) -> String {
        match self {
            ParamType::Column { table, column } => format!("{table}.{column}%type"),
            ParamType::Row { table } => format!("{table}%rowtype"),
            ParamType::Boolean => "boolean".to_string(),
            ParamType::RowId => "rowid".to_string(),
        }
    }
}

/// One procedure parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Underlying column, lowercased. Absent for row and synthetic parameters.
    pub column: Option<String>,
    pub role: Option<ColumnRole>,
    pub direction: Direction,
    pub param_type: ParamType,
    pub default: Option<String>,
}

/// Ordered parameter list for one procedure overload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub operation: OperationKind,
    pub style: SignatureStyle,
    pub parameters: Vec<Parameter>,
}

impl Signature {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|param| param.name == name)
    }

    pub fn parameter_for_column(&self, column: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|param| param.column.as_deref() == Some(column))
    }

    pub fn names(&self) -> Vec<&str> {
        self.parameters.iter().map(|param| param.name.as_str()).collect()
    }
}

/// Classify the table and derive the signature for one overload.
pub fn build(
    table: &Table,
    operation: OperationKind,
    style: SignatureStyle,
    policy: &Policy,
    sentinel: &SentinelSpec,
) -> Result<Signature, ConfigError> {
    let classified = classify_table(table, policy)?;
    Ok(build_classified(
        table,
        &classified,
        operation,
        style,
        policy,
        sentinel,
    ))
}

/// Derive a signature from an already classified column list.
pub fn build_classified(
    table: &Table,
    classified: &[ClassifiedColumn<'_>],
    operation: OperationKind,
    style: SignatureStyle,
    policy: &Policy,
    sentinel: &SentinelSpec,
) -> Signature {
    let table_lc = table.name.to_lowercase();
    let mut parameters = Vec::new();

    let keys = classified.iter().filter(|c| c.role == ColumnRole::Key);
    let others = classified
        .iter()
        .filter(|c| matches!(c.role, ColumnRole::Ordinary | ColumnRole::AutoMaintained));
    let version = classified.iter().find(|c| c.role == ColumnRole::Version);

    let column_param =
        |column: &ClassifiedColumn<'_>, direction: Direction, default: Option<String>| {
            let name_lc = column.name_lc();
            Parameter {
                name: format!("p_{name_lc}"),
                column: Some(name_lc.clone()),
                role: Some(column.role),
                direction,
                param_type: ParamType::Column {
                    table: table_lc.clone(),
                    column: name_lc,
                },
                default: default.filter(|_| direction == Direction::In),
            }
        };

    let row_param = |direction: Direction| Parameter {
        name: ROW_PARAMETER.to_string(),
        column: None,
        role: None,
        direction,
        param_type: ParamType::Row {
            table: table_lc.clone(),
        },
        default: None,
    };

    let insert_default = |column: &ClassifiedColumn<'_>| {
        if policy.include_defaults {
            column.column.declared_default().map(str::to_string)
        } else {
            None
        }
    };

    let key_direction = match operation {
        OperationKind::Upsert | OperationKind::Merge => Direction::InOut,
        OperationKind::Insert | OperationKind::Update if policy.return_key_columns => {
            Direction::InOut
        }
        _ => Direction::In,
    };

    // Identity columns generated always take no input on insert, so they
    // only appear when their value is returned.
    let omitted_key = |key: &ClassifiedColumn<'_>| {
        operation == OperationKind::Insert
            && key.column.is_identity_always()
            && !policy.return_key_columns
    };

    match (operation, style) {
        (OperationKind::Delete, _) => {
            for key in keys {
                parameters.push(column_param(key, Direction::In, None));
            }
        }
        (OperationKind::Select, SignatureStyle::Coltype) => {
            for key in keys {
                parameters.push(column_param(key, Direction::InOut, None));
            }
            for column in others {
                parameters.push(column_param(column, Direction::Out, None));
            }
            if let Some(version) = version {
                parameters.push(column_param(version, Direction::Out, None));
            }
        }
        (OperationKind::Select, SignatureStyle::Rowtype) => {
            for key in keys {
                parameters.push(column_param(key, Direction::In, None));
            }
            parameters.push(row_param(Direction::Out));
        }
        (_, SignatureStyle::Coltype) => {
            for key in keys.filter(|key| !omitted_key(*key)) {
                let default = if operation == OperationKind::Insert {
                    insert_default(key)
                } else {
                    None
                };
                parameters.push(column_param(key, key_direction, default));
            }
            for column in others.filter(|c| c.role == ColumnRole::Ordinary) {
                let default = if operation.supports_partial_update() {
                    Some(sentinel.default_expression())
                } else {
                    insert_default(column)
                };
                parameters.push(column_param(column, Direction::In, default));
            }
            if let Some(version) = version {
                parameters.push(column_param(version, Direction::Out, None));
            }
        }
        (_, SignatureStyle::Rowtype) => {
            for key in keys.filter(|key| !omitted_key(*key)) {
                parameters.push(column_param(key, key_direction, None));
            }
            parameters.push(row_param(Direction::InOut));
            if let Some(version) = version {
                parameters.push(column_param(version, Direction::Out, None));
            }
        }
    }

    if policy.include_rowid {
        parameters.push(Parameter {
            name: ROWID_PARAMETER.to_string(),
            column: None,
            role: None,
            direction: Direction::InOut,
            param_type: ParamType::RowId,
            default: None,
        });
    }
    if policy.include_commit {
        parameters.push(Parameter {
            name: COMMIT_PARAMETER.to_string(),
            column: None,
            role: None,
            direction: Direction::In,
            param_type: ParamType::Boolean,
            default: Some("false".to_string()),
        });
    }

    Signature {
        operation,
        style,
        parameters,
    }
}

/// True when both styles produce the same shape, so one overload suffices.
pub fn is_style_independent(operation: OperationKind) -> bool {
    operation == OperationKind::Delete
}
