use std::collections::{BTreeMap, BTreeSet};

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::constraints::Constraint;
use crate::error::{Error, Result};
use crate::schema::MetadataSnapshot;
use crate::snapshot::snapshot_json_schema;
use crate::SNAPSHOT_VERSION;

/// Validate internal consistency of a metadata snapshot.
///
/// This checks:
/// - the snapshot version is supported
/// - duplicate schemas/tables/columns (names compare case-insensitively)
/// - duplicate ordinal positions within a table
/// - primary key and unique constraint columns exist
/// - at most one primary key per table
pub fn validate_snapshot(snapshot: &MetadataSnapshot) -> Result<()> {
    if snapshot.snapshot_version != SNAPSHOT_VERSION {
        return Err(Error::InvalidSnapshot(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            snapshot.snapshot_version
        )));
    }

    let mut catalog: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for schema in &snapshot.schemas {
        let schema_key = schema.name.to_uppercase();
        if catalog.contains_key(&schema_key) {
            return Err(Error::InvalidSnapshot(format!(
                "duplicate schema name: {}",
                schema.name
            )));
        }

        let mut tables = BTreeSet::new();
        for table in &schema.tables {
            if !tables.insert(table.name.to_uppercase()) {
                return Err(Error::InvalidSnapshot(format!(
                    "duplicate table name: {}.{}",
                    schema.name, table.name
                )));
            }

            let mut columns = BTreeSet::new();
            let mut ordinals = BTreeSet::new();
            for column in &table.columns {
                if !columns.insert(column.name.to_uppercase()) {
                    return Err(Error::InvalidSnapshot(format!(
                        "duplicate column name: {}.{}.{}",
                        schema.name, table.name, column.name
                    )));
                }
                if !ordinals.insert(column.ordinal_position) {
                    return Err(Error::InvalidSnapshot(format!(
                        "duplicate ordinal position {} in {}.{}",
                        column.ordinal_position, schema.name, table.name
                    )));
                }
            }

            let mut primary_keys = 0;
            for constraint in &table.constraints {
                let (label, key_columns) = match constraint {
                    Constraint::PrimaryKey(pk) => {
                        primary_keys += 1;
                        ("primary key", &pk.columns)
                    }
                    Constraint::Unique(unique) => ("unique", &unique.columns),
                };
                for column in key_columns {
                    if !columns.contains(&column.to_uppercase()) {
                        return Err(Error::InvalidSnapshot(format!(
                            "{label} column not found: {}.{}.{}",
                            schema.name, table.name, column
                        )));
                    }
                }
            }
            if primary_keys > 1 {
                return Err(Error::InvalidSnapshot(format!(
                    "multiple primary keys declared on {}.{}",
                    schema.name, table.name
                )));
            }
        }

        catalog.insert(schema_key, tables);
    }

    Ok(())
}

/// Validate a raw snapshot document against the snapshot JSON Schema.
///
/// All violations are collected into a single error message, one per line.
pub fn validate_snapshot_json(document: &Value) -> Result<()> {
    let contract = serde_json::to_value(snapshot_json_schema())?;
    let compiled =
        JSONSchema::compile(&contract).map_err(|err| Error::Contract(err.to_string()))?;

    if let Err(errors) = compiled.validate(document) {
        let messages: Vec<String> = errors
            .map(|error| {
                let path = error.instance_path.to_string();
                let path = if path.is_empty() { "/".to_string() } else { path };
                format!("{path}: {error}")
            })
            .collect();
        return Err(Error::Contract(messages.join("\n")));
    }

    Ok(())
}
