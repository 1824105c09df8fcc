#![allow(dead_code)]

use std::path::PathBuf;

use tapigen_config::{Policy, RunOverrides, SettingsSource, resolve_policy};
use tapigen_core::{
    Column, ColumnType, Constraint, IdentityGeneration, MetadataSnapshot, PrimaryKey,
    SNAPSHOT_VERSION, Schema, Table, TableKind,
};
use tapigen_generate::{RunContext, SentinelSpec};

pub const BASE_SETTINGS: &str = r#"
[schemas]
default_table_owner = "APP"
default_package_owner = "APP_API"

[api_controls]
default_api_types = "insert,select,update,delete,upsert,merge"
row_vers_column_name = "ROW_VERSION"
auto_maintained_cols = "created_by, created_on"
"#;

/// Base settings with `(section, key, value)` entries layered on top.
pub fn policy(entries: &[(&str, &str, &str)]) -> Policy {
    let mut source = SettingsSource::from_toml_str(BASE_SETTINGS).expect("parse settings");
    for (section, key, value) in entries {
        source.set(section, key, *value);
    }
    resolve_policy(&source, &RunOverrides::default()).expect("resolve policy")
}

pub fn column(ordinal: i16, name: &str, data_type: &str, nullable: bool) -> Column {
    Column {
        ordinal_position: ordinal,
        name: name.to_string(),
        column_type: ColumnType {
            data_type: data_type.to_string(),
            character_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
        },
        is_nullable: nullable,
        default: None,
        identity: None,
        comment: None,
    }
}

/// `T(ID pk, NAME, AMOUNT, ROW_VERSION, CREATED_BY, CREATED_ON)`.
pub fn t_table() -> Table {
    Table {
        name: "T".to_string(),
        kind: TableKind::Table,
        comment: None,
        columns: vec![
            column(1, "ID", "NUMBER", false),
            column(2, "NAME", "VARCHAR2", false),
            column(3, "AMOUNT", "NUMBER", true),
            column(4, "ROW_VERSION", "NUMBER", false),
            column(5, "CREATED_BY", "VARCHAR2", true),
            column(6, "CREATED_ON", "DATE", true),
        ],
        constraints: vec![Constraint::PrimaryKey(PrimaryKey {
            name: Some("T_PK".to_string()),
            columns: vec!["ID".to_string()],
        })],
    }
}

/// `ORDERS(ORDER_ID identity always pk, CUSTOMER, TOTAL)`.
pub fn identity_table() -> Table {
    let mut order_id = column(1, "ORDER_ID", "NUMBER", false);
    order_id.identity = Some(IdentityGeneration::Always);
    Table {
        name: "ORDERS".to_string(),
        kind: TableKind::Table,
        comment: None,
        columns: vec![
            order_id,
            column(2, "CUSTOMER", "VARCHAR2", false),
            column(3, "TOTAL", "NUMBER", true),
        ],
        constraints: vec![Constraint::PrimaryKey(PrimaryKey {
            name: Some("ORDERS_PK".to_string()),
            columns: vec!["ORDER_ID".to_string()],
        })],
    }
}

/// A table without primary or unique keys.
pub fn audit_log_table() -> Table {
    Table {
        name: "AUDIT_LOG".to_string(),
        kind: TableKind::Table,
        comment: None,
        columns: vec![
            column(1, "MESSAGE", "VARCHAR2", false),
            column(2, "LOGGED_ON", "DATE", true),
        ],
        constraints: Vec::new(),
    }
}

pub fn snapshot(tables: Vec<Table>) -> MetadataSnapshot {
    MetadataSnapshot {
        snapshot_version: SNAPSHOT_VERSION.to_string(),
        engine: "oracle".to_string(),
        database: None,
        schemas: vec![Schema {
            name: "APP".to_string(),
            tables,
        }],
    }
}

pub fn fixed_run() -> RunContext {
    RunContext::fixed(
        "16-Oct-2026 09:30:00",
        "2026",
        SentinelSpec::Static("~unchanged~".to_string()),
    )
}

/// Default fragment set shipped at the workspace root.
pub fn shipped_templates() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../templates")
}

pub fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tapigen_{label}_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
