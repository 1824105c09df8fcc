mod common;

use std::collections::BTreeSet;

use tapigen_config::{ConfigError, OperationKind, SignatureStyle};
use tapigen_generate::{ColumnRole, Direction, Signature, build, classify, classify_table};

use common::{fixed_run, identity_table, policy, t_table};

fn shape(signature: &Signature) -> Vec<(String, Direction)> {
    signature
        .parameters
        .iter()
        .map(|param| (param.name.clone(), param.direction))
        .collect()
}

fn column_names(signature: &Signature) -> BTreeSet<String> {
    signature
        .parameters
        .iter()
        .filter_map(|param| param.column.clone())
        .collect()
}

#[test]
fn insert_coltype_takes_keys_ordinary_columns_and_version() {
    let policy = policy(&[]);
    let run = fixed_run();
    let signature = build(
        &t_table(),
        OperationKind::Insert,
        SignatureStyle::Coltype,
        &policy,
        &run.sentinel,
    )
    .expect("build signature");

    assert_eq!(
        shape(&signature),
        vec![
            ("p_id".to_string(), Direction::InOut),
            ("p_name".to_string(), Direction::In),
            ("p_amount".to_string(), Direction::In),
            ("p_row_version".to_string(), Direction::Out),
        ]
    );
    assert!(signature.parameter_for_column("created_by").is_none());
    assert!(signature.parameter_for_column("created_on").is_none());
}

#[test]
fn keys_are_in_only_when_returning_is_disabled() {
    let policy = policy(&[("api_controls", "return_key_columns", "false")]);
    let run = fixed_run();
    let insert = build(
        &t_table(),
        OperationKind::Insert,
        SignatureStyle::Coltype,
        &policy,
        &run.sentinel,
    )
    .expect("insert");
    assert_eq!(insert.parameter("p_id").expect("key").direction, Direction::In);

    let upsert = build(
        &t_table(),
        OperationKind::Upsert,
        SignatureStyle::Coltype,
        &policy,
        &run.sentinel,
    )
    .expect("upsert");
    assert_eq!(upsert.parameter("p_id").expect("key").direction, Direction::InOut);
}

#[test]
fn upsert_covers_insert_and_update_columns() {
    let policy = policy(&[]);
    let run = fixed_run();
    let table = t_table();
    let sig = |operation| {
        build(&table, operation, SignatureStyle::Coltype, &policy, &run.sentinel)
            .expect("build signature")
    };

    let insert = column_names(&sig(OperationKind::Insert));
    let update = column_names(&sig(OperationKind::Update));
    let upsert = column_names(&sig(OperationKind::Upsert));

    let union: BTreeSet<String> = insert.union(&update).cloned().collect();
    assert_eq!(upsert, union);

    let upsert = sig(OperationKind::Upsert);
    assert_eq!(upsert.parameter("p_id").expect("key").direction, Direction::InOut);
    assert!(upsert.parameter("p_id").expect("key").default.is_none());
    for name in ["p_name", "p_amount"] {
        let param = upsert.parameter(name).expect(name);
        assert_eq!(param.direction, Direction::In, "{name}");
        assert_eq!(param.default.as_deref(), Some("'~unchanged~'"), "{name}");
    }
    assert_eq!(upsert.names().last(), Some(&"p_row_version"));
    assert_eq!(
        upsert.parameter("p_row_version").expect("version").direction,
        Direction::Out
    );
}

#[test]
fn merge_has_the_same_shape_as_upsert() {
    let policy = policy(&[
        ("api_controls", "include_commit", "true"),
        ("api_controls", "return_key_columns", "false"),
    ]);
    let run = fixed_run();
    let table = t_table();
    for style in [SignatureStyle::Coltype, SignatureStyle::Rowtype] {
        let upsert = build(&table, OperationKind::Upsert, style, &policy, &run.sentinel)
            .expect("upsert");
        let merge = build(&table, OperationKind::Merge, style, &policy, &run.sentinel)
            .expect("merge");
        assert_eq!(merge.parameters, upsert.parameters, "{style}");
    }
}

#[test]
fn rowtype_mutations_take_keys_then_row_then_version() {
    let policy = policy(&[]);
    let run = fixed_run();
    let table = t_table();
    let expected = vec![
        ("p_id".to_string(), Direction::InOut),
        ("p_row".to_string(), Direction::InOut),
        ("p_row_version".to_string(), Direction::Out),
    ];
    for operation in [
        OperationKind::Insert,
        OperationKind::Update,
        OperationKind::Upsert,
    ] {
        let signature = build(
            &table,
            operation,
            SignatureStyle::Rowtype,
            &policy,
            &run.sentinel,
        )
        .expect("rowtype signature");
        assert_eq!(shape(&signature), expected, "{operation}");
        assert!(signature.parameters.iter().all(|param| param.default.is_none()));
    }

    let in_only = common::policy(&[("api_controls", "return_key_columns", "false")]);
    let update = build(
        &table,
        OperationKind::Update,
        SignatureStyle::Rowtype,
        &in_only,
        &run.sentinel,
    )
    .expect("update");
    assert_eq!(update.parameter("p_id").expect("key").direction, Direction::In);
}

#[test]
fn identity_always_keys_are_only_returned_on_insert() {
    let run = fixed_run();
    let table = identity_table();

    let in_only = policy(&[("api_controls", "return_key_columns", "false")]);
    let insert = build(
        &table,
        OperationKind::Insert,
        SignatureStyle::Coltype,
        &in_only,
        &run.sentinel,
    )
    .expect("insert");
    assert_eq!(insert.names(), vec!["p_customer", "p_total"]);

    let insert_row = build(
        &table,
        OperationKind::Insert,
        SignatureStyle::Rowtype,
        &in_only,
        &run.sentinel,
    )
    .expect("insert rowtype");
    assert_eq!(insert_row.names(), vec!["p_row"]);

    let update = build(
        &table,
        OperationKind::Update,
        SignatureStyle::Coltype,
        &in_only,
        &run.sentinel,
    )
    .expect("update");
    assert_eq!(update.parameter("p_order_id").expect("key").direction, Direction::In);

    let returning = policy(&[]);
    let insert = build(
        &table,
        OperationKind::Insert,
        SignatureStyle::Coltype,
        &returning,
        &run.sentinel,
    )
    .expect("insert");
    let key = insert.parameter("p_order_id").expect("key");
    assert_eq!(key.direction, Direction::InOut);
    assert_eq!(insert.names()[0], "p_order_id");
}

#[test]
fn partial_update_parameters_default_to_the_sentinel() {
    let policy = policy(&[]);
    let run = fixed_run();
    let update = build(
        &t_table(),
        OperationKind::Update,
        SignatureStyle::Coltype,
        &policy,
        &run.sentinel,
    )
    .expect("update");

    let name = update.parameter("p_name").expect("name parameter");
    assert_eq!(name.default.as_deref(), Some("'~unchanged~'"));
    assert!(update.parameter("p_id").expect("key").default.is_none());
    assert!(update.parameter("p_row_version").expect("version").default.is_none());
}

#[test]
fn select_coltype_returns_every_column() {
    let policy = policy(&[]);
    let run = fixed_run();
    let select = build(
        &t_table(),
        OperationKind::Select,
        SignatureStyle::Coltype,
        &policy,
        &run.sentinel,
    )
    .expect("select");

    assert_eq!(select.parameter("p_id").expect("key").direction, Direction::InOut);
    for name in ["p_name", "p_amount", "p_created_by", "p_created_on", "p_row_version"] {
        let param = select.parameter(name).expect(name);
        assert_eq!(param.direction, Direction::Out, "{name}");
        assert!(param.default.is_none(), "{name}");
    }
    assert_eq!(select.names().last(), Some(&"p_row_version"));
}

#[test]
fn select_rowtype_takes_keys_and_returns_the_row() {
    let policy = policy(&[]);
    let run = fixed_run();
    let select = build(
        &t_table(),
        OperationKind::Select,
        SignatureStyle::Rowtype,
        &policy,
        &run.sentinel,
    )
    .expect("select");

    assert_eq!(
        shape(&select),
        vec![
            ("p_id".to_string(), Direction::In),
            ("p_row".to_string(), Direction::Out),
        ]
    );
    assert_eq!(
        select.parameter("p_row").expect("row").param_type.reference(),
        "t%rowtype"
    );
}

#[test]
fn delete_takes_keys_only() {
    let policy = policy(&[("api_controls", "include_commit", "true")]);
    let run = fixed_run();
    for style in [SignatureStyle::Rowtype, SignatureStyle::Coltype] {
        let delete = build(&t_table(), OperationKind::Delete, style, &policy, &run.sentinel)
            .expect("delete");
        assert_eq!(delete.names(), vec!["p_id", "p_commit"]);
    }
}

#[test]
fn synthetic_parameters_trail_in_order() {
    let policy = policy(&[
        ("api_controls", "include_commit", "true"),
        ("api_controls", "include_rowid", "true"),
    ]);
    let run = fixed_run();
    let insert = build(
        &t_table(),
        OperationKind::Insert,
        SignatureStyle::Rowtype,
        &policy,
        &run.sentinel,
    )
    .expect("insert");

    assert_eq!(
        insert.names(),
        vec!["p_id", "p_row", "p_row_version", "p_rowid", "p_commit"]
    );
    let commit = insert.parameter("p_commit").expect("commit");
    assert_eq!(commit.direction, Direction::In);
    assert_eq!(commit.default.as_deref(), Some("false"));
}

#[test]
fn declared_defaults_apply_to_insert_only() {
    let policy = policy(&[]);
    let run = fixed_run();
    let mut table = t_table();
    table.columns[2].default = Some(" 0 ".to_string());

    let insert = build(
        &table,
        OperationKind::Insert,
        SignatureStyle::Coltype,
        &policy,
        &run.sentinel,
    )
    .expect("insert");
    assert_eq!(insert.parameter("p_amount").expect("amount").default.as_deref(), Some("0"));

    let without = common::policy(&[("api_controls", "include_defaults", "false")]);
    let insert = build(
        &table,
        OperationKind::Insert,
        SignatureStyle::Coltype,
        &without,
        &run.sentinel,
    )
    .expect("insert");
    assert!(insert.parameter("p_amount").expect("amount").default.is_none());
}

#[test]
fn every_column_gets_exactly_one_role() {
    let policy = policy(&[]);
    let table = t_table();
    let roles: Vec<(String, ColumnRole)> = classify_table(&table, &policy)
        .expect("classify")
        .iter()
        .map(|c| (c.name_lc(), c.role))
        .collect();

    assert_eq!(
        roles,
        vec![
            ("id".to_string(), ColumnRole::Key),
            ("name".to_string(), ColumnRole::Ordinary),
            ("amount".to_string(), ColumnRole::Ordinary),
            ("row_version".to_string(), ColumnRole::Version),
            ("created_by".to_string(), ColumnRole::AutoMaintained),
            ("created_on".to_string(), ColumnRole::AutoMaintained),
        ]
    );
}

#[test]
fn version_listed_as_auto_maintained_is_ambiguous() {
    let policy = policy(&[("api_controls", "auto_maintained_cols", "row_version, created_by")]);
    let table = t_table();
    let column = table.column("ROW_VERSION").expect("column");

    let err = classify(column, &table, &policy).unwrap_err();
    assert!(matches!(err, ConfigError::AmbiguousColumn { .. }));
    assert!(classify_table(&table, &policy).is_err());
}

#[test]
fn auto_sentinel_is_stable_within_a_run() {
    let policy = policy(&[]);
    let run = tapigen_generate::RunContext::new(&policy);
    let table = t_table();

    let first = build(
        &table,
        OperationKind::Update,
        SignatureStyle::Coltype,
        &policy,
        &run.sentinel,
    )
    .expect("first");
    let second = build(
        &table,
        OperationKind::Merge,
        SignatureStyle::Coltype,
        &policy,
        &run.sentinel,
    )
    .expect("second");

    let default = first.parameter("p_name").expect("name").default.clone();
    assert_eq!(default, second.parameter("p_name").expect("name").default.clone());
    assert_eq!(default.expect("sentinel default").len(), 42 + 2);
}
