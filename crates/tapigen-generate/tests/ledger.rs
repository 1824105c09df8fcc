mod common;

use std::fs;

use tapigen_generate::{ArtifactKind, FileLedger, GenerationError};

use common::temp_dir;

#[test]
fn unknown_pairs_are_registered_once() {
    let dir = temp_dir("ledger_register");
    let path = dir.join("tapigen.csv");

    let mut ledger = FileLedger::open(&path).expect("open missing ledger");
    assert!(ledger.entries().is_empty());

    assert!(ledger.should_generate("APP", "T", ArtifactKind::Package).expect("first"));
    assert!(ledger.should_generate("app", "t", ArtifactKind::Package).expect("repeat"));
    assert_eq!(ledger.entries().len(), 1);

    let contents = fs::read_to_string(&path).expect("read ledger");
    assert_eq!(contents, "schema_name,table_name,artifact,generate\nAPP,T,package,true\n");

    let reopened = FileLedger::open(&path).expect("reopen");
    assert_eq!(reopened.entries(), ledger.entries());
}

#[test]
fn disabled_rows_are_respected_and_flags_are_lenient() {
    let dir = temp_dir("ledger_disabled");
    let path = dir.join("tapigen.csv");
    fs::write(
        &path,
        "schema_name,table_name,artifact,generate\n\
         APP,T,package,No\n\
         APP,T,trigger,Y\n\
         APP,T,view,0\n\
         APP,T,package,true\n",
    )
    .expect("seed ledger");

    let mut ledger = FileLedger::open(&path).expect("open");
    assert_eq!(ledger.entries().len(), 3, "first duplicate wins");
    assert!(!ledger.should_generate("APP", "T", ArtifactKind::Package).expect("package"));
    assert!(ledger.should_generate("APP", "T", ArtifactKind::Trigger).expect("trigger"));
    assert!(!ledger.should_generate("APP", "T", ArtifactKind::View).expect("view"));
    assert_eq!(ledger.entries().len(), 3);
}

#[test]
fn set_updates_in_place() {
    let dir = temp_dir("ledger_set");
    let path = dir.join("tapigen.csv");

    let mut ledger = FileLedger::open(&path).expect("open");
    ledger.set("APP", "T", ArtifactKind::View, false).expect("disable");
    ledger.set("app", "T", ArtifactKind::View, true).expect("enable");

    let reopened = FileLedger::open(&path).expect("reopen");
    assert_eq!(reopened.entries().len(), 1);
    assert!(reopened.find("APP", "t", ArtifactKind::View).expect("row").generate);
}

#[test]
fn invalid_header_is_rejected() {
    let dir = temp_dir("ledger_header");
    let path = dir.join("tapigen.csv");
    fs::write(&path, "owner,table,kind,enabled\nAPP,T,package,true\n").expect("seed ledger");

    let err = FileLedger::open(&path).unwrap_err();
    assert!(matches!(err, GenerationError::Ledger { .. }));
    assert!(err.to_string().contains("invalid header"));
}

#[test]
fn unknown_artifact_is_rejected() {
    let dir = temp_dir("ledger_artifact");
    let path = dir.join("tapigen.csv");
    fs::write(
        &path,
        "schema_name,table_name,artifact,generate\nAPP,T,synonym,true\n",
    )
    .expect("seed ledger");

    let err = FileLedger::open(&path).unwrap_err();
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn empty_file_is_an_empty_ledger() {
    let dir = temp_dir("ledger_empty");
    let path = dir.join("tapigen.csv");
    fs::write(&path, "").expect("seed ledger");

    let ledger = FileLedger::open(&path).expect("open");
    assert!(ledger.entries().is_empty());
}
