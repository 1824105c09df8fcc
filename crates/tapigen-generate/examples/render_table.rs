use std::env;
use std::path::PathBuf;

use tapigen_config::{RunOverrides, SettingsSource, resolve_policy};
use tapigen_core::load_snapshot;
use tapigen_generate::render::render_package;
use tapigen_generate::{RunContext, TableContext, TemplateSet};

/// Print the package spec and body for one table without touching staging.
///
/// `cargo run --example render_table -- <snapshot.json> <TABLE> [settings.toml]`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let (Some(snapshot_path), Some(table_name)) = (args.next(), args.next()) else {
        eprintln!("usage: render_table <snapshot.json> <TABLE> [settings.toml]");
        std::process::exit(2);
    };
    let settings_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/tapigen.toml"));

    let settings = SettingsSource::load(&settings_path)?;
    let policy = resolve_policy(&settings, &RunOverrides::default())?;
    let snapshot = load_snapshot(&PathBuf::from(snapshot_path))?;
    let templates = TemplateSet::load(&policy.files.templates_dir, &policy)?;
    let run = RunContext::new(&policy);

    let Some(schema) = snapshot.schema(&policy.table_owner) else {
        eprintln!("schema {} not in snapshot", policy.table_owner);
        std::process::exit(1);
    };
    let Some(table) = schema.table(&table_name) else {
        eprintln!("table {}.{table_name} not in snapshot", schema.name);
        std::process::exit(1);
    };

    let ctx = TableContext::new(&schema.name, table, &policy, &run, &templates)?;
    let package = render_package(&ctx)?;
    println!("{}", package.spec);
    println!("{}", package.body);
    for skipped in &package.skipped {
        eprintln!("skipped {}/{}: {}", skipped.operation, skipped.style, skipped.reason);
    }
    Ok(())
}
