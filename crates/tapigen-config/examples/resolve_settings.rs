use std::env;
use std::path::PathBuf;

use tapigen_config::{RunOverrides, SettingsSource, resolve_policy};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/tapigen.toml"));

    let settings = SettingsSource::load(&path)?;
    let policy = match resolve_policy(&settings, &RunOverrides::default()) {
        Ok(policy) => policy,
        Err(err) => {
            eprintln!("settings rejected: {err}");
            std::process::exit(1);
        }
    };

    let json = serde_json::to_string_pretty(&policy)?;
    println!("{json}");
    Ok(())
}
