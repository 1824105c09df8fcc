use std::fs::{OpenOptions, create_dir_all};
use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use tapigen_config::Policy;
use tapigen_generate::GenerationReport;
use tapigen_generate::atomic::write_json_atomic;

use super::RegistryResult;

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunMeta {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub run_dir: PathBuf,
    pub settings_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub snapshot_fingerprint: String,
    pub tables: String,
    pub sentinel_mode: String,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
struct RunConfig<'a> {
    run_id: &'a str,
    started_at: String,
    settings_path: String,
    snapshot_path: String,
    snapshot_fingerprint: &'a str,
    tables: &'a str,
    sentinel_mode: &'a str,
    policy: &'a Policy,
    git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
struct GitInfo {
    commit: Option<String>,
    dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
}

fn run_root(meta: &RunMeta) -> PathBuf {
    let timestamp = meta.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    meta.run_dir
        .join(format!("{timestamp}__run_{}", meta.run_id))
}

/// Create the run directory, write `config.json` and touch `logs.ndjson`.
pub fn start_run(meta: &RunMeta, policy: &Policy) -> RegistryResult<RunPaths> {
    let root = run_root(meta);
    create_dir_all(&root)?;

    let config = RunConfig {
        run_id: &meta.run_id,
        started_at: meta.started_at.to_rfc3339(),
        settings_path: meta.settings_path.display().to_string(),
        snapshot_path: meta.snapshot_path.display().to_string(),
        snapshot_fingerprint: &meta.snapshot_fingerprint,
        tables: &meta.tables,
        sentinel_mode: &meta.sentinel_mode,
        policy,
        git: collect_git_info(),
    };
    write_json_atomic(&root.join("config.json"), &config)?;

    let logs_path = root.join("logs.ndjson");
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        report_path: root.join("report.json"),
        logs_path,
        root,
    })
}

pub fn write_report(paths: &RunPaths, report: &GenerationReport) -> RegistryResult<()> {
    write_json_atomic(&paths.report_path, report)?;
    Ok(())
}

fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

#[cfg(test)]
mod tests {
    use tapigen_config::{RunOverrides, SettingsSource, resolve_policy};

    use super::*;

    fn meta(run_dir: PathBuf) -> RunMeta {
        RunMeta {
            run_id: "5f0c".to_string(),
            started_at: DateTime::parse_from_rfc3339("2026-10-16T08:15:00Z")
                .expect("timestamp")
                .with_timezone(&Utc),
            run_dir,
            settings_path: PathBuf::from("config/tapigen.toml"),
            snapshot_path: PathBuf::from("snapshot.json"),
            snapshot_fingerprint: "ab".repeat(32),
            tables: "%".to_string(),
            sentinel_mode: "auto".to_string(),
        }
    }

    #[test]
    fn start_run_writes_config_and_log_file() {
        let run_dir =
            std::env::temp_dir().join(format!("tapigen_runs_{}", uuid::Uuid::new_v4()));
        let mut settings = SettingsSource::default();
        settings.set("schemas", "default_table_owner", "APP");
        settings.set("schemas", "default_package_owner", "APP_API");
        let policy = resolve_policy(&settings, &RunOverrides::default()).expect("policy");

        let paths = start_run(&meta(run_dir), &policy).expect("start run");
        assert!(paths.logs_path.exists());

        let text = std::fs::read_to_string(paths.root.join("config.json")).expect("read config");
        let config: serde_json::Value = serde_json::from_str(&text).expect("config json");
        assert_eq!(config["snapshot_fingerprint"], "ab".repeat(32));
        assert_eq!(config["policy"]["table_owner"], "APP");
        assert_eq!(config["tables"], "%");
    }

    #[test]
    fn run_root_is_timestamped() {
        let root = run_root(&meta(PathBuf::from("runs")));
        assert_eq!(root, PathBuf::from("runs/2026-10-16T08-15-00Z__run_5f0c"));
    }
}
