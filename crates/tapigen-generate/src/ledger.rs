use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::atomic::write_bytes_atomic;
use crate::errors::{GenerationError, Result};

pub const LEDGER_HEADER: [&str; 4] = ["schema_name", "table_name", "artifact", "generate"];

/// Artifact kinds tracked per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Package,
    Trigger,
    View,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Package,
        ArtifactKind::Trigger,
        ArtifactKind::View,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Package => "package",
            ArtifactKind::Trigger => "trigger",
            ArtifactKind::View => "view",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "package" => Ok(ArtifactKind::Package),
            "trigger" => Ok(ArtifactKind::Trigger),
            "view" => Ok(ArtifactKind::View),
            other => Err(format!(
                "unknown artifact '{other}', expected package, trigger or view"
            )),
        }
    }
}

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub schema_name: String,
    pub table_name: String,
    pub artifact: ArtifactKind,
    pub generate: bool,
}

impl LedgerEntry {
    fn matches(&self, schema: &str, table: &str, artifact: ArtifactKind) -> bool {
        self.artifact == artifact
            && self.schema_name.eq_ignore_ascii_case(schema)
            && self.table_name.eq_ignore_ascii_case(table)
    }
}

/// CSV-backed allow-list deciding which artifacts are (re)generated.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
}

impl FileLedger {
    /// Load the ledger at `path`. A missing or empty file yields an empty ledger.
    pub fn open(path: &Path) -> Result<Self> {
        let mut ledger = Self {
            path: path.to_path_buf(),
            entries: Vec::new(),
        };
        if !path.exists() {
            info!(path = %path.display(), "ledger not found; starting empty");
            return Ok(ledger);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Ok(ledger);
        }
        let found: Vec<String> = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
        if found != LEDGER_HEADER {
            return Err(ledger.error(format!(
                "invalid header: expected {}, found {}",
                LEDGER_HEADER.join(","),
                found.join(",")
            )));
        }

        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let line = index + 2;
            let field = |position: usize| record.get(position).unwrap_or_default().to_string();
            let artifact = field(2)
                .parse::<ArtifactKind>()
                .map_err(|err| ledger.error(format!("line {line}: {err}")))?;
            let entry = LedgerEntry {
                schema_name: field(0),
                table_name: field(1),
                artifact,
                generate: parse_flag(&field(3)),
            };
            if ledger
                .find(&entry.schema_name, &entry.table_name, artifact)
                .is_none()
            {
                ledger.entries.push(entry);
            }
        }

        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn find(&self, schema: &str, table: &str, artifact: ArtifactKind) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .find(|entry| entry.matches(schema, table, artifact))
    }

    /// Whether the artifact may be generated. Unknown pairs are registered
    /// as enabled and the ledger is flushed before returning.
    pub fn should_generate(
        &mut self,
        schema: &str,
        table: &str,
        artifact: ArtifactKind,
    ) -> Result<bool> {
        if let Some(entry) = self.find(schema, table, artifact) {
            return Ok(entry.generate);
        }

        self.entries.push(LedgerEntry {
            schema_name: schema.to_string(),
            table_name: table.to_string(),
            artifact,
            generate: true,
        });
        self.flush()?;
        info!(
            schema = %schema,
            table = %table,
            artifact = %artifact,
            "ledger entry registered"
        );
        Ok(true)
    }

    /// Insert or update a row and flush.
    pub fn set(
        &mut self,
        schema: &str,
        table: &str,
        artifact: ArtifactKind,
        generate: bool,
    ) -> Result<()> {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.matches(schema, table, artifact))
        {
            Some(entry) => entry.generate = generate,
            None => self.entries.push(LedgerEntry {
                schema_name: schema.to_string(),
                table_name: table.to_string(),
                artifact,
                generate,
            }),
        }
        self.flush()
    }

    /// Rewrite the ledger file atomically.
    pub fn flush(&self) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(LEDGER_HEADER)?;
        for entry in &self.entries {
            writer.write_record([
                entry.schema_name.as_str(),
                entry.table_name.as_str(),
                entry.artifact.as_str(),
                if entry.generate { "true" } else { "false" },
            ])?;
        }
        let data = writer
            .into_inner()
            .map_err(|err| self.error(err.to_string()))?;
        write_bytes_atomic(&self.path, &data)
    }

    fn error(&self, message: String) -> GenerationError {
        GenerationError::Ledger {
            path: self.path.display().to_string(),
            message,
        }
    }
}

/// Lenient flag parsing: `true`, `yes`, `y`, `1` (any case) are true.
pub fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}
