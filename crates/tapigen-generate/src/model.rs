use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ledger::ArtifactKind;
use crate::output::UnitKind;

/// Severity of a generation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueLevel {
    Warning,
    Error,
}

/// Structured generation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: IssueLevel,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

impl GenerationIssue {
    pub fn new(level: IssueLevel, code: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            code: code.to_string(),
            message: message.into(),
            schema: None,
            table: None,
            artifact: None,
            operation: None,
        }
    }

    pub fn for_table(mut self, schema: &str, table: &str) -> Self {
        self.schema = Some(schema.to_string());
        self.table = Some(table.to_string());
        self
    }

    pub fn for_artifact(mut self, artifact: ArtifactKind) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn for_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}

/// A unit written to staging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenUnit {
    pub kind: UnitKind,
    pub path: String,
}

/// An artifact not produced for a table, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedArtifact {
    pub artifact: ArtifactKind,
    pub reason: String,
}

/// Outcome for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub schema: String,
    pub table: String,
    pub written: Vec<WrittenUnit>,
    pub skipped: Vec<SkippedArtifact>,
}

impl TableReport {
    pub fn new(schema: &str, table: &str) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            written: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn skip(&mut self, artifact: ArtifactKind, reason: impl Into<String>) {
        self.skipped.push(SkippedArtifact {
            artifact,
            reason: reason.into(),
        });
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub sentinel_mode: String,
    pub tables: Vec<TableReport>,
    pub missing_tables: Vec<String>,
    pub units_written: u64,
    pub issues_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<GenerationIssue>,
    pub errors: Vec<GenerationIssue>,
}

impl GenerationReport {
    pub fn new(run_id: String, sentinel_mode: &str) -> Self {
        Self {
            run_id,
            sentinel_mode: sentinel_mode.to_string(),
            tables: Vec::new(),
            missing_tables: Vec::new(),
            units_written: 0,
            issues_by_code: BTreeMap::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record(&mut self, issue: GenerationIssue) {
        *self.issues_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        match issue.level {
            IssueLevel::Warning => self.warnings.push(issue),
            IssueLevel::Error => self.errors.push(issue),
        }
    }

    /// False when any artifact failed to render.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
