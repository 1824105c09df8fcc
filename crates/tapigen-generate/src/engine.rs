use std::time::Instant;

use tracing::{error, info, warn};

use tapigen_config::Policy;
use tapigen_core::{MetadataSnapshot, TableKind};

use crate::errors::{GenerationError, Result};
use crate::ledger::{ArtifactKind, FileLedger};
use crate::model::{GenerationIssue, GenerationReport, IssueLevel, TableReport, WrittenUnit};
use crate::output::{OutputWriter, RenderedUnit, UnitKind};
use crate::render::{RunContext, TableContext, render_package, render_trigger, render_view};
use crate::template::{FragmentKind, TemplateSet};

/// Tables selected for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    /// Every table owned by the table owner.
    All,
    Named(Vec<String>),
}

impl TableSelection {
    /// `%` selects everything; otherwise a comma separated list of names.
    pub fn parse(text: &str) -> Self {
        if text.trim() == "%" {
            return TableSelection::All;
        }
        TableSelection::Named(
            text.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    fn resolve(&self, snapshot: &MetadataSnapshot, owner: &str) -> Vec<String> {
        match self {
            TableSelection::Named(names) => names.clone(),
            TableSelection::All => snapshot
                .schema(owner)
                .map(|schema| {
                    schema
                        .tables
                        .iter()
                        .filter(|table| table.kind != TableKind::View)
                        .map(|table| table.name.clone())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Entry point for generating table APIs from a snapshot and policy.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    policy: Policy,
    templates: TemplateSet,
    run: RunContext,
}

impl GenerationEngine {
    /// Load templates from the policy's template directory.
    pub fn new(policy: Policy, run: RunContext) -> Result<Self> {
        let templates = TemplateSet::load(&policy.files.templates_dir, &policy)?;
        Ok(Self::with_templates(policy, templates, run))
    }

    pub fn with_templates(policy: Policy, templates: TemplateSet, run: RunContext) -> Self {
        Self {
            policy,
            templates,
            run,
        }
    }

    /// Generate every selected table, one at a time.
    ///
    /// Render failures are recorded and the run continues; configuration
    /// errors and (unless skipping is enabled) missing tables abort it.
    pub fn run(
        &self,
        snapshot: &MetadataSnapshot,
        selection: &TableSelection,
        ledger: &mut FileLedger,
        writer: &OutputWriter,
        run_id: &str,
    ) -> Result<GenerationReport> {
        let start = Instant::now();
        let owner = self.policy.table_owner.as_str();
        let tables = selection.resolve(snapshot, owner);
        let mut report = GenerationReport::new(run_id.to_string(), self.run.sentinel.mode());

        info!(
            run_id = %run_id,
            table_owner = %owner,
            tables = tables.len(),
            operations = ?self.policy.operations,
            sentinel = self.run.sentinel.mode(),
            "generation started"
        );
        if tables.is_empty() {
            report.record(GenerationIssue::new(
                IssueLevel::Warning,
                "no_tables",
                format!("no tables selected for owner {owner}"),
            ));
        }

        for name in &tables {
            let Some(schema) = snapshot.schema(owner) else {
                self.missing_table(&mut report, owner, name)?;
                continue;
            };
            let Some(table) = schema.table(name) else {
                self.missing_table(&mut report, owner, name)?;
                continue;
            };

            let ctx = TableContext::new(
                &schema.name,
                table,
                &self.policy,
                &self.run,
                &self.templates,
            )?;
            let mut table_report = TableReport::new(&schema.name, &table.name);
            info!(schema = %schema.name, table = %table.name, "generating table");

            for artifact in ArtifactKind::ALL {
                if !ledger.should_generate(&schema.name, &table.name, artifact)? {
                    info!(
                        schema = %schema.name,
                        table = %table.name,
                        artifact = %artifact,
                        "disabled in ledger"
                    );
                    table_report.skip(artifact, "disabled in ledger");
                    continue;
                }
                self.generate_artifact(&ctx, artifact, writer, &mut table_report, &mut report)?;
            }

            report.tables.push(table_report);
        }

        info!(
            run_id = %run_id,
            tables = report.tables.len(),
            units_written = report.units_written,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "generation completed"
        );
        Ok(report)
    }

    fn missing_table(&self, report: &mut GenerationReport, owner: &str, name: &str) -> Result<()> {
        if !self.policy.skip_on_missing_table {
            error!(schema = %owner, table = %name, "table does not exist; aborting");
            return Err(GenerationError::MissingTable {
                schema: owner.to_string(),
                table: name.to_string(),
            });
        }
        warn!(schema = %owner, table = %name, "table does not exist; skipping");
        report.missing_tables.push(name.to_string());
        report.record(
            GenerationIssue::new(
                IssueLevel::Warning,
                "missing_table",
                "table not found in snapshot",
            )
            .for_table(owner, name),
        );
        Ok(())
    }

    fn generate_artifact(
        &self,
        ctx: &TableContext<'_>,
        artifact: ArtifactKind,
        writer: &OutputWriter,
        table_report: &mut TableReport,
        report: &mut GenerationReport,
    ) -> Result<()> {
        let schema = ctx.schema_name;
        let table = ctx.table.name.as_str();

        let fragment = match artifact {
            ArtifactKind::Package => None,
            ArtifactKind::Trigger => Some(FragmentKind::Trigger),
            ArtifactKind::View => Some(FragmentKind::View),
        };
        if let Some(fragment) = fragment
            && !self.templates.has(fragment)
        {
            let path = self.templates.root().join(fragment.relative_path());
            warn!(
                table = %table,
                artifact = %artifact,
                path = %path.display(),
                "fragment missing; artifact skipped"
            );
            report.record(
                GenerationIssue::new(
                    IssueLevel::Warning,
                    "missing_fragment",
                    format!("fragment {} not found", path.display()),
                )
                .for_table(schema, table)
                .for_artifact(artifact),
            );
            table_report.skip(artifact, "fragment missing");
            return Ok(());
        }

        let files = &self.policy.files;
        let rendered = match artifact {
            ArtifactKind::Package => render_package(ctx).map(|package| {
                for skipped in &package.skipped {
                    report.record(
                        GenerationIssue::new(
                            IssueLevel::Warning,
                            "overload_skipped",
                            skipped.reason.clone(),
                        )
                        .for_table(schema, table)
                        .for_artifact(artifact)
                        .for_operation(format!("{}/{}", skipped.operation, skipped.style)),
                    );
                }
                vec![
                    RenderedUnit::new(UnitKind::PackageSpec, table, files, package.spec),
                    RenderedUnit::new(UnitKind::PackageBody, table, files, package.body),
                ]
            }),
            ArtifactKind::Trigger => render_trigger(ctx)
                .map(|text| vec![RenderedUnit::new(UnitKind::Trigger, table, files, text)]),
            ArtifactKind::View => render_view(ctx)
                .map(|text| vec![RenderedUnit::new(UnitKind::View, table, files, text)]),
        };

        let units = match rendered {
            Ok(units) => units,
            Err(err @ GenerationError::Render { .. }) => {
                error!(
                    table = %table,
                    artifact = %artifact,
                    error = %err,
                    "render failed; artifact not written"
                );
                report.record(
                    GenerationIssue::new(IssueLevel::Error, err.code(), err.to_string())
                        .for_table(schema, table)
                        .for_artifact(artifact),
                );
                table_report.skip(artifact, err.to_string());
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        for unit in &units {
            let path = writer.write(unit)?;
            info!(
                table = %table,
                artifact = %artifact,
                path = %path.display(),
                "unit written"
            );
            table_report.written.push(WrittenUnit {
                kind: unit.kind,
                path: path.display().to_string(),
            });
            report.units_written += 1;
        }
        Ok(())
    }
}
