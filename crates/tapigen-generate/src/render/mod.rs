//! Table-level rendering: package spec/body, trigger and view source.

pub mod package;
pub mod trigger;
pub mod view;

use chrono::{DateTime, Local};

use tapigen_config::{AutoMaintainMethod, ConfigError, Policy, SignatureStyle};
use tapigen_core::Table;

use crate::errors::Result;
use crate::roles::{ClassifiedColumn, ColumnRole, classify_table};
use crate::sentinel::SentinelSpec;
use crate::template::{Bindings, INDENT_TOKEN, TemplateSet, render};

pub use package::{RenderedPackage, render_package};
pub use trigger::render_trigger;
pub use view::render_view;

/// Binding that prefixes the current row inside expression fragments.
pub const CURRENT_ROW_TOKEN: &str = "current_row";

/// Values fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_date_time: String,
    pub run_year: String,
    pub sentinel: SentinelSpec,
}

impl RunContext {
    /// Stamp the run with the local clock and draw the sentinel.
    pub fn new(policy: &Policy) -> Self {
        Self::at(Local::now(), SentinelSpec::from_policy(policy))
    }

    pub fn at(now: DateTime<Local>, sentinel: SentinelSpec) -> Self {
        Self {
            run_date_time: now.format("%d-%b-%Y %H:%M:%S").to_string(),
            run_year: now.format("%Y").to_string(),
            sentinel,
        }
    }

    pub fn fixed(run_date_time: &str, run_year: &str, sentinel: SentinelSpec) -> Self {
        Self {
            run_date_time: run_date_time.to_string(),
            run_year: run_year.to_string(),
            sentinel,
        }
    }
}

/// Which expression fragment to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionPhase {
    Insert,
    Update,
}

/// Everything needed to render artifacts for one table.
#[derive(Debug)]
pub struct TableContext<'a> {
    pub schema_name: &'a str,
    pub table: &'a Table,
    pub columns: Vec<ClassifiedColumn<'a>>,
    pub policy: &'a Policy,
    pub run: &'a RunContext,
    pub templates: &'a TemplateSet,
}

impl<'a> TableContext<'a> {
    pub fn new(
        schema_name: &'a str,
        table: &'a Table,
        policy: &'a Policy,
        run: &'a RunContext,
        templates: &'a TemplateSet,
    ) -> std::result::Result<Self, ConfigError> {
        let columns = classify_table(table, policy)?;
        Ok(Self {
            schema_name,
            table,
            columns,
            policy,
            run,
            templates,
        })
    }

    pub fn table_lc(&self) -> String {
        self.table.name.to_lowercase()
    }

    pub fn package_name(&self) -> String {
        format!("{}{}", self.table_lc(), self.policy.files.package_name_suffix)
    }

    pub fn trigger_name(&self) -> String {
        format!("{}{}", self.table_lc(), self.policy.files.trigger_name_suffix)
    }

    pub fn view_name(&self) -> String {
        format!("{}{}", self.table_lc(), self.policy.files.view_name_suffix)
    }

    /// Indentation for the given nesting depth.
    pub fn indent(&self, depth: usize) -> String {
        self.policy.indent().repeat(depth)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ClassifiedColumn<'a>> {
        self.columns.iter().filter(|c| c.role == ColumnRole::Key)
    }

    pub fn has_keys(&self) -> bool {
        self.keys().next().is_some()
    }

    pub fn version(&self) -> Option<&ClassifiedColumn<'a>> {
        self.columns.iter().find(|c| c.role == ColumnRole::Version)
    }

    /// Columns the package writes. Maintained columns are left to the
    /// trigger unless expressions are inlined.
    pub fn dml_columns(&self) -> Vec<&ClassifiedColumn<'a>> {
        self.columns
            .iter()
            .filter(|c| {
                !c.role.is_maintained()
                    || self.policy.auto_maintain_method == AutoMaintainMethod::Expression
            })
            .collect()
    }

    /// Columns listed by insert statements. Identity columns generated
    /// always are filled by the database.
    pub fn insert_columns(&self) -> Vec<&ClassifiedColumn<'a>> {
        self.dml_columns()
            .into_iter()
            .filter(|c| !c.column.is_identity_always())
            .collect()
    }

    /// Maintained columns present in this table, in ordinal order.
    pub fn maintained(&self) -> impl Iterator<Item = &ClassifiedColumn<'a>> {
        self.columns.iter().filter(|c| c.role.is_maintained())
    }

    /// Reference to a column's value inside a procedure of the given style.
    /// Row-type procedures take keys as scalars and everything else from the row.
    pub fn value_ref(&self, column: &ClassifiedColumn<'_>, style: SignatureStyle) -> String {
        let name = column.name_lc();
        match style {
            SignatureStyle::Coltype => format!("p_{name}"),
            SignatureStyle::Rowtype if column.role == ColumnRole::Key => format!("p_{name}"),
            SignatureStyle::Rowtype => format!("p_row.{name}"),
        }
    }

    pub fn max_column_name_len(&self) -> usize {
        self.table.max_column_name_len()
    }

    /// Bindings shared by every fragment rendered for this table.
    pub fn base_bindings(&self) -> Bindings {
        let policy = self.policy;
        let mut bindings = Bindings::new();
        for (key, value) in &policy.settings_bindings {
            bindings.insert(key.clone(), value.clone());
        }

        let copyright_year = if policy.copyright_year.eq_ignore_ascii_case("current") {
            self.run.run_year.clone()
        } else {
            policy.copyright_year.clone()
        };

        bindings.insert(INDENT_TOKEN, policy.indent());
        bindings.insert("schema_name", self.schema_name);
        bindings.insert("table_name", self.table.name.clone());
        bindings.insert("table_owner", policy.table_owner.clone());
        bindings.insert("package_owner", policy.package_owner.clone());
        bindings.insert("trigger_owner", policy.trigger_owner.clone());
        bindings.insert("view_owner", policy.view_owner.clone());
        bindings.insert("package_name", self.package_name());
        bindings.insert("trigger_name", self.trigger_name());
        bindings.insert("view_name", self.view_name());
        bindings.insert("tapi_author", policy.tapi_author.clone());
        bindings.insert("app_name", policy.app_name.clone());
        bindings.insert("run_date_time", self.run.run_date_time.clone());
        bindings.insert("copyright_year", copyright_year);
        bindings.insert("spec_suffix", policy.files.spec_suffix.clone());
        bindings.insert("body_suffix", policy.files.body_suffix.clone());
        bindings.insert("noop_sentinel", self.run.sentinel.default_expression());
        bindings.insert(
            "version_column",
            self.version().map(|c| c.name_lc()).unwrap_or_default(),
        );

        bindings.set_flag("include_commit", policy.include_commit);
        bindings.set_flag("include_rowid", policy.include_rowid);
        bindings.set_flag("return_key_columns", policy.return_key_columns);
        bindings.set_flag("has_version", self.version().is_some());
        bindings
    }

    /// Render the expression fragment for a maintained column, if one exists.
    ///
    /// `current_row` prefixes the row's existing values in the fragment:
    /// `:old.` in a trigger, `tgt.` in a merge, empty in a plain update.
    pub fn expression(
        &self,
        column: &ClassifiedColumn<'_>,
        phase: ExpressionPhase,
        current_row: &str,
    ) -> Result<Option<String>> {
        let name = column.name_lc();
        let (template, folder) = match phase {
            ExpressionPhase::Insert => (self.templates.insert_expression(&name), "inserts"),
            ExpressionPhase::Update => (self.templates.update_expression(&name), "updates"),
        };
        let Some(template) = template else {
            return Ok(None);
        };
        let fragment = format!("column_expressions/{folder}/{name}");
        let mut bindings = self.base_bindings();
        bindings.insert(CURRENT_ROW_TOKEN, current_row);
        render(&fragment, template, &bindings).map(Some)
    }
}

/// Lay out list items one per line, aligned under the first:
/// `  a` / `<indent>, b` for a `,` leader.
pub(crate) fn join_lines(items: &[String], indent: &str, leader: &str) -> String {
    let mut out = String::new();
    for (position, item) in items.iter().enumerate() {
        if position == 0 {
            out.push_str(&" ".repeat(leader.len() + 1));
        } else {
            out.push('\n');
            out.push_str(indent);
            out.push_str(leader);
            out.push(' ');
        }
        out.push_str(item);
    }
    out
}
