use tracing::{debug, warn};

use tapigen_config::{OperationKind, SignatureStyle};

use crate::errors::Result;
use crate::roles::{ClassifiedColumn, ColumnRole};
use crate::signature::{
    ROW_PARAMETER, ROWID_PARAMETER, Signature, build_classified, is_style_independent,
};
use crate::template::{Bindings, FragmentKind};

use super::{ExpressionPhase, TableContext, join_lines};

/// Banner rule width, including the leading indent.
const BANNER_WIDTH: usize = 80;

/// Statements in procedure bodies sit two levels deep.
const STATEMENT_DEPTH: usize = 2;

/// Rendered package source plus the overloads left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPackage {
    pub spec: String,
    pub body: String,
    pub skipped: Vec<SkippedOverload>,
}

/// An overload that could not be generated for this table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOverload {
    pub operation: OperationKind,
    pub style: SignatureStyle,
    pub reason: String,
}

/// Overloads in emission order. Style-independent operations appear once.
pub fn overloads(
    operations: &[OperationKind],
    styles: &[SignatureStyle],
) -> Vec<(OperationKind, SignatureStyle)> {
    let mut pairs = Vec::new();
    for operation in operations {
        for (position, style) in styles.iter().enumerate() {
            if position > 0 && is_style_independent(*operation) {
                continue;
            }
            pairs.push((*operation, *style));
        }
    }
    pairs
}

/// Render the package specification and body for one table.
pub fn render_package(ctx: &TableContext<'_>) -> Result<RenderedPackage> {
    let base = ctx.base_bindings();
    let mut spec = ctx.templates.render(FragmentKind::SpecHeader, &base)?;
    let mut body = ctx.templates.render(FragmentKind::BodyHeader, &base)?;
    let mut skipped = Vec::new();

    for (operation, style) in overloads(&ctx.policy.operations, &ctx.policy.signature_styles) {
        if let Some(reason) = skip_reason(ctx, operation) {
            warn!(
                table = %ctx.table.name,
                operation = %operation,
                style = %style,
                reason = %reason,
                "overload skipped"
            );
            skipped.push(SkippedOverload {
                operation,
                style,
                reason,
            });
            continue;
        }

        let signature = build_classified(
            ctx.table,
            &ctx.columns,
            operation,
            style,
            ctx.policy,
            &ctx.run.sentinel,
        );
        debug!(
            table = %ctx.table.name,
            operation = %operation,
            style = %style,
            parameters = signature.parameters.len(),
            "signature built"
        );

        let declaration = format_signature(ctx, &signature);
        spec.push_str(&declaration);
        spec.push_str(";\n");

        let mut bindings = base.clone();
        bindings.extend(&procedure_bindings(ctx, &signature, declaration)?);
        body.push_str(
            &ctx.templates
                .render(FragmentKind::Procedure(operation), &bindings)?,
        );
    }

    spec.push('\n');
    spec.push_str(&ctx.templates.render(FragmentKind::SpecFooter, &base)?);
    body.push('\n');
    body.push_str(&ctx.templates.render(FragmentKind::BodyFooter, &base)?);

    Ok(RenderedPackage {
        spec,
        body,
        skipped,
    })
}

fn skip_reason(ctx: &TableContext<'_>, operation: OperationKind) -> Option<String> {
    if operation != OperationKind::Insert && !ctx.has_keys() {
        return Some("table has no primary key or unique columns".to_string());
    }
    if matches!(operation, OperationKind::Update | OperationKind::Upsert)
        && updatable(ctx).is_empty()
    {
        return Some("table has no updatable columns".to_string());
    }
    None
}

/// Banner comment, procedure name and aligned parameter block, unterminated.
pub fn format_signature(ctx: &TableContext<'_>, signature: &Signature) -> String {
    let tab = ctx.indent(1);
    let rule = "-".repeat(BANNER_WIDTH.saturating_sub(tab.len()));
    let width = ctx.max_column_name_len() + ctx.policy.indent_spaces;
    let procedure_name = ctx.policy.procedure_names.name_for(signature.operation);

    let mut out = String::new();
    out.push_str("\n\n");
    out.push_str(&format!("{tab}{rule}\n"));
    out.push_str(&format!(
        "{tab}-- {} TAPI for: {}.{}\n",
        signature.operation.title(),
        ctx.schema_name.to_lowercase(),
        ctx.table_lc()
    ));
    out.push_str(&format!("{tab}{rule}\n"));
    out.push_str(&format!("{tab}procedure {procedure_name}"));

    if signature.parameters.is_empty() {
        return out;
    }

    out.push_str(&format!("\n{tab}(\n"));
    for (position, param) in signature.parameters.iter().enumerate() {
        let leader = if position == 0 { "  " } else { ", " };
        let name = param.name.strip_prefix("p_").unwrap_or(&param.name);
        let mut line = format!(
            "{tab}{tab}{leader}p_{name:<width$}{tab}{}{tab}{}",
            param.direction.keyword(),
            param.param_type.reference()
        );
        if let Some(default) = &param.default {
            line.push_str(&format!(" := {default}"));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!("{tab})"));
    out
}

fn procedure_bindings(
    ctx: &TableContext<'_>,
    signature: &Signature,
    declaration: String,
) -> Result<Bindings> {
    let style = signature.style;
    let operation = signature.operation;
    let indent = ctx.indent(STATEMENT_DEPTH);
    let name_width = ctx.max_column_name_len();

    let mut bindings = Bindings::new();
    bindings.insert("procedure_signature", declaration);
    bindings.insert(
        "procedure_name",
        ctx.policy.procedure_names.name_for(operation),
    );
    bindings.set_flag("coltype", style == SignatureStyle::Coltype);
    bindings.set_flag("rowtype", style == SignatureStyle::Rowtype);

    let key_predicates: Vec<String> = ctx
        .keys()
        .map(|key| format!("{} = {}", key.name_lc(), ctx.value_ref(key, style)))
        .collect();
    bindings.insert(
        "key_predicates_string",
        join_lines(&key_predicates, &indent, "and"),
    );

    match operation {
        OperationKind::Select => {
            let mut columns: Vec<String> = ctx.columns.iter().map(|c| c.name_lc()).collect();
            let mut targets: Vec<String> = match style {
                SignatureStyle::Coltype => ctx
                    .columns
                    .iter()
                    .map(|c| format!("p_{}", c.name_lc()))
                    .collect(),
                SignatureStyle::Rowtype => vec![ROW_PARAMETER.to_string()],
            };
            // A row-type target cannot share an into list, so its rowid is read separately.
            let mut readback = Vec::new();
            if ctx.policy.include_rowid {
                match style {
                    SignatureStyle::Coltype => {
                        columns.push("rowid".to_string());
                        targets.push(ROWID_PARAMETER.to_string());
                    }
                    SignatureStyle::Rowtype => readback.push(rowid_pair()),
                }
            }
            bindings.insert("column_list_string", join_lines(&columns, &indent, ","));
            bindings.insert("parameter_list_string", join_lines(&targets, &indent, ","));
            readback_bindings(&mut bindings, &readback, &indent);
        }
        OperationKind::Delete => {
            let returned: Vec<(String, String)> = if ctx.policy.include_rowid {
                vec![rowid_pair()]
            } else {
                Vec::new()
            };
            returning_bindings(&mut bindings, &returned, &indent);
        }
        OperationKind::Insert
        | OperationKind::Update
        | OperationKind::Upsert
        | OperationKind::Merge => {
            // The upsert insert branch is nested one level below its update.
            let insert_indent = if operation == OperationKind::Upsert {
                ctx.indent(STATEMENT_DEPTH + 1)
            } else {
                indent.clone()
            };
            let inserted = ctx.insert_columns();
            let columns: Vec<String> = inserted.iter().map(|c| c.name_lc()).collect();
            bindings.insert("column_list_string", join_lines(&columns, &insert_indent, ","));

            let mut values = Vec::with_capacity(inserted.len());
            for column in &inserted {
                values.push(insert_value(ctx, column, style, operation, "")?);
            }
            bindings.insert("parameter_list_string", join_lines(&values, &insert_indent, ","));

            let mut assignments = Vec::new();
            for column in updatable(ctx) {
                let value = update_value(ctx, column, style, operation, "")?;
                assignments.push(format!("{:<name_width$} = {value}", column.name_lc()));
            }
            bindings.set_flag("has_update_assignments", !assignments.is_empty());
            bindings.insert(
                "update_assignments_string",
                join_lines(&assignments, &indent, ","),
            );

            let returned = returned_columns(ctx);
            returning_bindings(&mut bindings, &returned, &indent);
            bindings.insert(
                "insert_returning_clause",
                returning_clause(&returned, &insert_indent),
            );
            if operation == OperationKind::Merge {
                merge_bindings(ctx, &mut bindings, style, &indent)?;
            }
        }
    }

    Ok(bindings)
}

/// Non-key columns assigned by update statements.
fn updatable<'c, 'a>(ctx: &'c TableContext<'a>) -> Vec<&'c ClassifiedColumn<'a>> {
    ctx.dml_columns()
        .into_iter()
        .filter(|c| c.role != ColumnRole::Key)
        .collect()
}

/// Value inserted for a column. Sentinel-defaulted parameters fall back to
/// the declared default, so an omitted column never stores the sentinel.
fn insert_value(
    ctx: &TableContext<'_>,
    column: &ClassifiedColumn<'_>,
    style: SignatureStyle,
    operation: OperationKind,
    source_prefix: &str,
) -> Result<String> {
    if column.role.is_maintained()
        && let Some(expression) = ctx.expression(column, ExpressionPhase::Insert, "")?
    {
        return Ok(expression);
    }

    let value = source_value(ctx, column, style, source_prefix);
    if column.role == ColumnRole::Ordinary
        && style == SignatureStyle::Coltype
        && operation.supports_partial_update()
    {
        let fallback = column.column.declared_default().unwrap_or("null");
        return Ok(format!(
            "case when {value} = {} then {fallback} else {value} end",
            ctx.run.sentinel.default_expression()
        ));
    }
    Ok(value)
}

fn update_value(
    ctx: &TableContext<'_>,
    column: &ClassifiedColumn<'_>,
    style: SignatureStyle,
    operation: OperationKind,
    source_prefix: &str,
) -> Result<String> {
    let current = if source_prefix.is_empty() { "" } else { "tgt." };
    if column.role.is_maintained() {
        if let Some(expression) = ctx.expression(column, ExpressionPhase::Update, current)? {
            return Ok(expression);
        }
        return Ok(format!("{source_prefix}{}", column.name_lc()));
    }

    let value = source_value(ctx, column, style, source_prefix);
    if style == SignatureStyle::Coltype && operation.supports_partial_update() {
        return Ok(format!(
            "case when {value} = {} then {current}{} else {value} end",
            ctx.run.sentinel.default_expression(),
            column.name_lc()
        ));
    }
    Ok(value)
}

/// Value reference for a column: a procedure parameter, or `src.<column>`
/// inside a merge source.
fn source_value(
    ctx: &TableContext<'_>,
    column: &ClassifiedColumn<'_>,
    style: SignatureStyle,
    source_prefix: &str,
) -> String {
    if source_prefix.is_empty() {
        ctx.value_ref(column, style)
    } else {
        format!("{source_prefix}{}", column.name_lc())
    }
}

fn rowid_pair() -> (String, String) {
    ("rowid".to_string(), ROWID_PARAMETER.to_string())
}

/// `(column, parameter)` pairs handed back after a write.
fn returned_columns(ctx: &TableContext<'_>) -> Vec<(String, String)> {
    let mut returned = Vec::new();
    if ctx.policy.return_key_columns {
        returned.extend(
            ctx.keys()
                .map(|key| (key.name_lc(), format!("p_{}", key.name_lc()))),
        );
    }
    if let Some(version) = ctx.version() {
        returned.push((version.name_lc(), format!("p_{}", version.name_lc())));
    }
    if ctx.policy.include_rowid {
        returned.push(rowid_pair());
    }
    returned
}

fn returning_clause(returned: &[(String, String)], indent: &str) -> String {
    if returned.is_empty() {
        return String::new();
    }
    let (columns, targets): (Vec<String>, Vec<String>) = returned.iter().cloned().unzip();
    format!(
        "returning\n{indent}{}\n{indent}into\n{indent}{}",
        join_lines(&columns, indent, ","),
        join_lines(&targets, indent, ",")
    )
}

fn returning_bindings(bindings: &mut Bindings, returned: &[(String, String)], indent: &str) {
    let (columns, targets): (Vec<String>, Vec<String>) = returned.iter().cloned().unzip();
    bindings.set_flag("returning", !returned.is_empty());
    bindings.insert("return_columns_list", join_lines(&columns, indent, ","));
    bindings.insert("return_parameter_list", join_lines(&targets, indent, ","));
    bindings.insert("returning_clause", returning_clause(returned, indent));
}

/// Values read back by a follow-up select when the statement has no
/// returning clause.
fn readback_bindings(bindings: &mut Bindings, entries: &[(String, String)], indent: &str) {
    let (columns, targets): (Vec<String>, Vec<String>) = entries.iter().cloned().unzip();
    bindings.set_flag("readback", !entries.is_empty());
    bindings.insert("readback_columns", join_lines(&columns, indent, ","));
    bindings.insert("readback_targets", join_lines(&targets, indent, ","));
}

fn merge_bindings(
    ctx: &TableContext<'_>,
    bindings: &mut Bindings,
    style: SignatureStyle,
    indent: &str,
) -> Result<()> {
    let name_width = ctx.max_column_name_len();

    let aliases: Vec<String> = ctx
        .dml_columns()
        .into_iter()
        .filter(|c| !c.role.is_maintained())
        .map(|c| {
            format!(
                "{:<width$} as {}",
                ctx.value_ref(c, style),
                c.name_lc(),
                width = name_width + "p_row.".len()
            )
        })
        .collect();
    bindings.insert("mrg_param_alias_list", join_lines(&aliases, indent, ","));

    let predicates: Vec<String> = ctx
        .keys()
        .map(|key| format!("tgt.{0} = src.{0}", key.name_lc()))
        .collect();
    bindings.insert("mrg_predicates_string", join_lines(&predicates, indent, "and"));

    let mut sources = Vec::new();
    for column in ctx.insert_columns() {
        sources.push(insert_value(ctx, column, style, OperationKind::Merge, "src.")?);
    }
    bindings.insert("mrg_src_column_list_string", join_lines(&sources, indent, ","));

    let mut assignments = Vec::new();
    for column in updatable(ctx) {
        let value = update_value(ctx, column, style, OperationKind::Merge, "src.")?;
        assignments.push(format!(
            "tgt.{:<name_width$} = {value}",
            column.name_lc()
        ));
    }
    bindings.insert(
        "mrg_update_assignments_string",
        join_lines(&assignments, indent, ","),
    );

    // Merge has no returning clause; the version and rowid are read back.
    let mut readback = Vec::new();
    if let Some(version) = ctx.version() {
        readback.push((version.name_lc(), format!("p_{}", version.name_lc())));
    }
    if ctx.policy.include_rowid {
        readback.push(rowid_pair());
    }
    readback_bindings(bindings, &readback, indent);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_is_emitted_once_across_styles() {
        let pairs = overloads(
            &[OperationKind::Insert, OperationKind::Delete],
            &[SignatureStyle::Rowtype, SignatureStyle::Coltype],
        );
        assert_eq!(
            pairs,
            vec![
                (OperationKind::Insert, SignatureStyle::Rowtype),
                (OperationKind::Insert, SignatureStyle::Coltype),
                (OperationKind::Delete, SignatureStyle::Rowtype),
            ]
        );
    }
}
