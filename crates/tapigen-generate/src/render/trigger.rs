use tracing::warn;

use crate::errors::Result;
use crate::template::FragmentKind;

use super::{ExpressionPhase, TableContext};

/// Render the row-level trigger that maintains auto-maintained and version
/// columns. Columns without an expression fragment are left untouched.
pub fn render_trigger(ctx: &TableContext<'_>) -> Result<String> {
    let indent = ctx.indent(2);
    let mut insert_lines = Vec::new();
    let mut update_lines = Vec::new();

    for column in ctx.maintained() {
        let name = column.name_lc();
        match ctx.expression(column, ExpressionPhase::Insert, ":new.")? {
            Some(expression) => insert_lines.push(format!("{indent}:new.{name} := {expression};")),
            None => warn!(
                table = %ctx.table.name,
                column = %name,
                "no insert expression for trigger"
            ),
        }
        match ctx.expression(column, ExpressionPhase::Update, ":old.")? {
            Some(expression) => update_lines.push(format!("{indent}:new.{name} := {expression};")),
            None => warn!(
                table = %ctx.table.name,
                column = %name,
                "no update expression for trigger"
            ),
        }
    }

    let mut bindings = ctx.base_bindings();
    bindings.set_flag("has_insert_expressions", !insert_lines.is_empty());
    bindings.set_flag("has_update_expressions", !update_lines.is_empty());
    bindings.insert("insert_expressions_string", insert_lines.join("\n"));
    bindings.insert("update_expressions_string", update_lines.join("\n"));

    ctx.templates.render(FragmentKind::Trigger, &bindings)
}
