use crate::errors::Result;
use crate::template::FragmentKind;

use super::{TableContext, join_lines};

pub fn render_view(ctx: &TableContext<'_>) -> Result<String> {
    let columns: Vec<String> = ctx.columns.iter().map(|c| c.name_lc()).collect();
    let mut bindings = ctx.base_bindings();
    bindings.insert(
        "column_list_string",
        join_lines(&columns, &ctx.indent(1), ","),
    );
    ctx.templates.render(FragmentKind::View, &bindings)
}
