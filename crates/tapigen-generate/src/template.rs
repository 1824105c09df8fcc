use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use tapigen_config::{AutoMaintainMethod, ConfigError, OperationKind, Policy};

use crate::errors::{GenerationError, Result};

pub const FRAGMENT_EXTENSION: &str = "tpt";
pub const INDENT_TOKEN: &str = "STAB";

/// Named fragments loaded from the template directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FragmentKind {
    SpecHeader,
    SpecFooter,
    BodyHeader,
    BodyFooter,
    Procedure(OperationKind),
    Trigger,
    View,
}

impl FragmentKind {
    pub fn relative_path(self) -> PathBuf {
        let relative = match self {
            FragmentKind::SpecHeader => "packages/spec/package_header".to_string(),
            FragmentKind::SpecFooter => "packages/spec/package_footer".to_string(),
            FragmentKind::BodyHeader => "packages/body/package_header".to_string(),
            FragmentKind::BodyFooter => "packages/body/package_footer".to_string(),
            FragmentKind::Procedure(kind) => format!("packages/procedures/{}", kind.as_str()),
            FragmentKind::Trigger => "triggers/trigger".to_string(),
            FragmentKind::View => "views/view".to_string(),
        };
        PathBuf::from(format!("{relative}.{FRAGMENT_EXTENSION}"))
    }

    pub fn name(self) -> String {
        match self {
            FragmentKind::SpecHeader => "spec_header".to_string(),
            FragmentKind::SpecFooter => "spec_footer".to_string(),
            FragmentKind::BodyHeader => "body_header".to_string(),
            FragmentKind::BodyFooter => "body_footer".to_string(),
            FragmentKind::Procedure(kind) => format!("procedure_{}", kind.as_str()),
            FragmentKind::Trigger => "trigger".to_string(),
            FragmentKind::View => "view".to_string(),
        }
    }
}

/// Token values and conditional flags for one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<String, String>,
    flags: BTreeSet<String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn set_flag(&mut self, flag: impl Into<String>, enabled: bool) {
        let flag = flag.into();
        if enabled {
            self.flags.insert(flag);
        } else {
            self.flags.remove(&flag);
        }
    }

    /// Copy every value and flag from `other`, replacing existing keys.
    pub fn extend(&mut self, other: &Bindings) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
        for flag in &other.flags {
            self.flags.insert(flag.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Resolve a token, honouring the `_lc` and `_uc` case variants.
    pub fn resolve(&self, token: &str) -> Option<String> {
        if let Some(value) = self.values.get(token) {
            return Some(value.clone());
        }
        if let Some(base) = token.strip_suffix("_lc") {
            return self.values.get(base).map(|value| value.to_lowercase());
        }
        if let Some(base) = token.strip_suffix("_uc") {
            return self.values.get(base).map(|value| value.to_uppercase());
        }
        None
    }
}

struct Patterns {
    token: Regex,
    block_open: Regex,
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                token: Regex::new(r"%([A-Za-z_][A-Za-z0-9_]*)%").ok()?,
                block_open: Regex::new(r"%#([A-Za-z_][A-Za-z0-9_]*)%").ok()?,
            })
        })
        .as_ref()
}

/// Render template text against bindings.
///
/// Conditional blocks `%#flag%...%/flag%` are resolved first, then every
/// `%token%` is substituted in a single pass; bound values are never
/// re-scanned. Any token left without a binding fails the render.
pub fn render(fragment: &str, template: &str, bindings: &Bindings) -> Result<String> {
    let patterns =
        patterns().ok_or_else(|| GenerationError::render(fragment, "token patterns unavailable"))?;
    let expanded = expand_blocks(patterns, fragment, template, bindings)?;

    let mut output = String::with_capacity(expanded.len());
    let mut cursor = 0;
    for captures in patterns.token.captures_iter(&expanded) {
        let (Some(whole), Some(token)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = bindings.resolve(token.as_str()).ok_or_else(|| {
            GenerationError::render(fragment, format!("unresolved token %{}%", token.as_str()))
        })?;
        output.push_str(&expanded[cursor..whole.start()]);
        output.push_str(&value);
        cursor = whole.end();
    }
    output.push_str(&expanded[cursor..]);

    Ok(output)
}

fn expand_blocks(
    patterns: &Patterns,
    fragment: &str,
    template: &str,
    bindings: &Bindings,
) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = patterns.block_open.captures(rest) {
        let (Some(whole), Some(flag)) = (open.get(0), open.get(1)) else {
            break;
        };
        let close_marker = format!("%/{}%", flag.as_str());
        let body_start = whole.end();
        let Some(close_offset) = rest[body_start..].find(&close_marker) else {
            return Err(GenerationError::render(
                fragment,
                format!("unterminated block %#{}%", flag.as_str()),
            ));
        };
        let body = &rest[body_start..body_start + close_offset];

        output.push_str(&rest[..whole.start()]);
        if bindings.flag(flag.as_str()) {
            output.push_str(&expand_blocks(patterns, fragment, body, bindings)?);
        }
        rest = &rest[body_start + close_offset + close_marker.len()..];
    }
    output.push_str(rest);

    Ok(output)
}

/// Fragment set for one run, loaded and checked before any table is processed.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    root: PathBuf,
    fragments: BTreeMap<FragmentKind, String>,
    insert_expressions: BTreeMap<String, String>,
    update_expressions: BTreeMap<String, String>,
}

impl TemplateSet {
    /// Load every fragment the policy needs.
    ///
    /// Package headers, footers and the procedure fragment of each selected
    /// operation are required. Trigger and view fragments are optional; their
    /// absence is reported when an artifact needs them. Under the expression
    /// method every maintained column must have its expression fragments.
    pub fn load(root: &Path, policy: &Policy) -> Result<Self> {
        if !root.is_dir() {
            return Err(ConfigError::MissingFragment {
                fragment: "templates".to_string(),
                path: root.display().to_string(),
            }
            .into());
        }

        let mut required = vec![
            FragmentKind::SpecHeader,
            FragmentKind::SpecFooter,
            FragmentKind::BodyHeader,
            FragmentKind::BodyFooter,
        ];
        required.extend(policy.operations.iter().map(|kind| FragmentKind::Procedure(*kind)));

        let mut fragments = BTreeMap::new();
        for kind in required {
            let path = root.join(kind.relative_path());
            let text = read_fragment(&path)?.ok_or_else(|| ConfigError::MissingFragment {
                fragment: kind.name(),
                path: path.display().to_string(),
            })?;
            fragments.insert(kind, text);
        }
        for kind in [FragmentKind::Trigger, FragmentKind::View] {
            let path = root.join(kind.relative_path());
            match read_fragment(&path)? {
                Some(text) => {
                    fragments.insert(kind, text);
                }
                None => debug!(
                    fragment = %kind.name(),
                    path = %path.display(),
                    "optional fragment absent"
                ),
            }
        }

        let insert_expressions = read_expression_dir(&root.join("column_expressions/inserts"))?;
        let update_expressions = read_expression_dir(&root.join("column_expressions/updates"))?;

        let set = Self {
            root: root.to_path_buf(),
            fragments,
            insert_expressions,
            update_expressions,
        };
        set.check_expressions(policy)?;
        Ok(set)
    }

    fn check_expressions(&self, policy: &Policy) -> Result<()> {
        let needs_insert = policy
            .operations
            .iter()
            .any(|kind| {
                matches!(
                    kind,
                    OperationKind::Insert | OperationKind::Upsert | OperationKind::Merge
                )
            });
        let needs_update = policy
            .operations
            .iter()
            .any(|kind| kind.supports_partial_update());

        for column in policy.maintained_columns() {
            let checks = [
                (needs_insert, &self.insert_expressions, "inserts"),
                (needs_update, &self.update_expressions, "updates"),
            ];
            for (needed, expressions, folder) in checks {
                if expressions.contains_key(&column) {
                    continue;
                }
                let path = self
                    .root
                    .join("column_expressions")
                    .join(folder)
                    .join(format!("{column}.{FRAGMENT_EXTENSION}"));
                if needed && policy.auto_maintain_method == AutoMaintainMethod::Expression {
                    return Err(ConfigError::MissingFragment {
                        fragment: format!("column_expressions/{folder}/{column}"),
                        path: path.display().to_string(),
                    }
                    .into());
                }
                if policy.auto_maintain_method == AutoMaintainMethod::Trigger {
                    warn!(
                        column = %column,
                        path = %path.display(),
                        "no {folder} expression for maintained column; trigger leaves it untouched"
                    );
                }
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fragment(&self, kind: FragmentKind) -> Option<&str> {
        self.fragments.get(&kind).map(String::as_str)
    }

    pub fn has(&self, kind: FragmentKind) -> bool {
        self.fragments.contains_key(&kind)
    }

    /// Render a loaded fragment. An absent fragment is a render error.
    pub fn render(&self, kind: FragmentKind, bindings: &Bindings) -> Result<String> {
        let name = kind.name();
        let template = self
            .fragment(kind)
            .ok_or_else(|| GenerationError::render(&name, "fragment not loaded"))?;
        render(&name, template, bindings)
    }

    /// Insert-time expression for a lowercased column name.
    pub fn insert_expression(&self, column: &str) -> Option<&str> {
        self.insert_expressions.get(column).map(String::as_str)
    }

    /// Update-time expression for a lowercased column name.
    pub fn update_expression(&self, column: &str) -> Option<&str> {
        self.update_expressions.get(column).map(String::as_str)
    }
}

fn read_fragment(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Expression fragments keyed by lowercased file stem; trailing whitespace trimmed.
fn read_expression_dir(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut expressions = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(expressions);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(FRAGMENT_EXTENSION) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let text = fs::read_to_string(&path)?;
        expressions.insert(stem.to_lowercase(), text.trim_end().to_string());
    }
    Ok(expressions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> Bindings {
        let mut bindings = Bindings::new();
        bindings.insert("table_name", "Employees");
        bindings.insert(INDENT_TOKEN, "   ");
        bindings
    }

    #[test]
    fn substitutes_case_variants() {
        let out = render("t", "%table_name_uc%|%table_name_lc%|%STAB%x", &bindings())
            .expect("render");
        assert_eq!(out, "EMPLOYEES|employees|   x");
    }

    #[test]
    fn bound_values_are_not_rescanned() {
        let mut bindings = bindings();
        bindings.insert("signature", "%table_name%");
        let out = render("t", "%signature%", &bindings).expect("render");
        assert_eq!(out, "%table_name%");
    }

    #[test]
    fn conditional_blocks_follow_flags() {
        let mut bindings = bindings();
        bindings.set_flag("include_commit", true);
        let template = "a%#include_commit%+c%/include_commit%%#include_rowid%+r%/include_rowid%";
        let out = render("t", template, &bindings).expect("render");
        assert_eq!(out, "a+c");
    }

    #[test]
    fn unresolved_token_is_an_error() {
        let err = render("procedure_insert", "%nope%", &bindings()).unwrap_err();
        assert!(err.to_string().contains("procedure_insert"));
        assert!(err.to_string().contains("%nope%"));
    }

    #[test]
    fn percent_type_attributes_pass_through() {
        let out = render("t", "l_row %table_name_lc%%rowtype;", &bindings()).expect("render");
        assert_eq!(out, "l_row employees%rowtype;");
    }
}
