use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::{ConfigError, Result};
use crate::model::{
    FileControls, NoopSetting, OperationKind, Policy, ProcedureNames, SignatureStyle,
};
use crate::settings::SettingsSource;

/// Built-in defaults as (section, key, value). Keys absent here and from
/// every other layer are required.
const DEFAULTS: &[(&str, &str, &str)] = &[
    ("project", "default_app_name", "Undefined"),
    ("project", "tapi_author", "tapigen"),
    ("project", "copyright_year", "current"),
    ("api_controls", "default_api_types", "insert,select,update,delete"),
    ("api_controls", "signature_types", "rowtype,coltype"),
    ("api_controls", "include_defaults", "true"),
    ("api_controls", "return_key_columns", "true"),
    ("api_controls", "include_commit", "false"),
    ("api_controls", "include_rowid", "false"),
    ("api_controls", "noop_column_string", "auto"),
    ("api_controls", "noop_dynamic_expression", "sys_guid()"),
    ("api_controls", "row_vers_column_name", ""),
    ("api_controls", "auto_maintained_cols", ""),
    ("api_controls", "col_auto_maintain_method", "trigger"),
    ("api_controls", "insert_procname", "ins"),
    ("api_controls", "select_procname", "get"),
    ("api_controls", "update_procname", "upd"),
    ("api_controls", "delete_procname", "del"),
    ("api_controls", "upsert_procname", "ups"),
    ("api_controls", "merge_procname", "mrg"),
    ("formatting", "indent_spaces", "3"),
    ("file_controls", "staging_dir", "staging"),
    ("file_controls", "templates_dir", "templates"),
    ("file_controls", "ledger_path", "tapigen.csv"),
    ("file_controls", "spec_dir", "package_spec"),
    ("file_controls", "body_dir", "package_body"),
    ("file_controls", "trigger_dir", "trigger"),
    ("file_controls", "view_dir", "view"),
    ("file_controls", "spec_suffix", ".pks"),
    ("file_controls", "body_suffix", ".pkb"),
    ("file_controls", "trigger_suffix", ".sql"),
    ("file_controls", "view_suffix", ".sql"),
    ("file_controls", "package_name_suffix", "_tapi"),
    ("file_controls", "trigger_name_suffix", "_biu"),
    ("file_controls", "view_name_suffix", "_v"),
    ("behaviour", "skip_on_missing_table", "true"),
];

/// Which layer supplied a resolved setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingOrigin {
    Override,
    Settings,
    Default,
}

/// Run-scoped overrides, typically taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub api_types: Option<Vec<OperationKind>>,
    pub table_owner: Option<String>,
    pub package_owner: Option<String>,
    pub trigger_owner: Option<String>,
    pub view_owner: Option<String>,
    pub tapi_author: Option<String>,
    pub app_name: Option<String>,
    pub staging_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
}

impl RunOverrides {
    fn entries(&self) -> BTreeMap<(String, String), String> {
        let mut entries = BTreeMap::new();
        let mut put = |section: &str, key: &str, value: Option<String>| {
            if let Some(value) = value {
                entries.insert((section.to_string(), key.to_string()), value);
            }
        };

        put(
            "api_controls",
            "default_api_types",
            self.api_types.as_ref().map(|kinds| {
                kinds
                    .iter()
                    .map(|kind| kind.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            }),
        );
        put("schemas", "default_table_owner", self.table_owner.clone());
        put("schemas", "default_package_owner", self.package_owner.clone());
        put("schemas", "default_trigger_owner", self.trigger_owner.clone());
        put("schemas", "default_view_owner", self.view_owner.clone());
        put("project", "tapi_author", self.tapi_author.clone());
        put("project", "default_app_name", self.app_name.clone());
        put(
            "file_controls",
            "staging_dir",
            self.staging_dir
                .as_ref()
                .map(|path| path.display().to_string()),
        );
        put(
            "file_controls",
            "templates_dir",
            self.templates_dir
                .as_ref()
                .map(|path| path.display().to_string()),
        );

        entries
    }
}

/// Resolves each policy key with precedence override > settings > default.
#[derive(Debug)]
pub struct PolicyResolver<'a> {
    settings: &'a SettingsSource,
    overrides: BTreeMap<(String, String), String>,
}

impl<'a> PolicyResolver<'a> {
    pub fn new(settings: &'a SettingsSource, overrides: &RunOverrides) -> Self {
        Self {
            settings,
            overrides: overrides.entries(),
        }
    }

    /// The winning value for a key and the layer it came from.
    pub fn lookup(&self, section: &str, key: &str) -> Option<(String, SettingOrigin)> {
        if let Some(value) = self
            .overrides
            .get(&(section.to_string(), key.to_string()))
        {
            return Some((value.clone(), SettingOrigin::Override));
        }
        if let Some(value) = self.settings.get(section, key) {
            return Some((value.to_string(), SettingOrigin::Settings));
        }
        DEFAULTS
            .iter()
            .find(|(default_section, default_key, _)| {
                *default_section == section && *default_key == key
            })
            .map(|(_, _, value)| (value.to_string(), SettingOrigin::Default))
    }

    pub fn resolve(&self) -> Result<Policy> {
        let table_owner = self.required("schemas", "default_table_owner")?;
        let package_owner = self.required("schemas", "default_package_owner")?;
        let trigger_owner = self
            .optional("schemas", "default_trigger_owner")
            .unwrap_or_else(|| table_owner.clone());
        let view_owner = self
            .optional("schemas", "default_view_owner")
            .unwrap_or_else(|| table_owner.clone());

        let operations = self.parsed_list::<OperationKind>("api_controls", "default_api_types")?;
        let signature_styles =
            self.parsed_list::<SignatureStyle>("api_controls", "signature_types")?;

        let noop = match self.text("api_controls", "noop_column_string")?.trim() {
            "" => NoopSetting::Auto,
            mode if mode.eq_ignore_ascii_case("auto") => NoopSetting::Auto,
            mode if mode.eq_ignore_ascii_case("dynamic") => NoopSetting::Dynamic(
                self.required("api_controls", "noop_dynamic_expression")?,
            ),
            literal => NoopSetting::Static(literal.to_string()),
        };

        let auto_maintain_method = self.parsed("api_controls", "col_auto_maintain_method")?;

        let indent_spaces = self.parsed::<usize>("formatting", "indent_spaces")?;

        let procedure_names = ProcedureNames {
            insert: self.required("api_controls", "insert_procname")?,
            select: self.required("api_controls", "select_procname")?,
            update: self.required("api_controls", "update_procname")?,
            delete: self.required("api_controls", "delete_procname")?,
            upsert: self.required("api_controls", "upsert_procname")?,
            merge: self.required("api_controls", "merge_procname")?,
        };

        let files = FileControls {
            staging_dir: self.path("file_controls", "staging_dir")?,
            templates_dir: self.path("file_controls", "templates_dir")?,
            ledger_path: self.path("file_controls", "ledger_path")?,
            spec_dir: self.path("file_controls", "spec_dir")?,
            body_dir: self.path("file_controls", "body_dir")?,
            trigger_dir: self.path("file_controls", "trigger_dir")?,
            view_dir: self.path("file_controls", "view_dir")?,
            spec_suffix: self.text("file_controls", "spec_suffix")?,
            body_suffix: self.text("file_controls", "body_suffix")?,
            trigger_suffix: self.text("file_controls", "trigger_suffix")?,
            view_suffix: self.text("file_controls", "view_suffix")?,
            package_name_suffix: self.text("file_controls", "package_name_suffix")?,
            trigger_name_suffix: self.text("file_controls", "trigger_name_suffix")?,
            view_name_suffix: self.text("file_controls", "view_name_suffix")?,
        };

        let policy = Policy {
            app_name: self.text("project", "default_app_name")?,
            tapi_author: self.text("project", "tapi_author")?,
            copyright_year: self.text("project", "copyright_year")?,
            table_owner,
            package_owner,
            trigger_owner,
            view_owner,
            operations,
            signature_styles,
            include_defaults: self.flag("api_controls", "include_defaults")?,
            return_key_columns: self.flag("api_controls", "return_key_columns")?,
            include_commit: self.flag("api_controls", "include_commit")?,
            include_rowid: self.flag("api_controls", "include_rowid")?,
            noop,
            version_column_name: self
                .optional("api_controls", "row_vers_column_name")
                .map(|name| name.to_lowercase()),
            auto_maintained_columns: self
                .list("api_controls", "auto_maintained_cols")?
                .into_iter()
                .map(|name| name.to_lowercase())
                .collect(),
            auto_maintain_method,
            procedure_names,
            indent_spaces,
            files,
            skip_on_missing_table: self.flag("behaviour", "skip_on_missing_table")?,
            settings_bindings: self.bindings(),
        };

        policy.validate()?;
        Ok(policy)
    }

    /// Flattened key/value view of every layer, for template bindings.
    fn bindings(&self) -> BTreeMap<String, String> {
        let mut bindings: BTreeMap<String, String> = DEFAULTS
            .iter()
            .map(|(_, key, value)| (key.to_string(), value.to_string()))
            .collect();
        bindings.extend(self.settings.flattened());
        for ((_, key), value) in &self.overrides {
            bindings.insert(key.clone(), value.clone());
        }
        bindings
    }

    fn text(&self, section: &str, key: &str) -> Result<String> {
        self.lookup(section, key)
            .map(|(value, _)| value)
            .ok_or_else(|| missing(section, key))
    }

    fn required(&self, section: &str, key: &str) -> Result<String> {
        self.optional(section, key)
            .ok_or_else(|| missing(section, key))
    }

    fn optional(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
            .map(|(value, _)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn path(&self, section: &str, key: &str) -> Result<PathBuf> {
        self.required(section, key).map(PathBuf::from)
    }

    fn list(&self, section: &str, key: &str) -> Result<Vec<String>> {
        let value = self.text(section, key)?;
        Ok(value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn flag(&self, section: &str, key: &str) -> Result<bool> {
        let value = self.text(section, key)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" => Ok(true),
            "false" | "no" | "n" | "0" | "off" => Ok(false),
            _ => Err(invalid(section, key, &value, "expected a boolean")),
        }
    }

    fn parsed<T>(&self, section: &str, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: ToString,
    {
        let value = self.text(section, key)?;
        value
            .trim()
            .parse::<T>()
            .map_err(|err| invalid(section, key, &value, &err.to_string()))
    }

    fn parsed_list<T>(&self, section: &str, key: &str) -> Result<Vec<T>>
    where
        T: FromStr + PartialEq,
        T::Err: ToString,
    {
        let mut items = Vec::new();
        for item in self.list(section, key)? {
            let parsed = item
                .parse::<T>()
                .map_err(|err| invalid(section, key, &item, &err.to_string()))?;
            if !items.contains(&parsed) {
                items.push(parsed);
            }
        }
        Ok(items)
    }
}

/// Merge built-in defaults, settings and overrides into an effective policy.
pub fn resolve_policy(settings: &SettingsSource, overrides: &RunOverrides) -> Result<Policy> {
    PolicyResolver::new(settings, overrides).resolve()
}

fn missing(section: &str, key: &str) -> ConfigError {
    ConfigError::MissingKey {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
