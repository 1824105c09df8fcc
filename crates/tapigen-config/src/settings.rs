use std::collections::BTreeMap;
use std::path::Path;

use toml::Value;

use crate::errors::Result;

/// Key/value settings grouped into named sections.
///
/// Values are normalized to text: booleans and numbers use their TOML
/// rendering and arrays are joined with commas, so `auto_maintained_cols =
/// ["created_by", "updated_by"]` and `auto_maintained_cols = "created_by,
/// updated_by"` are equivalent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsSource {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl SettingsSource {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let document: toml::Table = toml::from_str(contents)?;
        let mut sections = BTreeMap::new();

        for (section, value) in document {
            // Top-level scalars carry no section and are ignored.
            let Value::Table(table) = value else {
                continue;
            };
            let mut entries = BTreeMap::new();
            for (key, value) in table {
                if let Some(text) = value_text(&value) {
                    entries.insert(key.to_lowercase(), text);
                }
            }
            sections.insert(section.to_lowercase(), entries);
        }

        Ok(Self { sections })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Insert or replace a single setting.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_lowercase())
            .or_default()
            .insert(key.to_lowercase(), value.into());
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section.to_lowercase())
            .and_then(|entries| entries.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    /// All keys flattened across sections; later sections (by name) win on clashes.
    pub fn flattened(&self) -> BTreeMap<String, String> {
        let mut flat = BTreeMap::new();
        for entries in self.sections.values() {
            for (key, value) in entries {
                flat.insert(key.clone(), value.clone());
            }
        }
        flat
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Integer(number) => Some(number.to_string()),
        Value::Float(number) => Some(number.to_string()),
        Value::Boolean(flag) => Some(flag.to_string()),
        Value::Datetime(datetime) => Some(datetime.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            Some(parts.join(","))
        }
        Value::Table(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_values_to_text() {
        let source = SettingsSource::from_toml_str(
            r#"
            version = "ignored"

            [API_Controls]
            include_defaults = true
            auto_maintained_cols = ["created_by", "updated_by"]

            [formatting]
            indent_spaces = 4
            "#,
        )
        .expect("parse settings");

        assert_eq!(source.get("api_controls", "include_defaults"), Some("true"));
        assert_eq!(
            source.get("api_controls", "auto_maintained_cols"),
            Some("created_by,updated_by")
        );
        assert_eq!(source.get("formatting", "indent_spaces"), Some("4"));
        assert_eq!(source.get("project", "version"), None);
    }
}
