use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

use tapigen_config::{NoopSetting, Policy};

/// Length of generated sentinel literals.
pub const AUTO_SENTINEL_LEN: usize = 42;

/// The "leave unchanged" marker used as a parameter default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum SentinelSpec {
    /// Literal text from configuration.
    Static(String),
    /// Literal generated once for the run.
    Auto(String),
    /// Source expression emitted verbatim.
    Dynamic(String),
}

impl SentinelSpec {
    /// Resolve the configured setting. `Auto` draws a fresh literal.
    pub fn from_policy(policy: &Policy) -> Self {
        match &policy.noop {
            NoopSetting::Auto => SentinelSpec::Auto(random_literal()),
            NoopSetting::Static(text) => SentinelSpec::Static(text.clone()),
            NoopSetting::Dynamic(expression) => SentinelSpec::Dynamic(expression.clone()),
        }
    }

    /// Source text used as the parameter default and in comparisons.
    pub fn default_expression(&self) -> String {
        match self {
            SentinelSpec::Static(text) | SentinelSpec::Auto(text) => quote_literal(text),
            SentinelSpec::Dynamic(expression) => expression.clone(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            SentinelSpec::Static(_) => "static",
            SentinelSpec::Auto(_) => "auto",
            SentinelSpec::Dynamic(_) => "dynamic",
        }
    }
}

/// Random alphanumeric literal drawn from the thread-local CSPRNG.
pub fn random_literal() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_SENTINEL_LEN)
        .map(char::from)
        .collect()
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_literal_is_alphanumeric() {
        let literal = random_literal();
        assert_eq!(literal.len(), AUTO_SENTINEL_LEN);
        assert!(literal.chars().all(|ch| ch.is_ascii_alphanumeric()));
    }

    #[test]
    fn static_literal_is_quoted() {
        let sentinel = SentinelSpec::Static("it's".to_string());
        assert_eq!(sentinel.default_expression(), "'it''s'");

        let sentinel = SentinelSpec::Dynamic("sys_guid()".to_string());
        assert_eq!(sentinel.default_expression(), "sys_guid()");
    }
}
