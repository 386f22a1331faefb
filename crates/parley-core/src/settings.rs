//! Read-only settings for the `settings` scope.
//!
//! Settings come from prefixed environment variables. The variable suffix
//! is converted to a camelCase key, so `PARLEY_SETTING_COMPANY_NAME=Acme`
//! becomes `settings.companyName`.

use serde_json::{Map, Value};

/// Prefix that marks an environment variable as a setting.
pub const SETTINGS_PREFIX: &str = "PARLEY_SETTING_";

/// Loads settings from the process environment.
#[must_use]
pub fn settings_from_env() -> Map<String, Value> {
    settings_from_vars(std::env::vars())
}

/// Builds a settings map from `(name, value)` pairs, keeping only names
/// that carry `SETTINGS_PREFIX`.
///
/// Values that parse as JSON booleans or numbers keep that type; everything
/// else is stored as a string.
pub fn settings_from_vars<I, K, V>(vars: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut settings = Map::new();
    for (name, raw) in vars {
        let Some(suffix) = name.as_ref().strip_prefix(SETTINGS_PREFIX) else {
            continue;
        };
        if suffix.is_empty() {
            continue;
        }
        settings.insert(camel_case(suffix), parse_value(raw.into()));
    }
    settings
}

fn camel_case(suffix: &str) -> String {
    let mut key = String::with_capacity(suffix.len());
    for (i, word) in suffix.split('_').filter(|w| !w.is_empty()).enumerate() {
        let lower = word.to_ascii_lowercase();
        if i == 0 {
            key.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                key.push(first.to_ascii_uppercase());
                key.push_str(chars.as_str());
            }
        }
    }
    key
}

fn parse_value(raw: String) -> Value {
    match serde_json::from_str::<Value>(&raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => value,
        _ => Value::String(raw),
    }
}
