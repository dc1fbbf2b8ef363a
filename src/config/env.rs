use toml::Value;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Prefix used by [`ConfigLoader::with_default_env`](super::ConfigLoader::with_default_env).
pub const DEFAULT_ENV_PREFIX: &str = "CERTGEN";

/// Separator between key path segments in override variable names.
pub const DEFAULT_ENV_SEPARATOR: &str = "__";

/// Overrides individual document keys from environment variables.
///
/// `CERTGEN__FIELDS__DATE__X_PERCENT=70` sets `fields.date.x_percent` to `70`.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            prefix: prefix.into(),
            separator,
        }
    }

    fn entries_from<I>(&self, vars: I) -> Vec<ConfigEntry>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut entries = Vec::new();

        for (key, value) in vars {
            let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
                continue;
            };
            if path_str.is_empty() {
                continue;
            }

            let path: Vec<String> = path_str
                .split(&self.separator)
                .map(|s| s.to_lowercase())
                .collect();
            if path.iter().any(String::is_empty) {
                continue;
            }

            let value = coerce_for(&path, &value);
            entries.push(ConfigEntry::at_path(path, value));
        }

        // Deterministic application order regardless of the environment's.
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

impl ConfigSource for EnvSource {
    fn describe(&self) -> String {
        format!("environment {}{}*", self.prefix, self.separator)
    }

    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        Ok(self.entries_from(std::env::vars()))
    }
}

/// Types an override by where it lands in the document.
///
/// Only keys the document declares as flags or numbers are parsed. Paths,
/// column headers and font names stay strings even when they look numeric,
/// so `CERTGEN__FIELD_MAPPINGS__DATE=2024` maps the column named `2024`.
fn coerce_for(path: &[String], raw: &str) -> Value {
    let keys: Vec<&str> = path.iter().map(String::as_str).collect();
    let typed = match keys.as_slice() {
        ["test_mode"] => parse_flag(raw),
        ["fields", _, "x_percent" | "y_percent" | "font_size"] => parse_number(raw),
        ["fields", _, "color"] => parse_color(raw),
        _ => None,
    };
    // Anything that doesn't parse goes through as text so validation can name the key.
    typed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn parse_flag(raw: &str) -> Option<Value> {
    match raw.trim() {
        s if s.eq_ignore_ascii_case("true") => Some(Value::Boolean(true)),
        s if s.eq_ignore_ascii_case("false") => Some(Value::Boolean(false)),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .map(Value::Integer)
        .or_else(|_| raw.parse::<f64>().map(Value::Float))
        .ok()
}

/// `"60,60,60"` or `"[60, 60, 60]"`.
fn parse_color(raw: &str) -> Option<Value> {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    inner
        .split(',')
        .map(|channel| channel.trim().parse::<i64>().map(Value::Integer).ok())
        .collect::<Option<Vec<_>>>()
        .map(Value::Array)
}
