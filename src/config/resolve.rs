//! `${vars.name}` interpolation inside string values.
//!
//! Interpolation only happens when the document declares a top-level `vars`
//! table, and only references into that table are expanded:
//!
//! ```yaml
//! vars:
//!   assets: /srv/certificates
//! template_pdf_path: ${vars.assets}/template.pdf
//! ```
//!
//! Everything else is literal text: `${HOME}`, a lone `$$`, and every
//! `field_mappings` value (column headers are matched verbatim against the
//! spreadsheet). `$${vars.name}` produces a literal `${vars.name}`.

use toml::{Table, Value};

use super::ConfigError;

const VARS_KEY: &str = "vars";
const REFERENCE_OPEN: &str = "${vars.";
const ESCAPED_OPEN: &str = "$${vars.";
const LITERAL_KEYS: [&str; 1] = ["field_mappings"];

const MAX_PASSES: usize = 64;

/// Expands every `${vars.*}` reference in `table`, repeating until nothing
/// changes so that chained references settle. Returns the number of
/// substitutions made; documents without a `vars` table are left untouched.
pub fn resolve_references(table: &mut Table) -> Result<usize, ConfigError> {
    if !matches!(table.get(VARS_KEY), Some(Value::Table(_))) {
        return Ok(0);
    }

    let mut total = 0;
    for _ in 0..MAX_PASSES {
        let snapshot = table.clone();
        let mut substitutions = 0;
        for (key, value) in table.iter_mut() {
            if !LITERAL_KEYS.contains(&key.as_str()) {
                substitutions += resolve_value(value, &snapshot)?;
            }
        }
        if substitutions == 0 {
            for (key, value) in table.iter_mut() {
                if !LITERAL_KEYS.contains(&key.as_str()) {
                    unescape_value(value);
                }
            }
            return Ok(total);
        }
        total += substitutions;
    }

    Err(ConfigError::CircularReference)
}

fn resolve_value(value: &mut Value, root: &Table) -> Result<usize, ConfigError> {
    match value {
        Value::String(s) => resolve_string(s, root),
        Value::Table(t) => {
            let mut count = 0;
            for (_, item) in t.iter_mut() {
                count += resolve_value(item, root)?;
            }
            Ok(count)
        }
        Value::Array(items) => {
            let mut count = 0;
            for item in items.iter_mut() {
                count += resolve_value(item, root)?;
            }
            Ok(count)
        }
        _ => Ok(0),
    }
}

/// Substitutes one level of references in `s`. Escaped references are
/// copied through unchanged until every reference has settled.
fn resolve_string(s: &mut String, root: &Table) -> Result<usize, ConfigError> {
    if !s.contains(REFERENCE_OPEN) {
        return Ok(0);
    }

    let mut out = String::with_capacity(s.len());
    let mut substitutions = 0;
    let mut rest = s.as_str();

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with(ESCAPED_OPEN) {
            out.push_str(ESCAPED_OPEN);
            rest = &tail[ESCAPED_OPEN.len()..];
        } else if tail.starts_with(REFERENCE_OPEN) {
            let close = tail.find('}').ok_or(ConfigError::UnclosedReference)?;
            out.push_str(&lookup(root, &tail[2..close])?);
            substitutions += 1;
            rest = &tail[close + 1..];
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);

    *s = out;
    Ok(substitutions)
}

fn unescape_value(value: &mut Value) {
    match value {
        Value::String(s) if s.contains(ESCAPED_OPEN) => {
            *s = s.replace(ESCAPED_OPEN, REFERENCE_OPEN);
        }
        Value::Table(t) => t.iter_mut().for_each(|(_, item)| unescape_value(item)),
        Value::Array(items) => items.iter_mut().for_each(unescape_value),
        _ => {}
    }
}

fn lookup(root: &Table, path: &str) -> Result<String, ConfigError> {
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::InvalidReferencePath(path.to_string()));
    }

    let not_found = || ConfigError::ReferenceNotFound(path.to_string());
    let mut current = root.get(segments[0]).ok_or_else(not_found)?;
    for segment in &segments[1..] {
        current = current
            .as_table()
            .and_then(|t| t.get(*segment))
            .ok_or_else(not_found)?;
    }

    match current {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(dt) => Ok(dt.to_string()),
        Value::Array(_) | Value::Table(_) => {
            Err(ConfigError::NonScalarReference(path.to_string()))
        }
    }
}
