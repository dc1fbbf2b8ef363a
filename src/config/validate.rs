//! Semantic checks on the merged document tree.
//!
//! Validation runs on the raw tree rather than on the typed model so every
//! failure can name the exact key path it came from.

use toml::{Table, Value};
use tracing::warn;

use super::model::Alignment;
use super::ConfigError;

pub const REQUIRED_KEYS: [&str; 6] = [
    "excel_path",
    "template_pdf_path",
    "output_folder",
    "field_mappings",
    "name_field",
    "fields",
];

const OPTIONAL_KEYS: [&str; 2] = ["test_mode", "vars"];

const FIELD_KEYS: [&str; 6] = [
    "x_percent",
    "y_percent",
    "font_size",
    "font",
    "color",
    "alignment",
];

/// Checks every invariant of a certificate document, returning the first
/// violation found.
pub fn validate(table: &Table) -> Result<(), ConfigError> {
    for key in REQUIRED_KEYS {
        if !table.contains_key(key) {
            return Err(ConfigError::validation(key, "a value for this required key"));
        }
    }

    for key in ["excel_path", "template_pdf_path", "output_folder"] {
        require_non_empty_str(table, key, key, "a non-empty path")?;
    }

    if let Some(value) = table.get("test_mode") {
        if !value.is_bool() {
            return Err(ConfigError::validation(
                "test_mode",
                format!("a boolean, found {}", value.type_str()),
            ));
        }
    }

    if table.contains_key("vars") {
        require_table(table, "vars", "vars")?;
    }

    let mappings = require_table(table, "field_mappings", "field_mappings")?;
    for (field, column) in mappings {
        if !column.is_str() {
            return Err(ConfigError::validation(
                format!("field_mappings.{field}"),
                format!("a spreadsheet column header string, found {}", column.type_str()),
            ));
        }
    }

    let name_field = require_non_empty_str(table, "name_field", "name_field", "a field name")?;
    if !mappings.contains_key(name_field) {
        let known: Vec<&str> = mappings.keys().map(String::as_str).collect();
        return Err(ConfigError::validation(
            "name_field",
            format!(
                "one of the keys of `field_mappings` [{}], found `{name_field}`",
                known.join(", ")
            ),
        ));
    }

    let fields = require_table(table, "fields", "fields")?;
    for field in mappings.keys() {
        if !fields.contains_key(field) {
            return Err(ConfigError::validation(
                format!("fields.{field}"),
                format!("a placement block for `{field}`, which `field_mappings` references"),
            ));
        }
    }

    for (name, spec) in fields {
        validate_field(name, spec)?;
    }

    for key in table.keys() {
        if !REQUIRED_KEYS.contains(&key.as_str()) && !OPTIONAL_KEYS.contains(&key.as_str()) {
            warn!(key = %key, "ignoring unrecognized configuration key");
        }
    }

    Ok(())
}

fn validate_field(name: &str, spec: &Value) -> Result<(), ConfigError> {
    let key = format!("fields.{name}");
    let Some(spec) = spec.as_table() else {
        return Err(ConfigError::validation(
            key,
            format!("a table of placement parameters, found {}", spec.type_str()),
        ));
    };

    for axis in ["x_percent", "y_percent"] {
        let path = format!("{key}.{axis}");
        let value = require_number(spec, axis, &path)?;
        if !(0.0..=100.0).contains(&value) {
            return Err(ConfigError::validation(
                path,
                format!("a percentage between 0 and 100, found {value}"),
            ));
        }
    }

    let path = format!("{key}.font_size");
    let font_size = require_number(spec, "font_size", &path)?;
    if !(font_size.is_finite() && font_size > 0.0) {
        return Err(ConfigError::validation(
            path,
            format!("a font size greater than 0, found {font_size}"),
        ));
    }

    if spec.contains_key("font") {
        require_non_empty_str(spec, "font", &format!("{key}.font"), "a font file path")?;
    }

    validate_color(spec.get("color"), &format!("{key}.color"))?;

    let path = format!("{key}.alignment");
    let alignment = require_non_empty_str(spec, "alignment", &path, "one of left, center, right")?;
    if Alignment::parse(alignment).is_none() {
        return Err(ConfigError::validation(
            path,
            format!("one of left, center, right, found `{alignment}`"),
        ));
    }

    for extra in spec.keys() {
        if !FIELD_KEYS.contains(&extra.as_str()) {
            warn!(field = %name, key = %extra, "ignoring unrecognized field parameter");
        }
    }

    Ok(())
}

fn validate_color(value: Option<&Value>, path: &str) -> Result<(), ConfigError> {
    const EXPECTED: &str = "an [r, g, b] list of three integers";

    let Some(value) = value else {
        return Err(ConfigError::validation(path, EXPECTED));
    };
    let Some(channels) = value.as_array() else {
        return Err(ConfigError::validation(
            path,
            format!("{EXPECTED}, found {}", value.type_str()),
        ));
    };
    if channels.len() != 3 {
        return Err(ConfigError::validation(
            path,
            format!("{EXPECTED}, found {} elements", channels.len()),
        ));
    }

    for (i, channel) in channels.iter().enumerate() {
        let channel_path = format!("{path}[{i}]");
        let Some(c) = channel.as_integer() else {
            return Err(ConfigError::validation(
                channel_path,
                format!("an integer channel value, found {}", channel.type_str()),
            ));
        };
        if !(0..=255).contains(&c) {
            return Err(ConfigError::validation(
                channel_path,
                format!("a channel value between 0 and 255, found {c}"),
            ));
        }
    }

    Ok(())
}

fn require_table<'a>(table: &'a Table, key: &str, path: &str) -> Result<&'a Table, ConfigError> {
    match table.get(key) {
        Some(Value::Table(t)) => Ok(t),
        Some(other) => Err(ConfigError::validation(
            path,
            format!("a mapping, found {}", other.type_str()),
        )),
        None => Err(ConfigError::validation(path, "a mapping")),
    }
}

fn require_non_empty_str<'a>(
    table: &'a Table,
    key: &str,
    path: &str,
    expected: &str,
) -> Result<&'a str, ConfigError> {
    match table.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) => Err(ConfigError::validation(
            path,
            format!("{expected}, found an empty string"),
        )),
        Some(other) => Err(ConfigError::validation(
            path,
            format!("{expected}, found {}", other.type_str()),
        )),
        None => Err(ConfigError::validation(path, expected)),
    }
}

fn require_number(table: &Table, key: &str, path: &str) -> Result<f64, ConfigError> {
    match table.get(key) {
        Some(Value::Float(f)) if f.is_nan() => {
            Err(ConfigError::validation(path, "a number, found NaN"))
        }
        Some(Value::Float(f)) => Ok(*f),
        Some(Value::Integer(i)) => Ok(*i as f64),
        Some(other) => Err(ConfigError::validation(
            path,
            format!("a number, found {}", other.type_str()),
        )),
        None => Err(ConfigError::validation(path, "a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
        excel_path = "names.xlsx"
        template_pdf_path = "template.pdf"
        output_folder = "out"

        [field_mappings]
        full_name = "full name"
        date = "date"

        [fields.full_name]
        x_percent = 50
        y_percent = 38.5
        font_size = 28
        color = [0, 0, 0]
        alignment = "center"

        [fields.date]
        x_percent = 65.4
        y_percent = 82.0
        font_size = 14.0
        color = [60, 60, 60]
        alignment = "left"
    "#;

    fn valid() -> Table {
        let mut table: Table = toml::from_str(VALID).unwrap();
        table.insert("name_field".into(), Value::String("full_name".into()));
        table
    }

    fn field_mut<'a>(table: &'a mut Table, name: &str) -> &'a mut Table {
        table
            .get_mut("fields")
            .and_then(Value::as_table_mut)
            .and_then(|f| f.get_mut(name))
            .and_then(Value::as_table_mut)
            .unwrap()
    }

    fn failing_key(table: &Table) -> String {
        match validate(table) {
            Err(ConfigError::Validation { key, .. }) => key,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_document_passes() {
        validate(&valid()).unwrap();
    }

    #[test]
    fn test_each_required_key_is_reported() {
        for key in REQUIRED_KEYS {
            let mut table = valid();
            table.remove(key);
            assert_eq!(failing_key(&table), key);
        }
    }

    #[test]
    fn test_name_field_must_be_mapped() {
        let mut table = valid();
        table.insert("name_field".into(), Value::String("nickname".into()));

        let err = validate(&table).unwrap_err();
        assert_eq!(err.key(), Some("name_field"));
        assert!(err.to_string().contains("nickname"));
    }

    #[test]
    fn test_mapped_field_needs_placement_block() {
        let mut table = valid();
        table
            .get_mut("fields")
            .and_then(Value::as_table_mut)
            .unwrap()
            .remove("date");

        assert_eq!(failing_key(&table), "fields.date");
    }

    #[test]
    fn test_unknown_alignment_is_rejected() {
        let mut table = valid();
        field_mut(&mut table, "date").insert("alignment".into(), Value::String("justify".into()));

        assert_eq!(failing_key(&table), "fields.date.alignment");
    }

    #[test]
    fn test_color_shape_and_range() {
        let cases = [
            (Value::Array(vec![Value::Integer(0), Value::Integer(0)]), "fields.date.color"),
            (Value::String("black".into()), "fields.date.color"),
            (
                Value::Array(vec![Value::Integer(0), Value::Integer(256), Value::Integer(0)]),
                "fields.date.color[1]",
            ),
            (
                Value::Array(vec![Value::Float(0.5), Value::Integer(0), Value::Integer(0)]),
                "fields.date.color[0]",
            ),
            (
                Value::Array(vec![Value::Integer(0), Value::Integer(0), Value::Integer(-1)]),
                "fields.date.color[2]",
            ),
        ];

        for (color, expected_key) in cases {
            let mut table = valid();
            field_mut(&mut table, "date").insert("color".into(), color);
            assert_eq!(failing_key(&table), expected_key);
        }
    }

    #[test]
    fn test_percent_bounds() {
        let mut table = valid();
        field_mut(&mut table, "full_name").insert("y_percent".into(), Value::Float(100.5));
        assert_eq!(failing_key(&table), "fields.full_name.y_percent");

        let mut table = valid();
        field_mut(&mut table, "full_name").insert("x_percent".into(), Value::Integer(-1));
        assert_eq!(failing_key(&table), "fields.full_name.x_percent");

        let mut table = valid();
        field_mut(&mut table, "full_name").insert("x_percent".into(), Value::Integer(100));
        validate(&table).unwrap();
    }

    #[test]
    fn test_font_size_must_be_positive() {
        for size in [Value::Integer(0), Value::Float(-2.0), Value::String("big".into())] {
            let mut table = valid();
            field_mut(&mut table, "date").insert("font_size".into(), size);
            assert_eq!(failing_key(&table), "fields.date.font_size");
        }
    }

    #[test]
    fn test_type_mismatches_name_their_key() {
        let mut table = valid();
        table.insert("test_mode".into(), Value::String("yes".into()));
        assert_eq!(failing_key(&table), "test_mode");

        let mut table = valid();
        table.insert("excel_path".into(), Value::Integer(3));
        assert_eq!(failing_key(&table), "excel_path");

        let mut table = valid();
        table
            .get_mut("field_mappings")
            .and_then(Value::as_table_mut)
            .unwrap()
            .insert("date".into(), Value::Boolean(true));
        assert_eq!(failing_key(&table), "field_mappings.date");

        let mut table = valid();
        field_mut(&mut table, "date").insert("font".into(), Value::String(" ".into()));
        assert_eq!(failing_key(&table), "fields.date.font");
    }

    #[test]
    fn test_vars_must_be_a_mapping() {
        let mut table = valid();
        table.insert("vars".into(), Value::String("assets".into()));
        assert_eq!(failing_key(&table), "vars");

        let mut table = valid();
        table.insert("vars".into(), Value::Table(Table::new()));
        validate(&table).unwrap();
    }

    #[test]
    fn test_unmapped_fields_are_still_validated() {
        let mut table = valid();
        let fields = table.get_mut("fields").and_then(Value::as_table_mut).unwrap();
        fields.insert("seal".into(), Value::String("not a table".into()));

        assert_eq!(failing_key(&table), "fields.seal");
    }
}
