//! File-based configuration source.

use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::debug;

use super::error::ParseFailure;
use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Syntax of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
}

impl Format {
    /// Picks the format from the file extension. YAML is the native format of
    /// certificate documents, so anything that is not `.toml` is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Yaml,
        }
    }

    /// Parses `contents` into a configuration tree.
    pub fn parse(self, contents: &str) -> Result<Table, ParseFailure> {
        match self {
            Format::Toml => Ok(toml::from_str(contents)?),
            Format::Yaml => {
                let document: serde_yaml::Value = serde_yaml::from_str(contents)?;
                yaml_document_to_table(document)
            }
        }
    }
}

/// A configuration source that loads one document from disk.
///
/// Files can be marked as required or optional. Required files that don't exist
/// cause an error; optional files that don't exist are silently skipped.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
    format: Format,
}

impl FileSource {
    /// Creates a new file source, inferring the format from the extension.
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = Format::from_path(&path);
        Self {
            path,
            required,
            format,
        }
    }

    /// Overrides the inferred document format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        match load_config_file(&self.path, self.required, self.format)? {
            Some(table) => Ok(vec![ConfigEntry::root(table)]),
            None => Ok(vec![]),
        }
    }
}

/// Loads and parses a config file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn load_config_file(
    path: &Path,
    required: bool,
    format: Format,
) -> Result<Option<Table>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = format
                .parse(&contents)
                .map_err(|source| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    source,
                })?;
            debug!(path = %path.display(), ?format, keys = table.len(), "parsed config file");
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            } else {
                debug!(path = %path.display(), "optional config file missing, skipping");
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn yaml_document_to_table(document: serde_yaml::Value) -> Result<Table, ParseFailure> {
    match document {
        // An empty document has no keys; validation reports what is missing.
        serde_yaml::Value::Null => Ok(Table::new()),
        serde_yaml::Value::Mapping(mapping) => yaml_mapping_to_table(mapping, ""),
        serde_yaml::Value::Tagged(tagged) => yaml_document_to_table(tagged.value),
        _ => Err(ParseFailure::RootNotMapping),
    }
}

fn yaml_mapping_to_table(
    mapping: serde_yaml::Mapping,
    prefix: &str,
) -> Result<Table, ParseFailure> {
    let mut table = Table::new();
    for (key, value) in mapping {
        let key = yaml_key(key, prefix)?;
        let path = join_key(prefix, &key);
        // `key: ~` means the same as leaving the key out.
        if let Some(value) = yaml_to_toml(value, &path)? {
            table.insert(key, value);
        }
    }
    Ok(table)
}

fn yaml_key(key: serde_yaml::Value, prefix: &str) -> Result<String, ParseFailure> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(ParseFailure::UnsupportedValue {
            key: if prefix.is_empty() { "<root>".to_string() } else { prefix.to_string() },
            detail: format!("mapping keys must be scalars, found {other:?}"),
        }),
    }
}

fn yaml_to_toml(value: serde_yaml::Value, path: &str) -> Result<Option<Value>, ParseFailure> {
    let converted = match value {
        serde_yaml::Value::Null => return Ok(None),
        serde_yaml::Value::Bool(b) => Value::Boolean(b),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            let mut array = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                match yaml_to_toml(item, &item_path)? {
                    Some(v) => array.push(v),
                    None => {
                        return Err(ParseFailure::UnsupportedValue {
                            key: item_path,
                            detail: "null is not allowed inside a list".to_string(),
                        })
                    }
                }
            }
            Value::Array(array)
        }
        serde_yaml::Value::Mapping(mapping) => Value::Table(yaml_mapping_to_table(mapping, path)?),
        serde_yaml::Value::Tagged(tagged) => return yaml_to_toml(tagged.value, path),
    };
    Ok(Some(converted))
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn test_file_source_loads_yaml_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "name_field: full_name\nfont: ~\ncolor: [1, 2, 3]").unwrap();

        let source = FileSource::new(file.path(), true);
        let entries = source.entries().unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.is_empty());
        let table = entries[0].value.as_table().unwrap();
        assert_eq!(table.get("name_field"), Some(&Value::String("full_name".into())));
        assert!(!table.contains_key("font"));
        assert_eq!(table["color"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_file_source_loads_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "test_mode = true").unwrap();

        let source = FileSource::new(file.path(), true);
        let entries = source.entries().unwrap();

        let table = entries[0].value.as_table().unwrap();
        assert_eq!(table.get("test_mode"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_yaml_numbers_keep_integer_and_float_kinds() {
        let table = Format::Yaml.parse("x_percent: 65.4\nfont_size: 14").unwrap();

        assert_eq!(table["x_percent"].as_float(), Some(65.4));
        assert_eq!(table["font_size"].as_integer(), Some(14));
    }

    #[test]
    fn test_empty_yaml_document_is_empty_table() {
        assert!(Format::Yaml.parse("").unwrap().is_empty());
    }

    #[test]
    fn test_scalar_yaml_root_is_rejected() {
        let result = Format::Yaml.parse("just a string");
        assert!(matches!(result, Err(ParseFailure::RootNotMapping)));
    }

    #[test]
    fn test_null_inside_list_is_rejected() {
        let result = Format::Yaml.parse("fields:\n  date:\n    color: [0, ~, 0]");
        match result {
            Err(ParseFailure::UnsupportedValue { key, .. }) => {
                assert_eq!(key, "fields.date.color[1]")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_yaml_reports_parse_error() {
        let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "fields: [unclosed").unwrap();

        let result = FileSource::new(file.path(), true).entries();

        assert!(matches!(
            result,
            Err(ConfigError::ParseError {
                source: ParseFailure::Yaml(_),
                ..
            })
        ));
    }

    #[test]
    fn test_explicit_format_overrides_extension() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "test_mode = false").unwrap();

        let entries = FileSource::new(file.path(), true)
            .with_format(Format::Toml)
            .entries()
            .unwrap();

        let table = entries[0].value.as_table().unwrap();
        assert_eq!(table.get("test_mode"), Some(&Value::Boolean(false)));
    }

    #[test]
    fn test_file_source_required_missing() {
        let source = FileSource::new("/nonexistent/path/config.yaml", true);
        let result = source.entries();

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_file_source_optional_missing() {
        let source = FileSource::new("/nonexistent/path/config.yaml", false);
        let entries = source.entries().unwrap();

        assert!(entries.is_empty());
    }
}
