use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::{debug, info};

use super::env::{EnvSource, DEFAULT_ENV_PREFIX, DEFAULT_ENV_SEPARATOR};
use super::file::FileSource;
use super::model::CertificateConfig;
use super::resolve::resolve_references;
use super::source::{merge_at_path, ConfigSource};
use super::validate::validate;
use super::ConfigError;

/// Builder for loading a certificate configuration from layered sources.
///
/// Sources are merged in registration order, with later sources overriding
/// earlier ones. Nested tables are merged recursively; other values
/// (including arrays such as `color`) are replaced entirely. The merged
/// document then has its `${vars.*}` references resolved and is validated once,
/// as a whole, before it is turned into a [`CertificateConfig`].
///
/// ## Example
///
/// ```no_run
/// use refuge_certgen::ConfigLoader;
///
/// // shared layout -> per-event overrides -> CERTGEN__* environment overrides
/// let config = ConfigLoader::builder()
///     .with_file("certificate_config.yaml", true)
///     .with_file("certificate_config.local.yaml", false)
///     .with_default_env()
///     .build()?;
///
/// println!("stamping {} fields", config.fields.len());
/// # Ok::<(), refuge_certgen::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ConfigLoader {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigLoader {
    /// Creates a new configuration builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Adds a YAML or TOML document, chosen by extension.
    ///
    /// If `required` is `true`, the build will fail if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Adds overrides from environment variables named
    /// `<prefix><separator><key><separator><key>...`.
    ///
    /// Path segments are lowercased and values are coerced to boolean,
    /// integer, float or string, in that order of preference.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    /// Adds `CERTGEN__*` environment overrides.
    pub fn with_default_env(self) -> Self {
        self.with_env(DEFAULT_ENV_PREFIX, DEFAULT_ENV_SEPARATOR)
    }

    /// Adds any other source of configuration entries.
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Loads, merges, resolves, validates and deserializes the configuration.
    ///
    /// Either a fully valid configuration is returned or an error; partially
    /// valid documents never escape.
    pub fn build(self) -> Result<CertificateConfig, ConfigError> {
        let mut merged = self.merge()?;

        let substitutions = resolve_references(&mut merged)?;
        validate(&merged)?;

        let config: CertificateConfig = Value::Table(merged).try_into()?;
        info!(
            fields = config.fields.len(),
            mapped = config.field_mappings.len(),
            test_mode = config.test_mode,
            substitutions,
            "certificate configuration loaded"
        );
        Ok(config)
    }

    fn merge(&self) -> Result<Table, ConfigError> {
        let mut merged = Table::new();
        for source in &self.sources {
            let entries = source.entries()?;
            debug!(source = %source.describe(), entries = entries.len(), "merging config source");
            for entry in entries {
                merge_at_path(&mut merged, &entry.path, entry.value);
            }
        }
        Ok(merged)
    }
}

/// Loads and validates the document at `path`.
///
/// Paths inside the document are returned exactly as written; see
/// [`load_resolved`] to anchor them to the document's directory.
pub fn load(path: impl AsRef<Path>) -> Result<CertificateConfig, ConfigError> {
    ConfigLoader::builder().with_file(path, true).build()
}

/// Loads the document at `path` and rewrites its relative paths against the
/// directory the document lives in, so the result does not depend on the
/// process's working directory.
pub fn load_resolved(path: impl AsRef<Path>) -> Result<CertificateConfig, ConfigError> {
    let path = path.as_ref();
    let config = load(path)?;
    Ok(config.resolve_paths(document_dir(path)?))
}

/// The canonical directory a document lives in, the base its relative
/// paths are meant against. A bare file name resolves to the working
/// directory.
pub fn document_dir(path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
    let dir = path
        .as_ref()
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    dir.canonicalize().map_err(|source| ConfigError::ReadError {
        path: dir.to_path_buf(),
        source,
    })
}
