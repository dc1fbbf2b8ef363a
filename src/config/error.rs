use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: ParseFailure,
    },

    #[error("invalid configuration at `{key}`: expected {expected}")]
    Validation { key: String, expected: String },

    #[error("asset referenced by `{key}` does not exist: {path}")]
    MissingAsset { key: String, path: PathBuf },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),

    #[error("circular reference detected in configuration")]
    CircularReference,

    #[error("referenced path not found: {0}")]
    ReferenceNotFound(String),

    #[error("invalid reference path: {0}")]
    InvalidReferencePath(String),

    #[error("cannot reference non-scalar value: {0}")]
    NonScalarReference(String),

    #[error("unclosed reference (missing '}}')")]
    UnclosedReference,
}

impl ConfigError {
    pub(crate) fn validation(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            expected: expected.into(),
        }
    }

    /// The dotted key path a validation or asset error points at.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Validation { key, .. } | Self::MissingAsset { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Why a document could not be turned into a configuration tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseFailure {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("document root must be a mapping of keys to values")]
    RootNotMapping,

    #[error("unsupported value at `{key}`: {detail}")]
    UnsupportedValue { key: String, detail: String },
}
