use std::path::PathBuf;

use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for the refuge-certgen library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("certificate batch requires a configuration")]
    MissingConfig,

    #[error("failed to create output folder '{path}': {source}")]
    OutputFolder {
        path: PathBuf,
        source: std::io::Error,
    },
}
