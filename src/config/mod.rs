//! Loading, validation and typed access for certificate documents.

mod assets;
mod builder;
mod env;
mod error;
mod file;
mod model;
mod resolve;
mod source;
mod validate;

pub use builder::{document_dir, load, load_resolved, ConfigLoader};
pub use env::{EnvSource, DEFAULT_ENV_PREFIX, DEFAULT_ENV_SEPARATOR};
pub use error::{ConfigError, ParseFailure};
pub use file::{FileSource, Format};
pub use model::{resolve_paths, Alignment, CertificateConfig, Color, FieldSpec};
pub use source::{ConfigEntry, ConfigSource};
pub use validate::REQUIRED_KEYS;
