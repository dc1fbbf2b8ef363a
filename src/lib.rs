pub mod batch;
pub mod config;
mod error;
pub mod record;

pub use batch::{Batch, CertificateJob, Stamp};
pub use config::{
    load, load_resolved, resolve_paths, Alignment, CertificateConfig, Color, ConfigError,
    ConfigLoader, FieldSpec,
};
pub use error::Error;
pub use record::{Cell, FieldValues, Row};
