//! Planning a certificate run over a loaded configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::{self, CertificateConfig, FieldSpec};
use crate::record::{self, FieldValues, Row, TEST_FILE_NAME};
use crate::Error;

/// A read-only handle on one run's configuration.
///
/// The configuration is held behind an [`Arc`], so rendering workers can
/// each take a [`shared_config`](Self::shared_config) and read it
/// concurrently without locking.
///
/// ## Example
///
/// ```no_run
/// use refuge_certgen::{Batch, Row};
///
/// let batch = Batch::from_file("certificate_config.yaml")?;
/// batch.prepare_output_folder()?;
///
/// let rows: Vec<Row> = Vec::new(); // from the spreadsheet reader
/// for job in batch.jobs(rows) {
///     for stamp in job.stamps(batch.config()) {
///         println!("{} -> {:?}: {}", stamp.field, job.output_path, stamp.text);
///     }
/// }
/// # Ok::<(), refuge_certgen::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Batch {
    config: Arc<CertificateConfig>,
    today: NaiveDate,
}

impl Batch {
    /// Creates a new builder for constructing a `Batch`.
    pub fn builder() -> BatchBuilder {
        BatchBuilder::default()
    }

    /// Loads the document at `path` with its paths anchored to the
    /// document's directory, and plans against today's date.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let config = config::load_resolved(path)?;
        Self::builder().with_config(config).build()
    }

    pub fn config(&self) -> &CertificateConfig {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<CertificateConfig> {
        Arc::clone(&self.config)
    }

    /// The date the `date` field falls back to.
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Creates the output folder, and any missing parents.
    pub fn prepare_output_folder(&self) -> Result<&Path, Error> {
        let folder = self.config.output_folder.as_path();
        std::fs::create_dir_all(folder).map_err(|source| Error::OutputFolder {
            path: folder.to_path_buf(),
            source,
        })?;
        debug!(folder = %folder.display(), "output folder ready");
        Ok(folder)
    }

    /// The jobs for this run: the single placeholder job in test mode, one
    /// job per row otherwise. Rows are ignored in test mode.
    pub fn jobs<I>(&self, rows: I) -> Vec<CertificateJob>
    where
        I: IntoIterator<Item = Row>,
    {
        if self.config.test_mode {
            info!("test mode: planning a single placeholder certificate");
            vec![self.test_job()]
        } else {
            self.plan(rows)
        }
    }

    /// One job per row, in row order.
    ///
    /// File names that repeat within the batch get `_2`, `_3`, ... appended
    /// so that no certificate overwrites another.
    pub fn plan<I>(&self, rows: I) -> Vec<CertificateJob>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut taken = HashSet::new();
        let jobs: Vec<CertificateJob> = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let values = record::resolve_row(&self.config, &row, self.today);
                let file_name = record::output_file_name(&values, &self.config.name_field, index);
                let file_name = claim_file_name(&mut taken, file_name);
                CertificateJob {
                    index: Some(index),
                    output_path: self.config.output_folder.join(file_name),
                    values,
                }
            })
            .collect();

        info!(certificates = jobs.len(), "planned certificate batch");
        jobs
    }

    /// The placeholder job used to check field placement.
    pub fn test_job(&self) -> CertificateJob {
        CertificateJob {
            index: None,
            values: record::sample_values(&self.config, self.today),
            output_path: self.config.output_folder.join(TEST_FILE_NAME),
        }
    }
}

fn claim_file_name(taken: &mut HashSet<String>, file_name: String) -> String {
    if taken.insert(file_name.clone()) {
        return file_name;
    }

    let stem = file_name.strip_suffix(".pdf").unwrap_or(&file_name).to_string();
    let mut n = 2;
    loop {
        let candidate = format!("{stem}_{n}.pdf");
        if taken.insert(candidate.clone()) {
            debug!(
                original = %file_name,
                renamed = %candidate,
                "disambiguated duplicate file name"
            );
            return candidate;
        }
        n += 1;
    }
}

/// Builder for constructing a [`Batch`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct BatchBuilder {
    config: Option<Arc<CertificateConfig>>,
    today: Option<NaiveDate>,
}

impl BatchBuilder {
    /// Attaches the configuration, owned or already shared.
    pub fn with_config(mut self, config: impl Into<Arc<CertificateConfig>>) -> Self {
        self.config = Some(config.into());
        self
    }

    /// Pins the fallback date instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Builds the `Batch`.
    ///
    /// Returns an error if no configuration was provided.
    pub fn build(self) -> Result<Batch, Error> {
        Ok(Batch {
            config: self.config.ok_or(Error::MissingConfig)?,
            today: self
                .today
                .unwrap_or_else(|| chrono::Local::now().date_naive()),
        })
    }
}

/// One certificate to render.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateJob {
    /// Zero-based spreadsheet row, `None` for the test-mode job.
    pub index: Option<usize>,
    pub values: FieldValues,
    pub output_path: PathBuf,
}

/// A piece of text to place on the page, with its placement parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamp<'a> {
    pub field: &'a str,
    pub spec: &'a FieldSpec,
    pub text: &'a str,
}

impl CertificateJob {
    pub fn is_test(&self) -> bool {
        self.index.is_none()
    }

    /// Every configured field that has text for this certificate.
    ///
    /// Fields with no resolved value are logged and skipped; fields whose
    /// value is empty are skipped silently.
    pub fn stamps<'a>(
        &'a self,
        config: &'a CertificateConfig,
    ) -> impl Iterator<Item = Stamp<'a>> + 'a {
        config.fields.iter().filter_map(move |(field, spec)| {
            let Some(text) = self.values.get(field) else {
                warn!(
                    field = %field,
                    output = %self.output_path.display(),
                    "no value for field, skipping"
                );
                return None;
            };
            if text.is_empty() {
                return None;
            }
            Some(Stamp {
                field,
                spec,
                text,
            })
        })
    }
}
