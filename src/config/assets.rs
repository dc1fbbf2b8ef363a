//! On-demand existence checks for the files a document points at.
//!
//! Loading never touches the template, the spreadsheet or any font: they are
//! only needed at render time, so callers run these checks right before a
//! batch starts, or at first use of a single asset.

use std::path::Path;

use tracing::debug;

use super::model::CertificateConfig;
use super::ConfigError;

impl CertificateConfig {
    /// Verifies every asset this configuration needs for a run.
    ///
    /// The spreadsheet is skipped in test mode, where rows are synthetic.
    pub fn check_assets(&self) -> Result<(), ConfigError> {
        require_file("template_pdf_path", &self.template_pdf_path)?;
        if !self.test_mode {
            require_file("excel_path", &self.excel_path)?;
        }
        for name in self.fields.keys() {
            self.check_font(name)?;
        }
        debug!(fields = self.fields.len(), "all configured assets present");
        Ok(())
    }

    /// Verifies the font of one field, if it configures one.
    pub fn check_font(&self, field: &str) -> Result<(), ConfigError> {
        match self.fields.get(field).and_then(|spec| spec.font.as_deref()) {
            Some(font) => require_file(&format!("fields.{field}.font"), font),
            None => Ok(()),
        }
    }
}

fn require_file(key: &str, path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::MissingAsset {
            key: key.to_string(),
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::config::model::{Alignment, Color, FieldSpec};

    fn config(dir: &Path, test_mode: bool, font: Option<PathBuf>) -> CertificateConfig {
        CertificateConfig {
            excel_path: dir.join("names.xlsx"),
            template_pdf_path: dir.join("template.pdf"),
            output_folder: dir.join("out"),
            test_mode,
            field_mappings: BTreeMap::from([("full_name".to_string(), "name".to_string())]),
            name_field: "full_name".to_string(),
            fields: BTreeMap::from([(
                "full_name".to_string(),
                FieldSpec {
                    x_percent: 50.0,
                    y_percent: 50.0,
                    font_size: 12.0,
                    font,
                    color: Color::BLACK,
                    alignment: Alignment::Left,
                },
            )]),
        }
    }

    #[test]
    fn test_missing_template_is_reported_first() {
        let dir = tempfile::tempdir().unwrap();
        let err = config(dir.path(), false, None).check_assets().unwrap_err();

        assert_eq!(err.key(), Some("template_pdf_path"));
        assert!(matches!(err, ConfigError::MissingAsset { .. }));
    }

    #[test]
    fn test_spreadsheet_only_required_outside_test_mode() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("template.pdf"), b"%PDF-1.4").unwrap();

        config(dir.path(), true, None).check_assets().unwrap();
        let err = config(dir.path(), false, None).check_assets().unwrap_err();
        assert_eq!(err.key(), Some("excel_path"));
    }

    #[test]
    fn test_missing_font_names_its_field() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("template.pdf"), b"%PDF-1.4").unwrap();
        let font = dir.path().join("fonts/Jomolhari.ttf");

        let cfg = config(dir.path(), true, Some(font.clone()));
        let err = cfg.check_assets().unwrap_err();
        assert_eq!(err.key(), Some("fields.full_name.font"));

        fs::create_dir_all(font.parent().unwrap()).unwrap();
        fs::write(&font, b"ttf").unwrap();
        cfg.check_font("full_name").unwrap();
        cfg.check_assets().unwrap();
    }

    #[test]
    fn test_unknown_field_has_no_font_to_check() {
        let dir = tempfile::tempdir().unwrap();
        config(dir.path(), true, None).check_font("nope").unwrap();
    }
}
