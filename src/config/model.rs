//! Typed view of a validated certificate document.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Everything a batch run needs to stamp certificates.
///
/// Values of this type only come out of the loader after validation, so the
/// cross-key invariants hold: `name_field` is a key of `field_mappings`, and
/// every mapped field has an entry in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateConfig {
    pub excel_path: PathBuf,
    pub template_pdf_path: PathBuf,
    pub output_folder: PathBuf,
    #[serde(default)]
    pub test_mode: bool,
    /// Logical field name to spreadsheet column header.
    pub field_mappings: BTreeMap<String, String>,
    pub name_field: String,
    pub fields: BTreeMap<String, FieldSpec>,
}

impl CertificateConfig {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// The spreadsheet column header a field is read from.
    pub fn column_for(&self, field: &str) -> Option<&str> {
        self.field_mappings.get(field).map(String::as_str)
    }

    /// Rewrites every relative path against `base_dir`.
    ///
    /// Absolute paths are left as they are.
    pub fn resolve_paths(mut self, base_dir: impl AsRef<Path>) -> Self {
        let base_dir = base_dir.as_ref();
        rebase(&mut self.excel_path, base_dir);
        rebase(&mut self.template_pdf_path, base_dir);
        rebase(&mut self.output_folder, base_dir);
        for spec in self.fields.values_mut() {
            if let Some(font) = spec.font.as_mut() {
                rebase(font, base_dir);
            }
        }
        self
    }
}

/// Free-function form of [`CertificateConfig::resolve_paths`].
pub fn resolve_paths(config: CertificateConfig, base_dir: impl AsRef<Path>) -> CertificateConfig {
    config.resolve_paths(base_dir)
}

fn rebase(path: &mut PathBuf, base_dir: &Path) {
    if path.is_relative() {
        *path = base_dir.join(&*path);
    }
}

/// Where and how one field's text is stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Horizontal anchor as a percentage of the page width.
    pub x_percent: f64,
    /// Vertical anchor as a percentage of the page height.
    pub y_percent: f64,
    /// Point size.
    pub font_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
    pub color: Color,
    pub alignment: Alignment,
}

impl FieldSpec {
    /// The configured font, or `default` when the field uses the renderer's own.
    pub fn font_or<'a>(&'a self, default: &'a Path) -> &'a Path {
        self.font.as_deref().unwrap_or(default)
    }
}

/// An RGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const BLACK: Color = Color(0, 0, 0);

    pub fn rgb(self) -> (u8, u8, u8) {
        (self.0, self.1, self.2)
    }

    /// Channels scaled to `0.0..=1.0`, the form PDF color operators take.
    pub fn to_unit(self) -> [f32; 3] {
        [self.0, self.1, self.2].map(|c| f32::from(c) / 255.0)
    }
}

impl From<Color> for (u8, u8, u8) {
    fn from(color: Color) -> Self {
        color.rgb()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    pub const ALL: [Alignment; 3] = [Alignment::Left, Alignment::Center, Alignment::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(font: Option<&str>) -> FieldSpec {
        FieldSpec {
            x_percent: 50.0,
            y_percent: 40.0,
            font_size: 24.0,
            font: font.map(PathBuf::from),
            color: Color::BLACK,
            alignment: Alignment::Center,
        }
    }

    fn config() -> CertificateConfig {
        CertificateConfig {
            excel_path: "names.xlsx".into(),
            template_pdf_path: "/abs/template.pdf".into(),
            output_folder: "out".into(),
            test_mode: false,
            field_mappings: BTreeMap::from([("full_name".to_string(), "full name".to_string())]),
            name_field: "full_name".to_string(),
            fields: BTreeMap::from([
                ("full_name".to_string(), spec(Some("fonts/a.ttf"))),
                ("seal".to_string(), spec(None)),
            ]),
        }
    }

    #[test]
    fn test_resolve_paths_rebases_relative_paths_only() {
        let resolved = resolve_paths(config(), "/srv/certs");

        assert_eq!(resolved.excel_path, PathBuf::from("/srv/certs/names.xlsx"));
        assert_eq!(resolved.template_pdf_path, PathBuf::from("/abs/template.pdf"));
        assert_eq!(resolved.output_folder, PathBuf::from("/srv/certs/out"));
        assert_eq!(
            resolved.fields["full_name"].font.as_deref(),
            Some(Path::new("/srv/certs/fonts/a.ttf"))
        );
        assert_eq!(resolved.fields["seal"].font, None);
    }

    #[test]
    fn test_font_or_falls_back_to_default() {
        let default = Path::new("Helvetica");
        assert_eq!(spec(None).font_or(default), default);
        assert_eq!(spec(Some("x.ttf")).font_or(default), Path::new("x.ttf"));
    }

    #[test]
    fn test_alignment_parse_is_exact() {
        assert_eq!(Alignment::parse("center"), Some(Alignment::Center));
        assert_eq!(Alignment::parse("Center"), None);
        assert_eq!(Alignment::parse("justify"), None);
    }

    #[test]
    fn test_color_conversions() {
        let color = Color(255, 0, 51);
        let (r, g, b): (u8, u8, u8) = color.into();
        assert_eq!((r, g, b), (255, 0, 51));
        assert_eq!(color.to_unit(), [1.0, 0.0, 0.2]);
    }

    #[test]
    fn test_lookups() {
        let config = config();
        assert_eq!(config.column_for("full_name"), Some("full name"));
        assert_eq!(config.column_for("seal"), None);
        assert!(config.field("seal").is_some());
    }
}
