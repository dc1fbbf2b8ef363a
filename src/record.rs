//! Turning spreadsheet rows into the text stamped on each certificate.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::CertificateConfig;

/// The field that falls back to today's date when the sheet has no value.
pub const DATE_FIELD: &str = "date";

/// Output file name used for the single test-mode certificate.
pub const TEST_FILE_NAME: &str = "test_certificate.pdf";

const DATE_OUTPUT_FORMAT: &str = "%B %-d, %Y.";

const DATETIME_INPUT_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_INPUT_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

/// One spreadsheet cell as handed over by the reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Whether the cell carries no value. Blank text and NaN count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
            Cell::Date(_) | Cell::DateTime(_) => false,
        }
    }

    /// Plain text rendering. Integral numbers drop their fractional part.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.is_nan() => String::new(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.to_string(),
            Cell::DateTime(dt) => dt.to_string(),
        }
    }

    /// The calendar date this cell denotes, if any.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::DateTime(dt) => Some(dt.date()),
            Cell::Text(s) => parse_date_text(s),
            Cell::Empty | Cell::Number(_) => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(dt: NaiveDateTime) -> Self {
        Cell::DateTime(dt)
    }
}

/// A spreadsheet row keyed by column header.
pub type Row = BTreeMap<String, Cell>;

/// Resolved text per logical field name.
pub type FieldValues = BTreeMap<String, String>;

/// Formats a date the way certificates print it, e.g. `March 5, 2024.`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_OUTPUT_FORMAT).to_string()
}

/// Reads a date out of free text in one of the common spreadsheet layouts.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim().trim_end_matches('.');
    DATETIME_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_INPUT_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        })
}

/// Maps one row onto the configured fields.
///
/// Columns that are absent or blank resolve to an empty string, except for
/// the `date` field, which falls back to `today` whenever it has a
/// placement block. Date cells, and text that reads as a date, are
/// reformatted; any other text in the date column is kept verbatim.
pub fn resolve_row(config: &CertificateConfig, row: &Row, today: NaiveDate) -> FieldValues {
    let dated = config.fields.contains_key(DATE_FIELD);
    let mut values = FieldValues::new();

    for (field, column) in &config.field_mappings {
        let cell = row.get(column).filter(|cell| !cell.is_empty());
        let value = match cell {
            Some(cell) if field == DATE_FIELD => match cell.as_date() {
                Some(date) => format_date(date),
                None => cell.to_text(),
            },
            Some(cell) => cell.to_text(),
            None if field == DATE_FIELD && dated => format_date(today),
            None => String::new(),
        };
        values.insert(field.clone(), value);
    }

    if dated && !values.contains_key(DATE_FIELD) {
        values.insert(DATE_FIELD.to_string(), format_date(today));
    }

    values
}

/// Placeholder values for a test-mode run: every configured field reads
/// `Test <field>`, and the date field shows today's date.
pub fn sample_values(config: &CertificateConfig, today: NaiveDate) -> FieldValues {
    config
        .fields
        .keys()
        .map(|field| {
            let value = if field == DATE_FIELD {
                format_date(today)
            } else {
                format!("Test {field}")
            };
            (field.clone(), value)
        })
        .collect()
}

/// Builds the PDF file name for a row from its name field.
///
/// Every character that is not alphanumeric becomes `_`. Rows without a
/// name are called `person_<index>`.
pub fn output_file_name(values: &FieldValues, name_field: &str, index: usize) -> String {
    let stem = match values.get(name_field).map(|v| v.trim()) {
        Some(name) if !name.is_empty() => sanitize(name),
        _ => format!("person_{index}"),
    };
    format!("{stem}.pdf")
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
