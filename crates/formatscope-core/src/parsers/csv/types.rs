//! CSV document model and column type inference

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

use crate::{diagnostics::ValidationError, regex_util::static_regex};

/// Values sampled per column during type inference
pub const TYPE_SAMPLE_SIZE: usize = 100;

const NUMBER_THRESHOLD: f64 = 0.8;
const BOOLEAN_THRESHOLD: f64 = 0.8;
const DATE_THRESHOLD: f64 = 0.7;

static_regex!(fn number_pattern, r"^[-+]?(?:\d+|\d{1,3}(?:,\d{3})+)?(?:\.\d+)?(?:[eE][-+]?\d+)?$");
static_regex!(fn iso_date_pattern, r"^\d{4}-\d{2}-\d{2}$");
static_regex!(fn slash_ymd_pattern, r"^\d{4}/\d{1,2}/\d{1,2}$");
static_regex!(fn us_date_pattern, r"^\d{1,2}/\d{1,2}/\d{4}$");
static_regex!(fn dash_dmy_pattern, r"^\d{1,2}-\d{1,2}-\d{4}$");
static_regex!(fn dot_dmy_pattern, r"^\d{1,2}\.\d{1,2}\.\d{4}$");
static_regex!(fn iso_datetime_pattern, r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?$");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Date,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
        }
    }
}

/// A converted cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Null,
    Boolean(bool),
    Number(f64),
    Date(NaiveDateTime),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvCell {
    pub raw: String,
    pub value: CellValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow {
    /// 1-based index among data rows
    pub index: usize,
    /// Line the record starts on
    pub line: usize,
    pub cells: Vec<CsvCell>,
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvColumn {
    pub name: String,
    pub index: usize,
    pub data_type: ColumnType,
    /// Share of non-null samples supporting `data_type` (0.0..=1.0)
    pub confidence: f64,
    pub sample_values: Vec<String>,
    pub null_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvMetadata {
    pub delimiter: char,
    pub quote_char: char,
    pub has_headers: bool,
    pub row_count: usize,
    pub column_count: usize,
    pub delimiter_confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub columns: Vec<CsvColumn>,
    pub rows: Vec<CsvRow>,
    pub metadata: CsvMetadata,
}

impl CsvData {
    pub fn column(&self, name: &str) -> Option<&CsvColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Values of one column across all rows, `None` where a row is short
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<&CellValue>> {
        self.rows
            .iter()
            .map(move |row| row.cells.get(index).map(|cell| &cell.value))
    }
}

pub fn is_null_like(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || ["null", "na", "n/a"].iter().any(|n| v.eq_ignore_ascii_case(n))
}

pub fn parse_boolean(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

pub fn parse_number(value: &str) -> Option<f64> {
    let v = value.trim();
    if v.is_empty() || !v.chars().any(|c| c.is_ascii_digit()) || !number_pattern().is_match(v) {
        return None;
    }
    v.replace(',', "").parse().ok()
}

/// Parse a date in one of the accepted shapes. The shape must match and the
/// calendar date must exist.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let v = value.trim();
    let date_only = |fmt: &str| {
        NaiveDate::parse_from_str(v, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    };

    if iso_date_pattern().is_match(v) {
        return date_only("%Y-%m-%d");
    }
    if slash_ymd_pattern().is_match(v) {
        return date_only("%Y/%m/%d");
    }
    if us_date_pattern().is_match(v) {
        return date_only("%m/%d/%Y");
    }
    if dash_dmy_pattern().is_match(v) {
        return date_only("%d-%m-%Y");
    }
    if dot_dmy_pattern().is_match(v) {
        return date_only("%d.%m.%Y");
    }
    if iso_datetime_pattern().is_match(v) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
            return Some(dt.naive_utc());
        }
        return [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M",
        ]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(v, fmt).ok());
    }
    None
}

/// Inferred type of a column with the share of samples supporting it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeInference {
    pub data_type: ColumnType,
    pub confidence: f64,
    pub null_count: usize,
}

/// Infer a column type from up to [`TYPE_SAMPLE_SIZE`] values.
///
/// Ratios are taken over non-null samples and checked in priority order
/// number, boolean, date; anything else is a string column whose confidence
/// is `1 - max(ratios)`.
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a str>) -> TypeInference {
    let (mut samples, mut nulls) = (0usize, 0usize);
    let (mut numbers, mut booleans, mut dates) = (0usize, 0usize, 0usize);

    for value in values.into_iter().take(TYPE_SAMPLE_SIZE) {
        if is_null_like(value) {
            nulls += 1;
            continue;
        }
        samples += 1;
        if parse_number(value).is_some() {
            numbers += 1;
        }
        if parse_boolean(value).is_some() {
            booleans += 1;
        }
        if parse_date(value).is_some() {
            dates += 1;
        }
    }

    let ratio = |count: usize| {
        if samples == 0 {
            0.0
        } else {
            count as f64 / samples as f64
        }
    };
    let (number_ratio, boolean_ratio, date_ratio) = (ratio(numbers), ratio(booleans), ratio(dates));

    let (data_type, confidence) = if number_ratio >= NUMBER_THRESHOLD {
        (ColumnType::Number, number_ratio)
    } else if boolean_ratio >= BOOLEAN_THRESHOLD {
        (ColumnType::Boolean, boolean_ratio)
    } else if date_ratio >= DATE_THRESHOLD {
        (ColumnType::Date, date_ratio)
    } else {
        let best = number_ratio.max(boolean_ratio).max(date_ratio);
        (ColumnType::String, 1.0 - best)
    };

    TypeInference {
        data_type,
        confidence,
        null_count: nulls,
    }
}

/// Convert a raw field to the column type. Null-like values are `Null` in
/// every column.
pub fn convert_cell(raw: &str, data_type: ColumnType) -> Result<CellValue, String> {
    if is_null_like(raw) {
        return Ok(CellValue::Null);
    }
    match data_type {
        ColumnType::String => Ok(CellValue::String(raw.to_string())),
        ColumnType::Number => parse_number(raw)
            .map(CellValue::Number)
            .ok_or_else(|| format!("'{}' is not a number", raw)),
        ColumnType::Boolean => parse_boolean(raw)
            .map(CellValue::Boolean)
            .ok_or_else(|| format!("'{}' is not a boolean", raw)),
        ColumnType::Date => parse_date(raw)
            .map(CellValue::Date)
            .ok_or_else(|| format!("'{}' is not a date", raw)),
    }
}
