//! CSV lint layers: security, encoding, structure, data quality, headers

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::{
    codes,
    config::{CsvOptions, ParseConfig},
    diagnostics::ValidationError,
    heuristics::row_length_consistency,
    parsers::csv::{infer_column_type, types::is_null_like, types::parse_number, CsvInput},
    regex_util::static_regex,
    rules::Validator,
};

/// Injection hits above which the whole file is flagged
const BULK_INJECTION_THRESHOLD: usize = 10;
/// Delimiter score (0..=90) below which the delimiter is reported as a guess
const MIN_DELIMITER_SCORE: f64 = 30.0;
const TYPE_CONSISTENCY_THRESHOLD: f64 = 0.7;
const NULL_RATE_THRESHOLD: f64 = 0.5;
const DUPLICATE_ID_THRESHOLD: f64 = 0.1;
const MAX_HEADER_LENGTH: usize = 100;

const SQL_KEYWORDS: &[&str] = &[
    "select", "insert", "update", "delete", "drop", "table", "from", "where", "order", "group",
    "join", "union", "create", "alter",
];

static_regex!(fn dangerous_function_pattern, r"(?i)\b(?:CMD|SYSTEM|EXEC|SHELL|HYPERLINK|IMPORT[A-Z]*|WEBSERVICE)\s*[(|]");

/// Layers enabled by the CSV options, in reporting order
pub fn csv_layers<'a>(options: &CsvOptions) -> Vec<Box<dyn Validator<CsvInput<'a>>>> {
    let mut layers: Vec<Box<dyn Validator<CsvInput<'a>>>> = Vec::new();
    if options.security {
        layers.push(Box::new(SecurityLayer));
    }
    if options.encoding {
        layers.push(Box::new(EncodingLayer));
    }
    if options.structure {
        layers.push(Box::new(StructureLayer));
    }
    if options.data_quality {
        layers.push(Box::new(DataQualityLayer));
    }
    if options.headers {
        layers.push(Box::new(HeaderLayer));
    }
    layers
}

/// How dangerous a field would be if opened in a spreadsheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionRisk {
    /// `=` prefix or a command-capable function
    High,
    /// `+`, `-` or `@` prefix on a non-numeric field
    Medium,
}

pub fn injection_risk(field: &str) -> Option<InjectionRisk> {
    let value = field.trim_start();
    let first = value.chars().next()?;
    if !matches!(first, '=' | '+' | '-' | '@') {
        return None;
    }
    if first == '=' || dangerous_function_pattern().is_match(value) {
        return Some(InjectionRisk::High);
    }
    if parse_number(value).is_some() {
        return None;
    }
    Some(InjectionRisk::Medium)
}

/// Formula injection and overlong fields
pub struct SecurityLayer;

impl<'a> Validator<CsvInput<'a>> for SecurityLayer {
    fn validate(&self, input: &CsvInput<'a>, config: &ParseConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut hits = 0;
        let max_len = config.csv.max_field_length;

        for record in &input.records {
            for (idx, field) in record.fields.iter().enumerate() {
                if let Some(risk) = injection_risk(field) {
                    hits += 1;
                    let message = format!(
                        "Field {} may be executed as a spreadsheet formula: {}",
                        idx + 1,
                        preview(field)
                    );
                    let finding = match risk {
                        InjectionRisk::High => ValidationError::error(codes::CSV_INJECTION, message),
                        InjectionRisk::Medium => {
                            ValidationError::warning(codes::CSV_INJECTION, message)
                        }
                    };
                    errors.push(
                        finding
                            .at_line(record.line)
                            .with_suggestion("Prefix the value with a single quote or strip the leading character"),
                    );
                }
                let len = field.chars().count();
                if len > max_len {
                    errors.push(
                        ValidationError::warning(
                            codes::LONG_FIELD,
                            format!("Field {} has {} characters (maximum {})", idx + 1, len, max_len),
                        )
                        .at_line(record.line),
                    );
                }
            }
        }

        if hits > BULK_INJECTION_THRESHOLD {
            errors.push(ValidationError::error(
                codes::CSV_INJECTION_BULK,
                format!("{} fields look like spreadsheet formulas", hits),
            ));
        }
        errors
    }
}

fn preview(field: &str) -> String {
    const MAX: usize = 40;
    if field.chars().count() > MAX {
        format!("{}...", field.chars().take(MAX).collect::<String>())
    } else {
        field.to_string()
    }
}

/// BOM, line endings, control and replacement characters
pub struct EncodingLayer;

impl<'a> Validator<CsvInput<'a>> for EncodingLayer {
    fn validate(&self, input: &CsvInput<'a>, _config: &ParseConfig) -> Vec<ValidationError> {
        let content = input.content;
        let mut errors = Vec::new();

        if content.starts_with('\u{FEFF}') {
            errors.push(
                ValidationError::info(codes::BOM_DETECTED, "Content starts with a UTF-8 byte order mark")
                    .at_line(1),
            );
        }

        let crlf = content.matches("\r\n").count();
        let lf = content.matches('\n').count() - crlf;
        let cr = content.matches('\r').count() - crlf;
        let styles = [crlf, lf, cr].iter().filter(|n| **n > 0).count();
        if styles > 1 {
            errors.push(
                ValidationError::warning(
                    codes::MIXED_LINE_ENDINGS,
                    format!(
                        "Mixed line endings ({} CRLF, {} LF, {} CR)",
                        crlf, lf, cr
                    ),
                )
                .with_suggestion("Normalize line endings"),
            );
        }

        let mut control: Option<(usize, usize)> = None;
        let mut replacement: Option<(usize, usize)> = None;
        for (line_idx, line) in content.lines().enumerate() {
            for ch in line.chars() {
                if ch.is_control() && !matches!(ch, '\t' | '\r' | '\n') {
                    let entry = control.get_or_insert((line_idx + 1, 0));
                    entry.1 += 1;
                }
                if ch == '\u{FFFD}' {
                    let entry = replacement.get_or_insert((line_idx + 1, 0));
                    entry.1 += 1;
                }
            }
        }
        if let Some((line, count)) = control {
            errors.push(
                ValidationError::warning(
                    codes::CONTROL_CHARACTERS,
                    format!("{} control characters found", count),
                )
                .at_line(line),
            );
        }
        if let Some((line, count)) = replacement {
            errors.push(
                ValidationError::warning(
                    codes::REPLACEMENT_CHARACTER,
                    format!("{} U+FFFD replacement characters found; the source encoding may be wrong", count),
                )
                .at_line(line),
            );
        }
        errors
    }
}

/// Delimiter confidence, row consistency, quotes and column count
pub struct StructureLayer;

impl<'a> Validator<CsvInput<'a>> for StructureLayer {
    fn validate(&self, input: &CsvInput<'a>, config: &ParseConfig) -> Vec<ValidationError> {
        let options = &config.csv;
        let mut errors = Vec::new();

        if let Some(line) = input.unterminated_quote_line {
            errors.push(
                ValidationError::error(codes::UNTERMINATED_QUOTE, "Quoted field is never closed")
                    .at_line(line)
                    .with_suggestion(format!("Close the field with {:?}", options.quote_char)),
            );
        }

        if input.records.len() > 1 && input.delimiter_score < MIN_DELIMITER_SCORE {
            errors.push(ValidationError::warning(
                codes::LOW_DELIMITER_CONFIDENCE,
                format!("Delimiter {:?} was inferred with low confidence", input.delimiter),
            ));
        }

        let counts: Vec<usize> = input.records.iter().map(|r| r.fields.len()).collect();
        let consistency = row_length_consistency(&counts);
        let threshold = options.row_consistency_threshold();
        if !counts.is_empty() && consistency < threshold {
            errors.push(ValidationError::warning(
                codes::INCONSISTENT_ROW_LENGTH,
                format!(
                    "Only {:.0}% of rows share the most common field count (need {:.0}%)",
                    consistency * 100.0,
                    threshold * 100.0
                ),
            ));
        }

        let columns = input.column_count();
        if columns > options.max_columns {
            errors.push(ValidationError::warning(
                codes::TOO_MANY_COLUMNS,
                format!("{} columns exceed the maximum of {}", columns, options.max_columns),
            ));
        }
        errors
    }
}

/// Type consistency, null rate and duplicate identifiers per column
pub struct DataQualityLayer;

impl<'a> Validator<CsvInput<'a>> for DataQualityLayer {
    fn validate(&self, input: &CsvInput<'a>, _config: &ParseConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if input.data_records().is_empty() {
            return errors;
        }
        let headers = input.headers();

        for index in 0..input.column_count() {
            let name = headers
                .and_then(|h| h.get(index))
                .cloned()
                .unwrap_or_else(|| format!("column {}", index + 1));

            let inference = infer_column_type(input.column_values(index));
            if inference.confidence < TYPE_CONSISTENCY_THRESHOLD {
                errors.push(ValidationError::info(
                    codes::INCONSISTENT_TYPES,
                    format!(
                        "Column '{}' is {:.0}% consistent with type {}",
                        name,
                        inference.confidence * 100.0,
                        inference.data_type.as_str()
                    ),
                ));
            }

            let total = input.column_values(index).count();
            let nulls = input.column_values(index).filter(|v| is_null_like(v)).count();
            if total > 0 && nulls as f64 / total as f64 > NULL_RATE_THRESHOLD {
                errors.push(ValidationError::info(
                    codes::HIGH_NULL_RATE,
                    format!("Column '{}' is {}/{} empty", name, nulls, total),
                ));
            }

            let lower = name.to_ascii_lowercase();
            if headers.is_some() && (lower.contains("id") || lower.contains("key")) {
                let values: Vec<&str> = input
                    .column_values(index)
                    .filter(|v| !is_null_like(v))
                    .collect();
                let distinct: HashSet<&str> = values.iter().copied().collect();
                let duplicates = values.len() - distinct.len();
                if !values.is_empty()
                    && duplicates as f64 / values.len() as f64 > DUPLICATE_ID_THRESHOLD
                {
                    errors.push(ValidationError::warning(
                        codes::DUPLICATE_IDENTIFIERS,
                        format!(
                            "Identifier column '{}' has {} duplicate values",
                            name, duplicates
                        ),
                    ));
                }
            }
        }
        errors
    }
}

/// Duplicate, empty, problematic and overlong header names
pub struct HeaderLayer;

impl<'a> Validator<CsvInput<'a>> for HeaderLayer {
    fn validate(&self, input: &CsvInput<'a>, _config: &ParseConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let (Some(headers), Some(first)) = (input.headers(), input.records.first()) else {
            return errors;
        };
        let line = first.line;
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (idx, raw) in headers.iter().enumerate() {
            let header = raw.trim();
            let column = idx + 1;

            if header.is_empty() {
                errors.push(
                    ValidationError::warning(codes::EMPTY_HEADER, format!("Header {} is empty", column))
                        .at_line(line),
                );
                continue;
            }

            let key = header.to_lowercase();
            if let Some(previous) = seen.get(&key) {
                errors.push(
                    ValidationError::warning(
                        codes::DUPLICATE_HEADER,
                        format!(
                            "Header '{}' (column {}) duplicates column {}",
                            header, column, previous
                        ),
                    )
                    .at_line(line),
                );
            } else {
                seen.insert(key.clone(), column);
            }

            if let Some(problem) = header_problem(header, &key) {
                errors.push(
                    ValidationError::info(
                        codes::PROBLEMATIC_HEADER,
                        format!("Header '{}' {}", header, problem),
                    )
                    .at_line(line),
                );
            }

            if header.chars().count() > MAX_HEADER_LENGTH {
                errors.push(
                    ValidationError::warning(
                        codes::LONG_HEADER,
                        format!("Header {} is longer than {} characters", column, MAX_HEADER_LENGTH),
                    )
                    .at_line(line),
                );
            }
        }
        errors
    }
}

fn header_problem(header: &str, lower: &str) -> Option<&'static str> {
    if header.starts_with(|c: char| c.is_ascii_digit()) {
        Some("starts with a digit")
    } else if header.contains("  ") {
        Some("contains consecutive spaces")
    } else if header.contains(['<', '>', '|', '&']) {
        Some("contains one of < > | &")
    } else if SQL_KEYWORDS.contains(&lower) {
        Some("is a SQL keyword")
    } else {
        None
    }
}
