//! CSV detection, tokenizing, type inference and decoding

pub mod tokenizer;
pub mod types;

pub use tokenizer::{parse_row, split_records};
pub use types::{
    infer_column_type, CellValue, ColumnType, CsvCell, CsvColumn, CsvData, CsvMetadata, CsvRow,
};

use std::time::Instant;

use crate::{
    codes,
    config::{CsvOptions, ParseConfig},
    diagnostics::{clamp_confidence, DetectionResult, ParseMetadata, ParseResult, ValidationError},
    document::Document,
    heuristics::{
        best_parser_delimiter, has_quoted_field, header_likeness, row_length_consistency,
        sample_lines, DelimiterStats, SAMPLE_LINES,
    },
    parsers::FormatParser,
    rules::csv::csv_layers,
};

/// Points an inferred delimiter must win by to replace the configured one
const DELIMITER_OVERRIDE_MARGIN: f64 = 20.0;

/// Share of fields that must look like a header over a numeric value
const HEADER_FIELD_RATIO: f64 = 0.3;

/// A tokenized record and the line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Tokenized content shared by the validation layers and the decoder
#[derive(Debug, Clone)]
pub struct CsvInput<'a> {
    pub content: &'a str,
    pub delimiter: char,
    /// Delimiter score on the 0..=90 scale of [`DelimiterStats::parser_score`]
    pub delimiter_score: f64,
    pub records: Vec<CsvRecord>,
    pub has_headers: bool,
    pub unterminated_quote_line: Option<usize>,
}

impl<'a> CsvInput<'a> {
    /// Split and tokenize `content`, settling the delimiter and header row.
    /// Returns the input and any notes about decisions taken.
    pub fn prepare(content: &'a str, options: &CsvOptions) -> (Self, Vec<ValidationError>) {
        let mut notes = Vec::new();
        let lines = sample_lines(content, SAMPLE_LINES);
        let inferred = best_parser_delimiter(&lines, options.quote_char);

        let (delimiter, delimiter_score) = match (options.delimiter, inferred) {
            (Some(configured), Some(best)) => {
                let configured_score =
                    DelimiterStats::compute(&lines, configured, options.quote_char).parser_score();
                let best_score = best.parser_score();
                if best.delimiter != configured
                    && best_score - configured_score > DELIMITER_OVERRIDE_MARGIN
                {
                    tracing::debug!(
                        configured = ?configured,
                        inferred = ?best.delimiter,
                        "overriding configured delimiter"
                    );
                    notes.push(
                        ValidationError::info(
                            codes::DELIMITER_OVERRIDDEN,
                            format!(
                                "Configured delimiter {:?} replaced by {:?} inferred from content",
                                configured, best.delimiter
                            ),
                        )
                        .with_suggestion(format!(
                            "Set the delimiter to {:?} to silence this note",
                            best.delimiter
                        )),
                    );
                    (best.delimiter, best_score)
                } else {
                    (configured, configured_score)
                }
            }
            (Some(configured), None) => (configured, 0.0),
            (None, Some(best)) => {
                let score = best.parser_score();
                (best.delimiter, score)
            }
            (None, None) => (',', 0.0),
        };

        let split = split_records(content, options.quote_char, options.escape_char);
        let records: Vec<CsvRecord> = split
            .records
            .iter()
            .filter(|r| !(options.skip_empty_lines && r.text.trim().is_empty()))
            .map(|r| {
                let mut fields =
                    parse_row(r.text, delimiter, options.quote_char, options.escape_char);
                if options.trim_whitespace {
                    for field in &mut fields {
                        *field = field.trim().to_string();
                    }
                }
                CsvRecord {
                    line: r.line,
                    fields,
                }
            })
            .collect();

        let has_headers = options
            .has_headers
            .unwrap_or_else(|| detect_headers(&records));

        (
            Self {
                content,
                delimiter,
                delimiter_score,
                records,
                has_headers,
                unterminated_quote_line: split.unterminated_quote_line,
            },
            notes,
        )
    }

    pub fn headers(&self) -> Option<&[String]> {
        if self.has_headers {
            self.records.first().map(|r| r.fields.as_slice())
        } else {
            None
        }
    }

    pub fn data_records(&self) -> &[CsvRecord] {
        if self.has_headers && !self.records.is_empty() {
            &self.records[1..]
        } else {
            &self.records
        }
    }

    /// Column count: header width, else the widest record
    pub fn column_count(&self) -> usize {
        match self.headers() {
            Some(headers) => headers.len(),
            None => self.records.iter().map(|r| r.fields.len()).max().unwrap_or(0),
        }
    }

    /// Raw values of one column across data records, skipping short rows
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.data_records()
            .iter()
            .filter_map(move |r| r.fields.get(index).map(String::as_str))
    }
}

/// Row 1 is a header row when, for more than 30% of its fields, the field
/// starts with a letter and the field below it starts with a digit. A lone
/// row is a header row when it reads like one.
fn detect_headers(records: &[CsvRecord]) -> bool {
    match records {
        [] => false,
        [only] => header_likeness(&only.fields) > 0.5,
        [first, second, ..] => {
            if first.fields.is_empty() {
                return false;
            }
            let hits = first
                .fields
                .iter()
                .zip(&second.fields)
                .filter(|(head, value)| {
                    head.trim().starts_with(char::is_alphabetic)
                        && value.trim().starts_with(|c: char| c.is_ascii_digit())
                })
                .count();
            hits as f64 / first.fields.len() as f64 > HEADER_FIELD_RATIO
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }

    fn decode(&self, input: &CsvInput<'_>, config: &ParseConfig) -> CsvData {
        let column_count = input.column_count();
        let headers: Vec<String> = match input.headers() {
            Some(headers) => headers.to_vec(),
            None => (1..=column_count).map(|i| format!("column_{}", i)).collect(),
        };

        let columns: Vec<CsvColumn> = headers
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let inference = infer_column_type(input.column_values(index));
                CsvColumn {
                    name: name.clone(),
                    index,
                    data_type: inference.data_type,
                    confidence: inference.confidence,
                    sample_values: input
                        .column_values(index)
                        .take(5)
                        .map(str::to_string)
                        .collect(),
                    null_count: input
                        .column_values(index)
                        .filter(|v| types::is_null_like(v))
                        .count(),
                }
            })
            .collect();

        let rows: Vec<CsvRow> = input
            .data_records()
            .iter()
            .enumerate()
            .map(|(i, record)| decode_row(i + 1, record, &columns))
            .collect();

        CsvData {
            metadata: CsvMetadata {
                delimiter: input.delimiter,
                quote_char: config.csv.quote_char,
                has_headers: input.has_headers,
                row_count: rows.len(),
                column_count,
                delimiter_confidence: clamp_confidence(input.delimiter_score / 90.0 * 100.0),
            },
            headers,
            columns,
            rows,
        }
    }
}

fn decode_row(index: usize, record: &CsvRecord, columns: &[CsvColumn]) -> CsvRow {
    let mut errors = Vec::new();
    let mut is_valid = true;

    if record.fields.len() != columns.len() {
        is_valid = false;
        errors.push(
            ValidationError::warning(
                codes::ROW_LENGTH_MISMATCH,
                format!(
                    "Row {} has {} fields; expected {}",
                    index,
                    record.fields.len(),
                    columns.len()
                ),
            )
            .at_line(record.line),
        );
    }

    let cells = record
        .fields
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let data_type = columns.get(i).map_or(ColumnType::String, |c| c.data_type);
            let value = match types::convert_cell(raw, data_type) {
                Ok(value) => value,
                Err(reason) => {
                    errors.push(
                        ValidationError::info(
                            codes::TYPE_CONVERSION_FAILED,
                            format!("Column {}: {}; kept as text", i + 1, reason),
                        )
                        .at_line(record.line),
                    );
                    CellValue::String(raw.clone())
                }
            };
            CsvCell {
                raw: raw.clone(),
                value,
            }
        })
        .collect();

    CsvRow {
        index,
        line: record.line,
        cells,
        is_valid,
        errors,
    }
}

impl FormatParser for CsvParser {
    fn name(&self) -> &str {
        "csv"
    }

    fn extensions(&self) -> &[&'static str] {
        &["csv", "tsv", "psv"]
    }

    fn mime_types(&self) -> &[&'static str] {
        &["text/csv", "text/tab-separated-values", "application/csv"]
    }

    fn detect(&self, content: &str) -> DetectionResult {
        let trimmed = content.trim_start();
        let lines = sample_lines(content, SAMPLE_LINES);
        let mut score = 0.0;
        let mut evidence = Vec::new();

        if let Some(best) = best_parser_delimiter(&lines, '"') {
            let points = best.parser_score() * 40.0 / 90.0;
            score += points;
            evidence.push(format!(
                "Delimiter {:?} averages {:.1} per line",
                best.delimiter, best.mean
            ));

            let consistency = row_length_consistency(&best.field_counts());
            if consistency >= 0.7 {
                score += 30.0;
                evidence.push(format!(
                    "{:.0}% of rows share the same field count",
                    consistency * 100.0
                ));
            }
            if lines.iter().any(|l| has_quoted_field(l, best.delimiter, '"')) {
                score += 15.0;
                evidence.push("Quoted fields present".to_string());
            }
            if let Some(first) = lines.first() {
                let fields = parse_row(first, best.delimiter, '"', '"');
                if header_likeness(&fields) > 0.5 {
                    score += 15.0;
                    evidence.push("First row looks like a header".to_string());
                }
            }
        }

        if trimmed.starts_with('<') {
            score -= 30.0;
            evidence.push("Starts with '<' (markup, not CSV)".to_string());
        } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
            score -= 20.0;
            evidence.push("Starts with a JSON bracket".to_string());
        }

        let format = if score > 50.0 {
            self.name()
        } else {
            DetectionResult::UNKNOWN
        };
        DetectionResult::new(format, score, evidence)
    }

    fn validate(&self, content: &str, config: &ParseConfig) -> Vec<ValidationError> {
        if content.trim().is_empty() {
            return vec![ValidationError::error(codes::EMPTY_CONTENT, "CSV content is empty")];
        }
        let (input, mut errors) = CsvInput::prepare(content, &config.csv);
        for layer in csv_layers(&config.csv) {
            errors.extend(layer.validate(&input, config));
        }
        config.filter_disabled(&mut errors);
        errors
    }

    fn parse(&self, content: &str, config: &ParseConfig) -> ParseResult<Document> {
        let start = Instant::now();
        let confidence = self.detect(content).confidence;
        let metadata = ParseMetadata::new(self.name(), content.len(), confidence);

        if content.trim().is_empty() {
            let errors = vec![ValidationError::error(codes::EMPTY_CONTENT, "CSV content is empty")];
            return ParseResult::failure(errors, metadata.with_parse_time(start.elapsed()));
        }

        let (input, mut errors) = CsvInput::prepare(content, &config.csv);
        for layer in csv_layers(&config.csv) {
            errors.extend(layer.validate(&input, config));
        }
        config.filter_disabled(&mut errors);

        if errors.iter().any(ValidationError::is_blocking) {
            return ParseResult::failure(errors, metadata.with_parse_time(start.elapsed()));
        }

        let data = self.decode(&input, config);
        ParseResult::from_parts(
            Some(Document::Csv(data)),
            errors,
            metadata.with_parse_time(start.elapsed()),
        )
    }
}
