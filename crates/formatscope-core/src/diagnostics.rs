//! Findings, detection results and parse results

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type FormatResult<T> = Result<T, FormatError>;

/// How serious a finding is. Only `Error` blocks a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn is_blocking(self) -> bool {
        self == Severity::Error
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// A single finding produced by a parser or validation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub code: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(severity: Severity, code: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
            code: code.to_string(),
            severity,
            suggestion: None,
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn info(code: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    /// Attach a 1-based line and column.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

/// Clamp a raw heuristic score into the 0..=100 confidence range.
pub fn clamp_confidence(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

/// Outcome of a detection call: which format, how sure, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub format: String,
    pub confidence: u8,
    pub evidence: Vec<String>,
}

impl DetectionResult {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(format: impl Into<String>, score: f64, evidence: Vec<String>) -> Self {
        Self {
            format: format.into(),
            confidence: clamp_confidence(score),
            evidence,
        }
    }

    pub fn unknown() -> Self {
        Self {
            format: Self::UNKNOWN.to_string(),
            confidence: 0,
            evidence: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.format == Self::UNKNOWN
    }
}

/// Bookkeeping attached to every parse result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseMetadata {
    pub parse_time: Duration,
    pub file_size: usize,
    pub format: String,
    pub confidence: u8,
}

impl ParseMetadata {
    pub fn new(format: &str, file_size: usize, confidence: u8) -> Self {
        Self {
            parse_time: Duration::ZERO,
            file_size,
            format: format.to_string(),
            confidence,
        }
    }

    pub fn with_parse_time(mut self, parse_time: Duration) -> Self {
        self.parse_time = parse_time;
        self
    }
}

/// Result of a `parse` call.
///
/// `data` is `Some` exactly when `is_valid` is true, and a valid result never
/// carries a blocking finding. Both hold by construction: the only ways to
/// build a result are [`ParseResult::from_parts`] and [`ParseResult::failure`].
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult<T> {
    pub is_valid: bool,
    pub data: Option<T>,
    pub errors: Vec<ValidationError>,
    pub metadata: ParseMetadata,
}

impl<T> ParseResult<T> {
    /// Build a result, dropping `data` if any finding is blocking.
    pub fn from_parts(
        data: Option<T>,
        errors: Vec<ValidationError>,
        metadata: ParseMetadata,
    ) -> Self {
        let blocked = errors.iter().any(ValidationError::is_blocking);
        match data {
            Some(data) if !blocked => Self {
                is_valid: true,
                data: Some(data),
                errors,
                metadata,
            },
            _ => Self::failure(errors, metadata),
        }
    }

    /// Build a failed result. A failure always carries at least one blocking
    /// finding; a generic one is added if the caller supplied none.
    pub fn failure(mut errors: Vec<ValidationError>, metadata: ParseMetadata) -> Self {
        if !errors.iter().any(ValidationError::is_blocking) {
            errors.push(ValidationError::error(
                crate::codes::SYNTAX_ERROR,
                format!("Failed to parse content as {}", metadata.format),
            ));
        }
        Self {
            is_valid: false,
            data: None,
            errors,
            metadata,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParseResult<U> {
        ParseResult {
            is_valid: self.is_valid,
            data: self.data.map(f),
            errors: self.errors,
            metadata: self.metadata,
        }
    }

    pub fn blocking_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.is_blocking())
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

/// Library errors that are not content findings
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("A parser named '{name}' is already registered")]
    DuplicateParser { name: String },

    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to read symlink: {path}")]
    FileSymlink { path: PathBuf },

    #[error("Not a regular file: {path}")]
    FileNotRegular { path: PathBuf },

    #[error("File too large: {path} ({size} bytes, limit {limit} bytes)")]
    FileTooBig { path: PathBuf, size: u64, limit: u64 },

    #[error("Invalid exclude pattern '{pattern}'")]
    ExcludePattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
