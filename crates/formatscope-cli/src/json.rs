//! JSON output format support.
//!
//! Every command that accepts `--format json` prints one of the documents
//! below, so scripts can consume the results without scraping text.

use formatscope_core::{DetectionResult, Document, FileReport, Severity, ValidationError};
use serde::Serialize;
use std::path::Path;

/// Output of `formatscope detect`.
#[derive(Debug, Serialize)]
pub struct DetectOutput {
    pub version: String,
    pub file: String,
    pub format: String,
    pub confidence: u8,
    pub evidence: Vec<String>,
}

/// Output of `formatscope parse`.
#[derive(Debug, Serialize)]
pub struct ParseOutput<'a> {
    pub version: String,
    pub file: String,
    pub format: String,
    /// Absent when the format was forced with `--as`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub findings: Vec<JsonFinding>,
    pub counts: JsonSummary,
    pub data: Option<&'a Document>,
}

/// Output of `formatscope validate`.
#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub version: String,
    pub files_checked: usize,
    pub files: Vec<JsonFileReport>,
    pub summary: JsonSummary,
}

#[derive(Debug, Serialize)]
pub struct JsonFileReport {
    /// Path relative to the validated root, forward slashes
    pub file: String,
    pub format: String,
    pub confidence: u8,
    pub valid: bool,
    pub findings: Vec<JsonFinding>,
}

/// A single finding in JSON format.
#[derive(Debug, Serialize)]
pub struct JsonFinding {
    /// Severity level: error, warning, or info.
    pub level: String,
    /// Code identifier (e.g., UNCLOSED_TAG).
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Finding counts by severity.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct JsonSummary {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl JsonSummary {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn of(errors: &[ValidationError]) -> Self {
        let mut summary = Self::default();
        for error in errors {
            summary.add(error.severity);
        }
        summary
    }
}

fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub fn path_to_string(path: &Path, base_path: &Path) -> String {
    path.strip_prefix(base_path)
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

pub fn finding_to_json(error: &ValidationError) -> JsonFinding {
    JsonFinding {
        level: error.severity.as_str().to_string(),
        code: error.code.clone(),
        line: error.line,
        column: error.column,
        message: error.message.clone(),
        suggestion: error.suggestion.clone(),
    }
}

pub fn detection_to_json(path: &Path, detection: &DetectionResult) -> DetectOutput {
    DetectOutput {
        version: version(),
        file: path.to_string_lossy().replace('\\', "/"),
        format: detection.format.clone(),
        confidence: detection.confidence,
        evidence: detection.evidence.clone(),
    }
}

pub fn parse_to_json<'a>(
    path: &Path,
    format: &str,
    confidence: Option<u8>,
    result: &'a formatscope_core::ParseResult<Document>,
) -> ParseOutput<'a> {
    ParseOutput {
        version: version(),
        file: path.to_string_lossy().replace('\\', "/"),
        format: format.to_string(),
        confidence,
        valid: result.is_valid,
        summary: result.data.as_ref().map(Document::summary),
        findings: result.errors.iter().map(finding_to_json).collect(),
        counts: JsonSummary::of(&result.errors),
        data: result.data.as_ref(),
    }
}

/// Convert batch reports to JSON output format.
pub fn reports_to_json(reports: &[FileReport], base_path: &Path) -> ValidateOutput {
    let mut summary = JsonSummary::default();

    let files = reports
        .iter()
        .map(|report| {
            for error in &report.errors {
                summary.add(error.severity);
            }
            JsonFileReport {
                file: path_to_string(&report.path, base_path),
                format: report.format.clone(),
                confidence: report.confidence,
                valid: report.is_valid,
                findings: report.errors.iter().map(finding_to_json).collect(),
            }
        })
        .collect();

    ValidateOutput {
        version: version(),
        files_checked: reports.len(),
        files,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report(path: &str, errors: Vec<ValidationError>) -> FileReport {
        FileReport {
            path: PathBuf::from(path),
            format: "xml".to_string(),
            confidence: 90,
            is_valid: !errors.iter().any(ValidationError::is_blocking),
            errors,
            summary: None,
        }
    }

    #[test]
    fn test_empty_reports() {
        let output = reports_to_json(&[], Path::new("."));
        assert_eq!(output.files_checked, 0);
        assert!(output.files.is_empty());
        assert_eq!(output.summary, JsonSummary::default());
    }

    #[test]
    fn test_version_matches_cargo() {
        let output = reports_to_json(&[], Path::new("."));
        assert_eq!(output.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_summary_counts() {
        let reports = vec![
            report(
                "/project/a.xml",
                vec![
                    ValidationError::error("UNCLOSED_TAG", "Element <a> is never closed").at(1, 1),
                    ValidationError::info("MISSING_DECLARATION", "No XML declaration").at(1, 1),
                ],
            ),
            report(
                "/project/nested/b.xml",
                vec![ValidationError::warning("DTD_DETECTED", "DOCTYPE present")],
            ),
        ];
        let output = reports_to_json(&reports, Path::new("/project"));
        assert_eq!(output.files_checked, 2);
        assert_eq!(
            output.summary,
            JsonSummary {
                errors: 1,
                warnings: 1,
                info: 1
            }
        );
        assert_eq!(output.files[0].file, "a.xml");
        assert_eq!(output.files[1].file, "nested/b.xml");
        assert!(!output.files[0].valid);
    }

    #[test]
    fn test_path_outside_base_is_kept() {
        assert_eq!(
            path_to_string(Path::new("/other/x.json"), Path::new("/project")),
            "/other/x.json"
        );
    }

    #[test]
    fn test_single_file_base_keeps_name() {
        assert_eq!(
            path_to_string(Path::new("data.csv"), Path::new("data.csv")),
            "data.csv"
        );
    }

    #[test]
    fn test_finding_serialization_skips_missing_position() {
        let finding = finding_to_json(&ValidationError::error("SYNTAX_ERROR", "bad"));
        let value = serde_json::to_value(&finding).unwrap();
        assert_eq!(value["level"], "error");
        assert_eq!(value["code"], "SYNTAX_ERROR");
        assert!(value.get("line").is_none());
        assert!(value.get("suggestion").is_none());
    }
}
