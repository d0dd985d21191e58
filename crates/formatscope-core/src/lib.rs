//! # formatscope-core
//!
//! Detection and parsing engine for structured text.
//!
//! Given a text blob with no declared type, the engine works out whether it
//! is JSON, CSV or XML, with a confidence score and evidence, then parses it
//! into a typed document annotated with validation findings.
//!
//! - [`FormatRegistry`] holds the parsers and routes content to them
//! - [`FormatDetector`] combines signature, MIME, filename and content
//!   detection and caches results
//! - [`parsers`] holds the JSON, CSV and XML parsers
//! - [`rules`] holds the configurable validation layers

pub mod codes;
pub mod config;
pub mod detector;
pub mod diagnostics;
pub mod document;
pub mod file_utils;
pub mod heuristics;
pub mod parsers;
mod regex_util;
pub mod registry;
pub mod rules;
pub mod security;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

pub use config::{CsvOptions, JsonOptions, ParseConfig, ValidationProfile, XmlOptions};
pub use detector::{DetectOptions, FormatDetector};
pub use diagnostics::{
    DetectionResult, FormatError, FormatResult, ParseMetadata, ParseResult, Severity,
    ValidationError,
};
pub use document::Document;
pub use parsers::{CsvParser, FormatParser, JsonParser, XmlParser};
pub use registry::{FormatRegistry, ParseOptions, MIN_PARSE_CONFIDENCE};
pub use security::{DefaultSecurityManager, SecurityError, SecurityManager};

/// Detection and parse outcome for one piece of content
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub detection: DetectionResult,
    pub result: ParseResult<Document>,
}

/// Per-file outcome of [`analyze_project`]
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub format: String,
    pub confidence: u8,
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl FileReport {
    pub fn from_analysis(path: PathBuf, analysis: Analysis) -> Self {
        Self {
            path,
            format: analysis.detection.format,
            confidence: analysis.detection.confidence,
            is_valid: analysis.result.is_valid,
            summary: analysis.result.data.as_ref().map(Document::summary),
            errors: analysis.result.errors,
        }
    }

    fn read_failure(path: PathBuf, error: &FormatError) -> Self {
        Self {
            path,
            format: DetectionResult::UNKNOWN.to_string(),
            confidence: 0,
            is_valid: false,
            errors: vec![ValidationError::error(
                codes::FILE_READ_ERROR,
                format!("Failed to read file: {}", error),
            )],
            summary: None,
        }
    }

    pub fn has_blocking(&self) -> bool {
        self.errors.iter().any(ValidationError::is_blocking)
    }
}

/// Options for [`analyze_project`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Glob patterns matched against each path; matches are skipped
    pub exclude: Vec<String>,
    pub max_file_size: u64,
    /// Only analyze files whose extension a registered parser claims
    pub known_extensions_only: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            max_file_size: file_utils::DEFAULT_MAX_FILE_SIZE,
            known_extensions_only: true,
        }
    }
}

/// Detect the format, then parse with it.
///
/// Content whose detection stays below [`MIN_PARSE_CONFIDENCE`] is reported
/// as a failed parse without running any parser.
pub fn analyze_content(
    content: &str,
    filename: Option<&str>,
    detector: &FormatDetector,
    config: &ParseConfig,
) -> Analysis {
    let detection = detector.detect(
        content,
        &DetectOptions {
            filename,
            ..DetectOptions::default()
        },
    );

    let result = if detection.is_unknown() || detection.confidence < MIN_PARSE_CONFIDENCE {
        ParseResult::failure(
            vec![ValidationError::error(
                codes::FORMAT_DETECTION_FAILED,
                format!(
                    "Could not detect the format (best guess {} at {}%)",
                    detection.format, detection.confidence
                ),
            )],
            ParseMetadata::new(&detection.format, content.len(), detection.confidence),
        )
    } else {
        detector.registry().parse(
            content,
            &ParseOptions::with_format(&detection.format),
            config,
        )
    };

    Analysis { detection, result }
}

/// Read a file safely and analyze it, using its name as a detection hint
pub fn analyze_file(
    path: &Path,
    detector: &FormatDetector,
    config: &ParseConfig,
) -> FormatResult<Analysis> {
    analyze_file_with_limit(path, detector, config, file_utils::DEFAULT_MAX_FILE_SIZE)
}

fn analyze_file_with_limit(
    path: &Path,
    detector: &FormatDetector,
    config: &ParseConfig,
    max_file_size: u64,
) -> FormatResult<Analysis> {
    let content = file_utils::safe_read_file_with_limit(path, max_file_size)?;
    let filename = path.file_name().and_then(|n| n.to_str());
    Ok(analyze_content(&content, filename, detector, config))
}

/// Analyze every file under `root`.
///
/// The walk honours ignore files. Files are analyzed in parallel, each as an
/// independent unit; reports come back sorted by path.
pub fn analyze_project(
    root: &Path,
    detector: &FormatDetector,
    config: &ParseConfig,
    options: &BatchOptions,
) -> FormatResult<Vec<FileReport>> {
    use ignore::WalkBuilder;

    let exclude_patterns: Vec<glob::Pattern> = options
        .exclude
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|source| FormatError::ExcludePattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect::<FormatResult<_>>()?;

    let registry = detector.registry();
    let paths: Vec<PathBuf> = WalkBuilder::new(root)
        .standard_filters(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter(|entry| {
            let path_str = entry.path().to_string_lossy();
            !exclude_patterns.iter().any(|p| p.matches(&path_str))
        })
        .filter(|entry| {
            !options.known_extensions_only
                || entry
                    .path()
                    .to_str()
                    .is_some_and(|p| registry.get_by_filename(p).is_some())
        })
        .map(|entry| entry.into_path())
        .collect();

    tracing::debug!(root = %root.display(), files = paths.len(), "analyzing project");

    let mut reports: Vec<FileReport> = paths
        .into_par_iter()
        .map(|path| {
            match analyze_file_with_limit(&path, detector, config, options.max_file_size) {
                Ok(analysis) => FileReport::from_analysis(path, analysis),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    FileReport::read_failure(path, &e)
                }
            }
        })
        .collect();

    reports.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(reports)
}
