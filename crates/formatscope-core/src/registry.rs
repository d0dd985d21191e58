//! Parser directory and registry-wide detection

use std::{collections::HashMap, sync::Arc};

use crate::{
    codes,
    config::ParseConfig,
    diagnostics::{
        clamp_confidence, DetectionResult, FormatError, FormatResult, ParseMetadata, ParseResult,
        ValidationError,
    },
    document::Document,
    file_utils::extension_of,
    parsers::{default_parsers, FormatParser},
};

/// Detection confidence below which `parse` refuses to guess
pub const MIN_PARSE_CONFIDENCE: u8 = 50;

const FILENAME_BONUS: f64 = 20.0;
const MIME_BONUS: f64 = 15.0;

/// How `parse` and `validate` pick a parser. An explicit `format` wins;
/// otherwise the content is detected with the filename and MIME hints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions<'a> {
    pub format: Option<&'a str>,
    pub filename: Option<&'a str>,
    pub mime_type: Option<&'a str>,
}

impl<'a> ParseOptions<'a> {
    pub fn with_format(format: &'a str) -> Self {
        Self {
            format: Some(format),
            ..Self::default()
        }
    }
}

/// Holds registered parsers and routes content to them by name, extension
/// or MIME type.
pub struct FormatRegistry {
    parsers: Vec<Arc<dyn FormatParser>>,
    by_extension: HashMap<String, String>,
    by_mime_type: HashMap<String, String>,
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

impl FormatRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
            by_extension: HashMap::new(),
            by_mime_type: HashMap::new(),
        }
    }

    /// A registry holding the JSON, CSV and XML parsers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for parser in default_parsers() {
            let registered = registry.register(parser);
            debug_assert!(registered.is_ok(), "built-in parser rejected: {:?}", registered);
            if let Err(e) = registered {
                tracing::warn!("skipping built-in parser: {}", e);
            }
        }
        registry
    }

    /// Add a parser. Names are unique ignoring case; a later parser claiming
    /// an extension or MIME type takes it over.
    pub fn register(&mut self, parser: Arc<dyn FormatParser>) -> FormatResult<()> {
        let name = parser.name().to_ascii_lowercase();
        if self.get(&name).is_some() {
            return Err(FormatError::DuplicateParser { name });
        }

        for ext in parser.extensions() {
            self.by_extension
                .insert(ext.trim_start_matches('.').to_ascii_lowercase(), name.clone());
        }
        for mime in parser.mime_types() {
            self.by_mime_type.insert(normalize_mime(mime), name.clone());
        }
        tracing::debug!(
            format = %name,
            extensions = parser.extensions().len(),
            mime_types = parser.mime_types().len(),
            "registered parser"
        );
        self.parsers.push(parser);
        Ok(())
    }

    /// Remove a parser and every mapping that still points at it
    pub fn unregister(&mut self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let before = self.parsers.len();
        self.parsers.retain(|p| !p.name().eq_ignore_ascii_case(&name));
        if self.parsers.len() == before {
            return false;
        }
        self.by_extension.retain(|_, owner| *owner != name);
        self.by_mime_type.retain(|_, owner| *owner != name);
        tracing::debug!(format = %name, "unregistered parser");
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FormatParser>> {
        self.parsers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Look up by extension, with or without the leading dot
    pub fn get_by_extension(&self, extension: &str) -> Option<Arc<dyn FormatParser>> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.by_extension.get(&ext).and_then(|name| self.get(name))
    }

    /// Look up by MIME type; parameters such as `charset` are ignored
    pub fn get_by_mime_type(&self, mime_type: &str) -> Option<Arc<dyn FormatParser>> {
        self.by_mime_type
            .get(&normalize_mime(mime_type))
            .and_then(|name| self.get(name))
    }

    pub fn get_by_filename(&self, filename: &str) -> Option<Arc<dyn FormatParser>> {
        extension_of(filename).and_then(|ext| self.get_by_extension(&ext))
    }

    pub fn parsers(&self) -> impl Iterator<Item = &Arc<dyn FormatParser>> {
        self.parsers.iter()
    }

    /// Registered format names in registration order
    pub fn formats(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Run every parser's `detect`, adding a bonus for the parser the
    /// filename points at (+20) and the one the MIME type points at (+15).
    ///
    /// Candidates are labelled with the parser's name. The highest confidence
    /// wins; an exact tie goes to the lexically smaller name.
    pub fn detect_format(
        &self,
        content: &str,
        filename: Option<&str>,
        mime_type: Option<&str>,
    ) -> DetectionResult {
        let by_filename = filename.and_then(|f| self.get_by_filename(f));
        let by_mime = mime_type.and_then(|m| self.get_by_mime_type(m));

        let mut candidates: Vec<(String, u8, Vec<String>)> = Vec::new();
        for parser in &self.parsers {
            let result = parser.detect(content);
            let mut score = f64::from(result.confidence);
            let mut evidence = result.evidence;

            if by_filename.as_ref().is_some_and(|p| Arc::ptr_eq(p, parser)) {
                score += FILENAME_BONUS;
                evidence.push(format!("Filename suggests {}", parser.name()));
            }
            if by_mime.as_ref().is_some_and(|p| Arc::ptr_eq(p, parser)) {
                score += MIME_BONUS;
                evidence.push(format!("MIME type suggests {}", parser.name()));
            }

            let confidence = clamp_confidence(score);
            if confidence > 0 {
                candidates.push((parser.name().to_string(), confidence, evidence));
            }
        }

        rank_candidates(&mut candidates);
        let mut ranked = candidates.into_iter();
        let Some((format, confidence, mut evidence)) = ranked.next() else {
            tracing::debug!("no parser reported any confidence");
            return DetectionResult::unknown();
        };
        if let Some((runner_up, runner_confidence, _)) = ranked.next() {
            evidence.push(format!(
                "Preferred over {} ({}% vs {}%)",
                runner_up, confidence, runner_confidence
            ));
        }
        tracing::debug!(format = %format, confidence, "registry detection");
        DetectionResult {
            format,
            confidence,
            evidence,
        }
    }

    fn resolve(
        &self,
        content: &str,
        options: &ParseOptions<'_>,
    ) -> Result<Arc<dyn FormatParser>, ValidationError> {
        if let Some(format) = options.format {
            return self.get(format).ok_or_else(|| {
                ValidationError::error(
                    codes::UNKNOWN_FORMAT,
                    format!("No parser registered for format '{}'", format),
                )
            });
        }

        let detection = self.detect_format(content, options.filename, options.mime_type);
        if detection.is_unknown() || detection.confidence < MIN_PARSE_CONFIDENCE {
            return Err(ValidationError::error(
                codes::FORMAT_DETECTION_FAILED,
                format!(
                    "Could not detect the format (best guess {} at {}%)",
                    detection.format, detection.confidence
                ),
            )
            .with_suggestion("Pass the format explicitly"));
        }
        self.get(&detection.format).ok_or_else(|| {
            ValidationError::error(
                codes::UNKNOWN_FORMAT,
                format!("No parser registered for format '{}'", detection.format),
            )
        })
    }

    /// Parse with an explicit or detected format
    pub fn parse(
        &self,
        content: &str,
        options: &ParseOptions<'_>,
        config: &ParseConfig,
    ) -> ParseResult<Document> {
        match self.resolve(content, options) {
            Ok(parser) => parser.parse(content, config),
            Err(error) => {
                let format = options.format.unwrap_or(DetectionResult::UNKNOWN);
                ParseResult::failure(vec![error], ParseMetadata::new(format, content.len(), 0))
            }
        }
    }

    /// Validate with an explicit or detected format. When no parser can be
    /// resolved the result is a single advisory warning.
    pub fn validate(
        &self,
        content: &str,
        options: &ParseOptions<'_>,
        config: &ParseConfig,
    ) -> Vec<ValidationError> {
        match self.resolve(content, options) {
            Ok(parser) => parser.validate(content, config),
            Err(error) => vec![ValidationError::warning(
                codes::PARSER_NOT_FOUND,
                format!("No parser available to validate this content: {}", error.message),
            )],
        }
    }
}

/// Highest confidence first; equal confidence in lexical name order
pub(crate) fn rank_candidates<T>(candidates: &mut [(String, u8, T)]) {
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parser that always reports a fixed confidence
    struct FixedParser {
        name: &'static str,
        confidence: f64,
        extensions: &'static [&'static str],
    }

    impl FormatParser for FixedParser {
        fn name(&self) -> &str {
            self.name
        }

        fn extensions(&self) -> &[&'static str] {
            self.extensions
        }

        fn mime_types(&self) -> &[&'static str] {
            &[]
        }

        fn detect(&self, _content: &str) -> DetectionResult {
            DetectionResult::new(self.name, self.confidence, vec!["fixed".to_string()])
        }

        fn parse(&self, content: &str, _config: &ParseConfig) -> ParseResult<Document> {
            ParseResult::from_parts(
                Some(Document::Json(serde_json::Value::String(content.to_string()))),
                Vec::new(),
                ParseMetadata::new(self.name, content.len(), 0),
            )
        }

        fn validate(&self, _content: &str, _config: &ParseConfig) -> Vec<ValidationError> {
            Vec::new()
        }
    }

    fn fixed(name: &'static str, confidence: f64) -> Arc<dyn FormatParser> {
        Arc::new(FixedParser {
            name,
            confidence,
            extensions: &["dat"],
        })
    }

    #[test]
    fn test_with_defaults() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.formats(), vec!["json", "csv", "xml"]);
        assert_eq!(registry.get_by_extension(".JSON").unwrap().name(), "json");
        assert_eq!(registry.get_by_extension("tsv").unwrap().name(), "csv");
        assert_eq!(
            registry.get_by_mime_type("text/xml; charset=utf-8").unwrap().name(),
            "xml"
        );
        assert!(registry.get_by_filename("notes.txt").is_none());
    }

    #[test]
    fn test_with_defaults_registers_every_builtin() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.len(), default_parsers().len());
    }

    #[test]
    fn test_duplicate_name_is_rejected_ignoring_case() {
        let mut registry = FormatRegistry::new();
        registry.register(fixed("data", 10.0)).unwrap();
        let err = registry.register(fixed("DATA", 10.0)).unwrap_err();
        assert!(matches!(err, FormatError::DuplicateParser { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_later_registration_takes_over_extension() {
        let mut registry = FormatRegistry::new();
        registry.register(fixed("first", 10.0)).unwrap();
        registry.register(fixed("second", 10.0)).unwrap();
        assert_eq!(registry.get_by_extension("dat").unwrap().name(), "second");

        // removing the earlier parser leaves the takeover in place
        assert!(registry.unregister("first"));
        assert_eq!(registry.get_by_extension("dat").unwrap().name(), "second");
        assert!(registry.unregister("Second"));
        assert!(registry.get_by_extension("dat").is_none());
        assert!(!registry.unregister("second"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_detect_format_json() {
        let registry = FormatRegistry::with_defaults();
        let result = registry.detect_format(r#"{"name": "Ada", "active": true}"#, None, None);
        assert_eq!(result.format, "json");
        assert!(result.confidence >= 90);
    }

    #[test]
    fn test_filename_bonus_adds_evidence() {
        let registry = FormatRegistry::with_defaults();
        let content = "name,age\nada,36\nalan,41\n";
        let plain = registry.detect_format(content, None, None);
        let hinted = registry.detect_format(content, Some("people.csv"), None);
        assert_eq!(hinted.format, "csv");
        assert!(hinted.confidence >= plain.confidence);
        assert!(hinted.evidence.iter().any(|e| e == "Filename suggests csv"));
    }

    #[test]
    fn test_mime_bonus_adds_evidence() {
        let registry = FormatRegistry::with_defaults();
        let result = registry.detect_format("<root><a/></root>", None, Some("application/xml"));
        assert_eq!(result.format, "xml");
        assert!(result.evidence.iter().any(|e| e == "MIME type suggests xml"));
    }

    #[test]
    fn test_runner_up_is_noted() {
        let mut registry = FormatRegistry::new();
        registry.register(fixed("alpha", 60.0)).unwrap();
        registry.register(fixed("beta", 40.0)).unwrap();
        let result = registry.detect_format("x", None, None);
        assert_eq!(result.format, "alpha");
        assert!(result.evidence.last().unwrap().contains("beta"));
    }

    #[test]
    fn test_tie_goes_to_lexically_smaller_name() {
        let mut registry = FormatRegistry::new();
        registry.register(fixed("zeta", 70.0)).unwrap();
        registry.register(fixed("alpha", 70.0)).unwrap();
        assert_eq!(registry.detect_format("x", None, None).format, "alpha");
    }

    #[test]
    fn test_no_candidates_is_unknown() {
        let mut registry = FormatRegistry::new();
        registry.register(fixed("zero", 0.0)).unwrap();
        let result = registry.detect_format("x", None, None);
        assert!(result.is_unknown());
        assert_eq!(result.confidence, 0);
    }

    #[test]
    fn test_parse_unknown_format() {
        let registry = FormatRegistry::with_defaults();
        let result = registry.parse("a", &ParseOptions::with_format("yaml"), &ParseConfig::default());
        assert!(!result.is_valid);
        assert!(result.has_code(codes::UNKNOWN_FORMAT));
    }

    #[test]
    fn test_parse_low_confidence_is_detection_failure() {
        let registry = FormatRegistry::with_defaults();
        let result = registry.parse(
            "just a sentence of prose",
            &ParseOptions::default(),
            &ParseConfig::default(),
        );
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.has_code(codes::FORMAT_DETECTION_FAILED));
    }

    #[test]
    fn test_parse_detected_json() {
        let registry = FormatRegistry::with_defaults();
        let result = registry.parse(r#"{"a": [1, 2]}"#, &ParseOptions::default(), &ParseConfig::default());
        assert!(result.is_valid);
        assert_eq!(result.metadata.format, "json");
    }

    #[test]
    fn test_explicit_format_skips_detection() {
        let registry = FormatRegistry::with_defaults();
        let result = registry.parse("a,b\n1,2\n", &ParseOptions::with_format("CSV"), &ParseConfig::default());
        assert!(result.is_valid);
        assert_eq!(result.data.unwrap().format(), "csv");
    }

    #[test]
    fn test_validate_without_parser_is_single_warning() {
        let registry = FormatRegistry::with_defaults();
        let errors = registry.validate("???", &ParseOptions::default(), &ParseConfig::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, codes::PARSER_NOT_FOUND);
        assert!(!errors[0].is_blocking());
    }
}
