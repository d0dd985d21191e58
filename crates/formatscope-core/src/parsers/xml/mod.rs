//! XML detection, validation and recursive-descent parsing

pub mod descent;
pub mod scan;
pub mod tree;

use std::{fmt, sync::Arc, time::Instant};

pub use self::descent::{parse_document, XmlSyntaxError};
pub use self::tree::{
    NodeId, XmlAttribute, XmlDeclaration, XmlDocument, XmlElement, XmlNode, XmlNodeKind,
};

use crate::{
    codes,
    config::ParseConfig,
    diagnostics::{DetectionResult, ParseMetadata, ParseResult, ValidationError},
    document::Document,
    heuristics::score_xml_structure,
    parsers::FormatParser,
    rules::xml::xml_layers,
    security::{DefaultSecurityManager, SecurityManager},
};

pub struct XmlParser {
    security: Arc<dyn SecurityManager>,
}

impl fmt::Debug for XmlParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlParser").finish_non_exhaustive()
    }
}

impl Default for XmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlParser {
    pub fn new() -> Self {
        Self {
            security: Arc::new(DefaultSecurityManager::default()),
        }
    }

    /// Use a custom sanitization boundary instead of the default one
    pub fn with_security_manager(security: Arc<dyn SecurityManager>) -> Self {
        Self { security }
    }
}

impl FormatParser for XmlParser {
    fn name(&self) -> &str {
        "xml"
    }

    fn extensions(&self) -> &[&'static str] {
        &["xml", "xsd", "xsl", "xslt", "svg", "rss", "atom", "plist"]
    }

    fn mime_types(&self) -> &[&'static str] {
        &[
            "application/xml",
            "text/xml",
            "application/xhtml+xml",
            "application/rss+xml",
            "application/atom+xml",
            "image/svg+xml",
        ]
    }

    fn detect(&self, content: &str) -> DetectionResult {
        let heuristic = score_xml_structure(content);
        let format = if heuristic.score > 50.0 {
            self.name()
        } else {
            DetectionResult::UNKNOWN
        };
        DetectionResult::new(format, heuristic.score, heuristic.evidence)
    }

    fn validate(&self, content: &str, config: &ParseConfig) -> Vec<ValidationError> {
        if content.trim().is_empty() {
            return vec![ValidationError::error(codes::EMPTY_CONTENT, "XML content is empty")];
        }
        let mut errors = Vec::new();
        for layer in xml_layers(&config.xml) {
            errors.extend(layer.validate(content, config));
        }
        config.filter_disabled(&mut errors);
        errors
    }

    fn parse(&self, content: &str, config: &ParseConfig) -> ParseResult<Document> {
        let start = Instant::now();
        let metadata = ParseMetadata::new(self.name(), content.len(), self.detect(content).confidence);

        let content = match self.security.sanitize_input(content, self.name()) {
            Ok(sanitized) => sanitized,
            Err(e) => {
                let message = self.security.sanitize_error_message(&e.to_string());
                let errors = vec![ValidationError::error(codes::SECURITY_ERROR, message)];
                return ParseResult::failure(errors, metadata.with_parse_time(start.elapsed()));
            }
        };

        let mut errors = self.validate(&content, config);
        if errors.iter().any(ValidationError::is_blocking) {
            return ParseResult::failure(errors, metadata.with_parse_time(start.elapsed()));
        }

        let descent = parse_document(
            &content,
            config.xml.preserve_whitespace,
            config.xml.max_nesting_depth,
        );
        match descent {
            Ok(document) => ParseResult::from_parts(
                Some(Document::Xml(document)),
                errors,
                metadata.with_parse_time(start.elapsed()),
            ),
            Err(e) => {
                tracing::debug!(line = e.line, column = e.column, "xml descent failed: {}", e.message);
                errors.push(
                    ValidationError::error(
                        codes::XML_PARSE_ERROR,
                        self.security.sanitize_error_message(&e.message),
                    )
                    .at(e.line, e.column),
                );
                ParseResult::failure(errors, metadata.with_parse_time(start.elapsed()))
            }
        }
    }
}
