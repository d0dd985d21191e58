//! Format parsers
//!
//! Each parser owns detection, validation and decoding for one format. The
//! [`FormatRegistry`](crate::FormatRegistry) routes content to them.

pub mod csv;
pub mod json;
pub mod xml;

pub use self::csv::CsvParser;
pub use self::json::JsonParser;
pub use self::xml::XmlParser;

use crate::{
    config::ParseConfig,
    diagnostics::{DetectionResult, ParseResult, ValidationError},
    document::Document,
};
use std::sync::Arc;

/// Contract every format parser implements.
///
/// Parsers hold no per-call state, so one instance can serve concurrent
/// calls from several threads.
pub trait FormatParser: Send + Sync {
    /// Unique, lowercase format name (`json`, `csv`, `xml`)
    fn name(&self) -> &str;

    /// File extensions without the leading dot
    fn extensions(&self) -> &[&'static str];

    fn mime_types(&self) -> &[&'static str];

    /// Score how likely `content` is this format. The reported format is
    /// this parser's name only when it is confident enough; the confidence
    /// is reported either way.
    fn detect(&self, content: &str) -> DetectionResult;

    /// Validate then decode. Never panics; every failure is a finding.
    fn parse(&self, content: &str, config: &ParseConfig) -> ParseResult<Document>;

    fn validate(&self, content: &str, config: &ParseConfig) -> Vec<ValidationError>;
}

/// The built-in parsers, in registration order
pub fn default_parsers() -> Vec<Arc<dyn FormatParser>> {
    vec![
        Arc::new(JsonParser::new()),
        Arc::new(CsvParser::new()),
        Arc::new(XmlParser::new()),
    ]
}
